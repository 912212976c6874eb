//! C ABI for the vector search solver.
//!
//! A handle returned by `generate_instance_vs` holds its workspace until it is
//! passed to `release_workspace_vs`. Every entry point tolerates null handles
//! and never unwinds into the caller.

use crate::{read_seeds, run_pipeline, Workspace, WorkspaceData, WorkspaceLease, WorkspacePool};
use once_cell::sync::OnceCell;
use std::{
    mem::ManuallyDrop,
    panic::{catch_unwind, AssertUnwindSafe},
    ptr, slice,
};
use tig_algorithms::vector_search::optimax::solve_challenge_into;
use tig_challenges::vector_search::{Difficulty, VerifyError};
use tracing::{error, warn};

pub const DEFAULT_NUM_WORKSPACES: usize = 128;
/// Returned when no verdict could be produced, e.g. generation failed or the
/// handle is invalid.
pub const ERROR_CODE: u32 = 4;

static WORKSPACES: OnceCell<WorkspacePool> = OnceCell::new();

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VSODifficulty {
    pub num_queries: u32,
    pub better_than_baseline: u32,
}

impl From<VSODifficulty> for Difficulty {
    fn from(d: VSODifficulty) -> Self {
        Difficulty {
            num_queries: d.num_queries,
            better_than_baseline: d.better_than_baseline,
        }
    }
}

/// Borrowed view of a workspace's solution. Valid until the workspace is
/// solved again or released.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VSOSolution {
    pub indexes: *const usize,
    pub len: usize,
}

fn workspaces() -> Option<&'static WorkspacePool> {
    WORKSPACES
        .get_or_try_init(|| WorkspacePool::new(DEFAULT_NUM_WORKSPACES))
        .map_err(|e| error!("{}", e))
        .ok()
}

fn verdict_code(verdict: Result<f32, VerifyError>) -> u32 {
    match verdict {
        Ok(_) => 0,
        Err(e) => e.code(),
    }
}

unsafe fn read_difficulty(difficulty: *const VSODifficulty) -> Option<Difficulty> {
    difficulty.as_ref().map(|d| (*d).into())
}

/// Rebuilds the lease behind a handle without taking ownership of it.
/// Handles that were already released are rejected.
unsafe fn borrow_workspace(ptr: *const Workspace) -> Option<ManuallyDrop<WorkspaceLease<'static>>> {
    if ptr.is_null() || !workspaces()?.is_leased(ptr) {
        warn!("invalid workspace handle");
        return None;
    }
    Some(ManuallyDrop::new(WorkspaceLease::from_raw(ptr)))
}

/// Creates the workspace pool with `num_workspaces` workspaces. Returns false
/// if the pool already exists or `num_workspaces` is 0.
#[no_mangle]
pub extern "C" fn init_workspaces_vs(num_workspaces: u32) -> bool {
    catch_unwind(|| {
        let mut created = false;
        let result = WORKSPACES.get_or_try_init(|| {
            created = true;
            WorkspacePool::new(num_workspaces as usize)
        });
        match result {
            Ok(_) => created,
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    })
    .unwrap_or(false)
}

/// Acquires a workspace and generates an instance into it. Spins while every
/// workspace is in use. Returns null if generation fails.
///
/// # Safety
///
/// `seeds` must point to 8 readable `u64`s and `difficulty` to a valid
/// `VSODifficulty`.
#[no_mangle]
pub unsafe extern "C" fn generate_instance_vs(
    seeds: *const u64,
    difficulty: *const VSODifficulty,
) -> *mut Workspace {
    catch_unwind(AssertUnwindSafe(|| {
        let (Some(seeds), Some(difficulty)) = (read_seeds(seeds), read_difficulty(difficulty))
        else {
            return ptr::null_mut();
        };
        let Some(pool) = workspaces() else {
            return ptr::null_mut();
        };
        let mut lease = pool.acquire();
        match lease.challenge.regenerate(seeds, &difficulty) {
            Ok(()) => lease.into_raw() as *mut Workspace,
            Err(e) => {
                warn!(workspace_id = lease.id(), "{}", e);
                ptr::null_mut()
            }
        }
    }))
    .unwrap_or(ptr::null_mut())
}

/// Solves the instance held by `workspace` into its solution buffer. Returns
/// false if some query found no candidate, in which case the solution is
/// empty.
///
/// # Safety
///
/// `workspace` must be a live handle from `generate_instance_vs`.
#[no_mangle]
pub unsafe extern "C" fn solve_optimax_vs(workspace: *mut Workspace) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(mut lease) = borrow_workspace(workspace) else {
            return false;
        };
        let WorkspaceData {
            challenge,
            solution,
        } = &mut **lease;
        solve_challenge_into(challenge, solution)
    }))
    .unwrap_or(false)
}

/// Verifies the solution held by `workspace`: 0 valid, 1 wrong count,
/// 2 index out of bounds, 3 threshold exceeded.
///
/// # Safety
///
/// `workspace` must be a live handle from `generate_instance_vs`.
#[no_mangle]
pub unsafe extern "C" fn verify_solution_vs(workspace: *const Workspace) -> u32 {
    catch_unwind(AssertUnwindSafe(|| match borrow_workspace(workspace) {
        Some(lease) => verdict_code(lease.challenge.verify_solution(&lease.solution)),
        None => ERROR_CODE,
    }))
    .unwrap_or(ERROR_CODE)
}

/// Verifies `len` caller supplied indexes against the instance held by
/// `workspace`. Codes as for `verify_solution_vs`.
///
/// # Safety
///
/// `workspace` must be a live handle from `generate_instance_vs` and
/// `indexes` must point to `len` readable `usize`s.
#[no_mangle]
pub unsafe extern "C" fn verify_indexes_vs(
    workspace: *const Workspace,
    indexes: *const usize,
    len: usize,
) -> u32 {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(lease) = borrow_workspace(workspace) else {
            return ERROR_CODE;
        };
        let indexes = match (indexes.is_null(), len) {
            (true, 0) => &[][..],
            (true, _) => return ERROR_CODE,
            (false, _) => slice::from_raw_parts(indexes, len),
        };
        verdict_code(lease.challenge.verify_indexes(indexes))
    }))
    .unwrap_or(ERROR_CODE)
}

/// Writes a view of the workspace's solution into `out`.
///
/// # Safety
///
/// `workspace` must be a live handle from `generate_instance_vs` and `out`
/// must be writable.
#[no_mangle]
pub unsafe extern "C" fn workspace_solution_vs(
    workspace: *const Workspace,
    out: *mut VSOSolution,
) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        let (Some(lease), Some(out)) = (borrow_workspace(workspace), out.as_mut()) else {
            return false;
        };
        *out = VSOSolution {
            indexes: lease.solution.indexes.as_ptr(),
            len: lease.solution.indexes.len(),
        };
        true
    }))
    .unwrap_or(false)
}

/// Returns the workspace to the pool. The handle is invalid afterwards.
///
/// # Safety
///
/// `workspace` must be a live handle from `generate_instance_vs`, released
/// at most once.
#[no_mangle]
pub unsafe extern "C" fn release_workspace_vs(workspace: *mut Workspace) {
    let _ = catch_unwind(AssertUnwindSafe(|| {
        if workspace.is_null() {
            return;
        }
        let released = workspaces().map_or(false, |pool| pool.release_raw(workspace));
        if !released {
            warn!("invalid workspace handle");
        }
    }));
}

/// Generates, solves and verifies one instance, then releases the workspace.
/// Returns the verification code, or `ERROR_CODE` if generation failed.
///
/// # Safety
///
/// `seeds` must point to 8 readable `u64`s and `difficulty` to a valid
/// `VSODifficulty`.
#[no_mangle]
pub unsafe extern "C" fn solve_optimax_full_vs(
    seeds: *const u64,
    difficulty: *const VSODifficulty,
) -> u32 {
    catch_unwind(AssertUnwindSafe(|| {
        let (Some(seeds), Some(difficulty), Some(pool)) =
            (read_seeds(seeds), read_difficulty(difficulty), workspaces())
        else {
            return ERROR_CODE;
        };
        run_pipeline(pool, seeds, &difficulty).map_or(ERROR_CODE, |outcome| outcome.code())
    }))
    .unwrap_or(ERROR_CODE)
}
