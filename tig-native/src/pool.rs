use anyhow::{anyhow, Result};
use std::{
    cell::UnsafeCell,
    hint::spin_loop,
    mem,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tig_challenges::vector_search::{Challenge, Solution, MAX_QUERIES};
use tracing::info;

pub struct WorkspaceData {
    pub challenge: Challenge,
    pub solution: Solution,
}

/// Pre-allocated buffers for one instance plus its solution. The contents are
/// only reachable through a `WorkspaceLease`.
pub struct Workspace {
    id: usize,
    in_use: AtomicBool,
    data: UnsafeCell<WorkspaceData>,
}

// SAFETY: `data` is only accessed by the holder of `in_use`.
unsafe impl Sync for Workspace {}

impl Workspace {
    fn new(id: usize) -> Self {
        Self {
            id,
            in_use: AtomicBool::new(false),
            data: UnsafeCell::new(WorkspaceData {
                challenge: Challenge::allocate(),
                solution: Solution::with_capacity(MAX_QUERIES),
            }),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }
}

/// Fixed set of workspaces handed out round-robin.
///
/// Acquisition walks a shared counter and claims the slot it lands on if that
/// slot is free, so a caller may skip over free workspaces while others are
/// busy. No two leases ever refer to the same workspace at once.
pub struct WorkspacePool {
    workspaces: Box<[Workspace]>,
    next_index: AtomicUsize,
}

impl WorkspacePool {
    pub fn new(num_workspaces: usize) -> Result<Self> {
        if num_workspaces == 0 {
            return Err(anyhow!("Workspace pool needs at least one workspace"));
        }
        info!(num_workspaces, "initializing workspaces");
        let workspaces = (0..num_workspaces).map(Workspace::new).collect();
        info!(num_workspaces, "workspaces initialized");
        Ok(Self {
            workspaces,
            next_index: AtomicUsize::new(0),
        })
    }

    pub fn num_workspaces(&self) -> usize {
        self.workspaces.len()
    }

    pub fn num_in_use(&self) -> usize {
        self.workspaces.iter().filter(|w| w.is_in_use()).count()
    }

    /// Spins until a workspace is claimed.
    pub fn acquire(&self) -> WorkspaceLease<'_> {
        loop {
            if let Some(lease) = self.try_acquire() {
                return lease;
            }
            spin_loop();
        }
    }

    /// One claim attempt on the next slot in round-robin order.
    pub fn try_acquire(&self) -> Option<WorkspaceLease<'_>> {
        let id = self.next_index.fetch_add(1, Ordering::Relaxed) % self.workspaces.len();
        let workspace = &self.workspaces[id];
        workspace
            .in_use
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()?;
        Some(WorkspaceLease { workspace })
    }

    /// Releases a workspace previously handed out by `WorkspaceLease::into_raw`.
    /// Returns false if `ptr` is not one of this pool's workspaces or that
    /// workspace is not leased.
    ///
    /// # Safety
    ///
    /// No lease rebuilt from `ptr` may still be in use.
    pub unsafe fn release_raw(&self, ptr: *const Workspace) -> bool {
        if !self.owns(ptr) {
            return false;
        }
        (*ptr)
            .in_use
            .compare_exchange(true, false, Ordering::Release, Ordering::Relaxed)
            .is_ok()
    }

    /// True if `ptr` points at the start of one of this pool's workspaces.
    pub fn owns(&self, ptr: *const Workspace) -> bool {
        let base = self.workspaces.as_ptr() as usize;
        let offset = (ptr as usize).wrapping_sub(base);
        offset < self.workspaces.len() * mem::size_of::<Workspace>()
            && offset % mem::size_of::<Workspace>() == 0
    }

    /// True if `ptr` is one of this pool's workspaces and is currently leased.
    pub fn is_leased(&self, ptr: *const Workspace) -> bool {
        // SAFETY: `owns` guarantees `ptr` points at a live element
        self.owns(ptr) && unsafe { (*ptr).is_in_use() }
    }
}

/// Exclusive access to one workspace. Dropping the lease releases it.
pub struct WorkspaceLease<'a> {
    workspace: &'a Workspace,
}

impl<'a> WorkspaceLease<'a> {
    pub fn id(&self) -> usize {
        self.workspace.id
    }

    /// Keeps the workspace claimed and returns a handle for `from_raw`.
    pub fn into_raw(self) -> *const Workspace {
        let ptr: *const Workspace = self.workspace;
        mem::forget(self);
        ptr
    }

    /// # Safety
    ///
    /// `ptr` must come from `into_raw`, its pool must outlive `'a`, and at
    /// most one lease may be rebuilt per `into_raw` unless all but one are
    /// wrapped in `ManuallyDrop`.
    pub unsafe fn from_raw(ptr: *const Workspace) -> Self {
        Self {
            workspace: &*ptr,
        }
    }
}

impl Deref for WorkspaceLease<'_> {
    type Target = WorkspaceData;

    fn deref(&self) -> &WorkspaceData {
        // SAFETY: the lease holds the workspace's in_use flag
        unsafe { &*self.workspace.data.get() }
    }
}

impl DerefMut for WorkspaceLease<'_> {
    fn deref_mut(&mut self) -> &mut WorkspaceData {
        // SAFETY: the lease holds the workspace's in_use flag
        unsafe { &mut *self.workspace.data.get() }
    }
}

impl Drop for WorkspaceLease<'_> {
    fn drop(&mut self) {
        self.workspace.in_use.store(false, Ordering::Release);
    }
}
