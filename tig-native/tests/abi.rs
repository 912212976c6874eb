use std::{mem::ManuallyDrop, ptr};
use tig_challenges::vector_search::{euclidean_distance, DATABASE_SIZE};
use tig_challenges::RngArray;
use tig_native::{rng_array::*, vector_search::*, Workspace, WorkspaceLease};

const SEEDS: [u64; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

// Every test shares the process-wide pool. Each test holds at most one handle
// at a time so two workspaces are always enough.
fn setup() {
    init_workspaces_vs(2);
}

fn difficulty(num_queries: u32, better_than_baseline: u32) -> VSODifficulty {
    VSODifficulty {
        num_queries,
        better_than_baseline,
    }
}

fn solution_of(workspace: *const Workspace) -> Vec<usize> {
    let mut out = VSOSolution {
        indexes: ptr::null(),
        len: 0,
    };
    unsafe {
        assert!(workspace_solution_vs(workspace, &mut out));
        std::slice::from_raw_parts(out.indexes, out.len).to_vec()
    }
}

#[test]
fn test_init_workspaces() {
    setup();
    assert!(!init_workspaces_vs(0));
    assert!(!init_workspaces_vs(4));
}

#[test]
fn test_generate_solve_verify() {
    setup();
    unsafe {
        let workspace = generate_instance_vs(SEEDS.as_ptr(), &difficulty(10, 0));
        assert!(!workspace.is_null());
        assert!(solve_optimax_vs(workspace));
        assert_eq!(verify_solution_vs(workspace), 0);

        let indexes = solution_of(workspace);
        assert_eq!(indexes.len(), 10);
        assert!(indexes.iter().all(|&i| i < DATABASE_SIZE));
        assert_eq!(verify_indexes_vs(workspace, indexes.as_ptr(), indexes.len()), 0);

        // an out of range index wins over any distance check
        let mut out_of_bounds = indexes.clone();
        out_of_bounds[3] = DATABASE_SIZE;
        assert_eq!(
            verify_indexes_vs(workspace, out_of_bounds.as_ptr(), out_of_bounds.len()),
            2
        );
        let all_out_of_bounds = vec![DATABASE_SIZE; 10];
        assert_eq!(
            verify_indexes_vs(workspace, all_out_of_bounds.as_ptr(), 10),
            2
        );

        assert_eq!(verify_indexes_vs(workspace, indexes.as_ptr(), 9), 1);
        assert_eq!(verify_indexes_vs(workspace, ptr::null(), 0), 1);
        assert_eq!(verify_indexes_vs(workspace, ptr::null(), 10), ERROR_CODE);

        // map every query to the farthest of the first thousand rows
        let lease = ManuallyDrop::new(WorkspaceLease::from_raw(workspace));
        let farthest: Vec<usize> = lease
            .challenge
            .iter_queries()
            .map(|query| {
                (0..1000)
                    .max_by(|&a, &b| {
                        euclidean_distance(query, lease.challenge.database_vector(a)).total_cmp(
                            &euclidean_distance(query, lease.challenge.database_vector(b)),
                        )
                    })
                    .unwrap()
            })
            .collect();
        assert_eq!(verify_indexes_vs(workspace, farthest.as_ptr(), farthest.len()), 3);

        release_workspace_vs(workspace);
    }
}

#[test]
fn test_scenario_is_valid() {
    setup();
    unsafe {
        let workspace = generate_instance_vs(SEEDS.as_ptr(), &difficulty(20, 450));
        assert!(!workspace.is_null());
        assert!(solve_optimax_vs(workspace));
        assert_eq!(solution_of(workspace).len(), 20);
        assert_eq!(verify_solution_vs(workspace), 0);
        release_workspace_vs(workspace);
    }
}

#[test]
fn test_generate_is_deterministic() {
    setup();
    unsafe {
        let first = generate_instance_vs(SEEDS.as_ptr(), &difficulty(12, 300));
        assert!(solve_optimax_vs(first));
        let first_indexes = solution_of(first);
        release_workspace_vs(first);

        let second = generate_instance_vs(SEEDS.as_ptr(), &difficulty(12, 300));
        assert!(solve_optimax_vs(second));
        assert_eq!(solution_of(second), first_indexes);
        release_workspace_vs(second);
    }
}

#[test]
fn test_invalid_inputs() {
    setup();
    unsafe {
        assert!(generate_instance_vs(ptr::null(), &difficulty(10, 0)).is_null());
        assert!(generate_instance_vs(SEEDS.as_ptr(), ptr::null()).is_null());
        // failed generations hand their workspace back, so this never blocks
        for _ in 0..8 {
            assert!(generate_instance_vs(SEEDS.as_ptr(), &difficulty(0, 0)).is_null());
            assert!(generate_instance_vs(SEEDS.as_ptr(), &difficulty(1001, 0)).is_null());
        }

        assert!(!solve_optimax_vs(ptr::null_mut()));
        assert_eq!(verify_solution_vs(ptr::null()), ERROR_CODE);
        assert_eq!(verify_indexes_vs(ptr::null(), ptr::null(), 0), ERROR_CODE);
        let mut out = VSOSolution {
            indexes: ptr::null(),
            len: 0,
        };
        assert!(!workspace_solution_vs(ptr::null(), &mut out));
        release_workspace_vs(ptr::null_mut());

        assert_eq!(solve_optimax_full_vs(SEEDS.as_ptr(), &difficulty(0, 0)), ERROR_CODE);
        assert_eq!(solve_optimax_full_vs(ptr::null(), &difficulty(10, 0)), ERROR_CODE);
    }
}

#[test]
fn test_solve_full() {
    setup();
    unsafe {
        assert_eq!(solve_optimax_full_vs([3; 8].as_ptr(), &difficulty(10, 0)), 0);
    }
}

#[test]
fn test_rng_array_matches_native_stream() {
    unsafe {
        let handle = rng_array_native_new(SEEDS.as_ptr());
        assert!(!handle.is_null());
        let mut rngs = RngArray::new(SEEDS);
        for _ in 0..100 {
            assert_eq!(
                rng_array_native_sample_uniform32(handle, 0.0, 1.0),
                rngs.sample_uniform(0.0f32, 1.0)
            );
            assert_eq!(
                rng_array_native_sample_uniform64(handle, -5.0, 5.0),
                rngs.sample_uniform(-5.0f64, 5.0)
            );
        }
        assert_eq!(rng_array_native_sample_uniform32(handle, 2.0, 2.0), 2.0);
        assert_eq!(rng_array_native_sample_uniform64(handle, 3.0, 1.0), 3.0);
        rng_array_native_free(handle);

        assert!(rng_array_native_new(ptr::null()).is_null());
        assert_eq!(rng_array_native_sample_uniform32(ptr::null_mut(), 0.0, 1.0), 0.0);
        assert_eq!(rng_array_native_sample_uniform64(ptr::null_mut(), 0.0, 1.0), 0.0);
        rng_array_native_free(ptr::null_mut());
    }
}
