use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tig_challenges::vector_search::Difficulty;
use tig_native::{run_pipeline, Workspace, WorkspacePool};

#[test]
fn test_empty_pool_is_rejected() {
    assert!(WorkspacePool::new(0).is_err());
}

#[test]
fn test_round_robin_acquire() {
    let pool = WorkspacePool::new(3).unwrap();
    let a = pool.acquire();
    let b = pool.acquire();
    let c = pool.acquire();
    assert_eq!((a.id(), b.id(), c.id()), (0, 1, 2));
    assert_eq!(pool.num_in_use(), 3);

    // the counter lands on slot 0, which is still held
    assert!(pool.try_acquire().is_none());

    drop(b);
    assert_eq!(pool.num_in_use(), 2);
    let again = pool.try_acquire().unwrap();
    assert_eq!(again.id(), 1);
}

#[test]
fn test_leases_are_exclusive() {
    const NUM_WORKSPACES: usize = 4;
    const NUM_THREADS: usize = 8;
    const ITERATIONS: usize = 500;

    let pool = WorkspacePool::new(NUM_WORKSPACES).unwrap();
    let held: Vec<AtomicBool> = (0..NUM_WORKSPACES).map(|_| AtomicBool::new(false)).collect();
    let max_in_use = AtomicUsize::new(0);

    std::thread::scope(|s| {
        for thread_id in 0..NUM_THREADS {
            let pool = &pool;
            let held = &held;
            let max_in_use = &max_in_use;
            s.spawn(move || {
                for i in 0..ITERATIONS {
                    let mut lease = pool.acquire();
                    assert!(!held[lease.id()].swap(true, Ordering::SeqCst));
                    max_in_use.fetch_max(pool.num_in_use(), Ordering::SeqCst);

                    let marker = thread_id * ITERATIONS + i;
                    lease.solution.indexes.clear();
                    lease.solution.indexes.push(marker);
                    std::hint::spin_loop();
                    assert_eq!(lease.solution.indexes, vec![marker]);

                    held[lease.id()].store(false, Ordering::SeqCst);
                }
            });
        }
    });

    assert!(max_in_use.load(Ordering::SeqCst) <= NUM_WORKSPACES);
    assert_eq!(pool.num_in_use(), 0);
}

#[test]
fn test_raw_handle_round_trip() {
    let pool = WorkspacePool::new(2).unwrap();
    let other = WorkspacePool::new(1).unwrap();

    let ptr = pool.acquire().into_raw();
    assert_eq!(pool.num_in_use(), 1);
    assert!(pool.owns(ptr));
    assert!(!other.owns(ptr));

    unsafe {
        assert!(!other.release_raw(ptr));
        assert_eq!(pool.num_in_use(), 1);
        assert!(pool.is_leased(ptr));
        assert!(pool.release_raw(ptr));
    }
    assert_eq!(pool.num_in_use(), 0);
    assert!(!pool.is_leased(ptr));
}

#[test]
fn test_double_release_is_rejected() {
    let pool = WorkspacePool::new(2).unwrap();
    let ptr = pool.acquire().into_raw();
    unsafe {
        assert!(pool.release_raw(ptr));
        assert!(!pool.release_raw(ptr));
    }

    // a stale handle leaves other leases alone
    let held = pool.acquire();
    assert_eq!(held.id(), 1);
    unsafe {
        assert!(!pool.release_raw(ptr));
    }
    assert_eq!(pool.num_in_use(), 1);
    drop(held);
}

#[test]
fn test_owns_rejects_interior_pointers() {
    let pool = WorkspacePool::new(2).unwrap();
    let ptr = pool.acquire().into_raw();
    let second = pool.acquire().into_raw();
    assert!(pool.owns(ptr));
    assert!(pool.owns(second));

    let interior = (ptr as *const u8).wrapping_add(1) as *const Workspace;
    assert!(!pool.owns(interior));
    assert!(!pool.is_leased(interior));
    assert!(!pool.owns(second.wrapping_add(1)));
    assert!(!pool.owns(std::ptr::null()));
    unsafe {
        assert!(!pool.release_raw(interior));
        assert!(pool.release_raw(ptr));
        assert!(pool.release_raw(second));
    }
    assert_eq!(pool.num_in_use(), 0);
}

#[test]
fn test_failed_generation_releases_workspace() {
    let pool = WorkspacePool::new(1).unwrap();
    for num_queries in [0, 1001] {
        let difficulty = Difficulty {
            num_queries,
            better_than_baseline: 0,
        };
        assert!(run_pipeline(&pool, [0; 8], &difficulty).is_err());
        assert_eq!(pool.num_in_use(), 0);
    }
}
