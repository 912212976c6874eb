mod pipeline;
pub use pipeline::*;
mod pool;
pub use pool::*;

pub mod rng_array;
pub mod vector_search;

/// Copies the 8 seeds behind `seeds`, or `None` for a null pointer.
unsafe fn read_seeds(seeds: *const u64) -> Option<[u64; 8]> {
    if seeds.is_null() {
        return None;
    }
    Some(std::ptr::read_unaligned(seeds as *const [u64; 8]))
}
