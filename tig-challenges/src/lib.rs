mod rng_array;
pub use rng_array::RngArray;

pub mod vector_search;
pub use vector_search as c004;
