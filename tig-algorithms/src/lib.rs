pub mod vector_search;
pub use vector_search as c004;
