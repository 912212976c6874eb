pub mod core;
mod json;
pub use json::*;
