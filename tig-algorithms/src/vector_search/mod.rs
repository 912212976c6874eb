pub mod optimax;
pub use optimax as c004_a026;
