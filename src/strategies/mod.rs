pub mod classifier;
pub mod types;
pub mod windows;
