pub mod persistence;
pub mod simulator;
pub mod types;
