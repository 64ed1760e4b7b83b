pub mod config;
pub mod data;
pub mod engine;
pub mod execution;
pub mod monitoring;
pub mod strategies;

pub use config::EngineConfig;
pub use engine::{detect_and_simulate, EngineError, RunOutput};
