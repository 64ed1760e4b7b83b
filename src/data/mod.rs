pub mod grid;
pub mod pairing;
pub mod types;
