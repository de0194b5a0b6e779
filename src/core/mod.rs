pub mod config;
pub mod debug;
pub mod errors;
pub mod kernel;
pub mod types;
