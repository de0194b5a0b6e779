pub mod client;
pub mod core;

pub use client::{ApiClient, ApiClientBuilder};
pub use crate::core::{
    config::{ClientConfig, ConfigError},
    debug::{DebugReport, DebugSession, TraceEntry},
    errors::ClientError,
    types::*,
};
