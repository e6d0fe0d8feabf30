//! Core types and utilities for flowpoll
//!
//! # Modules
//!
//! - `config`: Environment loading and engine configuration
//! - `error`: Error types and Result alias
//! - `traits`: The workflow engine contract
//! - `types`: Execution ids, history events and status values

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-exports
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use traits::WorkflowEngine;
pub use types::*;
