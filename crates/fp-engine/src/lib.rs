//! fp-engine: workflow engine adapters
//!
//! - `client`: Step Functions JSON 1.0 protocol over `reqwest`
//! - `memory`: in-process engine for tests and local runs

pub mod client;
pub mod memory;

pub use client::StepFunctionsClient;
pub use memory::MemoryEngine;
