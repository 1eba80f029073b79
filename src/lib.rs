//! n8n workflow CI - Library
//!
//! Validation, LLM generation and correction, and repository bookkeeping
//! for n8n workflow JSON. Re-exports modules for integration testing and
//! for the `n8n-ci` binary.

pub mod classify;
pub mod clients;
pub mod config;
pub mod correction;
pub mod error;
pub mod generator;
pub mod node_types;
pub mod pr_body;
pub mod prompt;
pub mod registry;
pub mod render;
pub mod scanner;
pub mod types;
pub mod validator;

pub use error::{Error, Result};
