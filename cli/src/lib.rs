//! # askgraph CLI Library
//!
//! Command implementations and configuration for the `askgraph` binary,
//! which answers questions about a developer knowledge graph.
//!
//! ## Modules
//!
//! - [`backend`] - Builds the RAG context from configuration
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration management
//! - [`errors`] - Error display
//! - [`exit_codes`] - Standard exit codes

pub mod backend;
pub mod commands;
pub mod config;
pub mod errors;
pub mod exit_codes;

pub use config::Config;
