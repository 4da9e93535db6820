//! # CLI Command Implementations
//!
//! Each submodule represents a top-level command or command group.
//!
//! ## Available Commands
//!
//! - [`ask`] - Answer one question from the knowledge graph
//! - [`config`] - Show or initialise the configuration file
//! - [`embed`] - Embed nodes that have no embedding yet
//! - [`interactive`] - Answer questions read from stdin
//! - [`status`] - Check database connectivity and embedded data

pub mod ask;
pub mod config;
pub mod embed;
pub mod interactive;
pub mod status;
