//! # Exit Codes
//!
//! Standard exit codes for the askgraph CLI.
//!
//! These codes follow common Unix conventions and provide meaningful
//! feedback to scripts wrapping the CLI.

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// General error (unspecified)
pub const EXIT_ERROR: i32 = 1;

/// Configuration error (missing API key, invalid config file, etc.)
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Network error (graph database unreachable, etc.)
pub const EXIT_NETWORK_ERROR: i32 = 4;
