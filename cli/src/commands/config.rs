//! # Config Command
//!
//! Shows the effective configuration or writes a default configuration file.
//!
//! ## Usage
//!
//! ```bash
//! # Show current configuration (secrets masked)
//! askgraph config show
//!
//! # Write defaults to ~/.config/askgraph/config.json
//! askgraph config init
//! ```

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::config::{Config, config_path, mask_secret};
use crate::errors::{display_config_error, display_success, display_warning};
use crate::exit_codes::*;

/// Arguments for the config show command
#[derive(Debug)]
pub struct ConfigShowArgs {
    /// Show full secrets (default: masked)
    pub show_secrets: bool,
}

/// Arguments for the config init command
#[derive(Debug)]
pub struct ConfigInitArgs {
    /// Overwrite an existing configuration file
    pub force: bool,
}

/// Execute the config show command
///
/// # Returns
///
/// * `Ok(EXIT_SUCCESS)` - Configuration displayed successfully
/// * `Ok(EXIT_CONFIG_ERROR)` - Configuration file invalid
pub fn execute_show(args: ConfigShowArgs) -> Result<i32> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            display_config_error(&format!("{e:#}"));
            return Ok(EXIT_CONFIG_ERROR);
        }
    };
    let env = |var: &str| std::env::var(var).ok();

    println!();
    println!("{}", "askgraph Configuration".bold().underline());
    if let Ok(path) = config_path() {
        let state = if path.exists() { "" } else { " (not found, using defaults)" };
        println!("{} {}{}", "File:".dimmed(), path.display(), state.dimmed());
    }
    println!();

    println!("{}", "Graph database".cyan().bold());
    println!("  {} {}", "URI:".dimmed(), config.graph.uri);
    println!("  {} {}", "Database:".dimmed(), config.graph.database);
    println!("  {} {}", "User:".dimmed(), config.graph.user);
    println!(
        "  {} {}",
        "Password:".dimmed(),
        secret(&config.graph.password, args.show_secrets)
    );
    println!();

    println!("{}", "Embeddings".cyan().bold());
    println!("  {} {}", "Provider:".dimmed(), config.embeddings.provider);
    if let Some(ref endpoint) = config.embeddings.endpoint {
        println!("  {} {}", "Endpoint:".dimmed(), endpoint);
    }
    println!("  {} {}", "Model:".dimmed(), config.embeddings.model);
    println!("  {} {}", "Dimensions:".dimmed(), config.embeddings.dimensions);
    println!("  {} {}", "Property:".dimmed(), config.embeddings.property);
    if let Some(key) = config.embeddings.get_api_key_with(env) {
        println!("  {} {}", "API Key:".dimmed(), secret(&key, args.show_secrets));
    }
    println!();

    println!("{}", "LLM".cyan().bold());
    let llm = &config.llm;
    println!("  {} {}", "Provider:".dimmed(), llm.provider);
    println!("  {} {}", "Endpoint:".dimmed(), llm.endpoint);
    println!("  {} {}", "Model:".dimmed(), llm.model);
    if let Some(ref env_var) = llm.api_key_env {
        let status = if env(env_var.as_str()).is_some() {
            "✓ set".green().to_string()
        } else {
            "✗ not set".red().to_string()
        };
        println!("  {} {} ({})", "API Key Env:".dimmed(), env_var, status);
    }
    match llm.get_api_key_with(env) {
        Some(key) => println!("  {} {}", "API Key:".dimmed(), secret(&key, args.show_secrets)),
        None => println!("  {} {}", "Status:".dimmed(), "✗ not ready (API key missing)".red()),
    }
    println!(
        "  {} temperature {}, max tokens {}, top_p {}, top_k {}",
        "Sampling:".dimmed(),
        llm.temperature,
        llm.max_output_tokens,
        llm.top_p,
        llm.top_k
    );
    println!();

    println!("{}", "Retrieval".cyan().bold());
    println!("  {} {}", "Top K:".dimmed(), config.retrieval.top_k);
    println!();

    Ok(EXIT_SUCCESS)
}

/// Execute the config init command
pub fn execute_init(args: ConfigInitArgs) -> Result<i32> {
    let path = config_path()?;
    if write_defaults(&path, args.force)? {
        display_success(&format!("Configuration written to {}", path.display()));
    } else {
        display_warning(&format!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        ));
    }
    Ok(EXIT_SUCCESS)
}

/// Write the default configuration unless a file exists and `force` is off
///
/// Returns whether the file was written.
fn write_defaults(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    Config::default().save_to(path)?;
    Ok(true)
}

fn secret(value: &str, show: bool) -> String {
    if show {
        value.to_string()
    } else {
        mask_secret(value)
    }
}
