//! # Status Command
//!
//! Checks graph database connectivity and reports what can be answered.
//!
//! ## Usage
//!
//! ```bash
//! askgraph status
//! ```

use anyhow::Result;
use askgraph_rag::graph::{GraphSession, probe_database};
use askgraph_rag::{DatabaseSnapshot, NodeType};
use colored::Colorize;

use crate::backend;
use crate::config::Config;
use crate::errors::{display_config_error, display_network_error};
use crate::exit_codes::*;

const PING_QUERY: &str = "RETURN 1 AS ok";

/// Execute the status command
///
/// # Returns
///
/// * `Ok(EXIT_SUCCESS)` - Database reachable
/// * `Ok(EXIT_CONFIG_ERROR)` - Configuration file invalid
/// * `Ok(EXIT_NETWORK_ERROR)` - Cannot reach the graph database
pub async fn execute() -> Result<i32> {
    println!("{}", "askgraph Status".bold());
    println!("{}", "─".repeat(40).dimmed());
    println!();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            display_config_error(&format!("{e:#}"));
            return Ok(EXIT_CONFIG_ERROR);
        }
    };

    println!("{} Graph endpoint: {}", "ℹ".blue(), config.graph.uri.cyan());

    let session = backend::build_session(&config.graph);
    if let Err(e) = session.run(PING_QUERY, serde_json::json!({})).await {
        println!("{} Database: {}", "✗".red().bold(), "Unreachable".red());
        println!();
        display_network_error(&e.to_string());
        return Ok(EXIT_NETWORK_ERROR);
    }
    println!(
        "{} Database: {}",
        "✓".bright_green().bold(),
        "Reachable".green()
    );

    let snapshot = probe_database(&*session, &config.embeddings.property).await;
    session.close().await;

    println!();
    for line in snapshot_lines(&snapshot) {
        println!("{line}");
    }

    println!();
    let key_status = if config.llm.get_api_key().is_some() {
        "✓ set".green()
    } else {
        "✗ not set".red()
    };
    println!(
        "{} LLM: {} {} ({} {})",
        "ℹ".blue(),
        config.llm.provider,
        config.llm.model,
        config.llm.key_env_name(),
        key_status
    );

    Ok(EXIT_SUCCESS)
}

/// Plain-text summary of a database snapshot
fn snapshot_lines(snapshot: &DatabaseSnapshot) -> Vec<String> {
    let mut lines = vec![format!("Server version: {}", snapshot.version)];

    lines.push(format!("Indexes: {}", snapshot.indexes.len()));
    for index in &snapshot.indexes {
        lines.push(format!(
            "  {} ({}) on {}",
            index.name,
            index.index_type,
            index.labels.join(", ")
        ));
    }

    lines.push("Embedded nodes:".to_string());
    for node_type in NodeType::ALL {
        let count = snapshot.availability.count(node_type);
        let marker = if count > 0 { "✓" } else { "·" };
        lines.push(format!("  {marker} {node_type}: {count}"));
    }
    lines
}
