//! # Embed Command
//!
//! Writes embeddings onto every pull request, issue, message and text chunk
//! that does not have one yet, so the nodes become answerable.
//!
//! ## Usage
//!
//! ```bash
//! askgraph embed
//! askgraph embed --batch-size 20
//! ```

use anyhow::Result;
use askgraph_rag::NodeType;
use askgraph_rag::embeddings::{BackfillReport, EmbeddingBackfill};
use askgraph_rag::graph::GraphSession;
use colored::Colorize;

use crate::backend;
use crate::config::Config;
use crate::errors::{display_config_error, display_network_error, display_success};
use crate::exit_codes::*;

/// Arguments for the embed command
#[derive(Debug)]
pub struct EmbedArgs {
    /// Nodes fetched and embedded per request
    pub batch_size: usize,
}

/// Execute the embed command
///
/// # Returns
///
/// * `Ok(EXIT_SUCCESS)` - Every node now has an embedding
/// * `Ok(EXIT_CONFIG_ERROR)` - Invalid configuration or missing embedding key
/// * `Ok(EXIT_NETWORK_ERROR)` - The database or embedding backend failed
pub async fn execute(args: EmbedArgs) -> Result<i32> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            display_config_error(&format!("{e:#}"));
            return Ok(EXIT_CONFIG_ERROR);
        }
    };

    let env = |var: &str| std::env::var(var).ok();
    let embedder = match backend::build_embedder(&config.embeddings, env) {
        Ok(embedder) => embedder,
        Err(e) => return Ok(backend::report_setup_error(&e)),
    };
    let session = backend::build_session(&config.graph);
    let backfill = match EmbeddingBackfill::new(
        session.clone(),
        embedder.clone(),
        config.embeddings.property.clone(),
        args.batch_size,
    ) {
        Ok(backfill) => backfill,
        Err(e) => return Ok(backend::report_setup_error(&e)),
    };

    println!(
        "{} Embedding nodes with {} into '{}'",
        "ℹ".blue(),
        embedder.model_name().cyan(),
        config.embeddings.property
    );
    let result = backfill.run().await;
    session.close().await;

    match result {
        Ok(report) => {
            for line in report_lines(&report) {
                println!("{line}");
            }
            display_success(&format!("Embedded {} nodes", report.total()));
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            display_network_error(&e.to_string());
            Ok(EXIT_NETWORK_ERROR)
        }
    }
}

/// One line per node type with the number of nodes embedded
fn report_lines(report: &BackfillReport) -> Vec<String> {
    NodeType::ALL
        .iter()
        .map(|node_type| format!("  {node_type}: {}", report.count(*node_type)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lines_cover_every_type() {
        let mut report = BackfillReport::default();
        report.embedded.insert(NodeType::Issue, 12);

        let lines = report_lines(&report);
        assert_eq!(lines.len(), NodeType::ALL.len());
        assert!(lines.contains(&"  Issue: 12".to_string()));
        assert!(lines.contains(&"  Message: 0".to_string()));
    }
}
