//! Startup snapshot of the graph database.
//!
//! Reads the server version, the existing indexes and how many nodes of each
//! type carry an embedding. Every step degrades to an empty result with a
//! warning, so an unreachable server yields the default snapshot.

use log::{info, warn};
use serde_json::json;

use super::{GraphSession, is_identifier, row_str, row_u64};
use crate::error::RagError;
use crate::types::{Availability, DatabaseSnapshot, IndexInfo, NodeType};

const VERSION_QUERY: &str =
    "CALL dbms.components() YIELD versions RETURN versions[0] AS version";

const LIST_INDEXES_QUERY: &str =
    "SHOW INDEXES YIELD name, type, labelsOrTypes RETURN name, type, labelsOrTypes";

/// Capture server version, existing indexes and embedding counts.
///
/// Never fails: if the database cannot be queried the snapshot degrades to
/// an unknown version with no indexes and empty availability.
pub async fn probe_database(
    session: &dyn GraphSession,
    embedding_property: &str,
) -> DatabaseSnapshot {
    match try_probe(session, embedding_property).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Error checking database state: {e}");
            DatabaseSnapshot::default()
        }
    }
}

async fn try_probe(
    session: &dyn GraphSession,
    embedding_property: &str,
) -> Result<DatabaseSnapshot, RagError> {
    if !is_identifier(embedding_property) {
        return Err(RagError::Config(format!(
            "invalid embedding property: {embedding_property:?}"
        )));
    }

    let rows = session.run(VERSION_QUERY, json!({})).await?;
    let version = rows
        .first()
        .and_then(|r| row_str(r, "version"))
        .unwrap_or("unknown")
        .to_string();
    info!("Neo4j version: {version}");

    let indexes: Vec<IndexInfo> = session
        .run(LIST_INDEXES_QUERY, json!({}))
        .await?
        .iter()
        .map(|r| IndexInfo {
            name: row_str(r, "name").unwrap_or("unknown").to_string(),
            index_type: row_str(r, "type").unwrap_or("unknown").to_string(),
            labels: r
                .get("labelsOrTypes")
                .and_then(|v| v.as_array())
                .map(|a| {
                    a.iter()
                        .filter_map(|l| l.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect();
    info!("Found {} existing indexes", indexes.len());

    let mut availability = Availability::new();
    for node_type in NodeType::ALL {
        let statement = format!(
            "MATCH (n:{}) WHERE n.{} IS NOT NULL RETURN count(n) AS count",
            node_type.label(),
            embedding_property
        );
        let rows = session.run(&statement, json!({})).await?;
        let count = rows.first().and_then(|r| row_u64(r, "count")).unwrap_or(0);
        if count > 0 {
            info!("Found {count} {node_type} nodes with embeddings");
        } else {
            info!("No {node_type} nodes with embeddings found");
        }
        availability.set(node_type, count);
    }

    Ok(DatabaseSnapshot {
        version,
        indexes,
        availability,
    })
}
