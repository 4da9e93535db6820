//! Writes embeddings onto graph nodes that do not have one yet.
//!
//! Each node type is walked in pages of unembedded nodes. Page text is
//! embedded in one batch and written back with a single `UNWIND` statement,
//! so the next page query naturally skips what was just written.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value, json};

use super::EmbeddingProvider;
use crate::error::RagError;
use crate::graph::{GraphSession, is_identifier, row_str};
use crate::types::NodeType;

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Fields joined for node types without a dedicated text rule.
const GENERIC_TEXT_FIELDS: [&str; 5] = ["content", "text", "body", "description", "title"];

/// Nodes embedded per type by one backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub embedded: BTreeMap<NodeType, usize>,
}

impl BackfillReport {
    pub fn count(&self, node_type: NodeType) -> usize {
        self.embedded.get(&node_type).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.embedded.values().sum()
    }
}

/// Text a node of `node_type` is embedded from.
///
/// Pull requests and issues use title and body, messages their text, and
/// anything else every non-empty generic text field.
pub fn text_for_embedding(node_type: NodeType, props: &Map<String, Value>) -> String {
    match node_type {
        NodeType::PullRequest | NodeType::Issue => {
            format!("{} {}", field(props, "title"), field(props, "body"))
        }
        NodeType::Message => field(props, "text"),
        NodeType::TextChunk => GENERIC_TEXT_FIELDS
            .iter()
            .map(|name| field(props, name))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn field(props: &Map<String, Value>, name: &str) -> String {
    match props.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Fills the embedding property of every node that lacks one.
pub struct EmbeddingBackfill {
    session: Arc<dyn GraphSession>,
    embedder: Arc<dyn EmbeddingProvider>,
    property: String,
    batch_size: usize,
}

impl EmbeddingBackfill {
    pub fn new(
        session: Arc<dyn GraphSession>,
        embedder: Arc<dyn EmbeddingProvider>,
        property: impl Into<String>,
        batch_size: usize,
    ) -> Result<Self, RagError> {
        let property = property.into();
        if !is_identifier(&property) {
            return Err(RagError::Config(format!(
                "invalid embedding property: {property:?}"
            )));
        }
        if batch_size == 0 {
            return Err(RagError::Config("batch size must be positive".to_string()));
        }
        Ok(Self {
            session,
            embedder,
            property,
            batch_size,
        })
    }

    /// Embed every unembedded node of every type.
    pub async fn run(&self) -> Result<BackfillReport, RagError> {
        let mut report = BackfillReport::default();
        for node_type in NodeType::ALL {
            let count = self.backfill_type(node_type).await?;
            info!("Embedded {count} {node_type} nodes");
            report.embedded.insert(node_type, count);
        }
        Ok(report)
    }

    async fn backfill_type(&self, node_type: NodeType) -> Result<usize, RagError> {
        let label = node_type.label();
        let property = &self.property;
        let select = format!(
            "MATCH (n:{label}) WHERE n.{property} IS NULL \
             RETURN elementId(n) AS id, n {{.*}} AS props LIMIT $limit"
        );
        let write = format!(
            "UNWIND $rows AS r MATCH (n) WHERE elementId(n) = r.id SET n.{property} = r.embedding"
        );

        let mut written: HashSet<String> = HashSet::new();
        loop {
            let page = self
                .session
                .run(&select, json!({ "limit": self.batch_size }))
                .await?;
            if page.is_empty() {
                break;
            }

            let mut ids = Vec::with_capacity(page.len());
            let mut texts = Vec::with_capacity(page.len());
            for row in &page {
                let Some(id) = row_str(row, "id") else {
                    warn!("Skipping {label} row without an element id");
                    continue;
                };
                if written.contains(id) {
                    return Err(RagError::graph(format!(
                        "{label} node {id} is still missing '{property}' after it was written"
                    )));
                }
                let props = row
                    .get("props")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                ids.push(id.to_string());
                texts.push(text_for_embedding(node_type, &props));
            }
            if ids.is_empty() {
                return Err(RagError::graph(format!(
                    "{label} page returned no element ids"
                )));
            }

            let vectors = self.embedder.embed_batch(&texts).await?;
            let rows: Vec<Value> = ids
                .iter()
                .zip(vectors)
                .map(|(id, embedding)| json!({ "id": id, "embedding": embedding }))
                .collect();
            self.session.run(&write, json!({ "rows": rows })).await?;
            debug!("Wrote {} {label} embeddings", ids.len());

            let last_page = page.len() < self.batch_size;
            written.extend(ids);
            if last_page {
                break;
            }
        }
        Ok(written.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::testing::{FakeSession, FixedEmbedder, row};

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_pull_requests_and_issues_use_title_and_body() {
        let pr = props(json!({
            "title": "Add OAuth2 integration",
            "body": "Adds Google and GitHub providers.",
            "login": "octocat"
        }));
        assert_eq!(
            text_for_embedding(NodeType::PullRequest, &pr),
            "Add OAuth2 integration Adds Google and GitHub providers."
        );
        let issue = props(json!({ "title": "Login crash" }));
        assert_eq!(text_for_embedding(NodeType::Issue, &issue), "Login crash ");
    }

    #[test]
    fn test_messages_use_text_only() {
        let message = props(json!({ "text": "shipping today", "title": "ignored" }));
        assert_eq!(text_for_embedding(NodeType::Message, &message), "shipping today");
    }

    #[test]
    fn test_text_chunks_join_generic_fields() {
        let chunk = props(json!({
            "title": "README",
            "content": "Install with cargo.",
            "description": "",
            "page": 3
        }));
        assert_eq!(
            text_for_embedding(NodeType::TextChunk, &chunk),
            "Install with cargo. README"
        );
        assert_eq!(text_for_embedding(NodeType::TextChunk, &Map::new()), "");
    }

    /// Graph holding unembedded nodes per label that accepts writes.
    fn graph(nodes: Vec<(&'static str, Vec<(String, Value)>)>) -> FakeSession {
        let store = Mutex::new(nodes);
        FakeSession::new(move |stmt, params| {
            let mut store = store.lock().unwrap();
            if stmt.starts_with("UNWIND") {
                let ids: Vec<&str> = params["rows"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|r| r["id"].as_str().unwrap())
                    .collect();
                for (_, nodes) in store.iter_mut() {
                    nodes.retain(|(id, _)| !ids.contains(&id.as_str()));
                }
                return Ok(Vec::new());
            }
            let limit = params["limit"].as_u64().unwrap() as usize;
            let page = store
                .iter()
                .find(|(label, _)| stmt.starts_with(&format!("MATCH (n:{label})")))
                .map(|(_, nodes)| nodes.iter().take(limit).cloned().collect::<Vec<_>>())
                .unwrap_or_default();
            Ok(page
                .into_iter()
                .map(|(id, props)| row(&[("id", json!(id)), ("props", props)]))
                .collect())
        })
    }

    fn issues(count: usize) -> Vec<(String, Value)> {
        (0..count)
            .map(|i| (format!("4:issue:{i}"), json!({ "title": format!("Issue {i}") })))
            .collect()
    }

    #[tokio::test]
    async fn test_backfill_pages_until_every_node_is_embedded() {
        let session = Arc::new(graph(vec![
            ("Issue", issues(5)),
            ("Message", vec![("4:msg:0".to_string(), json!({ "text": "hi" }))]),
        ]));
        let backfill =
            EmbeddingBackfill::new(session.clone(), Arc::new(FixedEmbedder), "embedding", 2)
                .unwrap();

        let report = backfill.run().await.unwrap();

        assert_eq!(report.count(NodeType::Issue), 5);
        assert_eq!(report.count(NodeType::Message), 1);
        assert_eq!(report.count(NodeType::TextChunk), 0);
        assert_eq!(report.total(), 6);

        let statements = session.statements.lock().unwrap();
        let writes: Vec<&Value> = statements
            .iter()
            .filter(|(s, _)| s.starts_with("UNWIND"))
            .map(|(_, p)| p)
            .collect();
        // issue pages of 2, 2 and 1, then the single message
        assert_eq!(writes.len(), 4);
        assert_eq!(writes[0]["rows"][0]["id"], json!("4:issue:0"));
        assert_eq!(writes[0]["rows"][0]["embedding"], json!([0.5, 0.25, 0.0]));
        assert!(statements.iter().any(|(s, _)| s.contains(
            "MATCH (n:Issue) WHERE n.embedding IS NULL RETURN elementId(n) AS id, n {.*} AS props"
        )));
        assert!(statements.iter().any(|(s, _)| s.ends_with("SET n.embedding = r.embedding")));
    }

    #[tokio::test]
    async fn test_blank_nodes_are_written_as_zero_vectors() {
        let session = Arc::new(graph(vec![(
            "PullRequest",
            vec![
                ("4:pr:0".to_string(), json!({ "title": "OAuth", "body": "flow" })),
                ("4:pr:1".to_string(), json!({ "number": 7 })),
            ],
        )]));
        let backfill =
            EmbeddingBackfill::new(session.clone(), Arc::new(FixedEmbedder), "embedding", 10)
                .unwrap();

        backfill.run().await.unwrap();

        let statements = session.statements.lock().unwrap();
        let (_, params) = statements
            .iter()
            .find(|(s, _)| s.starts_with("UNWIND"))
            .unwrap();
        assert_eq!(params["rows"][0]["embedding"], json!([0.5, 0.25, 0.0]));
        assert_eq!(params["rows"][1]["id"], json!("4:pr:1"));
        assert_eq!(params["rows"][1]["embedding"], json!([0.0, 0.0, 0.0]));
    }

    #[tokio::test]
    async fn test_unpersisted_writes_stop_the_run() {
        // Writes are accepted but never applied, so the same page comes back.
        let session = Arc::new(FakeSession::new(|stmt, _| {
            if stmt.starts_with("MATCH (n:TextChunk)") {
                return Ok(vec![
                    row(&[("id", json!("4:chunk:0")), ("props", json!({ "text": "a" }))]),
                    row(&[("id", json!("4:chunk:1")), ("props", json!({ "text": "b" }))]),
                ]);
            }
            Ok(Vec::new())
        }));
        let backfill =
            EmbeddingBackfill::new(session.clone(), Arc::new(FixedEmbedder), "embedding", 2)
                .unwrap();

        let err = backfill.run().await.unwrap_err();
        assert!(err.to_string().contains("still missing 'embedding'"));
        assert_eq!(
            session.sent().iter().filter(|s| s.starts_with("UNWIND")).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_graph_errors_propagate() {
        let session = Arc::new(FakeSession::new(|_, _| {
            Err(RagError::graph("connection refused"))
        }));
        let backfill =
            EmbeddingBackfill::new(session, Arc::new(FixedEmbedder), "embedding", 10).unwrap();
        assert!(matches!(
            backfill.run().await,
            Err(RagError::Graph { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_settings() {
        let session = Arc::new(FakeSession::new(|_, _| Ok(Vec::new())));
        assert!(matches!(
            EmbeddingBackfill::new(session.clone(), Arc::new(FixedEmbedder), "a b", 10),
            Err(RagError::Config(_))
        ));
        assert!(matches!(
            EmbeddingBackfill::new(session, Arc::new(FixedEmbedder), "embedding", 0),
            Err(RagError::Config(_))
        ));
    }
}
