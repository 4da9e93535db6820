//! Nearest-neighbour retrieval over graph vector indexes.
//!
//! The query text is embedded with the same model as the stored nodes and
//! matched against a named vector index. Retrieved nodes are rendered into a
//! plain-text context block for the prompt.

use std::sync::Arc;

use log::debug;
use serde_json::json;

use crate::embeddings::EmbeddingProvider;
use crate::error::RagError;
use crate::graph::GraphSession;
use crate::types::RetrievedItem;

const VECTOR_QUERY: &str = "CALL db.index.vector.queryNodes($index, $top_k, $embedding) \
     YIELD node, score \
     RETURN node {.*, embedding: null} AS node, score";

/// Rendered in place of context when the index returned nothing.
pub const EMPTY_CONTEXT: &str = "No relevant context found.";

/// Searches a vector index with an embedded query.
pub struct VectorRetriever {
    session: Arc<dyn GraphSession>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl VectorRetriever {
    pub fn new(session: Arc<dyn GraphSession>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { session, embedder }
    }

    /// Return up to `top_k` nodes from `index_name` nearest to `query_text`.
    pub async fn search(
        &self,
        index_name: &str,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedItem>, RagError> {
        let embedding = self.embedder.embed(query_text).await?;
        let params = json!({
            "index": index_name,
            "top_k": top_k,
            "embedding": embedding,
        });

        let rows = self.session.run(VECTOR_QUERY, params).await?;
        debug!("{} nodes retrieved from '{index_name}'", rows.len());

        rows.into_iter()
            .map(|mut row| {
                let properties = match row.remove("node") {
                    Some(serde_json::Value::Object(map)) => map,
                    other => {
                        return Err(RagError::graph(format!(
                            "expected node map in vector result, got {other:?}"
                        )));
                    }
                };
                let score = row.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0) as f32;
                Ok(RetrievedItem { properties, score })
            })
            .collect()
    }
}

/// Render retrieved items as one line each, properties sorted by key.
///
/// Null properties (including the blanked-out embedding) are skipped.
pub fn format_context(items: &[RetrievedItem]) -> String {
    if items.is_empty() {
        return EMPTY_CONTEXT.to_string();
    }

    items
        .iter()
        .map(|item| {
            let mut keys: Vec<&String> = item
                .properties
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, _)| k)
                .collect();
            keys.sort();

            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{k}: {}", render_value(&item.properties[k])))
                .collect();
            format!("- {} (score: {:.3})", fields.join(", "), item.score)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.replace('\n', " "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSession, FixedEmbedder, row};

    fn item(pairs: &[(&str, serde_json::Value)], score: f32) -> RetrievedItem {
        RetrievedItem {
            properties: row(pairs),
            score,
        }
    }

    #[tokio::test]
    async fn test_search_sends_embedding_and_parses_nodes() {
        let session = Arc::new(FakeSession::new(|_, _| {
            Ok(vec![row(&[
                (
                    "node",
                    json!({"title": "Add OAuth integration", "login": "octocat", "embedding": null}),
                ),
                ("score", json!(0.91)),
            ])])
        }));
        let retriever = VectorRetriever::new(session.clone(), Arc::new(FixedEmbedder));

        let items = retriever
            .search("pullrequest_vector_idx", "who wrote oauth", 5)
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].properties["login"], json!("octocat"));
        assert!((items[0].score - 0.91).abs() < 1e-6);

        let statements = session.statements.lock().unwrap();
        let params = &statements[0].1;
        assert_eq!(params["index"], json!("pullrequest_vector_idx"));
        assert_eq!(params["top_k"], json!(5));
        assert_eq!(params["embedding"], json!([0.5, 0.25, 0.0]));
    }

    #[tokio::test]
    async fn test_search_rejects_malformed_rows() {
        let session = Arc::new(FakeSession::new(|_, _| {
            Ok(vec![row(&[("node", json!("not a map")), ("score", json!(0.5))])])
        }));
        let retriever = VectorRetriever::new(session, Arc::new(FixedEmbedder));
        assert!(retriever.search("issue_vector_idx", "bug", 3).await.is_err());
    }

    #[test]
    fn test_format_context_sorted_and_skips_nulls() {
        let items = vec![
            item(
                &[
                    ("title", json!("Fix login\ncrash")),
                    ("number", json!(42)),
                    ("embedding", json!(null)),
                ],
                0.8,
            ),
            item(&[("text", json!("Release notes"))], 0.5),
        ];
        let context = format_context(&items);
        assert_eq!(
            context,
            "- number: 42, title: Fix login crash (score: 0.800)\n- text: Release notes (score: 0.500)"
        );
    }

    #[test]
    fn test_format_context_empty() {
        assert_eq!(format_context(&[]), EMPTY_CONTEXT);
    }
}
