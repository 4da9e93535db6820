//! Lazy vector-index provisioning.
//!
//! An index is looked up by name first; if missing it is created through the
//! vector procedure, and if the server lacks that procedure through a literal
//! `CREATE VECTOR INDEX` statement.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::RagError;
use crate::graph::{GraphSession, is_identifier};
use crate::types::NodeType;

const INDEX_EXISTS_QUERY: &str = "SHOW INDEXES YIELD name WHERE name = $name RETURN name";

const CREATE_NODE_INDEX_PROCEDURE: &str =
    "CALL db.index.vector.createNodeIndex($name, $label, $property, $dimensions, $similarity)";

/// Shape of the vector indexes this crate creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndexSpec {
    /// Node property holding the embedding
    pub property: String,
    pub dimensions: usize,
    /// Similarity function ("cosine" or "euclidean")
    pub similarity: String,
}

impl Default for VectorIndexSpec {
    fn default() -> Self {
        Self {
            property: "embedding".to_string(),
            dimensions: 384,
            similarity: "cosine".to_string(),
        }
    }
}

/// Ensures vector indexes exist before they are queried.
pub struct IndexProvisioner {
    session: Arc<dyn GraphSession>,
    spec: VectorIndexSpec,
}

impl IndexProvisioner {
    pub fn new(session: Arc<dyn GraphSession>, spec: VectorIndexSpec) -> Self {
        Self { session, spec }
    }

    /// Make sure `index_name` exists over `node_type` embeddings.
    ///
    /// Returns `false` only when the index is missing and both creation
    /// paths failed. Calling it again for an existing index is a no-op.
    pub async fn ensure_index(&self, node_type: NodeType, index_name: &str) -> bool {
        debug!("Ensuring vector index '{index_name}' exists for {node_type} nodes");

        match self.index_exists(index_name).await {
            Ok(true) => {
                debug!("Vector index '{index_name}' already exists");
                return true;
            }
            Ok(false) => {}
            Err(e) => warn!("Could not look up index '{index_name}': {e}"),
        }

        match self.create_with_procedure(node_type, index_name).await {
            Ok(()) => {
                info!("Vector index '{index_name}' created");
                return true;
            }
            Err(e) if e.is_already_exists() => {
                debug!("Vector index '{index_name}' was created concurrently");
                return true;
            }
            Err(e) => warn!("Error creating vector index with procedure: {e}"),
        }

        match self.create_with_statement(node_type, index_name).await {
            Ok(()) => {
                info!("Vector index '{index_name}' created with CREATE VECTOR INDEX");
                true
            }
            Err(e) => {
                warn!("Error creating vector index '{index_name}': {e}");
                false
            }
        }
    }

    async fn index_exists(&self, index_name: &str) -> Result<bool, RagError> {
        let rows = self
            .session
            .run(INDEX_EXISTS_QUERY, json!({ "name": index_name }))
            .await?;
        Ok(!rows.is_empty())
    }

    async fn create_with_procedure(
        &self,
        node_type: NodeType,
        index_name: &str,
    ) -> Result<(), RagError> {
        let params = json!({
            "name": index_name,
            "label": node_type.label(),
            "property": self.spec.property,
            "dimensions": self.spec.dimensions,
            "similarity": self.spec.similarity,
        });
        self.session
            .run(CREATE_NODE_INDEX_PROCEDURE, params)
            .await
            .map(|_| ())
    }

    async fn create_with_statement(
        &self,
        node_type: NodeType,
        index_name: &str,
    ) -> Result<(), RagError> {
        let statement = self.create_statement(node_type, index_name)?;
        self.session.run(&statement, json!({})).await.map(|_| ())
    }

    /// Literal creation statement; identifiers cannot be parameterized here.
    fn create_statement(&self, node_type: NodeType, index_name: &str) -> Result<String, RagError> {
        for name in [index_name, self.spec.property.as_str()] {
            if !is_identifier(name) {
                return Err(RagError::Index(format!("invalid identifier: {name:?}")));
            }
        }
        if !matches!(self.spec.similarity.as_str(), "cosine" | "euclidean") {
            return Err(RagError::Index(format!(
                "unsupported similarity function: {}",
                self.spec.similarity
            )));
        }

        Ok(format!(
            "CREATE VECTOR INDEX {index} IF NOT EXISTS \
             FOR (n:{label}) ON (n.{property}) \
             OPTIONS {{indexConfig: {{`vector.dimensions`: {dims}, \
             `vector.similarity_function`: '{similarity}'}}}}",
            index = index_name,
            label = node_type.label(),
            property = self.spec.property,
            dims = self.spec.dimensions,
            similarity = self.spec.similarity,
        ))
    }
}
