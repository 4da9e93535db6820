//! RAG query orchestrator.
//!
//! Combines node-type selection, lazy index provisioning, vector retrieval
//! and answer generation into one pipeline. All state lives in an explicitly
//! constructed [`RagContext`].

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::embeddings::EmbeddingProvider;
use crate::error::RagError;
use crate::graph::{GraphSession, is_identifier, probe_database};
use crate::index::{IndexProvisioner, VectorIndexSpec};
use crate::llm::{
    ChatTurn, GenerationRequest, LanguageModel, SYSTEM_INSTRUCTION, build_prompt,
};
use crate::retrieval::{VectorRetriever, format_context};
use crate::routing;
use crate::types::{Availability, DatabaseSnapshot, DebugCapture, NodeType, RagAnswer, Selection};

/// Node type substituted when the selected index cannot be provisioned.
const FALLBACK_NODE_TYPE: NodeType = NodeType::TextChunk;

/// Configuration for a RAG context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    /// Shape of the vector indexes to provision
    pub index: VectorIndexSpec,
    /// Neighbours retrieved when the caller does not say otherwise
    pub default_top_k: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            index: VectorIndexSpec::default(),
            default_top_k: 500,
        }
    }
}

/// Everything needed to answer questions against one graph database.
///
/// The availability snapshot is taken once in [`RagContext::connect`] and not
/// refreshed; nodes embedded afterwards are invisible to selection until a
/// new context is built.
pub struct RagContext {
    session: Arc<dyn GraphSession>,
    provisioner: IndexProvisioner,
    retriever: VectorRetriever,
    llm: Arc<dyn LanguageModel>,
    snapshot: DatabaseSnapshot,
    settings: RagSettings,
}

impl RagContext {
    /// Validate settings, probe the database and build the context.
    ///
    /// An unreachable database is not an error here: the snapshot degrades
    /// to empty availability and every query falls back to the default type.
    pub async fn connect(
        settings: RagSettings,
        session: Arc<dyn GraphSession>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LanguageModel>,
    ) -> Result<Self, RagError> {
        if !is_identifier(&settings.index.property) {
            return Err(RagError::Config(format!(
                "invalid embedding property: {:?}",
                settings.index.property
            )));
        }
        if embedder.dimensions() != settings.index.dimensions {
            return Err(RagError::Config(format!(
                "embedding model '{}' produces {} dimensions but indexes expect {}",
                embedder.model_name(),
                embedder.dimensions(),
                settings.index.dimensions
            )));
        }
        if settings.default_top_k == 0 {
            return Err(RagError::Config("default_top_k must be positive".to_string()));
        }

        let snapshot = probe_database(session.as_ref(), &settings.index.property).await;

        Ok(Self {
            provisioner: IndexProvisioner::new(session.clone(), settings.index.clone()),
            retriever: VectorRetriever::new(session.clone(), embedder),
            session,
            llm,
            snapshot,
            settings,
        })
    }

    pub fn snapshot(&self) -> &DatabaseSnapshot {
        &self.snapshot
    }

    pub fn availability(&self) -> &Availability {
        &self.snapshot.availability
    }

    /// Pick the node type for `query` from the startup snapshot.
    pub fn select(&self, query: &str) -> Selection {
        routing::select_node_type(query, self.availability())
    }

    /// Answer `query` from the `top_k` nearest nodes of the selected type.
    ///
    /// Never fails: problems are reported inside the returned answer text.
    pub async fn answer(
        &self,
        query: &str,
        top_k: Option<usize>,
        debug: Option<&mut DebugCapture>,
    ) -> RagAnswer {
        self.answer_with_history(query, top_k, &[], debug).await
    }

    /// Like [`RagContext::answer`], with earlier turns of the conversation
    /// sent to the model ahead of the prompt.
    ///
    /// Selection and retrieval only look at `query`.
    pub async fn answer_with_history(
        &self,
        query: &str,
        top_k: Option<usize>,
        history: &[ChatTurn],
        mut debug: Option<&mut DebugCapture>,
    ) -> RagAnswer {
        let top_k = top_k.unwrap_or(self.settings.default_top_k);
        let selection = self.select(query);
        info!(
            "Selected {} nodes with '{}' index: {}",
            selection.node_type, selection.index_name, selection.reason
        );

        if let Some(capture) = debug.as_deref_mut() {
            capture.query = Some(query.to_string());
            capture.selected_node_type = Some(selection.node_type);
            capture.index_name = Some(selection.index_name.clone());
            capture.selection_reason = Some(selection.reason.clone());
            capture.available_node_types = Some(self.availability().clone());
        }

        let Some(selection) = self.provision(selection).await else {
            return RagAnswer {
                answer: "Error: Unable to create necessary vector indexes.".to_string(),
                node_type: FALLBACK_NODE_TYPE,
                reason: "Failed to create index".to_string(),
            };
        };

        let result = self
            .retrieve_and_generate(query, &selection, top_k, history, debug.as_deref_mut())
            .await;
        match result {
            Ok(answer) => RagAnswer {
                answer,
                node_type: selection.node_type,
                reason: selection.reason,
            },
            Err(e) => {
                warn!("Error in RAG pipeline: {e}");
                if let Some(capture) = debug {
                    capture.error = Some(e.to_string());
                }
                RagAnswer {
                    answer: format!("Error querying the knowledge graph: {e}"),
                    node_type: selection.node_type,
                    reason: "Error during query".to_string(),
                }
            }
        }
    }

    /// Ensure the selected index exists, substituting the fallback type once.
    async fn provision(&self, selection: Selection) -> Option<Selection> {
        if self
            .provisioner
            .ensure_index(selection.node_type, &selection.index_name)
            .await
        {
            return Some(selection);
        }

        warn!(
            "Failed to create vector index for {}. Falling back to {FALLBACK_NODE_TYPE}.",
            selection.node_type
        );
        let fallback = Selection::new(
            FALLBACK_NODE_TYPE,
            format!("Fallback to {FALLBACK_NODE_TYPE} after index creation failed"),
        );
        if self
            .provisioner
            .ensure_index(fallback.node_type, &fallback.index_name)
            .await
        {
            Some(fallback)
        } else {
            warn!("Failed to create fallback index. Cannot continue.");
            None
        }
    }

    async fn retrieve_and_generate(
        &self,
        query: &str,
        selection: &Selection,
        top_k: usize,
        history: &[ChatTurn],
        debug: Option<&mut DebugCapture>,
    ) -> Result<String, RagError> {
        let items = self
            .retriever
            .search(&selection.index_name, query, top_k)
            .await?;
        let context = format_context(&items);

        if let Some(capture) = debug {
            capture.top_k = Some(top_k);
            capture.retrieved_count = Some(items.len());
            capture.context = Some(context.clone());
        }

        let request = GenerationRequest::new(build_prompt(&context, query))
            .with_system_instruction(SYSTEM_INSTRUCTION)
            .with_history(history.to_vec());
        debug!("Generating answer with {}", self.llm.model_name());
        Ok(self.llm.generate(&request).await?)
    }

    /// Close the database session.
    pub async fn shutdown(self) {
        self.session.close().await;
    }
}
