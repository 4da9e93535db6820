use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Categories of embedded nodes stored in the knowledge graph.
///
/// The declaration order doubles as the ordering of [`Availability`] maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// Generic text chunks (documents, READMEs, notes)
    TextChunk,
    /// Pull requests and the code changes they carry
    PullRequest,
    /// Issue tracker entries
    Issue,
    /// Chat messages
    Message,
}

impl NodeType {
    /// All node types, in the order the database is probed.
    pub const ALL: [NodeType; 4] = [
        NodeType::TextChunk,
        NodeType::PullRequest,
        NodeType::Issue,
        NodeType::Message,
    ];

    /// Graph label for this node type.
    pub fn label(&self) -> &'static str {
        match self {
            NodeType::TextChunk => "TextChunk",
            NodeType::PullRequest => "PullRequest",
            NodeType::Issue => "Issue",
            NodeType::Message => "Message",
        }
    }

    /// Name of the vector index over this type's embeddings.
    pub fn index_name(&self) -> String {
        format!("{}_vector_idx", self.label().to_lowercase())
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown node type: {s}"))
    }
}

/// Count of embedded nodes per node type.
///
/// Types absent from the map are treated as having no embeddings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability(BTreeMap<NodeType, u64>);

impl Availability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, node_type: NodeType, count: u64) {
        self.0.insert(node_type, count);
    }

    pub fn count(&self, node_type: NodeType) -> u64 {
        self.0.get(&node_type).copied().unwrap_or(0)
    }

    pub fn is_available(&self, node_type: NodeType) -> bool {
        self.count(node_type) > 0
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|&c| c == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeType, u64)> + '_ {
        self.0.iter().map(|(t, c)| (*t, *c))
    }
}

impl FromIterator<(NodeType, u64)> for Availability {
    fn from_iter<I: IntoIterator<Item = (NodeType, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Outcome of node-type selection for a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub node_type: NodeType,
    /// Always `node_type.index_name()`
    pub index_name: String,
    /// Human-readable justification, never parsed
    pub reason: String,
}

impl Selection {
    pub fn new(node_type: NodeType, reason: impl Into<String>) -> Self {
        Self {
            node_type,
            index_name: node_type.index_name(),
            reason: reason.into(),
        }
    }
}

/// An index as reported by the graph database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub index_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// State of the graph database captured once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexInfo>,
    pub availability: Availability,
}

impl Default for DatabaseSnapshot {
    fn default() -> Self {
        Self {
            version: "unknown".to_string(),
            indexes: Vec::new(),
            availability: Availability::new(),
        }
    }
}

/// A node returned by nearest-neighbour search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedItem {
    /// Node properties with the embedding removed
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub score: f32,
}

/// The answer produced for a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    /// Node type whose index was actually searched
    pub node_type: NodeType,
    pub reason: String,
}

/// Observability record filled in while answering a query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugCapture {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_node_type: Option<NodeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_node_types: Option<Availability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
