//! Static routing tables.
//!
//! Row order is significant in every table: override rows are checked top to
//! bottom, keyword rows break score ties top to bottom, and the fallback
//! order is walked front to back.

use crate::types::NodeType;

/// A phrase list that routes straight to a node type when any phrase matches.
pub struct OverrideRule {
    pub node_type: NodeType,
    pub phrases: &'static [&'static str],
    pub reason: &'static str,
}

/// Specific-intent overrides, highest priority first.
pub static OVERRIDE_RULES: &[OverrideRule] = &[
    OverrideRule {
        node_type: NodeType::Issue,
        phrases: &["who reported", "issue reporter", "bug report", "filed an issue"],
        reason: "Query specifically asks about issues",
    },
    OverrideRule {
        node_type: NodeType::PullRequest,
        phrases: &[
            "who wrote",
            "who implemented",
            "who coded",
            "who developed",
            "oauth",
            "integration",
            "author",
        ],
        reason: "Query asks about code authorship or implementation",
    },
    OverrideRule {
        node_type: NodeType::Message,
        phrases: &[
            "who said",
            "who mentioned",
            "who discussed",
            "who talked",
            "conversation",
            "chat",
            "slack",
        ],
        reason: "Query asks about discussions or conversations",
    },
];

/// Keywords scored per node type. Ties go to the earlier row.
pub static KEYWORD_TABLE: &[(NodeType, &[&str])] = &[
    (
        NodeType::PullRequest,
        &[
            "pr",
            "pull request",
            "code change",
            "merge",
            "branch",
            "commit",
            "git",
            "repository",
            "repo",
            "developer",
            "contribution",
            "feature",
            "oauth",
            "implementation",
        ],
    ),
    (
        NodeType::Issue,
        &[
            "issue",
            "bug",
            "ticket",
            "problem",
            "task",
            "feature request",
            "enhancement",
            "error",
            "defect",
            "tracker",
        ],
    ),
    (
        NodeType::Message,
        &[
            "chat",
            "slack",
            "message",
            "conversation",
            "discussion",
            "said",
            "mentioned",
            "talk",
            "channel",
            "communication",
            "discuss",
        ],
    ),
    (NodeType::TextChunk, &[]),
];

/// Preference order when no keyword matched: most general data first.
pub static FALLBACK_ORDER: [NodeType; 4] = [
    NodeType::TextChunk,
    NodeType::PullRequest,
    NodeType::Issue,
    NodeType::Message,
];

/// Used when nothing at all is available.
pub const DEFAULT_NODE_TYPE: NodeType = NodeType::TextChunk;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_node_type_has_a_keyword_row() {
        for node_type in NodeType::ALL {
            assert_eq!(
                KEYWORD_TABLE.iter().filter(|(t, _)| *t == node_type).count(),
                1,
                "{node_type} must appear exactly once"
            );
        }
    }

    #[test]
    fn test_phrases_are_lowercase() {
        let overrides = OVERRIDE_RULES.iter().flat_map(|r| r.phrases.iter());
        let keywords = KEYWORD_TABLE.iter().flat_map(|(_, k)| k.iter());
        for phrase in overrides.chain(keywords) {
            assert_eq!(*phrase, phrase.to_lowercase());
        }
    }

    #[test]
    fn test_fallback_order_covers_all_types() {
        for node_type in NodeType::ALL {
            assert!(FALLBACK_ORDER.contains(&node_type));
        }
    }
}
