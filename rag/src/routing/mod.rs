//! Node-type selection for incoming queries.
//!
//! Picks which vector index a question should be answered from, using the
//! static phrase and keyword tables in [`tables`]. Selection is deterministic
//! and does not require ML models.

pub mod tables;

use log::debug;

use crate::types::{Availability, NodeType, Selection};
use tables::{DEFAULT_NODE_TYPE, FALLBACK_ORDER, KEYWORD_TABLE, OVERRIDE_RULES};

/// Select the node type best suited to answer `query`.
///
/// Rules apply in priority order, first match wins:
/// 1. specific-intent phrase overrides
/// 2. keyword scoring among available types
/// 3. the first available type in the fallback order
/// 4. [`DEFAULT_NODE_TYPE`]
pub fn select_node_type(query: &str, availability: &Availability) -> Selection {
    let lower = query.to_lowercase();

    if let Some(selection) = match_override(&lower, availability) {
        debug!("override matched {}", selection.node_type);
        return selection;
    }

    if let Some((node_type, score)) = best_keyword_match(&lower, availability) {
        debug!("keyword score {score} for {node_type}");
        return Selection::new(
            node_type,
            format!("Query contains {score} keywords related to {node_type}"),
        );
    }

    if let Some(node_type) = FALLBACK_ORDER
        .iter()
        .copied()
        .find(|t| availability.is_available(*t))
    {
        return Selection::new(
            node_type,
            format!("Fallback to {node_type} based on available data"),
        );
    }

    Selection::new(DEFAULT_NODE_TYPE, "Default fallback")
}

fn match_override(query: &str, availability: &Availability) -> Option<Selection> {
    OVERRIDE_RULES
        .iter()
        .filter(|rule| availability.is_available(rule.node_type))
        .find(|rule| rule.phrases.iter().any(|p| query.contains(p)))
        .map(|rule| Selection::new(rule.node_type, rule.reason))
}

/// Count keyword hits per available type and return the strict maximum.
fn best_keyword_match(query: &str, availability: &Availability) -> Option<(NodeType, usize)> {
    let mut best: Option<(NodeType, usize)> = None;

    for (node_type, keywords) in KEYWORD_TABLE {
        if !availability.is_available(*node_type) {
            continue;
        }
        let score = keywords.iter().filter(|k| query.contains(*k)).count();
        if score > 0 && best.is_none_or(|(_, s)| score > s) {
            best = Some((*node_type, score));
        }
    }

    best
}
