//! Graph database access.
//!
//! The rest of the crate talks to the database only through [`GraphSession`],
//! so tests can substitute an in-memory fake for the HTTP client.

mod http;
mod probe;

pub use http::HttpGraphSession;
pub use probe::probe_database;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::RagError;

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Whether `name` can be spliced into a Cypher statement unquoted.
///
/// Labels, property names and index names cannot be passed as parameters,
/// so anything interpolated into statement text must pass this check.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// One result row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A query/response session against a Cypher-speaking database.
#[async_trait]
pub trait GraphSession: Send + Sync {
    /// Run a single statement and collect all rows.
    async fn run(&self, statement: &str, params: serde_json::Value) -> Result<Vec<Row>, RagError>;

    /// Release the session. Later calls to [`GraphSession::run`] fail.
    async fn close(&self) {}
}

/// Read an integer column, accepting both JSON integers and floats.
pub(crate) fn row_u64(row: &Row, column: &str) -> Option<u64> {
    let value = row.get(column)?;
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

pub(crate) fn row_str<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    row.get(column).and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::row;
    use serde_json::json;

    #[test]
    fn test_row_u64_accepts_ints_and_floats() {
        let r = row(&[("a", json!(7)), ("b", json!(3.0)), ("c", json!("x"))]);
        assert_eq!(row_u64(&r, "a"), Some(7));
        assert_eq!(row_u64(&r, "b"), Some(3));
        assert_eq!(row_u64(&r, "c"), None);
        assert_eq!(row_u64(&r, "missing"), None);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("embedding"));
        assert!(is_identifier("issue_vector_idx"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("idx} DETACH DELETE n //"));
        assert!(!is_identifier("n.embedding"));
    }

    #[test]
    fn test_row_str() {
        let r = row(&[("name", json!("issue_vector_idx")), ("n", json!(1))]);
        assert_eq!(row_str(&r, "name"), Some("issue_vector_idx"));
        assert_eq!(row_str(&r, "n"), None);
    }
}
