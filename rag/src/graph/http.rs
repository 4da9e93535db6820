//! Neo4j HTTP transactional API client.
//!
//! Each statement is sent as its own auto-commit transaction to
//! `POST {uri}/db/{database}/tx/commit`.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{GraphSession, Row};
use crate::error::RagError;

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    statements: Vec<StatementRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<ServerError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<DataRow>,
}

#[derive(Debug, Deserialize)]
struct DataRow {
    row: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ServerError {
    code: String,
    message: String,
}

/// Graph session over Neo4j's HTTP endpoint with basic auth.
pub struct HttpGraphSession {
    client: reqwest::Client,
    commit_url: String,
    user: String,
    password: String,
    closed: AtomicBool,
}

impl HttpGraphSession {
    /// Create a session.
    ///
    /// # Arguments
    /// * `uri` - HTTP base URI (e.g., "http://localhost:7474")
    /// * `database` - Database name (e.g., "neo4j")
    pub fn new(uri: &str, database: &str, user: String, password: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            commit_url: format!("{}/db/{}/tx/commit", uri.trim_end_matches('/'), database),
            user,
            password,
            closed: AtomicBool::new(false),
        }
    }

    pub fn commit_url(&self) -> &str {
        &self.commit_url
    }
}

#[async_trait]
impl GraphSession for HttpGraphSession {
    async fn run(&self, statement: &str, params: serde_json::Value) -> Result<Vec<Row>, RagError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RagError::graph("session is closed"));
        }

        debug!("cypher: {}", statement.trim());
        let request = CommitRequest {
            statements: vec![StatementRequest {
                statement,
                parameters: params,
            }],
        };

        let response = self
            .client
            .post(&self.commit_url)
            .basic_auth(&self.user, Some(&self.password))
            .header("Accept", "application/json;charset=UTF-8")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Graph {
                code: format!("Http.{}", status.as_u16()),
                message: body,
            });
        }

        let body: CommitResponse = response.json().await?;
        rows_from_response(body)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Convert a commit response into rows, surfacing the first server error.
fn rows_from_response(body: CommitResponse) -> Result<Vec<Row>, RagError> {
    if let Some(err) = body.errors.into_iter().next() {
        return Err(RagError::Graph {
            code: err.code,
            message: err.message,
        });
    }

    let Some(result) = body.results.into_iter().next() else {
        return Ok(Vec::new());
    };

    Ok(result
        .data
        .into_iter()
        .map(|data| result.columns.iter().cloned().zip(data.row).collect())
        .collect())
}
