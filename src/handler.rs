//! Request boundary around [`parse_query`].
//!
//! Accepts the JSON body `{"sql_query": "..."}` and produces a status code
//! plus `{"success": true, "diagram_data": {...}}` or `{"error": "..."}`.
//! Input validation lives here; the core itself accepts any text.

use crate::diagram::DiagramData;
use crate::parser::parse_query;
use serde::Serialize;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

pub const DEFAULT_MAX_QUERY_BYTES: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestConfig {
    /// Largest accepted `sql_query`, in bytes.
    pub max_query_bytes: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_query_bytes: DEFAULT_MAX_QUERY_BYTES,
        }
    }
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),
    #[error("Request body must be a JSON object")]
    NotAnObject,
    #[error("No SQL query provided")]
    MissingQuery,
    #[error("sql_query must be a string")]
    QueryNotString,
    #[error("SQL query is {len} bytes, limit is {limit}")]
    QueryTooLarge { len: usize, limit: usize },
    #[error("{0}")]
    Internal(String),
}

impl RequestError {
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidBody(_) | Self::NotAnObject | Self::MissingQuery | Self::QueryNotString => 400,
            Self::QueryTooLarge { .. } => 413,
            Self::Internal(_) => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Success {
        success: bool,
        diagram_data: DiagramData,
    },
    Failure {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: ResponseBody,
}

impl Response {
    fn ok(diagram_data: DiagramData) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Success {
                success: true,
                diagram_data,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.body)
    }
}

impl From<RequestError> for Response {
    fn from(err: RequestError) -> Self {
        Self {
            status: err.status(),
            body: ResponseBody::Failure {
                error: err.to_string(),
            },
        }
    }
}

/// Handle a raw JSON request body.
pub fn handle_request(body: &str, config: &RequestConfig) -> Response {
    match query_from_body(body) {
        Ok(sql) => handle_query(&sql, config),
        Err(err) => {
            tracing::debug!(status = err.status(), error = %err, "rejected request");
            err.into()
        }
    }
}

/// Handle a query string that has already been taken out of a request.
pub fn handle_query(sql: &str, config: &RequestConfig) -> Response {
    match diagram_for(sql, config) {
        Ok(diagram) => Response::ok(diagram),
        Err(err) => {
            match &err {
                RequestError::Internal(message) => tracing::error!(%message, "diagram generation failed"),
                _ => tracing::debug!(status = err.status(), error = %err, "rejected query"),
            }
            err.into()
        }
    }
}

/// Validate `sql` and run the core, turning a panic into an internal error.
pub fn diagram_for(sql: &str, config: &RequestConfig) -> Result<DiagramData, RequestError> {
    if sql.is_empty() {
        return Err(RequestError::MissingQuery);
    }
    if sql.len() > config.max_query_bytes {
        return Err(RequestError::QueryTooLarge {
            len: sql.len(),
            limit: config.max_query_bytes,
        });
    }

    panic::catch_unwind(AssertUnwindSafe(|| parse_query(sql))).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Internal error while generating diagram".to_string());
        RequestError::Internal(message)
    })
}

fn query_from_body(body: &str) -> Result<String, RequestError> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Object(mut fields) = value else {
        return Err(RequestError::NotAnObject);
    };

    match fields.remove("sql_query") {
        None | Some(Value::Null) => Err(RequestError::MissingQuery),
        Some(Value::String(sql)) => Ok(sql),
        Some(_) => Err(RequestError::QueryNotString),
    }
}
