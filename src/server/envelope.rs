//! JSON response envelope shared by every endpoint

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::modes::Mode;

pub const TASK_QUERY_A: &str =
    "Find the name of an employee who lives in Lincoln and works in Omaha.";
pub const TASK_QUERY_B: &str =
    "Find salaries of employees who live in the same cities as the companies for which they work.";

/// `{statusCode, result|results, task?, message?}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Value>,
    #[serde(skip)]
    http_status: StatusCode,
}

impl Envelope {
    fn new(status_code: u16, http_status: StatusCode) -> Self {
        Self {
            status_code,
            task: None,
            result: None,
            results: None,
            message: None,
            summary: None,
            http_status,
        }
    }

    /// Acknowledgement for create and insert: `{"statusCode": 200, "result": ""}`
    pub fn done() -> Self {
        Self {
            result: Some(Value::String(String::new())),
            ..Self::new(200, StatusCode::OK)
        }
    }

    pub fn with_summary(mut self, summary: Value) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Query answers; the separate layout nests them under `result`, the
    /// combined layout under `results`
    pub fn answers(mode: Mode, task: &str, values: Value) -> Self {
        let wrapped = Some(json!({ "results": values }));
        let base = Self {
            task: Some(task.to_string()),
            ..Self::new(200, StatusCode::OK)
        };
        match mode {
            Mode::Separate => Self {
                result: wrapped,
                ..base
            },
            Mode::Combined => Self {
                results: wrapped,
                ..base
            },
        }
    }

    pub fn ok(result: Value) -> Self {
        Self {
            result: Some(result),
            ..Self::new(200, StatusCode::OK)
        }
    }

    /// Unknown path; the HTTP status stays 200 for client compatibility
    pub fn not_found() -> Self {
        Self {
            message: Some("NOT FOUND".to_string()),
            ..Self::new(404, StatusCode::OK)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(500, StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.http_status, Json(self)).into_response()
    }
}
