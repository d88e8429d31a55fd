//! Error types for the PDF case API client.
//!
//! # Design
//! Failures fall into three categories: the server answered with an error
//! status, nothing came back, or the request never left. `ApiError::message`
//! renders the user-facing notification text for each; `Display` stays
//! technical for logs.

use thiserror::Error;

/// Shown when a request was sent but no response arrived.
pub const NO_RESPONSE_MESSAGE: &str = "网络超时或无响应";

const UNKNOWN_ERROR: &str = "未知错误";

/// Errors returned by `PdfClient` and `PdfApi`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The server returned a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, status_text: String, body: String },

    /// The request was sent but no response was received (network failure
    /// or timeout).
    #[error("no response received: {0}")]
    NoResponse(String),

    /// The request could not be built or handed to the transport.
    #[error("request setup failed: {0}")]
    RequestSetup(String),

    /// A successful response body could not be decoded.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

/// Which side of the exchange failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Status,
    NoResponse,
    RequestSetup,
}

impl ApiError {
    /// `None` for decode failures, which happen after a successful exchange.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            ApiError::Status { .. } => Some(ErrorCategory::Status),
            ApiError::NoResponse(_) => Some(ErrorCategory::NoResponse),
            ApiError::RequestSetup(_) => Some(ErrorCategory::RequestSetup),
            ApiError::Deserialization(_) => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Server-provided `detail` from a JSON error body.
    ///
    /// Validation errors arrive as a list of objects; their `msg` fields are
    /// joined with `; `.
    pub fn detail(&self) -> Option<String> {
        let ApiError::Status { body, .. } = self else {
            return None;
        };
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        match value.get("detail")? {
            serde_json::Value::String(detail) if !detail.is_empty() => Some(detail.clone()),
            serde_json::Value::Array(items) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                (!msgs.is_empty()).then(|| msgs.join("; "))
            }
            serde_json::Value::Null | serde_json::Value::String(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// User-facing notification text.
    pub fn message(&self) -> String {
        match self {
            ApiError::Status {
                status,
                status_text,
                ..
            } => {
                let reason = self
                    .detail()
                    .or_else(|| (!status_text.is_empty()).then(|| status_text.clone()))
                    .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
                format!("请求错误 {status}: {reason}")
            }
            ApiError::NoResponse(_) => NO_RESPONSE_MESSAGE.to_string(),
            ApiError::RequestSetup(msg) => format!("请求配置错误: {msg}"),
            ApiError::Deserialization(msg) => format!("响应解析失败: {msg}"),
        }
    }
}

/// Failures reported by a `Transport` before any response was read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("no response: {0}")]
    NoResponse(String),
    #[error("request setup: {0}")]
    Setup(String),
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NoResponse(msg) => ApiError::NoResponse(msg),
            TransportError::Setup(msg) => ApiError::RequestSetup(msg),
        }
    }
}
