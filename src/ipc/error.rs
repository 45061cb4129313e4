use serde::Serialize;

use crate::entry::EntryError;
use crate::records::RecordError;

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// One response line. `id` is absent only when the request could not be read.
#[derive(Debug, Serialize)]
struct Reply<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody<'a>>,
}

impl Reply<'_> {
    fn into_value(self) -> serde_json::Value {
        serde_json::to_value(&self).unwrap_or_else(|_| serde_json::json!({ "ok": false }))
    }
}

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    Reply {
        id: Some(id),
        ok: true,
        result: Some(result),
        error: None,
    }
    .into_value()
}

fn failure(
    id: Option<&str>,
    code: &str,
    message: String,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    tracing::debug!(id = ?id, code, %message, "request failed");
    Reply {
        id,
        ok: false,
        result: None,
        error: Some(ErrorBody {
            code,
            message,
            details,
        }),
    }
    .into_value()
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    failure(Some(id), code, message.into(), details)
}

/// Reply for a line that never parsed into a request, so there is no id to echo.
pub fn unaddressed(code: &str, message: impl Into<String>) -> serde_json::Value {
    failure(None, code, message.into(), None)
}

pub fn entry_err(id: &str, e: &EntryError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), e.details())
}

pub fn record_err(id: &str, e: &RecordError, details: Option<serde_json::Value>) -> serde_json::Value {
    err(id, e.code(), e.to_string(), details)
}
