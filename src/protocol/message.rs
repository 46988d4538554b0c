//! Message payload shapes carried inside a `Command`/`Response`/`BulkOperation`
//! frame. Payloads are JSON objects (§4.9), deserialized with `serde_json`
//! the same way `query::parser` treats its wire-level query document.

use crate::value::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOpKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkOpItem {
    pub kind: BulkOpKind,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub document: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkOperationPayload {
    pub collection: String,
    pub ops: Vec<BulkOpItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkOpResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkOperationResponse {
    pub results: Vec<BulkOpResult>,
}

/// Client-sent handshake payload. `client_version` is informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakePayload {
    pub client_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationPayload {
    pub username: String,
    pub credential: String,
}

/// Generic response envelope for non-bulk commands: the raw result document
/// on success, or an `ErrorPayload` carried in a separate `Error` message.
#[derive(Debug, Clone, Serialize)]
pub struct ResponsePayload {
    pub result: Value,
}
