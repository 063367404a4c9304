//! Shared response envelope types for API handlers.
//!
//! Structured (non-file) responses that are not part of the legacy polling
//! contract use a `{ "data": ... }` envelope. Use [`DataResponse`] instead
//! of ad-hoc `serde_json::json!({ "data": ... })`.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
