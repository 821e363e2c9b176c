//! Content store client abstraction.
//!
//! The [`ContentStore`] trait is the seam between the pipelines and the
//! remote contents server, enabling pluggable backends (the Jupyter REST
//! client, the in-memory store used by tests and offline runs).
//!
//! Implementations must be `Send + Sync`: the save pipeline calls them from
//! many concurrently spawned tasks.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::models::{FetchParams, ServerConfig};
use crate::serialize::SaveModel;

/// Status code the fetch pipeline treats as success.
pub const STATUS_OK: u16 = 200;

/// Status-bearing answer to a `get`.
///
/// `get` returns this for every HTTP status; only transport failures
/// (no response at all) surface as `Err`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreResponse {
    pub status: u16,
    /// Decoded JSON body, or the raw text as a JSON string when the body
    /// is not JSON.
    pub response: Value,
}

impl StoreResponse {
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Best-effort human message for a failed response.
    pub fn message(&self) -> String {
        match &self.response {
            Value::String(s) => s.clone(),
            Value::Object(obj) => obj
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| self.response.to_string()),
            other => other.to_string(),
        }
    }
}

/// Abstract contents server.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get`](ContentStore::get) | Read the model at a path |
/// | [`save`](ContentStore::save) | Write a save-model to a path |
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Read the contents model at `path`.
    async fn get(
        &self,
        server: &ServerConfig,
        path: &str,
        params: Option<&FetchParams>,
    ) -> Result<StoreResponse>;

    /// Write `model` to `path`.
    ///
    /// Returns the server's acknowledgement model. Errors on any
    /// non-success status.
    async fn save(&self, server: &ServerConfig, path: &str, model: &SaveModel) -> Result<Value>;
}
