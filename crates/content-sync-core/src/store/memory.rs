//! In-memory [`ContentStore`] implementation for testing and offline use.
//!
//! Models are kept in a `HashMap` behind `std::sync::RwLock`, keyed by
//! normalized path (no leading slash). Call counters let tests assert that
//! a code path never reached the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::models::{guess_mimetype, FetchParams, ServerConfig};
use crate::serialize::SaveModel;

use super::{ContentStore, StoreResponse, STATUS_OK};

/// In-memory contents store.
pub struct InMemoryContentStore {
    models: RwLock<HashMap<String, Value>>,
    gets: AtomicUsize,
    saves: AtomicUsize,
    read_only: AtomicBool,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
            gets: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
            read_only: AtomicBool::new(false),
        }
    }

    /// Seed a path with raw content of the given contents-API `type`.
    pub fn insert(&self, path: &str, kind: &str, content: Value) {
        let path = normalize(path);
        let model = model_for(&path, kind, content, None);
        self.models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, model);
    }

    /// The full stored model at `path`, if any.
    pub fn model(&self, path: &str) -> Option<Value> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize(path))
            .cloned()
    }

    /// Make every subsequent `save` fail.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

fn model_for(path: &str, kind: &str, content: Value, format: Option<&str>) -> Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    let format = format.map(str::to_string).unwrap_or_else(|| {
        if kind == "notebook" { "json" } else { "text" }.to_string()
    });
    json!({
        "name": name,
        "path": path,
        "type": kind,
        "format": format,
        "mimetype": if kind == "file" { guess_mimetype(path) } else { None },
        "writable": true,
        "last_modified": Utc::now().to_rfc3339(),
        "content": content,
    })
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn get(
        &self,
        _server: &ServerConfig,
        path: &str,
        params: Option<&FetchParams>,
    ) -> Result<StoreResponse> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let models = self.models.read().unwrap_or_else(PoisonError::into_inner);
        let Some(model) = models.get(&normalize(path)) else {
            return Ok(StoreResponse {
                status: 404,
                response: json!({ "message": format!("No such file or directory: {}", path) }),
            });
        };

        let mut model = model.clone();
        let skip_content = params
            .and_then(|p| p.get("content"))
            .is_some_and(|c| c == "0");
        if skip_content {
            model["content"] = Value::Null;
        }
        Ok(StoreResponse {
            status: STATUS_OK,
            response: model,
        })
    }

    async fn save(&self, _server: &ServerConfig, path: &str, model: &SaveModel) -> Result<Value> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.read_only.load(Ordering::SeqCst) {
            bail!("contents store is read-only: cannot save {}", path);
        }

        let path = normalize(path);
        let stored = model_for(
            &path,
            &model.kind,
            model.content.clone(),
            model.format.as_deref(),
        );
        let mut ack = stored.clone();
        ack["content"] = Value::Null;

        self.models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, stored);
        Ok(ack)
    }
}
