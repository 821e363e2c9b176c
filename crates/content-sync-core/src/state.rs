//! Document state and the reducer that applies result events to it.
//!
//! [`AppState`] is owned by exactly one writer (the action stream), which
//! calls [`AppState::reduce`] for every dispatched event before any
//! subscriber sees it. Pipelines only ever read snapshots.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::actions::{Action, FetchContentFulfilled};
use crate::errors::ContentError;
use crate::models::{guess_mimetype, ContentModel, ContentRecord, ContentRef, Host};
use crate::notebook;

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub host: Host,
    /// Version stamped into saved notebooks; `None` when unknown.
    pub app_version: Option<String>,
    contents: HashMap<ContentRef, ContentRecord>,
}

impl AppState {
    pub fn new(host: Host) -> Self {
        Self {
            host,
            app_version: None,
            contents: HashMap::new(),
        }
    }

    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    /// Register a new document under a freshly minted reference.
    pub fn open(&mut self, record: ContentRecord) -> ContentRef {
        let content_ref = ContentRef::new();
        self.contents.insert(content_ref.clone(), record);
        content_ref
    }

    /// Register a document under a caller-chosen reference, replacing any
    /// record already stored there.
    pub fn open_as(&mut self, content_ref: ContentRef, record: ContentRecord) {
        self.contents.insert(content_ref, record);
    }

    pub fn close(&mut self, content_ref: &ContentRef) -> Option<ContentRecord> {
        self.contents.remove(content_ref)
    }

    pub fn content(&self, content_ref: &ContentRef) -> Option<&ContentRecord> {
        self.contents.get(content_ref)
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Apply one event. Intents and events naming unknown documents are
    /// no-ops; the reducer never creates or removes records.
    pub fn reduce(&mut self, action: &Action) {
        match action {
            Action::FetchContentFulfilled(done) => {
                if let Some(record) = done
                    .content_ref
                    .as_ref()
                    .and_then(|r| self.contents.get_mut(r))
                {
                    apply_fetched(record, done);
                }
            }
            Action::SaveFulfilled(done) => {
                if let Some(record) = self.contents.get_mut(&done.content_ref) {
                    record.error = None;
                    record.last_saved = Some(Utc::now());
                }
            }
            Action::FetchContentFailed(_)
            | Action::SaveFailed(_)
            | Action::DownloadContentFailed(_) => {
                let target = action.content_ref().and_then(|r| self.contents.get_mut(r));
                if let (Some(record), Some(error)) = (target, action.error()) {
                    record.error = Some(error.clone());
                }
            }
            Action::FetchContent(_)
            | Action::Save(_)
            | Action::DownloadContent(_)
            | Action::DownloadContentFulfilled(_)
            | Action::Error(_) => {}
        }
    }
}

/// Model carried by a fetched contents model.
///
/// `Ok(None)` means the server sent metadata only (`content=0`): the
/// record keeps whatever model it already holds.
fn fetched_model(model: &Value) -> Result<Option<ContentModel>, ContentError> {
    let content = model.get("content").filter(|c| !c.is_null());

    match (model.get("type").and_then(|t| t.as_str()), content) {
        (Some("notebook"), Some(content)) => notebook::from_wire(content.clone())
            .map(|notebook| Some(ContentModel::Notebook { notebook })),
        (Some("file"), Some(Value::String(text))) => {
            Ok(Some(ContentModel::File { text: text.clone() }))
        }
        (Some("notebook") | Some("file"), _) => Ok(None),
        _ => Ok(Some(ContentModel::Unset)),
    }
}

fn apply_fetched(record: &mut ContentRecord, done: &FetchContentFulfilled) {
    let model = &done.model;

    match fetched_model(model) {
        Ok(parsed) => {
            if let Some(parsed) = parsed {
                record.model = parsed;
            }
            record.filepath = done.filepath.clone();
            record.mimetype = model
                .get("mimetype")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .or_else(|| guess_mimetype(&done.filepath));
            record.last_saved = model
                .get("last_modified")
                .and_then(|t| t.as_str())
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc));
            record.error = None;
        }
        Err(err) => record.error = Some(err),
    }
}
