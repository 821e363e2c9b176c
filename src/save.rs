//! Save/download pipeline: a fire-and-forget task set.
//!
//! Save and download intents share serialization, so one handler serves
//! both. Unlike fetches, every intent is a side effect the user asked for:
//! nothing here is ever cancelled, and network saves run concurrently as
//! independent tasks in a [`JoinSet`]. Completions may interleave freely.
//!
//! # Per-intent flow
//!
//! 1. Host without a contents server → dismissed, no event at all.
//! 2. No record for `content_ref` → `SaveFailed` / `DownloadContentFailed`
//!    with "Content was not set.".
//! 3. Serialize by model kind (notebooks get the app version stamped in).
//!    `Unset` models produce no event.
//! 4. Download → hand the payload to the [`Materializer`] and report
//!    fulfilled immediately. Save → `ContentStore::save` on a spawned task.

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use content_sync_core::actions::{
    Action, DownloadContentFailed, DownloadContentFulfilled, SaveFailed, SaveFulfilled,
};
use content_sync_core::errors::ContentError;
use content_sync_core::models::ContentRef;
use content_sync_core::serialize::serialize_content;
use content_sync_core::store::ContentStore;

use crate::materialize::Materializer;
use crate::stream::{ActionReceiver, ActionStream};

/// Which intent triggered the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    Download,
}

impl Operation {
    fn failed(self, content_ref: ContentRef, error: ContentError) -> Action {
        match self {
            Operation::Save => Action::SaveFailed(SaveFailed { error, content_ref }),
            Operation::Download => {
                Action::DownloadContentFailed(DownloadContentFailed { error, content_ref })
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Save => "save",
            Operation::Download => "download",
        })
    }
}

pub struct SavePipeline {
    stream: ActionStream,
    store: Arc<dyn ContentStore>,
    materializer: Arc<dyn Materializer>,
    fallback_version: String,
}

impl SavePipeline {
    pub fn new(
        stream: ActionStream,
        store: Arc<dyn ContentStore>,
        materializer: Arc<dyn Materializer>,
        fallback_version: impl Into<String>,
    ) -> Self {
        Self {
            stream,
            store,
            materializer,
            fallback_version: fallback_version.into(),
        }
    }

    /// Consume intents until the stream closes or `shutdown` fires, then
    /// wait for every save still in flight.
    pub async fn run(self, mut rx: ActionReceiver, shutdown: CancellationToken) {
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = rx.recv() => {
                    let Some(action) = next else { break };
                    let (operation, content_ref) = match action {
                        Action::Save(intent) => (Operation::Save, intent.content_ref),
                        Action::DownloadContent(intent) => (Operation::Download, intent.content_ref),
                        _ => continue,
                    };
                    self.handle(operation, content_ref, &mut tasks);
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => reap(joined),
            }
        }

        if !tasks.is_empty() {
            tracing::debug!(pending = tasks.len(), "draining in-flight saves");
        }
        while let Some(joined) = tasks.join_next().await {
            reap(joined);
        }
    }

    fn handle(&self, operation: Operation, content_ref: ContentRef, tasks: &mut JoinSet<()>) {
        let (host, record, app_version) = self.stream.read(|s| {
            (
                s.host.clone(),
                s.content(&content_ref).cloned(),
                s.app_version.clone(),
            )
        });

        let Some(server) = host.server_config() else {
            tracing::debug!(host = host.kind(), %operation, %content_ref, "dismissing intent: host has no contents server");
            return;
        };

        let Some(record) = record else {
            tracing::warn!(%operation, %content_ref, "no content for reference");
            self.stream
                .dispatch(operation.failed(content_ref, ContentError::ContentNotSet));
            return;
        };

        let version = app_version.unwrap_or_else(|| self.fallback_version.clone());
        let serialized = match serialize_content(&record.model, &version) {
            Ok(Some(serialized)) => serialized,
            Ok(None) => {
                tracing::warn!(%operation, %content_ref, kind = record.model.kind(), "unsupported content type; ignoring intent");
                return;
            }
            Err(error) => {
                self.stream.dispatch(operation.failed(content_ref, error));
                return;
            }
        };

        match operation {
            Operation::Download => {
                let action = match serialized.download_payload(&record) {
                    Ok(payload) => {
                        self.materializer.materialize(
                            payload.contents,
                            &payload.filename,
                            &payload.content_type,
                        );
                        Action::DownloadContentFulfilled(DownloadContentFulfilled { content_ref })
                    }
                    Err(error) => operation.failed(content_ref, error),
                };
                self.stream.dispatch(action);
            }
            Operation::Save => {
                let model = serialized.save_model();
                let store = self.store.clone();
                let stream = self.stream.clone();
                let filepath = record.filepath;

                tasks.spawn(async move {
                    let action = match store.save(&server, &filepath, &model).await {
                        Ok(_) => Action::SaveFulfilled(SaveFulfilled { content_ref }),
                        Err(e) => {
                            let error = ContentError::from(e);
                            tracing::warn!(%filepath, %error, "save failed");
                            Action::SaveFailed(SaveFailed { error, content_ref })
                        }
                    };
                    stream.dispatch(action);
                });
                tracing::trace!(pending = tasks.len(), "save task spawned");
            }
        }
    }
}

fn reap(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!(error = %e, "save task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_variant_follows_operation() {
        let save = Operation::Save.failed(ContentRef::from("a"), ContentError::ContentNotSet);
        assert_eq!(save.kind(), "SAVE_FAILED");

        let download =
            Operation::Download.failed(ContentRef::from("a"), ContentError::ContentNotSet);
        assert_eq!(download.kind(), "DOWNLOAD_CONTENT_FAILED");
        assert_eq!(download.error(), Some(&ContentError::ContentNotSet));
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Save.to_string(), "save");
        assert_eq!(Operation::Download.to_string(), "download");
    }
}
