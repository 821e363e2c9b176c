//! Fetch pipeline: a latest-wins supervisor over content reads.
//!
//! Every `FetchContent` intent supersedes whatever fetch is still in flight
//! on this pipeline. The superseded request is cancelled through its
//! [`CancellationToken`], and because completions are routed back through
//! the supervisor loop tagged with their generation, a result that loses
//! the race against cancellation is still dropped instead of emitted.
//!
//! # Per-intent flow
//!
//! 1. Missing/empty `filepath` → `Error` result, no network.
//! 2. Host without a contents server → dismissed, no event at all.
//! 3. `get` → `FetchContentFulfilled` on status 200, otherwise
//!    `FetchContentFailed` carrying the status or transport error.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use content_sync_core::actions::{
    Action, ErrorPayload, FetchContent, FetchContentFailed, FetchContentFulfilled,
};
use content_sync_core::errors::ContentError;
use content_sync_core::store::{ContentStore, StoreResponse};

use crate::stream::{ActionReceiver, ActionStream};

type Completion = (u64, Action);

pub struct FetchPipeline {
    stream: ActionStream,
    store: Arc<dyn ContentStore>,
}

impl FetchPipeline {
    pub fn new(stream: ActionStream, store: Arc<dyn ContentStore>) -> Self {
        Self { stream, store }
    }

    /// Consume intents from `rx` until the stream closes or `shutdown` fires.
    pub async fn run(self, mut rx: ActionReceiver, shutdown: CancellationToken) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
        let mut generation: u64 = 0;
        let mut in_flight: Option<CancellationToken> = None;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = rx.recv() => {
                    let Some(action) = next else { break };
                    let Action::FetchContent(intent) = action else { continue };

                    generation += 1;
                    if let Some(previous) = in_flight.take() {
                        tracing::trace!(generation, "superseding in-flight fetch");
                        previous.cancel();
                    }
                    in_flight = self.start(intent, generation, &done_tx);
                }
                Some((finished, action)) = done_rx.recv() => {
                    if finished == generation {
                        in_flight = None;
                        self.stream.dispatch(action);
                    } else {
                        tracing::trace!(finished, current = generation, "dropping superseded fetch result");
                    }
                }
            }
        }

        if let Some(token) = in_flight {
            token.cancel();
        }
    }

    /// Validate and route one intent; spawn the request when it applies.
    fn start(
        &self,
        intent: FetchContent,
        generation: u64,
        done_tx: &mpsc::UnboundedSender<Completion>,
    ) -> Option<CancellationToken> {
        let filepath = match intent.filepath.as_deref() {
            Some(path) if !path.is_empty() => path.to_string(),
            _ => {
                tracing::warn!(content_ref = ?intent.content_ref, "fetch intent without a filepath");
                self.stream.dispatch(Action::Error(ErrorPayload {
                    error: ContentError::MissingPayload,
                }));
                return None;
            }
        };

        let host = self.stream.read(|s| s.host.clone());
        let Some(server) = host.server_config() else {
            tracing::debug!(host = host.kind(), %filepath, "dismissing fetch: host has no contents server");
            return None;
        };

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let store = self.store.clone();
        let done_tx = done_tx.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = cancelled.cancelled() => return,
                outcome = store.get(&server, &filepath, intent.params.as_ref()) => outcome,
            };
            let action = to_result(filepath, intent, outcome);
            // The supervisor may already be gone during shutdown.
            let _ = done_tx.send((generation, action));
        });

        Some(token)
    }
}

fn to_result(filepath: String, intent: FetchContent, outcome: anyhow::Result<StoreResponse>) -> Action {
    let error = match outcome {
        Ok(response) if response.is_ok() => {
            return Action::FetchContentFulfilled(FetchContentFulfilled {
                filepath,
                model: response.response,
                kernel_ref: intent.kernel_ref,
                content_ref: intent.content_ref,
            });
        }
        Ok(response) => ContentError::Status {
            status: response.status,
            body: response.message(),
        },
        Err(e) => ContentError::from(e),
    };

    tracing::warn!(%filepath, %error, "fetch failed");
    Action::FetchContentFailed(FetchContentFailed {
        filepath: Some(filepath),
        error,
        kernel_ref: intent.kernel_ref,
        content_ref: intent.content_ref,
    })
}
