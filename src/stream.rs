//! The action stream: one ordered, multi-producer event channel.
//!
//! ```text
//!  producers ──dispatch──▶ ┌──────────────┐ ──queue──▶ fetch pipeline
//!  (app, pipelines)        │ reduce state │ ──queue──▶ save pipeline
//!                          └──────────────┘ ──queue──▶ app subscribers
//! ```
//!
//! `dispatch` applies the event to [`AppState`] and pushes it onto every
//! subscriber's queue under the same write lock, so every subscriber that
//! observes event N reads a state that already includes N, and all
//! subscribers see the same order.
//!
//! Each subscriber owns an unbounded queue. A slow consumer never loses
//! events; it only falls behind.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;

use content_sync_core::actions::Action;
use content_sync_core::models::{ContentRecord, ContentRef};
use content_sync_core::state::AppState;

/// Receiving end of one subscription.
pub type ActionReceiver = mpsc::UnboundedReceiver<Action>;

struct Shared {
    state: AppState,
    subscribers: Vec<mpsc::UnboundedSender<Action>>,
}

/// Cloneable handle to the shared state and its subscribers.
#[derive(Clone)]
pub struct ActionStream {
    shared: Arc<RwLock<Shared>>,
}

impl ActionStream {
    pub fn new(state: AppState) -> Self {
        Self {
            shared: Arc::new(RwLock::new(Shared {
                state,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Reduce `action` into the state, then deliver it to every subscriber.
    pub fn dispatch(&self, action: Action) {
        let mut guard = self.shared.write().unwrap_or_else(PoisonError::into_inner);
        let shared = &mut *guard;
        shared.state.reduce(&action);
        tracing::trace!(action = action.kind(), content_ref = ?action.content_ref(), "dispatch");

        // Dropped receivers are pruned here rather than on drop.
        shared
            .subscribers
            .retain(|tx| tx.send(action.clone()).is_ok());
        if shared.subscribers.is_empty() {
            tracing::trace!("dispatch with no subscribers");
        }
    }

    /// Receive every action dispatched from now on.
    pub fn subscribe(&self) -> ActionReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .push(tx);
        rx
    }

    /// Run `f` against the current state. Do not dispatch from inside `f`.
    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        let shared = self.shared.read().unwrap_or_else(PoisonError::into_inner);
        f(&shared.state)
    }

    /// Snapshot of one record.
    pub fn content(&self, content_ref: &ContentRef) -> Option<ContentRecord> {
        self.read(|s| s.content(content_ref).cloned())
    }

    /// Open a document. Creating and closing records is the embedding
    /// application's job; the pipelines only update existing ones.
    pub fn open(&self, record: ContentRecord) -> ContentRef {
        self.shared
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .open(record)
    }

    pub fn open_as(&self, content_ref: ContentRef, record: ContentRecord) {
        self.shared
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .open_as(content_ref, record);
    }

    pub fn close(&self, content_ref: &ContentRef) -> Option<ContentRecord> {
        self.shared
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .close(content_ref)
    }
}

/// Wait for the first result event (not an intent) naming `content_ref`.
pub async fn next_result_for(rx: &mut ActionReceiver, content_ref: &ContentRef) -> Option<Action> {
    while let Some(action) = rx.recv().await {
        if !action.is_intent() && action.content_ref() == Some(content_ref) {
            return Some(action);
        }
    }
    None
}
