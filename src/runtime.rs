//! Wiring: one action stream, two pipelines.
//!
//! [`ContentSync::start`] subscribes both pipelines before returning, so no
//! intent dispatched afterwards can be missed. The pipelines run as
//! independent tasks with no ordering between them.

use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use content_sync_core::actions::Action;
use content_sync_core::state::AppState;
use content_sync_core::store::ContentStore;

use crate::config::Config;
use crate::fetch::FetchPipeline;
use crate::jupyter::JupyterContentStore;
use crate::materialize::Materializer;
use crate::save::SavePipeline;
use crate::stream::{ActionReceiver, ActionStream};

/// Tunables for [`ContentSync::start`].
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Version stamped into notebooks when the state does not know one.
    pub fallback_version: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            fallback_version: "0.0.0-beta".to_string(),
        }
    }
}

/// A running content-sync pipeline pair.
pub struct ContentSync {
    stream: ActionStream,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ContentSync {
    /// Spawn the fetch and save/download pipelines over a fresh stream.
    pub fn start(
        state: AppState,
        store: Arc<dyn ContentStore>,
        materializer: Arc<dyn Materializer>,
        options: SyncOptions,
    ) -> Self {
        let stream = ActionStream::new(state);
        let shutdown = CancellationToken::new();

        let fetch = FetchPipeline::new(stream.clone(), store.clone());
        let fetch_rx = stream.subscribe();
        let save = SavePipeline::new(
            stream.clone(),
            store,
            materializer,
            options.fallback_version,
        );
        let save_rx = stream.subscribe();

        let tasks = vec![
            tokio::spawn(fetch.run(fetch_rx, shutdown.child_token())),
            tokio::spawn(save.run(save_rx, shutdown.child_token())),
        ];
        tracing::debug!("content sync started");

        Self {
            stream,
            shutdown,
            tasks,
        }
    }

    /// Start against the host described by `config`, using the HTTP
    /// contents client.
    pub fn from_config(config: &Config, materializer: Arc<dyn Materializer>) -> Result<Self> {
        let store = Arc::new(JupyterContentStore::new(&config.client)?);
        let mut state = AppState::new(config.host.to_host());
        state.app_version = config.app.version.clone();

        Ok(Self::start(
            state,
            store,
            materializer,
            SyncOptions {
                fallback_version: config.app.fallback_version.clone(),
            },
        ))
    }

    pub fn stream(&self) -> &ActionStream {
        &self.stream
    }

    pub fn dispatch(&self, action: Action) {
        self.stream.dispatch(action);
    }

    pub fn subscribe(&self) -> ActionReceiver {
        self.stream.subscribe()
    }

    /// Stop both pipelines. In-flight fetches are cancelled; in-flight
    /// saves are allowed to finish.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "pipeline task failed");
            }
        }
    }
}
