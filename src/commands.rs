//! Implementations of the `csync` subcommands.
//!
//! Each command opens a record, dispatches one or more intents through a
//! [`ContentSync`] runtime, and waits for the matching result event.
//! Results are printed on stdout; diagnostics go to stderr via `tracing`.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use content_sync_core::actions::{Action, DownloadContent, FetchContent, Save};
use content_sync_core::models::{guess_mimetype, ContentRecord, ContentRef};
use content_sync_core::notebook::parse_notebook;

use crate::config::Config;
use crate::materialize::{DiskMaterializer, Materializer};
use crate::runtime::ContentSync;
use crate::stream::{next_result_for, ActionReceiver};

/// Slack on top of the HTTP timeout before giving up on a result event.
const RESULT_GRACE: Duration = Duration::from_secs(5);

fn ensure_remote_host(config: &Config) -> Result<()> {
    let host = config.host.to_host();
    if !host.is_jupyter() {
        bail!(
            "host type '{}' has no contents server; set [host].type = \"jupyter\"",
            host.kind()
        );
    }
    Ok(())
}

async fn await_result(
    config: &Config,
    rx: &mut ActionReceiver,
    content_ref: &ContentRef,
) -> Result<Action> {
    let limit = Duration::from_secs(config.client.timeout_secs) + RESULT_GRACE;
    tokio::time::timeout(limit, next_result_for(rx, content_ref))
        .await
        .context("Timed out waiting for the contents server")?
        .context("Action stream closed before a result arrived")
}

async fn fetch_into(
    config: &Config,
    sync: &ContentSync,
    path: &str,
) -> Result<(ContentRef, serde_json::Value)> {
    let content_ref = sync.stream().open(ContentRecord::unset(path));
    let mut rx = sync.subscribe();
    sync.dispatch(Action::FetchContent(FetchContent::new(
        path,
        content_ref.clone(),
    )));

    match await_result(config, &mut rx, &content_ref).await? {
        Action::FetchContentFulfilled(done) => Ok((content_ref, done.model)),
        Action::FetchContentFailed(failed) => bail!("fetch {} failed: {}", path, failed.error),
        other => bail!("unexpected result {} while fetching {}", other.kind(), path),
    }
}

/// `csync fetch <path>`: print the server's model for `path`.
pub async fn run_fetch(config: &Config, path: &str) -> Result<()> {
    ensure_remote_host(config)?;
    let materializer = Arc::new(DiskMaterializer::new(&config.download.dir));
    let sync = ContentSync::from_config(config, materializer)?;

    let result = fetch_into(config, &sync, path).await;
    sync.shutdown().await;

    let (_, model) = result?;
    println!("{}", serde_json::to_string_pretty(&model)?);
    Ok(())
}

async fn download_into(config: &Config, sync: &ContentSync, path: &str) -> Result<()> {
    let (content_ref, _) = fetch_into(config, sync, path).await?;
    let mut rx = sync.subscribe();
    sync.dispatch(Action::DownloadContent(DownloadContent {
        content_ref: content_ref.clone(),
    }));

    match await_result(config, &mut rx, &content_ref).await? {
        Action::DownloadContentFulfilled(_) => Ok(()),
        Action::DownloadContentFailed(failed) => bail!("download {} failed: {}", path, failed.error),
        other => bail!("unexpected result {} while downloading {}", other.kind(), path),
    }
}

/// `csync download <path>`: fetch `path`, then write it under the
/// download directory.
pub async fn run_download(config: &Config, path: &str) -> Result<()> {
    ensure_remote_host(config)?;
    let materializer = Arc::new(DiskMaterializer::new(&config.download.dir));
    let sync = ContentSync::from_config(config, materializer.clone() as Arc<dyn Materializer>)?;

    let result = download_into(config, &sync, path).await;

    sync.shutdown().await;
    materializer.flush().await;
    result?;

    println!("download {}", path);
    println!("  written: {}", materializer.target_for(path).display());
    println!("ok");
    Ok(())
}

/// Build a record for a local file: `.ipynb` → notebook, anything else →
/// plain text file.
pub fn load_local(local: &Path, remote: &str) -> Result<ContentRecord> {
    let text = std::fs::read_to_string(local)
        .with_context(|| format!("Failed to read {}", local.display()))?;

    if remote.ends_with(".ipynb") {
        let notebook = parse_notebook(&text)
            .with_context(|| format!("{} is not a valid notebook", local.display()))?;
        Ok(ContentRecord::notebook(remote, notebook))
    } else {
        Ok(ContentRecord::file(remote, guess_mimetype(remote), text))
    }
}

/// `csync push <local> [--to <remote>]`: save a local file to the server.
pub async fn run_push(config: &Config, local: &Path, to: Option<&str>) -> Result<()> {
    ensure_remote_host(config)?;
    let remote = match to {
        Some(remote) => remote.to_string(),
        None => local
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Cannot derive a remote name from {}", local.display()))?,
    };
    let record = load_local(local, &remote)?;
    let kind = record.model.kind();

    let materializer = Arc::new(DiskMaterializer::new(&config.download.dir));
    let sync = ContentSync::from_config(config, materializer)?;
    let content_ref = sync.stream().open(record);
    let mut rx = sync.subscribe();
    sync.dispatch(Action::Save(Save {
        content_ref: content_ref.clone(),
    }));

    let result = await_result(config, &mut rx, &content_ref).await;
    sync.shutdown().await;

    match result? {
        Action::SaveFulfilled(_) => {
            println!("push {} ({})", remote, kind);
            println!("  version: {}", config.effective_version());
            println!("ok");
            Ok(())
        }
        Action::SaveFailed(failed) => bail!("push {} failed: {}", remote, failed.error),
        other => bail!("unexpected result {} while pushing {}", other.kind(), remote),
    }
}
