//! Jupyter contents API client.
//!
//! Implements [`ContentStore`] over the Jupyter server REST API:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `get` | `GET {base}/api/contents/{path}?type=..&format=..&content=..` |
//! | `save` | `PUT {base}/api/contents/{path}` with the save-model as JSON |
//!
//! When the server config carries a token it is sent as
//! `Authorization: token <token>`.
//!
//! `get` hands every HTTP status back to the caller; `save` fails on any
//! non-success status. Network errors fail both.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

use content_sync_core::models::{FetchParams, ServerConfig};
use content_sync_core::serialize::SaveModel;
use content_sync_core::store::{ContentStore, StoreResponse};

use crate::config::ClientConfig;

/// HTTP-backed contents store.
///
/// Holds one pooled `reqwest::Client`; cloning the store shares the pool.
#[derive(Clone)]
pub struct JupyterContentStore {
    client: reqwest::Client,
}

impl JupyterContentStore {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

/// Build `{endpoint}/api/contents/{path}` with every path segment encoded.
pub fn contents_url(server: &ServerConfig, path: &str) -> Result<Url> {
    let mut url = Url::parse(&server.endpoint)
        .with_context(|| format!("Invalid contents endpoint: {}", server.endpoint))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Endpoint cannot be a base URL: {}", server.endpoint))?;
        segments.pop_if_empty().push("api").push("contents");
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
    }
    Ok(url)
}

fn authorize(request: reqwest::RequestBuilder, server: &ServerConfig) -> reqwest::RequestBuilder {
    match &server.token {
        Some(token) => request.header("Authorization", format!("token {}", token)),
        None => request,
    }
}

fn decode_body(text: String) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[async_trait]
impl ContentStore for JupyterContentStore {
    async fn get(
        &self,
        server: &ServerConfig,
        path: &str,
        params: Option<&FetchParams>,
    ) -> Result<StoreResponse> {
        let url = contents_url(server, path)?;
        tracing::debug!(%url, "contents.get");

        let mut request = self.client.get(url.clone());
        if let Some(params) = params {
            request = request.query(params);
        }

        let response = authorize(request, server)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read body of GET {}", url))?;

        Ok(StoreResponse {
            status,
            response: decode_body(text),
        })
    }

    async fn save(&self, server: &ServerConfig, path: &str, model: &SaveModel) -> Result<Value> {
        let url = contents_url(server, path)?;
        tracing::debug!(%url, kind = %model.kind, "contents.save");

        let response = authorize(self.client.put(url.clone()), server)
            .json(model)
            .send()
            .await
            .with_context(|| format!("PUT {} failed", url))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("PUT {} returned {}: {}", url, status, text);
        }
        Ok(decode_body(text))
    }
}
