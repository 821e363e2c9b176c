//! Core data models shared by the pipeline, the reducer, and the CLI.
//!
//! A [`ContentRecord`] is the unit of document state. It is keyed by a
//! [`ContentRef`] and carries one of the [`ContentModel`] variants, which
//! decides both the serializer and the save/download path that apply.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ContentError;
use crate::notebook::Notebook;

/// Opaque, process-unique identifier naming one open document.
///
/// Used as the correlation key on every intent and result event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(String);

impl ContentRef {
    /// Mint a fresh reference backed by a UUID v4.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ContentRef {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ContentRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the kernel a fetch was issued on behalf of.
///
/// The pipeline never interprets it; it is echoed back on results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KernelRef(String);

impl From<&str> for KernelRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The execution target documents are synced against.
///
/// Only [`Host::Jupyter`] is backed by a remote contents server; every
/// network operation is dismissed for the other variants.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Host {
    Jupyter {
        base_url: String,
        token: Option<String>,
    },
    #[default]
    Local,
    Other(String),
}

impl Host {
    /// Short label for logs (`"jupyter"`, `"local"`, or the custom name).
    pub fn kind(&self) -> &str {
        match self {
            Host::Jupyter { .. } => "jupyter",
            Host::Local => "local",
            Host::Other(name) => name,
        }
    }

    pub fn is_jupyter(&self) -> bool {
        matches!(self, Host::Jupyter { .. })
    }

    /// Derive the connection parameters handed to the store client.
    ///
    /// Returns `None` for hosts without a contents server.
    pub fn server_config(&self) -> Option<ServerConfig> {
        match self {
            Host::Jupyter { base_url, token } => Some(ServerConfig {
                endpoint: base_url.trim_end_matches('/').to_string(),
                token: token.clone(),
            }),
            Host::Local | Host::Other(_) => None,
        }
    }
}

/// Connection parameters for a contents server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL without a trailing slash (e.g. `http://127.0.0.1:8888`).
    pub endpoint: String,
    pub token: Option<String>,
}

/// Query parameters forwarded verbatim on a fetch (`type`, `format`, `content`, ...).
pub type FetchParams = BTreeMap<String, String>;

/// Variant-dependent payload of a [`ContentRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentModel {
    Notebook { notebook: Notebook },
    File { text: String },
    /// Nothing loaded yet, or a model kind this crate cannot save.
    Unset,
}

impl ContentModel {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentModel::Notebook { .. } => "notebook",
            ContentModel::File { .. } => "file",
            ContentModel::Unset => "unset",
        }
    }
}

/// One open document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Path on the contents server; empty for content never saved.
    pub filepath: String,
    pub mimetype: Option<String>,
    pub model: ContentModel,
    /// Last successful save, or the server's `last_modified` after a fetch.
    pub last_saved: Option<DateTime<Utc>>,
    /// Failure attached by the most recent failed result event.
    pub error: Option<ContentError>,
}

impl ContentRecord {
    /// A record with nothing loaded yet, typically the target of a fetch.
    pub fn unset(filepath: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            mimetype: None,
            model: ContentModel::Unset,
            last_saved: None,
            error: None,
        }
    }

    pub fn notebook(filepath: impl Into<String>, notebook: Notebook) -> Self {
        Self {
            filepath: filepath.into(),
            mimetype: Some("application/x-ipynb+json".to_string()),
            model: ContentModel::Notebook { notebook },
            last_saved: None,
            error: None,
        }
    }

    pub fn file(
        filepath: impl Into<String>,
        mimetype: Option<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            filepath: filepath.into(),
            mimetype,
            model: ContentModel::File { text: text.into() },
            last_saved: None,
            error: None,
        }
    }
}

/// Guess a MIME type from a file extension.
///
/// | Extension | MIME Type |
/// |-----------|----------|
/// | `.ipynb` | `application/x-ipynb+json` |
/// | `.md` | `text/markdown` |
/// | `.txt` | `text/plain` |
/// | `.py` | `text/x-python` |
/// | `.json` | `application/json` |
/// | `.js` | `application/javascript` |
/// | `.yaml`, `.yml` | `text/yaml` |
/// | `.html`, `.htm` | `text/html` |
/// | `.csv` | `text/csv` |
/// | Other | `None` |
pub fn guess_mimetype(path: &str) -> Option<String> {
    let ext = path.rsplit_once('.').map(|(_, e)| e.to_lowercase())?;
    let mime = match ext.as_str() {
        "ipynb" => "application/x-ipynb+json",
        "md" => "text/markdown",
        "txt" => "text/plain",
        "py" => "text/x-python",
        "json" => "application/json",
        "js" => "application/javascript",
        "yaml" | "yml" => "text/yaml",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        _ => return None,
    };
    Some(mime.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_refs_are_unique() {
        assert_ne!(ContentRef::new(), ContentRef::new());
    }

    #[test]
    fn test_server_config_only_for_jupyter() {
        let host = Host::Jupyter {
            base_url: "http://localhost:8888/".to_string(),
            token: Some("secret".to_string()),
        };
        let cfg = host.server_config().unwrap();
        assert_eq!(cfg.endpoint, "http://localhost:8888");
        assert_eq!(cfg.token.as_deref(), Some("secret"));

        assert!(Host::Local.server_config().is_none());
        assert!(Host::Other("electron".into()).server_config().is_none());
    }

    #[test]
    fn test_host_kind_labels() {
        assert_eq!(Host::Local.kind(), "local");
        assert_eq!(Host::Other("electron".into()).kind(), "electron");
        assert!(!Host::Other("jupyter-ish".into()).is_jupyter());
    }

    #[test]
    fn test_guess_mimetype() {
        assert_eq!(guess_mimetype("a/b.md").as_deref(), Some("text/markdown"));
        assert_eq!(guess_mimetype("x.PY").as_deref(), Some("text/x-python"));
        assert_eq!(guess_mimetype("noext"), None);
        assert_eq!(guess_mimetype("blob.bin"), None);
    }
}
