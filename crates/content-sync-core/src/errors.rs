//! Failures carried inside result events.
//!
//! Result events are delivered to every subscriber, so the error they carry
//! must be cheap to clone and serializable. Transport-level errors from the
//! store client arrive as [`anyhow::Error`] and are flattened into
//! [`ContentError::Transport`] with their full context chain.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentError {
    /// A fetch intent arrived without a usable filepath.
    #[error("fetching content needs a payload")]
    MissingPayload,

    /// No record exists for the content reference at save/download time.
    #[error("Content was not set.")]
    ContentNotSet,

    /// The contents server answered with a non-success status.
    #[error("contents server responded {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response (connect, timeout, decode).
    #[error("{message}")]
    Transport { message: String },

    /// A plain file cannot be downloaded without a name.
    #[error("a filepath is required to download a file")]
    MissingFilepath,

    /// The fetched notebook body could not be read as nbformat v4.
    #[error("invalid notebook: {message}")]
    InvalidNotebook { message: String },
}

impl From<anyhow::Error> for ContentError {
    fn from(err: anyhow::Error) -> Self {
        ContentError::Transport {
            message: format!("{:#}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(ContentError::ContentNotSet.to_string(), "Content was not set.");
        assert_eq!(
            ContentError::MissingPayload.to_string(),
            "fetching content needs a payload"
        );
        let status = ContentError::Status {
            status: 404,
            body: "No such file".into(),
        };
        assert_eq!(status.to_string(), "contents server responded 404: No such file");
    }

    #[test]
    fn test_anyhow_context_is_kept() {
        let err = anyhow::anyhow!("connection refused").context("GET /api/contents/a.ipynb");
        let converted = ContentError::from(err);
        assert_eq!(
            converted.to_string(),
            "GET /api/contents/a.ipynb: connection refused"
        );
    }
}
