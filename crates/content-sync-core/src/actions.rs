//! Events flowing through the action stream.
//!
//! Intents (`FetchContent`, `Save`, `DownloadContent`) are produced by the
//! application; results (`*Fulfilled`, `*Failed`, `Error`) are produced by
//! the pipelines. Both travel on the same ordered stream, so a consumer that
//! triggered an intent observes its outcome on the channel it used.
//!
//! Save and download intents carry no content: the pipeline re-reads the
//! record named by `content_ref` when it handles the intent.

use serde::Serialize;
use serde_json::Value;

use crate::errors::ContentError;
use crate::models::{ContentRef, FetchParams, KernelRef};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    FetchContent(FetchContent),
    FetchContentFulfilled(FetchContentFulfilled),
    FetchContentFailed(FetchContentFailed),
    Save(Save),
    SaveFulfilled(SaveFulfilled),
    SaveFailed(SaveFailed),
    DownloadContent(DownloadContent),
    DownloadContentFulfilled(DownloadContentFulfilled),
    DownloadContentFailed(DownloadContentFailed),
    /// Generic failure not tied to a specific operation (malformed intents).
    Error(ErrorPayload),
}

impl Action {
    /// Stable, screaming-snake name of the event, as used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::FetchContent(_) => "FETCH_CONTENT",
            Action::FetchContentFulfilled(_) => "FETCH_CONTENT_FULFILLED",
            Action::FetchContentFailed(_) => "FETCH_CONTENT_FAILED",
            Action::Save(_) => "SAVE",
            Action::SaveFulfilled(_) => "SAVE_FULFILLED",
            Action::SaveFailed(_) => "SAVE_FAILED",
            Action::DownloadContent(_) => "DOWNLOAD_CONTENT",
            Action::DownloadContentFulfilled(_) => "DOWNLOAD_CONTENT_FULFILLED",
            Action::DownloadContentFailed(_) => "DOWNLOAD_CONTENT_FAILED",
            Action::Error(_) => "ERROR",
        }
    }

    /// The document this event is about, when it names one.
    pub fn content_ref(&self) -> Option<&ContentRef> {
        match self {
            Action::FetchContent(a) => a.content_ref.as_ref(),
            Action::FetchContentFulfilled(a) => a.content_ref.as_ref(),
            Action::FetchContentFailed(a) => a.content_ref.as_ref(),
            Action::Save(a) => Some(&a.content_ref),
            Action::SaveFulfilled(a) => Some(&a.content_ref),
            Action::SaveFailed(a) => Some(&a.content_ref),
            Action::DownloadContent(a) => Some(&a.content_ref),
            Action::DownloadContentFulfilled(a) => Some(&a.content_ref),
            Action::DownloadContentFailed(a) => Some(&a.content_ref),
            Action::Error(_) => None,
        }
    }

    pub fn is_intent(&self) -> bool {
        matches!(
            self,
            Action::FetchContent(_) | Action::Save(_) | Action::DownloadContent(_)
        )
    }

    /// The failure carried by this event, if it is a failure.
    pub fn error(&self) -> Option<&ContentError> {
        match self {
            Action::FetchContentFailed(a) => Some(&a.error),
            Action::SaveFailed(a) => Some(&a.error),
            Action::DownloadContentFailed(a) => Some(&a.error),
            Action::Error(a) => Some(&a.error),
            _ => None,
        }
    }
}

/// Request to load `filepath` from the contents server.
///
/// Every field is optional on the wire; a missing or empty `filepath` is
/// answered with a generic [`Action::Error`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchContent {
    pub filepath: Option<String>,
    pub params: Option<FetchParams>,
    pub kernel_ref: Option<KernelRef>,
    pub content_ref: Option<ContentRef>,
}

impl FetchContent {
    pub fn new(filepath: impl Into<String>, content_ref: ContentRef) -> Self {
        Self {
            filepath: Some(filepath.into()),
            params: None,
            kernel_ref: None,
            content_ref: Some(content_ref),
        }
    }

    pub fn with_kernel(mut self, kernel_ref: KernelRef) -> Self {
        self.kernel_ref = Some(kernel_ref);
        self
    }

    pub fn with_params(mut self, params: FetchParams) -> Self {
        self.params = Some(params);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchContentFulfilled {
    pub filepath: String,
    /// Raw contents-API model as returned by the server.
    pub model: Value,
    pub kernel_ref: Option<KernelRef>,
    pub content_ref: Option<ContentRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchContentFailed {
    pub filepath: Option<String>,
    pub error: ContentError,
    pub kernel_ref: Option<KernelRef>,
    pub content_ref: Option<ContentRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Save {
    pub content_ref: ContentRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveFulfilled {
    pub content_ref: ContentRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveFailed {
    pub error: ContentError,
    pub content_ref: ContentRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadContent {
    pub content_ref: ContentRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadContentFulfilled {
    pub content_ref: ContentRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadContentFailed {
    pub error: ContentError,
    pub content_ref: ContentRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub error: ContentError,
}
