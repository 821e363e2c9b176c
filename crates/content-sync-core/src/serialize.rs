//! Content record → wire payloads.
//!
//! Saving and downloading share one serialization step, branched on the
//! record's model kind:
//!
//! | Kind | Save model | Download payload |
//! |------|------------|------------------|
//! | notebook | `{content: <nbformat JSON>, type: "notebook"}` | stringified notebook, `application/json` |
//! | file | `{content: <text>, type: "file", format: "text"}` | raw text, record mimetype |
//! | unset | nothing is sent | nothing is written |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ContentError;
use crate::models::{ContentModel, ContentRecord};
use crate::notebook::{serialize_notebook, stringify_notebook};

/// Filename used when downloading a notebook that was never saved.
pub const DEFAULT_NOTEBOOK_FILENAME: &str = "notebook.ipynb";

/// Content type label for notebook downloads.
pub const NOTEBOOK_CONTENT_TYPE: &str = "application/json";

/// Content type label for file downloads without a known mimetype.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Body of a contents-API save request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveModel {
    pub content: Value,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// A record's content in its serialized form.
#[derive(Debug, Clone, PartialEq)]
pub enum Serialized {
    /// nbformat JSON with the app version stamped into its metadata.
    Notebook(Value),
    File(String),
}

/// Everything the local materializer needs for one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPayload {
    pub contents: String,
    pub filename: String,
    pub content_type: String,
}

/// Serialize a model for saving or downloading.
///
/// Returns `Ok(None)` for [`ContentModel::Unset`]: there is nothing to write.
pub fn serialize_content(
    model: &ContentModel,
    app_version: &str,
) -> Result<Option<Serialized>, ContentError> {
    match model {
        ContentModel::Notebook { notebook } => Ok(Some(Serialized::Notebook(
            serialize_notebook(notebook, app_version)?,
        ))),
        ContentModel::File { text } => Ok(Some(Serialized::File(text.clone()))),
        ContentModel::Unset => Ok(None),
    }
}

impl Serialized {
    pub fn save_model(&self) -> SaveModel {
        match self {
            Serialized::Notebook(wire) => SaveModel {
                content: wire.clone(),
                kind: "notebook".to_string(),
                format: None,
            },
            Serialized::File(text) => SaveModel {
                content: Value::String(text.clone()),
                kind: "file".to_string(),
                format: Some("text".to_string()),
            },
        }
    }

    /// Build the download payload for `record`.
    ///
    /// Notebooks fall back to [`DEFAULT_NOTEBOOK_FILENAME`]; plain files must
    /// carry their own filepath.
    pub fn download_payload(&self, record: &ContentRecord) -> Result<DownloadPayload, ContentError> {
        match self {
            Serialized::Notebook(wire) => {
                let filename = if record.filepath.is_empty() {
                    DEFAULT_NOTEBOOK_FILENAME.to_string()
                } else {
                    record.filepath.clone()
                };
                Ok(DownloadPayload {
                    contents: stringify_notebook(wire)?,
                    filename,
                    content_type: NOTEBOOK_CONTENT_TYPE.to_string(),
                })
            }
            Serialized::File(text) => {
                if record.filepath.is_empty() {
                    return Err(ContentError::MissingFilepath);
                }
                Ok(DownloadPayload {
                    contents: text.clone(),
                    filename: record.filepath.clone(),
                    content_type: record
                        .mimetype
                        .clone()
                        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notebook::{parse_notebook, Cell, Notebook};
    use serde_json::json;

    #[test]
    fn test_file_save_model() {
        let record = ContentRecord::file("/b.txt", None, "hi");
        let serialized = serialize_content(&record.model, "1.0.0").unwrap().unwrap();
        let model = serialized.save_model();
        assert_eq!(
            serde_json::to_value(&model).unwrap(),
            json!({"content": "hi", "type": "file", "format": "text"})
        );
    }

    #[test]
    fn test_notebook_save_model_is_stamped() {
        let mut nb = Notebook::new();
        nb.cells.push(Cell::code("1 + 1"));
        let record = ContentRecord::notebook("/a.ipynb", nb);

        let serialized = serialize_content(&record.model, "0.9.1").unwrap().unwrap();
        let model = serialized.save_model();
        assert_eq!(model.kind, "notebook");
        assert_eq!(model.format, None);
        assert_eq!(model.content["metadata"]["nteract"]["version"], json!("0.9.1"));
        assert_eq!(model.content["cells"][0]["source"], json!(["1 + 1"]));

        let wire = serde_json::to_value(&model).unwrap();
        assert!(wire.get("format").is_none());
    }

    #[test]
    fn test_unset_serializes_to_nothing() {
        let record = ContentRecord::unset("/x");
        assert_eq!(serialize_content(&record.model, "1.0.0").unwrap(), None);
    }

    #[test]
    fn test_notebook_download_defaults_filename() {
        let record = ContentRecord::notebook("", Notebook::new());
        let serialized = serialize_content(&record.model, "1.0.0").unwrap().unwrap();
        let payload = serialized.download_payload(&record).unwrap();

        assert_eq!(payload.filename, "notebook.ipynb");
        assert_eq!(payload.content_type, "application/json");
        let parsed = parse_notebook(&payload.contents).unwrap();
        assert_eq!(parsed.app_version(), Some("1.0.0"));
    }

    #[test]
    fn test_file_download_uses_mimetype_or_fallback() {
        let typed = ContentRecord::file("dir/notes.md", Some("text/markdown".into()), "# hi");
        let serialized = serialize_content(&typed.model, "1.0.0").unwrap().unwrap();
        let payload = serialized.download_payload(&typed).unwrap();
        assert_eq!(payload.contents, "# hi");
        assert_eq!(payload.filename, "dir/notes.md");
        assert_eq!(payload.content_type, "text/markdown");

        let untyped = ContentRecord::file("blob", None, "bytes");
        let serialized = serialize_content(&untyped.model, "1.0.0").unwrap().unwrap();
        let payload = serialized.download_payload(&untyped).unwrap();
        assert_eq!(payload.content_type, "application/octet-stream");
    }

    #[test]
    fn test_file_download_requires_filepath() {
        let record = ContentRecord::file("", None, "x");
        let serialized = serialize_content(&record.model, "1.0.0").unwrap().unwrap();
        assert_eq!(
            serialized.download_payload(&record).unwrap_err(),
            ContentError::MissingFilepath
        );
    }
}
