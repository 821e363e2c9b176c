//! Notebook documents and their nbformat v4 wire form.
//!
//! On the wire, cell sources, stream text and non-JSON mime bundle entries
//! may be either a single string or an array of lines. In memory they are
//! always a single string; serialization splits them back into line arrays,
//! each line keeping its trailing `\n`.
//!
//! # Pipeline
//!
//! ```text
//! Notebook ──serialize_notebook(version)──▶ wire Value ──stringify_notebook──▶ text
//!    ▲                                                                          │
//!    └────────────────────────────── parse_notebook ◀───────────────────────────┘
//! ```

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ContentError;

/// Lowest major nbformat version this crate reads.
pub const MIN_NBFORMAT: u32 = 4;

/// An nbformat v4 notebook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub cells: Vec<Cell>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub nbformat: u32,
    pub nbformat_minor: u32,
    /// Top-level keys not modelled above, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Notebook {
    /// An empty v4.5 notebook.
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            metadata: Map::new(),
            nbformat: 4,
            nbformat_minor: 5,
            extra: Map::new(),
        }
    }

    /// The version stamped under `metadata.nteract.version`, if any.
    pub fn app_version(&self) -> Option<&str> {
        self.metadata
            .get("nteract")
            .and_then(|n| n.get("version"))
            .and_then(|v| v.as_str())
    }

    /// Write `version` under `metadata.nteract.version`, keeping sibling keys.
    pub fn stamp_version(&mut self, version: &str) {
        let nteract = self
            .metadata
            .entry("nteract")
            .or_insert_with(|| Value::Object(Map::new()));
        if !nteract.is_object() {
            *nteract = Value::Object(Map::new());
        }
        if let Value::Object(map) = nteract {
            map.insert("version".to_string(), Value::String(version.to_string()));
        }
    }
}

impl Default for Notebook {
    fn default() -> Self {
        Self::new()
    }
}

/// A single notebook cell, tagged by `cell_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
pub enum Cell {
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(with = "multiline")]
        source: String,
        #[serde(default)]
        metadata: Map<String, Value>,
        #[serde(default)]
        execution_count: Option<u64>,
        #[serde(default)]
        outputs: Vec<Output>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Markdown {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(with = "multiline")]
        source: String,
        #[serde(default)]
        metadata: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attachments: Option<Value>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Raw {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(with = "multiline")]
        source: String,
        #[serde(default)]
        metadata: Map<String, Value>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl Cell {
    pub fn source(&self) -> &str {
        match self {
            Cell::Code { source, .. } | Cell::Markdown { source, .. } | Cell::Raw { source, .. } => {
                source
            }
        }
    }

    pub fn code(source: impl Into<String>) -> Self {
        Cell::Code {
            id: None,
            source: source.into(),
            metadata: Map::new(),
            execution_count: None,
            outputs: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn markdown(source: impl Into<String>) -> Self {
        Cell::Markdown {
            id: None,
            source: source.into(),
            metadata: Map::new(),
            attachments: None,
            extra: Map::new(),
        }
    }
}

/// A code cell output.
///
/// Outputs are kept as JSON; only their multi-line text fields are
/// normalized (stream `text`, and the non-JSON entries of a `data` bundle).
#[derive(Debug, Clone, PartialEq)]
pub struct Output(Value);

impl Output {
    pub fn new(value: Value) -> Self {
        let mut value = value;
        visit_multiline_fields(&mut value, |v| {
            if let Some(joined) = join_lines(v) {
                *v = Value::String(joined);
            }
        });
        Output(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl Serialize for Output {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut wire = self.0.clone();
        visit_multiline_fields(&mut wire, |v| {
            if let Value::String(s) = v {
                *v = Value::Array(split_lines(s).into_iter().map(Value::String).collect());
            }
        });
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Output {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Output::new)
    }
}

fn visit_multiline_fields(output: &mut Value, mut f: impl FnMut(&mut Value)) {
    let Some(obj) = output.as_object_mut() else {
        return;
    };
    let is_stream = obj.get("output_type").and_then(|t| t.as_str()) == Some("stream");
    if is_stream {
        if let Some(text) = obj.get_mut("text") {
            f(text);
        }
    }
    if let Some(Value::Object(bundle)) = obj.get_mut("data") {
        for (mime, entry) in bundle.iter_mut() {
            if !mime.ends_with("json") {
                f(entry);
            }
        }
    }
}

/// Join a wire multi-line value (string or array of strings).
fn join_lines(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => parts
            .iter()
            .map(|p| p.as_str())
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.concat()),
        _ => None,
    }
}

/// Split text into lines, each keeping its trailing newline.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}

mod multiline {
    use serde::de::{Deserializer, Error};
    use serde::ser::Serializer;
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(source: &str, serializer: S) -> Result<S::Ok, S::Error> {
        super::split_lines(source).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let value = Value::deserialize(deserializer)?;
        super::join_lines(&value)
            .ok_or_else(|| D::Error::custom("expected a string or an array of strings"))
    }
}

/// Read a notebook from its wire JSON value.
pub fn from_wire(value: Value) -> Result<Notebook, ContentError> {
    let notebook: Notebook =
        serde_json::from_value(value).map_err(|e| ContentError::InvalidNotebook {
            message: e.to_string(),
        })?;
    if notebook.nbformat < MIN_NBFORMAT {
        return Err(ContentError::InvalidNotebook {
            message: format!(
                "nbformat {} is not supported (need >= {})",
                notebook.nbformat, MIN_NBFORMAT
            ),
        });
    }
    Ok(notebook)
}

/// Parse notebook text (the form written to disk or downloaded).
pub fn parse_notebook(text: &str) -> Result<Notebook, ContentError> {
    let value: Value = serde_json::from_str(text).map_err(|e| ContentError::InvalidNotebook {
        message: e.to_string(),
    })?;
    from_wire(value)
}

/// Produce the wire form of `notebook` with `version` stamped into its
/// metadata. The input document is left untouched.
pub fn serialize_notebook(notebook: &Notebook, version: &str) -> Result<Value, ContentError> {
    let mut stamped = notebook.clone();
    stamped.stamp_version(version);
    serde_json::to_value(&stamped).map_err(|e| ContentError::InvalidNotebook {
        message: e.to_string(),
    })
}

/// Canonical text form of a wire notebook: 1-space indent, trailing newline.
pub fn stringify_notebook(wire: &Value) -> Result<String, ContentError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    wire.serialize(&mut ser)
        .map_err(|e| ContentError::InvalidNotebook {
            message: e.to_string(),
        })?;
    let mut text = String::from_utf8(buf).map_err(|e| ContentError::InvalidNotebook {
        message: e.to_string(),
    })?;
    text.push('\n');
    Ok(text)
}
