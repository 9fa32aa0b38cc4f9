//! Core types for sheet-relay

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Stage of a conversion run
///
/// A run moves through these stages strictly in order. Any failure ends the
/// run in the stage where it happened; there is no resumption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Checking the configured URLs
    Validating,
    /// Fetching the spreadsheet from the file URL
    Downloading,
    /// `POST {base}/upload`
    Uploading,
    /// `GET {base}/documents/{id}/sheets`
    ListingSheets,
    /// `GET {base}/documents/{id}/fields`
    ListingFields,
    /// `POST {base}/documents/{id}/parameters`
    SettingParameters,
    /// `GET {base}/documents/{id}/export`
    FetchingExport,
    /// Turning the exported payload into output items
    Emitting,
}

impl Stage {
    /// Short human-readable label used in logs and error messages
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Validating => "validate",
            Stage::Downloading => "download",
            Stage::Uploading => "upload",
            Stage::ListingSheets => "list sheets",
            Stage::ListingFields => "list fields",
            Stage::SettingParameters => "set parameters",
            Stage::FetchingExport => "fetch export",
            Stage::Emitting => "emit",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Service-side handle of an uploaded spreadsheet
///
/// The service may answer with a string or a number; both are kept as text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Create a new DocumentId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode an identifier from a JSON value
    ///
    /// Strings and numbers are accepted. `null`, empty strings and any other
    /// JSON type yield `None` so callers can try the next candidate field.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keys tried, in order, when a descriptor object names a sheet or column
pub const DESCRIPTOR_NAME_KEYS: [&str; 3] = ["name", "id", "title"];

/// Sheet or column descriptor as reported by the service
///
/// The service reports either bare names or objects carrying a name-like
/// field. Anything else is kept as-is and rendered with its JSON text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldDescriptor {
    /// Bare name
    Name(String),
    /// Object exposing a name-like field
    Object(serde_json::Map<String, Value>),
    /// Any other JSON value
    Other(Value),
}

/// Sheets and columns share the same descriptor shape
pub type SheetDescriptor = FieldDescriptor;

impl FieldDescriptor {
    /// Best-effort display name
    ///
    /// Bare names are returned verbatim. Objects are searched for
    /// [`DESCRIPTOR_NAME_KEYS`] in order; string and number values qualify.
    /// Everything else falls back to its compact JSON text.
    pub fn display_name(&self) -> String {
        match self {
            FieldDescriptor::Name(name) => name.clone(),
            FieldDescriptor::Object(map) => DESCRIPTOR_NAME_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(scalar_text)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
            FieldDescriptor::Other(value) => scalar_text(value).unwrap_or_else(|| value.to_string()),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl From<&str> for FieldDescriptor {
    fn from(name: &str) -> Self {
        FieldDescriptor::Name(name.to_string())
    }
}

impl From<String> for FieldDescriptor {
    fn from(name: String) -> Self {
        FieldDescriptor::Name(name)
    }
}

/// Export parameters sent to the service before fetching the export
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportSpec {
    /// Zero-based sheet index
    pub sheet_index: usize,
    /// Zero-based row holding the column names
    pub headers_row_index: u32,
    /// Column index (as string) to display name
    pub mapping: BTreeMap<String, String>,
    /// Column indexes to export, in export order
    pub export_indexes: Vec<usize>,
}

/// Wire body of `POST {base}/documents/{id}/parameters`
#[derive(Debug, Serialize)]
pub(crate) struct ParametersRequest<'a> {
    #[serde(rename = "sheetIndex")]
    pub sheet_index: usize,
    pub headers_index: u32,
    pub mapping: &'a BTreeMap<String, String>,
    pub export_fields: Vec<String>,
}

impl<'a> From<&'a ExportSpec> for ParametersRequest<'a> {
    fn from(spec: &'a ExportSpec) -> Self {
        Self {
            sheet_index: spec.sheet_index,
            headers_index: spec.headers_row_index,
            mapping: &spec.mapping,
            export_fields: spec.export_indexes.iter().map(|i| i.to_string()).collect(),
        }
    }
}

/// One exported row: display field name to value
pub type ExportedRecord = Value;

/// Payload returned by the export call
#[derive(Clone, Debug, PartialEq)]
pub enum ExportPayload {
    /// JSON array; each element becomes one output item
    Records(Vec<ExportedRecord>),
    /// Any non-array value; becomes exactly one output item
    Single(ExportedRecord),
}

impl ExportPayload {
    /// Classify a decoded export body
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(records) => ExportPayload::Records(records),
            other => ExportPayload::Single(other),
        }
    }

    /// Number of output items this payload produces
    pub fn len(&self) -> usize {
        match self {
            ExportPayload::Records(records) => records.len(),
            ExportPayload::Single(_) => 1,
        }
    }

    /// True when the payload is an empty array
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wrap every record into an output item, preserving order
    pub fn into_items(self) -> Vec<OutputItem> {
        match self {
            ExportPayload::Records(records) => records.into_iter().map(OutputItem::new).collect(),
            ExportPayload::Single(record) => vec![OutputItem::new(record)],
        }
    }
}

/// Output item handed to the host pipeline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OutputItem {
    /// The exported record, verbatim
    #[schema(value_type = Object)]
    pub json: ExportedRecord,
}

impl OutputItem {
    /// Wrap a record
    pub fn new(json: ExportedRecord) -> Self {
        Self { json }
    }
}
