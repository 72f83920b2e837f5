//! Record exporters for scraped results.
//!
//! A record is a JSON object. [`JsonExporter`] writes the records as they
//! are; [`CsvExporter`] flattens them into a table whose header is the
//! sorted union of every record's keys.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// One exported row.
pub type Record = Map<String, Value>;

/// Writes a collection of records to a destination file.
pub trait Exporter {
    /// Exports `records` to `path` and returns the written path.
    fn export(&self, records: &[Record], path: &Path) -> Result<PathBuf>;
}

/// Exports records as a pretty-printed JSON array.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn export(&self, records: &[Record], path: &Path) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(records)?;
        std::fs::write(path, json).map_err(|e| Error::filesystem(path, e))?;
        tracing::debug!(path = ?path, records = records.len(), "exported JSON");
        Ok(path.to_path_buf())
    }
}

/// Exports records as CSV with a header row.
///
/// Keys missing from a record become empty fields. Strings are written
/// verbatim, `null` as an empty field and any other value as its JSON text.
/// An empty collection produces an empty file.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl CsvExporter {
    /// Returns the sorted union of keys across all records.
    pub fn header(records: &[Record]) -> Vec<String> {
        let keys: BTreeSet<&String> = records.iter().flat_map(|r| r.keys()).collect();
        keys.into_iter().cloned().collect()
    }

    /// Renders records to CSV text.
    pub fn render(records: &[Record]) -> String {
        if records.is_empty() {
            return String::new();
        }

        let header = Self::header(records);
        let mut out = String::new();
        push_row(&mut out, header.iter().map(|k| Cow::Borrowed(k.as_str())));

        for record in records {
            push_row(
                &mut out,
                header.iter().map(|key| match record.get(key) {
                    None | Some(Value::Null) => Cow::Borrowed(""),
                    Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
                    Some(other) => Cow::Owned(other.to_string()),
                }),
            );
        }

        out
    }
}

impl Exporter for CsvExporter {
    fn export(&self, records: &[Record], path: &Path) -> Result<PathBuf> {
        std::fs::write(path, Self::render(records)).map_err(|e| Error::filesystem(path, e))?;
        tracing::debug!(path = ?path, records = records.len(), "exported CSV");
        Ok(path.to_path_buf())
    }
}

fn push_row<'a, I>(out: &mut String, fields: I)
where
    I: Iterator<Item = Cow<'a, str>>,
{
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, &field);
    }
    out.push_str("\r\n");
}

fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    Json,
    #[default]
    Csv,
}

impl ExportFormat {
    /// Returns the exporter for this format.
    pub fn exporter(&self) -> Box<dyn Exporter> {
        match self {
            ExportFormat::Json => Box::new(JsonExporter),
            ExportFormat::Csv => Box::new(CsvExporter),
        }
    }

    /// File extension written by this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(Error::Export(format!("unknown format '{}'", other))),
        }
    }
}

/// Reads a JSON file holding either one object or an array of objects.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::filesystem(path, e))?;
    let value: Value = serde_json::from_str(&content)?;

    match value {
        Value::Object(record) => Ok(vec![record]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(record) => Ok(record),
                _ => Err(Error::Export(format!(
                    "{}: element {} is not an object",
                    path.display(),
                    i
                ))),
            })
            .collect(),
        _ => Err(Error::Export(format!(
            "{}: expected an object or an array of objects",
            path.display()
        ))),
    }
}

/// Resolves an export input path.
///
/// A path that exists as given is used directly; otherwise it is looked up
/// relative to the persistent data directory.
pub fn resolve_input(input: &Path, data_dir: &Path) -> PathBuf {
    if input.exists() || input.is_absolute() {
        return input.to_path_buf();
    }
    let candidate = data_dir.join(input);
    if candidate.exists() {
        candidate
    } else {
        input.to_path_buf()
    }
}

/// Default destination: the input path with the format's extension.
///
/// Never returns `input` itself; a clash becomes `<stem>_export.<ext>`.
pub fn default_output(input: &Path, format: ExportFormat) -> PathBuf {
    let output = input.with_extension(format.extension());
    if output != input {
        return output;
    }

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}_export.{}", stem, format.extension()))
}
