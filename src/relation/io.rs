//! CSV and JSON persistence for relations.
//!
//! Both formats store every value as text and reload through per-column casting, so
//! a saved relation compares equal to the one it was saved from.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Header, Relation};
use crate::error::{RelalgError, Result};

/// On-disk relation formats, chosen by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// Header row followed by RFC 4180 rows.
    Csv,
    /// `{"header": [...], "content": [[...], ...]}`.
    Json,
}

impl Format {
    /// Picks the format from the extension of `path` (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Format> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Format::Csv),
            Some("json") => Ok(Format::Json),
            _ => Err(RelalgError::Unsupported(format!(
                "unknown relation file format: {}",
                path.display()
            ))),
        }
    }
}

#[derive(Deserialize)]
struct JsonInput {
    header: Vec<String>,
    content: Vec<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    header: &'a [String],
    content: Vec<Vec<String>>,
}

impl Relation {
    /// Loads a relation from a `.csv` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Relation> {
        let path = path.as_ref();
        let relation = match Format::from_path(path)? {
            Format::Csv => Relation::read_csv(fs::File::open(path)?)?,
            Format::Json => Relation::from_json(&fs::read_to_string(path)?)?,
        };
        debug!(path = %path.display(), rows = relation.len(), header = %relation.header(), "loaded relation");
        Ok(relation)
    }

    /// Saves the relation to a `.csv` or `.json` file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match Format::from_path(path)? {
            Format::Csv => self.write_csv(fs::File::create(path)?)?,
            Format::Json => fs::write(path, self.to_json()?)?,
        }
        debug!(path = %path.display(), rows = self.len(), "saved relation");
        Ok(())
    }

    /// Reads CSV text: the first record is the header.
    pub fn read_csv<R: Read>(reader: R) -> Result<Relation> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let header = Header::new(reader.headers()?.iter().map(str::trim))?;
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_owned).collect::<Vec<_>>());
        }
        Relation::from_raw(header, &rows)
    }

    /// Writes the relation as CSV, header first.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = WriterBuilder::new().from_writer(writer);
        writer.write_record(self.header().attributes())?;
        for row in self.iter() {
            writer.write_record(row.iter().map(ToString::to_string))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Parses the JSON document form. Non-string cells are read through their JSON text.
    pub fn from_json(text: &str) -> Result<Relation> {
        let input: JsonInput = serde_json::from_str(text)?;
        let header = Header::new(input.header)?;
        let rows: Vec<Vec<String>> = input
            .content
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect();
        Relation::from_raw(header, &rows)
    }

    /// Renders the JSON document form with every value as text.
    pub fn to_json(&self) -> Result<String> {
        let output = JsonOutput {
            header: self.header().attributes(),
            content: self
                .iter()
                .map(|row| row.iter().map(ToString::to_string).collect())
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&output)?)
    }
}
