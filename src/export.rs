//! Export-file I/O.
//!
//! Records are written one JSON object per line so the enrichment
//! subprocess can stream them. Reading is deliberately tolerant: earlier
//! pipeline generations wrote a plain JSON array, and the enrichment output
//! sometimes arrives wrapped in an `items` object.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::normalize::CleanRecord;

pub fn save_records(path: &Path, records: &[CleanRecord]) -> Result<()> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, out)
        .with_context(|| format!("failed to write export file {}", path.display()))?;
    info!(count = records.len(), path = %path.display(), "saved export file");
    Ok(())
}

/// Read records from a JSON array, an `{"items": [...]}` wrapper, or
/// JSON-lines. An empty file is an empty list, not an error.
pub fn read_items(path: &Path) -> Result<Vec<Value>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = raw.trim_start_matches('\u{feff}').trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return Ok(match value {
            Value::Object(mut map) if map.contains_key("items") => match map.remove("items") {
                Some(Value::Array(items)) => items,
                Some(other) => vec![other],
                None => Vec::new(),
            },
            Value::Array(items) => items,
            other => vec![other],
        });
    }

    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str::<Value>(line).with_context(|| format!("bad JSON line: {line}"))
        })
        .collect()
}
