//! Ingestion boundary and corpus assembly.
//!
//! Scraped tables spell their columns differently per platform (`Name` vs
//! `name`, `URL` vs `link`, ...). Everything is mapped onto [`ProblemRecord`]
//! here, so the indexing core only ever sees one shape.

use crate::{CoreError, ProblemRecord, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// How many times a problem name is repeated ahead of its body text.
pub const TITLE_WEIGHT: usize = 4;

// Accepted spellings per canonical field, highest precedence first.
const NAME_KEYS: &[&str] = &["name", "Name", "title", "Title"];
const URL_KEYS: &[&str] = &["url", "URL", "Url", "link", "Link"];
const TAG_KEYS: &[&str] = &["tag", "Tag", "tags", "Tags"];
const DIFFICULTY_KEYS: &[&str] = &["difficulty", "Difficulty", "rating", "Rating"];
const TEXT_KEYS: &[&str] = &["text", "Text", "body", "statement", "Statement"];

/// One scraped row as it came in. Rows may carry several spellings of the
/// same column; [`normalize`] picks one per field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RawProblemRecord {
    fields: Map<String, Value>,
}

impl RawProblemRecord {
    /// First spelling in `keys` holding a non-blank value.
    fn field(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.fields.get(*k))
            .filter_map(loose_text)
            .find(|v| !v.trim().is_empty())
    }
}

/// Scrapers emit some columns as a string, a number or a list.
fn loose_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(loose_text).collect();
            Some(parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

/// Map a raw row onto the canonical shape. Rows without a name or url are rejected.
pub fn normalize(raw: RawProblemRecord) -> Option<ProblemRecord> {
    Some(ProblemRecord {
        name: raw.field(NAME_KEYS)?,
        url: raw.field(URL_KEYS)?,
        tag: raw.field(TAG_KEYS).unwrap_or_default(),
        difficulty: raw.field(DIFFICULTY_KEYS).unwrap_or_default(),
        text: raw.field(TEXT_KEYS).unwrap_or_default(),
    })
}

/// Trim fields, collapse whitespace in the body, drop rows missing a name or
/// url and later rows repeating an earlier url. Surviving order is input order.
pub fn clean_records(records: Vec<ProblemRecord>) -> Vec<ProblemRecord> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(records.len());
    for rec in records {
        let name = rec.name.trim().to_string();
        let url = rec.url.trim().to_string();
        if name.is_empty() || url.is_empty() {
            continue;
        }
        if !seen.insert(url.clone()) {
            tracing::debug!(%url, "dropping duplicate problem");
            continue;
        }
        out.push(ProblemRecord {
            name,
            url,
            tag: rec.tag.trim().to_string(),
            difficulty: rec.difficulty.trim().to_string(),
            text: rec.text.split_whitespace().collect::<Vec<_>>().join(" "),
        });
    }
    out
}

/// One weighted document per problem: the name repeated [`TITLE_WEIGHT`]
/// times, then the lowercased body.
pub fn build_corpus<S: AsRef<str>, T: AsRef<str>>(names: &[S], texts: &[T]) -> Result<Vec<String>> {
    if names.len() != texts.len() {
        return Err(CoreError::LengthMismatch { what: "names vs texts", left: names.len(), right: texts.len() });
    }
    Ok(names
        .iter()
        .zip(texts)
        .map(|(name, text)| {
            let title = vec![name.as_ref(); TITLE_WEIGHT].join(" ");
            format!("{} {}", title, text.as_ref().to_lowercase())
        })
        .collect())
}

/// Corpus for a cleaned problem table, row-aligned with it.
pub fn corpus_for(records: &[ProblemRecord]) -> Vec<String> {
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
    // equal lengths by construction
    build_corpus(&names, &texts).unwrap_or_default()
}

/// Read raw records from a `.json` (array or single object), a `.jsonl`
/// file, or a directory of those. Directory entries are visited in sorted
/// path order so row positions are reproducible.
pub fn read_records(input: &Path) -> Result<Vec<ProblemRecord>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        return Err(CoreError::Invalid(format!("input path {} does not exist", input.display())));
    }

    let mut raws = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut raws)?;
        } else {
            read_json(&file, &mut raws)?;
        }
    }
    let total = raws.len();
    let records: Vec<ProblemRecord> = raws.into_iter().filter_map(normalize).collect();
    if records.len() < total {
        tracing::warn!(rejected = total - records.len(), "rows without name or url were skipped");
    }
    Ok(records)
}

fn read_jsonl(file: &Path, out: &mut Vec<RawProblemRecord>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        out.push(serde_json::from_str(&line)?);
    }
    Ok(())
}

fn read_json(file: &Path, out: &mut Vec<RawProblemRecord>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: Value = serde_json::from_reader(reader)?;
    match json {
        Value::Array(arr) => {
            for v in arr {
                out.push(serde_json::from_value(v)?);
            }
        }
        Value::Object(_) => out.push(serde_json::from_value(json)?),
        _ => tracing::warn!(file = %file.display(), "ignoring json that is neither object nor array"),
    }
    Ok(())
}
