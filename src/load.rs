//! Loads an export file (raw or LLM-enriched) into the store.
//!
//! This is where string values finally become typed: dates are parsed,
//! GPA/GRE scores are validated against their scales, and each record gets
//! a stable integer id derived from its result URL.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use chrono::NaiveDate;
use regex::Regex;
use rusqlite::Connection;
use serde_json::Value;
use tracing::info;

use crate::db::{self, ApplicantRow};
use crate::export;

const MISSING_VALUES: &[&str] = &["", "NA", "N/A", "null"];

static ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)(?:st|nd|rd|th)\b").unwrap());
static SEPT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bSept\.?\b").unwrap());
static PUNCT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.,]").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Parse the site's many date renderings. Slash forms are tried verbatim;
/// worded and hyphenated forms are normalized first (ordinals dropped,
/// `Sept` mapped to `Sep`, punctuation stripped). A bare month + year means
/// the first of that month. ISO `YYYY-MM-DD` is accepted (see DESIGN.md).
/// Anything else is `None`, never an error.
pub fn to_date(s: &str) -> Option<NaiveDate> {
    let raw = s.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.contains('/') {
        for fmt in ["%m/%d/%Y", "%m/%d/%y"] {
            if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
                return Some(date);
            }
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }

    let t = ORDINAL.replace_all(raw, "$1");
    let t = SEPT.replace_all(&t, "Sep");
    let t = t.replace('-', " ");
    let t = PUNCT.replace_all(&t, " ");
    let t = SPACES.replace_all(t.trim(), " ").to_string();

    // %B parses both full and abbreviated month names
    for fmt in ["%B %d %Y", "%d %B %Y", "%B %d %y", "%d %B %y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&t, fmt) {
            return Some(date);
        }
    }

    // month + year only, e.g. "September 2025"
    NaiveDate::parse_from_str(&format!("1 {t}"), "%d %B %Y").ok()
}

fn to_float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let t = s.trim();
            if MISSING_VALUES.contains(&t) {
                None
            } else {
                t.parse().ok()
            }
        }
        _ => None,
    }
}

/// GPA on the 4.0 scale; anything outside it would skew the averages.
pub fn clean_gpa(value: Option<&Value>) -> Option<f64> {
    to_float(value).filter(|g| (0.0..=4.0).contains(g))
}

#[derive(Debug, Clone, Copy)]
pub enum GreSection {
    /// Quantitative or verbal, scored 130–170.
    Scored,
    /// Analytical writing, scored 0–6.
    Writing,
}

pub fn clean_gre(value: Option<&Value>, section: GreSection) -> Option<f64> {
    to_float(value).filter(|score| match section {
        GreSection::Scored => (130.0..=170.0).contains(score),
        GreSection::Writing => (0.0..=6.0).contains(score),
    })
}

/// Map one export item to a typed row. `index` is the 1-based position in
/// the file, used as the id of last resort.
pub fn row_from_item(item: &Value, index: usize) -> ApplicantRow {
    let url = get_str(item, &["url", "applicant_URL", "applicant_url"]);
    ApplicantRow {
        p_id: stable_id(item, url.as_deref(), index),
        program: get_str(item, &["program"]),
        comments: get_str(item, &["comments", "notes"]),
        date_added: get_str(item, &["date_added"]).and_then(|s| to_date(&s)),
        url,
        status: get_str(item, &["status", "applicant_status"]),
        term: get_str(item, &["term", "semester"]),
        us_or_international: get_str(
            item,
            &["US/International", "us_or_international", "student_location"],
        ),
        gpa: clean_gpa(get_value(item, &["gpa", "GPA"])),
        gre_q: clean_gre(get_value(item, &["gre_q", "gre_quant", "GRE"]), GreSection::Scored),
        gre_v: clean_gre(
            get_value(item, &["gre_v", "gre_verbal", "GRE V"]),
            GreSection::Scored,
        ),
        gre_aw: clean_gre(
            get_value(item, &["gre_aw", "gre_awriting", "gre_aw_score", "GRE AW"]),
            GreSection::Writing,
        ),
        degree: get_str(item, &["degree", "Degree", "degree_title"]),
        llm_generated_program: get_str(item, &["llm_generated_program", "llm-generated-program"]),
        llm_generated_university: get_str(
            item,
            &["llm_generated_university", "llm-generated-university"],
        ),
    }
}

pub fn load_file(conn: &Connection, path: &Path) -> Result<usize> {
    let items = export::read_items(path)?;
    let rows: Vec<ApplicantRow> = items
        .iter()
        .enumerate()
        .map(|(i, item)| row_from_item(item, i + 1))
        .collect();
    let inserted = db::insert_applicants(conn, &rows)?;
    info!(total = rows.len(), inserted, path = %path.display(), "loaded export file");
    Ok(inserted)
}

/// The trailing path segment of a result URL is the site's own record id,
/// which makes re-loads line up with earlier ones.
fn stable_id(item: &Value, url: Option<&str>, index: usize) -> i64 {
    if let Some(url) = url {
        if let Some(segment) = url.trim_end_matches('/').rsplit('/').next() {
            if let Ok(id) = segment.parse::<i64>() {
                return id;
            }
        }
    }
    match item.get("p_id") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(index as i64),
        Some(Value::String(s)) => s.parse().unwrap_or(index as i64),
        _ => index as i64,
    }
}

fn get_str(item: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(Value::String(s)) = item.get(key) {
            let t = s.trim();
            if !t.is_empty() {
                return Some(t.to_string());
            }
        }
    }
    None
}

fn get_value<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| {
        item.get(key).filter(|v| match v {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
    })
}
