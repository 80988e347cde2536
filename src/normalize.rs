//! Maps scraped entries to the canonical export schema.
//!
//! The export keys evolved across scraper generations, so the JSON path
//! accepts every historical spelling with first-non-empty fallback. Applying
//! the normalizer to already-normalized data is a no-op.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scrape::RawApplicant;

/// Canonical export record consumed by the enrichment subprocess and the
/// loader. All values are strings; type coercion is the loader's job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    #[serde(default)]
    pub program: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub date_added: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub term: String,
    #[serde(rename = "US/International", default)]
    pub us_or_international: String,
    #[serde(rename = "Degree", default)]
    pub degree: String,
    #[serde(default)]
    pub gpa: String,
    #[serde(default)]
    pub gre_q: String,
    #[serde(default)]
    pub gre_v: String,
    #[serde(default)]
    pub gre_aw: String,
}

pub fn clean_records(records: &[RawApplicant]) -> Vec<CleanRecord> {
    records.iter().map(clean_record).collect()
}

pub fn clean_record(raw: &RawApplicant) -> CleanRecord {
    CleanRecord {
        program: join_program(&raw.program_name, &raw.university),
        comments: raw.notes.clone(),
        date_added: raw.date_added.clone(),
        url: raw.applicant_url.clone(),
        status: raw.applicant_status.clone(),
        term: raw.semester.clone(),
        us_or_international: raw.student_location.clone(),
        degree: raw.degree_title.clone(),
        gpa: raw.gpa.clone(),
        gre_q: raw.gre_quant.clone(),
        gre_v: raw.gre_verbal.clone(),
        gre_aw: raw.gre_aw.clone(),
    }
}

/// Normalize a loose JSON record, whichever generation of the schema it
/// uses. A pre-composed `program` field wins over composing one.
pub fn clean_item(item: &Value) -> CleanRecord {
    let program = {
        let direct = first_non_empty(item, &["program"]);
        if direct.is_empty() {
            join_program(
                &first_non_empty(item, &["program_name"]),
                &first_non_empty(item, &["university"]),
            )
        } else {
            direct
        }
    };
    CleanRecord {
        program,
        comments: first_non_empty(item, &["comments", "notes"]),
        date_added: first_non_empty(item, &["date_added"]),
        url: first_non_empty(item, &["url", "applicant_URL", "applicant_url"]),
        status: first_non_empty(item, &["status", "applicant_status"]),
        term: first_non_empty(item, &["term", "semester"]),
        us_or_international: first_non_empty(
            item,
            &["US/International", "us_or_international", "student_location"],
        ),
        degree: first_non_empty(item, &["Degree", "degree", "degree_title"]),
        gpa: first_non_empty(item, &["gpa", "GPA"]),
        gre_q: first_non_empty(item, &["gre_q", "gre_quant", "GRE"]),
        gre_v: first_non_empty(item, &["gre_v", "gre_verbal", "GRE V"]),
        gre_aw: first_non_empty(item, &["gre_aw", "gre_awriting", "gre_aw_score", "GRE AW"]),
    }
}

fn join_program(program_name: &str, university: &str) -> String {
    let (p, u) = (program_name.trim(), university.trim());
    match (p.is_empty(), u.is_empty()) {
        (false, false) => format!("{p}, {u}"),
        (false, true) => p.to_string(),
        _ => u.to_string(),
    }
}

fn first_non_empty(item: &Value, keys: &[&str]) -> String {
    for key in keys {
        match item.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return s.trim().to_string(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    String::new()
}
