use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::Connection;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS applicants (
            p_id                     INTEGER PRIMARY KEY,
            program                  TEXT,
            comments                 TEXT,
            date_added               DATE,
            url                      TEXT UNIQUE,
            status                   TEXT,
            term                     TEXT,
            us_or_international      TEXT,
            gpa                      REAL,
            gre_q                    REAL,
            gre_v                    REAL,
            gre_aw                   REAL,
            degree                   TEXT,
            llm_generated_program    TEXT,
            llm_generated_university TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_applicants_term ON applicants(term);
        CREATE INDEX IF NOT EXISTS idx_applicants_status ON applicants(status);
        ",
    )?;
    Ok(())
}

/// Backs the scrape driver's incremental-stop predicate.
pub fn url_exists(conn: &Connection, url: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM applicants WHERE url = ?1 LIMIT 1")?;
    Ok(stmt.exists(rusqlite::params![url])?)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicantRow {
    pub p_id: i64,
    pub program: Option<String>,
    pub comments: Option<String>,
    pub date_added: Option<NaiveDate>,
    pub url: Option<String>,
    pub status: Option<String>,
    pub term: Option<String>,
    pub us_or_international: Option<String>,
    pub gpa: Option<f64>,
    pub gre_q: Option<f64>,
    pub gre_v: Option<f64>,
    pub gre_aw: Option<f64>,
    pub degree: Option<String>,
    pub llm_generated_program: Option<String>,
    pub llm_generated_university: Option<String>,
}

/// Insert rows in one transaction, ignoring conflicts on the stable id or
/// url so re-loading an export file is idempotent. Returns how many rows
/// were actually inserted.
pub fn insert_applicants(conn: &Connection, rows: &[ApplicantRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO applicants
             (p_id, program, comments, date_added, url, status, term,
              us_or_international, gpa, gre_q, gre_v, gre_aw, degree,
              llm_generated_program, llm_generated_university)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)",
        )?;
        for r in rows {
            inserted += stmt.execute(rusqlite::params![
                r.p_id,
                r.program,
                r.comments,
                r.date_added,
                r.url,
                r.status,
                r.term,
                r.us_or_international,
                r.gpa,
                r.gre_q,
                r.gre_v,
                r.gre_aw,
                r.degree,
                r.llm_generated_program,
                r.llm_generated_university,
            ])?;
        }
    }
    tx.commit()?;
    Ok(inserted)
}

pub struct StoreStats {
    pub total: usize,
    pub enriched: usize,
    pub latest_date_added: Option<NaiveDate>,
}

pub fn stats(conn: &Connection) -> Result<StoreStats> {
    let total: usize = conn.query_row("SELECT COUNT(*) FROM applicants", [], |r| r.get(0))?;
    let enriched: usize = conn.query_row(
        "SELECT COUNT(*) FROM applicants
         WHERE llm_generated_university IS NOT NULL OR llm_generated_program IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let latest_date_added: Option<NaiveDate> =
        conn.query_row("SELECT MAX(date_added) FROM applicants", [], |r| r.get(0))?;
    Ok(StoreStats {
        total,
        enriched,
        latest_date_added,
    })
}

#[cfg(test)]
pub fn connect_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(p_id: i64, url: &str) -> ApplicantRow {
        ApplicantRow {
            p_id,
            program: Some("Computer Science, CMU".into()),
            url: (!url.is_empty()).then(|| url.to_string()),
            term: Some("Fall 2025".into()),
            ..ApplicantRow::default()
        }
    }

    #[test]
    fn insert_then_lookup_url() {
        let conn = connect_in_memory().unwrap();
        let n = insert_applicants(&conn, &[row(1, "/result/1")]).unwrap();
        assert_eq!(n, 1);
        assert!(url_exists(&conn, "/result/1").unwrap());
        assert!(!url_exists(&conn, "/result/2").unwrap());
    }

    #[test]
    fn reinsert_is_ignored() {
        let conn = connect_in_memory().unwrap();
        insert_applicants(&conn, &[row(1, "/result/1")]).unwrap();
        let n = insert_applicants(&conn, &[row(1, "/result/1"), row(2, "/result/2")]).unwrap();
        assert_eq!(n, 1);
        let s = stats(&conn).unwrap();
        assert_eq!(s.total, 2);
    }

    #[test]
    fn rows_without_url_can_coexist() {
        let conn = connect_in_memory().unwrap();
        let n = insert_applicants(&conn, &[row(1, ""), row(2, "")]).unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn stats_track_dates_and_enrichment() {
        let conn = connect_in_memory().unwrap();
        let mut a = row(1, "/result/1");
        a.date_added = NaiveDate::from_ymd_opt(2025, 2, 5);
        let mut b = row(2, "/result/2");
        b.date_added = NaiveDate::from_ymd_opt(2025, 2, 7);
        b.llm_generated_university = Some("Johns Hopkins University".into());
        insert_applicants(&conn, &[a, b]).unwrap();
        let s = stats(&conn).unwrap();
        assert_eq!(s.total, 2);
        assert_eq!(s.enriched, 1);
        assert_eq!(s.latest_date_added, NaiveDate::from_ymd_opt(2025, 2, 7));
    }

    #[test]
    fn file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/applicants.sqlite");
        {
            let conn = connect(&path).unwrap();
            init_schema(&conn).unwrap();
            insert_applicants(&conn, &[row(1, "/result/1")]).unwrap();
        }
        let conn = connect(&path).unwrap();
        init_schema(&conn).unwrap();
        assert!(url_exists(&conn, "/result/1").unwrap());
    }
}
