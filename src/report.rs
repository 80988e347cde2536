//! Aggregate statistics over the stored applicants.
//!
//! These are the questions the dashboard renders; here they print as a
//! plain CLI report. SQLite's `LIKE` is case-insensitive for ASCII, which
//! is all the substring matching below needs.

use anyhow::Result;
use rusqlite::{params, Connection};

const TERM_FALL_2025: &str = "%fall 2025%";
const STATUS_ACCEPTED: &str = "%accept%";

#[derive(Debug)]
pub struct Report {
    pub total: i64,
    pub fall_2025: i64,
    pub pct_international: Option<f64>,
    pub avg_gpa: Option<f64>,
    pub avg_gre_q: Option<f64>,
    pub avg_gre_v: Option<f64>,
    pub avg_gre_aw: Option<f64>,
    pub avg_gpa_american_fall_2025: Option<f64>,
    pub pct_accepted_fall_2025: Option<f64>,
    pub avg_gpa_accepted_fall_2025: Option<f64>,
    pub jhu_cs_masters: i64,
    pub georgetown_cs_phd_2025: i64,
    pub degree_counts: Vec<(String, i64)>,
    pub top_universities: Vec<(String, i64)>,
}

pub fn build(conn: &Connection) -> Result<Report> {
    let total = conn.query_row("SELECT COUNT(*) FROM applicants", [], |r| r.get(0))?;

    let fall_2025 = conn.query_row(
        "SELECT COUNT(*) FROM applicants WHERE term LIKE ?1",
        params![TERM_FALL_2025],
        |r| r.get(0),
    )?;

    let pct_international = conn.query_row(
        "SELECT ROUND(
            100.0 * SUM(CASE WHEN us_or_international LIKE '%internat%' THEN 1 ELSE 0 END)
            / NULLIF(COUNT(*), 0), 2)
         FROM applicants",
        [],
        |r| r.get(0),
    )?;

    let (avg_gpa, avg_gre_q, avg_gre_v, avg_gre_aw) = conn.query_row(
        "SELECT ROUND(AVG(gpa), 3), ROUND(AVG(gre_q), 3),
                ROUND(AVG(gre_v), 3), ROUND(AVG(gre_aw), 3)
         FROM applicants",
        [],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
    )?;

    let avg_gpa_american_fall_2025 = conn.query_row(
        "SELECT ROUND(AVG(gpa), 3) FROM applicants
         WHERE term LIKE ?1 AND us_or_international LIKE '%american%'",
        params![TERM_FALL_2025],
        |r| r.get(0),
    )?;

    let pct_accepted_fall_2025 = conn.query_row(
        "SELECT ROUND(100.0 * AVG(CASE WHEN status LIKE ?1 THEN 1 ELSE 0 END), 2)
         FROM applicants WHERE term LIKE ?2",
        params![STATUS_ACCEPTED, TERM_FALL_2025],
        |r| r.get(0),
    )?;

    let avg_gpa_accepted_fall_2025 = conn.query_row(
        "SELECT ROUND(AVG(gpa), 3) FROM applicants
         WHERE term LIKE ?1 AND status LIKE ?2",
        params![TERM_FALL_2025, STATUS_ACCEPTED],
        |r| r.get(0),
    )?;

    let jhu_cs_masters = conn.query_row(
        "SELECT COUNT(*) FROM applicants
         WHERE llm_generated_university LIKE '%johns hopkins%'
           AND llm_generated_program LIKE '%computer science%'
           AND degree LIKE '%master%'",
        [],
        |r| r.get(0),
    )?;

    let georgetown_cs_phd_2025 = conn.query_row(
        "SELECT COUNT(*) FROM applicants
         WHERE term LIKE '%2025%' AND status LIKE ?1
           AND llm_generated_university LIKE '%georgetown%'
           AND llm_generated_program LIKE '%computer science%'
           AND degree LIKE '%phd%'",
        params![STATUS_ACCEPTED],
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT COALESCE(degree, ''), COUNT(*) AS n
         FROM applicants GROUP BY degree ORDER BY n DESC",
    )?;
    let degree_counts = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT llm_generated_university, COUNT(*) AS n
         FROM applicants
         WHERE llm_generated_university IS NOT NULL
         GROUP BY llm_generated_university
         ORDER BY n DESC
         LIMIT 10",
    )?;
    let top_universities = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Report {
        total,
        fall_2025,
        pct_international,
        avg_gpa,
        avg_gre_q,
        avg_gre_v,
        avg_gre_aw,
        avg_gpa_american_fall_2025,
        pct_accepted_fall_2025,
        avg_gpa_accepted_fall_2025,
        jhu_cs_masters,
        georgetown_cs_phd_2025,
        degree_counts,
        top_universities,
    })
}

impl Report {
    pub fn print(&self) {
        println!("Total applicants: {}", self.total);
        println!("1) Fall 2025 entries: {}", self.fall_2025);
        println!("2) International entries: {}", pct(self.pct_international));
        println!(
            "3) Averages (GPA / GRE Q / GRE V / GRE AW): {} / {} / {} / {}",
            num(self.avg_gpa),
            num(self.avg_gre_q),
            num(self.avg_gre_v),
            num(self.avg_gre_aw),
        );
        println!(
            "4) Avg GPA of American applicants, Fall 2025: {}",
            num(self.avg_gpa_american_fall_2025)
        );
        println!(
            "5) Acceptance rate, Fall 2025: {}",
            pct(self.pct_accepted_fall_2025)
        );
        println!(
            "6) Avg GPA of Fall 2025 acceptances: {}",
            num(self.avg_gpa_accepted_fall_2025)
        );
        println!("7) JHU Masters in CS entries: {}", self.jhu_cs_masters);
        println!(
            "8) 2025 Georgetown CS PhD acceptances: {}",
            self.georgetown_cs_phd_2025
        );
        println!("9) Applicants by degree:");
        for (degree, n) in &self.degree_counts {
            let label = if degree.is_empty() { "(unknown)" } else { degree };
            println!("   {label}: {n}");
        }
        println!("10) Top universities by applicant count:");
        for (university, n) in &self.top_universities {
            println!("   {university}: {n}");
        }
    }
}

fn num(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}%"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, ApplicantRow};

    fn seed() -> Connection {
        let conn = db::connect_in_memory().unwrap();
        let rows = [
            ApplicantRow {
                p_id: 1,
                term: Some("Fall 2025".into()),
                status: Some("Accepted".into()),
                us_or_international: Some("International".into()),
                gpa: Some(3.8),
                degree: Some("Masters".into()),
                llm_generated_university: Some("Johns Hopkins University".into()),
                llm_generated_program: Some("Computer Science".into()),
                ..ApplicantRow::default()
            },
            ApplicantRow {
                p_id: 2,
                term: Some("Fall 2025".into()),
                status: Some("Rejected".into()),
                us_or_international: Some("American".into()),
                gpa: Some(3.2),
                degree: Some("PhD".into()),
                llm_generated_university: Some("Georgetown University".into()),
                llm_generated_program: Some("Computer Science".into()),
                ..ApplicantRow::default()
            },
            ApplicantRow {
                p_id: 3,
                term: Some("Spring 2026".into()),
                status: Some("Wait listed".into()),
                us_or_international: Some("American".into()),
                degree: Some("PhD".into()),
                ..ApplicantRow::default()
            },
        ];
        db::insert_applicants(&conn, &rows).unwrap();
        conn
    }

    #[test]
    fn counts_and_rates() {
        let report = build(&seed()).unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.fall_2025, 2);
        assert_eq!(report.pct_international, Some(33.33));
        assert_eq!(report.pct_accepted_fall_2025, Some(50.0));
        assert_eq!(report.avg_gpa_american_fall_2025, Some(3.2));
        assert_eq!(report.jhu_cs_masters, 1);
        assert_eq!(report.georgetown_cs_phd_2025, 0);
    }

    #[test]
    fn groupings() {
        let report = build(&seed()).unwrap();
        assert_eq!(report.degree_counts[0], ("PhD".to_string(), 2));
        assert_eq!(report.top_universities.len(), 2);
    }

    #[test]
    fn empty_store_reports_dashes_not_errors() {
        let conn = db::connect_in_memory().unwrap();
        let report = build(&conn).unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.pct_international, None);
        assert_eq!(report.avg_gpa, None);
        assert_eq!(report.pct_accepted_fall_2025, None);
    }
}
