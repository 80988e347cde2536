//! Reassembles survey entries from the classified row stream.
//!
//! One logical entry is rendered as up to three consecutive table rows: the
//! entry row (school / program / date / decision), an optional badge row
//! (term, residency, GRE, GPA) and an optional notes row. Only the class of
//! the row *after* a badge row tells whether a notes row follows, so feeding
//! a row takes the classification of the next row as one-row lookahead.

use super::classify::{classify, RowKind};
use super::dom::{SubKind, TableRow};
use super::extract;
use super::RawApplicant;

/// UI chrome that leaks into the decision cell's text.
const DECISION_NOISE: &[&str] = &["Total comments", "Open options", "See More", "Report"];

const TERM_PREFIXES: &[&str] = &["Fall", "Spring", "Summer"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No entry buffered.
    Idle,
    /// Entry row consumed, badge row may follow.
    AfterEntry,
    /// Badge row consumed and the lookahead promised a notes row.
    AfterDetails,
}

/// What one fed row produced.
#[derive(Debug, Default)]
pub struct Feed {
    /// Entry completed by this row, if any.
    pub emitted: Option<RawApplicant>,
    /// URL of the entry this row just started (possibly empty). The driver
    /// applies its stop predicate here, before any more rows are consumed.
    pub started_url: Option<String>,
}

#[derive(Debug)]
pub struct Assembler {
    state: State,
    buffer: RawApplicant,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            buffer: RawApplicant::default(),
        }
    }

    /// Feed one row together with the classification of the row after it.
    pub fn feed(&mut self, row: &TableRow, next_kind: Option<RowKind>) -> Feed {
        match classify(row) {
            RowKind::Header | RowKind::Empty => Feed::default(),
            RowKind::Entry => {
                let emitted = match self.state {
                    State::Idle => None,
                    _ => self.take_complete(),
                };
                self.start_entry(row);
                self.state = State::AfterEntry;
                Feed {
                    emitted,
                    started_url: Some(self.buffer.applicant_url.clone()),
                }
            }
            RowKind::Continuation => match self.state {
                // Stray continuation with nothing buffered; ignore.
                State::Idle => Feed::default(),
                State::AfterEntry => {
                    self.apply_details(row);
                    if next_kind == Some(RowKind::Continuation) {
                        self.state = State::AfterDetails;
                        Feed::default()
                    } else {
                        self.state = State::Idle;
                        Feed {
                            emitted: self.take_complete(),
                            started_url: None,
                        }
                    }
                }
                State::AfterDetails => {
                    self.apply_notes(row);
                    self.state = State::Idle;
                    Feed {
                        emitted: self.take_complete(),
                        started_url: None,
                    }
                }
            },
        }
    }

    /// Flush a valid trailing buffer once the row stream ends.
    pub fn finish(&mut self) -> Option<RawApplicant> {
        match self.state {
            State::Idle => None,
            _ => {
                self.state = State::Idle;
                self.take_complete()
            }
        }
    }

    fn take_complete(&mut self) -> Option<RawApplicant> {
        let record = std::mem::take(&mut self.buffer);
        record.is_complete().then_some(record)
    }

    fn start_entry(&mut self, row: &TableRow) {
        let mut record = RawApplicant {
            university: cell_text(row, 0),
            date_added: cell_text(row, 2),
            applicant_url: row.result_link.clone().unwrap_or_default(),
            ..RawApplicant::default()
        };

        // Program and degree sit in the second cell as two inline sub-items;
        // either may be absent.
        if let Some(cell) = row.cells.get(1) {
            let mut inline = cell
                .subs
                .iter()
                .filter(|s| s.kind == SubKind::Inline)
                .map(|s| s.text.clone());
            record.program_name = inline.next().unwrap_or_default();
            record.degree_title = inline.next().unwrap_or_default();
        }

        let decision = strip_noise(&cell_text(row, 3));
        match decision.split_once(" on ") {
            Some((status, date)) => {
                record.applicant_status = status.trim().to_string();
                record.decision_date = date.trim().to_string();
            }
            None => record.applicant_status = decision,
        }

        self.buffer = record;
    }

    fn apply_details(&mut self, row: &TableRow) {
        let Some(cell) = row.cells.first() else {
            return;
        };
        for token in extract::cell_tokens(cell) {
            // Wrapper elements repeat their children's text as one joined
            // token; the children follow and overwrite field by field.
            if TERM_PREFIXES.iter().any(|p| token.starts_with(p)) {
                self.buffer.semester = token;
            } else if token.contains("International") || token.contains("American") {
                self.buffer.student_location = token;
            } else if let Some(value) = token.strip_prefix("GRE V") {
                self.buffer.gre_verbal = value.trim().to_string();
            } else if let Some(value) = token.strip_prefix("GRE AW") {
                self.buffer.gre_aw = value.trim().to_string();
            } else if let Some(value) = token.strip_prefix("GRE ") {
                self.buffer.gre_quant = value.trim().to_string();
            } else if let Some(value) = token.strip_prefix("GPA") {
                self.buffer.gpa = value.trim().to_string();
            }
        }
    }

    fn apply_notes(&mut self, row: &TableRow) {
        if let Some(first) = extract::row_tokens(row).into_iter().next() {
            self.buffer.notes = first;
        }
    }
}

fn cell_text(row: &TableRow, index: usize) -> String {
    row.cells
        .get(index)
        .map(|c| c.text.trim().to_string())
        .unwrap_or_default()
}

fn strip_noise(text: &str) -> String {
    let mut cleaned = text.to_string();
    for noise in DECISION_NOISE {
        if cleaned.contains(noise) {
            cleaned = cleaned.replace(noise, "");
        }
    }
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::dom::{SubItem, TableCell};

    fn text_cell(text: &str) -> TableCell {
        TableCell {
            text: text.to_string(),
            subs: vec![],
        }
    }

    fn entry_row(university: &str, program: &str, degree: &str, decision: &str) -> TableRow {
        let subs = [program, degree]
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| SubItem {
                kind: SubKind::Inline,
                text: t.to_string(),
            })
            .collect();
        TableRow {
            cells: vec![
                text_cell(university),
                TableCell {
                    text: format!("{program} {degree}"),
                    subs,
                },
                text_cell("February 05, 2025"),
                text_cell(decision),
            ],
            result_link: Some("/result/901234".to_string()),
            ..TableRow::default()
        }
    }

    fn badge_row(tokens: &[&str]) -> TableRow {
        TableRow {
            continuation: true,
            cells: vec![TableCell {
                text: tokens.join(" "),
                subs: tokens
                    .iter()
                    .map(|t| SubItem {
                        kind: SubKind::Block,
                        text: t.to_string(),
                    })
                    .collect(),
            }],
            ..TableRow::default()
        }
    }

    fn notes_row(text: &str) -> TableRow {
        TableRow {
            continuation: true,
            cells: vec![text_cell(text)],
            ..TableRow::default()
        }
    }

    #[test]
    fn entry_row_fields_parsed() {
        let mut asm = Assembler::new();
        asm.feed(
            &entry_row("CMU", "Computer Science", "PhD", "Accepted on 2025-02-05"),
            None,
        );
        let rec = asm.finish().unwrap();
        assert_eq!(rec.university, "CMU");
        assert_eq!(rec.program_name, "Computer Science");
        assert_eq!(rec.degree_title, "PhD");
        assert_eq!(rec.date_added, "February 05, 2025");
        assert_eq!(rec.applicant_status, "Accepted");
        assert_eq!(rec.decision_date, "2025-02-05");
        assert_eq!(rec.applicant_url, "/result/901234");
    }

    #[test]
    fn decision_without_delimiter_is_all_status() {
        let mut asm = Assembler::new();
        asm.feed(&entry_row("CMU", "CS", "PhD", "Waitlisted (no date)"), None);
        let rec = asm.finish().unwrap();
        assert_eq!(rec.applicant_status, "Waitlisted (no date)");
        assert_eq!(rec.decision_date, "");
    }

    #[test]
    fn decision_noise_stripped_before_split() {
        let mut asm = Assembler::new();
        asm.feed(
            &entry_row("CMU", "CS", "PhD", "Accepted on 5 Feb Open options Report"),
            None,
        );
        let rec = asm.finish().unwrap();
        assert_eq!(rec.applicant_status, "Accepted");
        assert_eq!(rec.decision_date, "5 Feb");
    }

    #[test]
    fn badge_row_without_notes_emits_on_lookahead() {
        let mut asm = Assembler::new();
        let fed = asm.feed(
            &entry_row("CMU", "CS", "PhD", "Accepted"),
            Some(RowKind::Continuation),
        );
        assert!(fed.emitted.is_none());

        let badges = badge_row(&["Fall 2025", "International", "GRE 324", "GPA 3.72"]);
        // next row is a fresh entry, so the record finishes here
        let fed = asm.feed(&badges, Some(RowKind::Entry));
        let rec = fed.emitted.unwrap();
        assert_eq!(rec.semester, "Fall 2025");
        assert_eq!(rec.student_location, "International");
        assert_eq!(rec.gre_quant, "324");
        assert_eq!(rec.gpa, "3.72");
        assert_eq!(rec.notes, "");
        assert!(asm.finish().is_none());
    }

    #[test]
    fn notes_row_finishes_the_entry() {
        let mut asm = Assembler::new();
        asm.feed(&entry_row("CMU", "CS", "PhD", "Accepted"), Some(RowKind::Continuation));
        let fed = asm.feed(
            &badge_row(&["Fall 2025", "American"]),
            Some(RowKind::Continuation),
        );
        assert!(fed.emitted.is_none());
        let fed = asm.feed(&notes_row("Strong SOP, two publications."), Some(RowKind::Entry));
        let rec = fed.emitted.unwrap();
        assert_eq!(rec.notes, "Strong SOP, two publications.");
        assert_eq!(rec.student_location, "American");
    }

    #[test]
    fn gre_prefixes_disambiguated_longest_first() {
        let mut asm = Assembler::new();
        asm.feed(&entry_row("CMU", "CS", "PhD", "Accepted"), Some(RowKind::Continuation));
        let fed = asm.feed(
            &badge_row(&["GRE V 160", "GRE AW 4.5", "GRE 168"]),
            Some(RowKind::Entry),
        );
        let rec = fed.emitted.unwrap();
        assert_eq!(rec.gre_verbal, "160");
        assert_eq!(rec.gre_aw, "4.5");
        assert_eq!(rec.gre_quant, "168");
    }

    #[test]
    fn wrapper_token_is_overwritten_by_children() {
        // the outer flex div joins all badges into one token; its children
        // follow in document order
        let row = TableRow {
            continuation: true,
            cells: vec![TableCell {
                text: "Fall 2025 GRE 324".to_string(),
                subs: vec![
                    SubItem {
                        kind: SubKind::Block,
                        text: "Fall 2025 GRE 324".to_string(),
                    },
                    SubItem {
                        kind: SubKind::Block,
                        text: "Fall 2025".to_string(),
                    },
                    SubItem {
                        kind: SubKind::Block,
                        text: "GRE 324".to_string(),
                    },
                ],
            }],
            ..TableRow::default()
        };
        let mut asm = Assembler::new();
        asm.feed(&entry_row("CMU", "CS", "PhD", "Accepted"), Some(RowKind::Continuation));
        let rec = asm.feed(&row, Some(RowKind::Entry)).emitted.unwrap();
        assert_eq!(rec.semester, "Fall 2025");
        assert_eq!(rec.gre_quant, "324");
    }

    #[test]
    fn unrecognized_badge_tokens_dropped() {
        let mut asm = Assembler::new();
        asm.feed(&entry_row("CMU", "CS", "PhD", "Accepted"), Some(RowKind::Continuation));
        let rec = asm
            .feed(&badge_row(&["Something else", "Fall 2025"]), Some(RowKind::Entry))
            .emitted
            .unwrap();
        assert_eq!(rec.semester, "Fall 2025");
        assert_eq!(rec.student_location, "");
    }

    #[test]
    fn new_entry_emits_previous_buffer() {
        let mut asm = Assembler::new();
        asm.feed(&entry_row("CMU", "CS", "PhD", "Accepted"), Some(RowKind::Entry));
        let fed = asm.feed(&entry_row("MIT", "EE", "Masters", "Rejected"), None);
        assert_eq!(fed.emitted.unwrap().university, "CMU");
        assert_eq!(asm.finish().unwrap().university, "MIT");
    }

    #[test]
    fn invalid_buffer_is_never_emitted() {
        let mut asm = Assembler::new();
        // neither university nor program
        asm.feed(&entry_row("", "", "", "Accepted on 5 Feb"), Some(RowKind::Entry));
        let fed = asm.feed(&entry_row("MIT", "EE", "Masters", "Rejected"), None);
        assert!(fed.emitted.is_none());
        assert!(asm.finish().is_some());
    }

    #[test]
    fn stray_continuation_is_a_no_op() {
        let mut asm = Assembler::new();
        let fed = asm.feed(&badge_row(&["Fall 2025"]), None);
        assert!(fed.emitted.is_none());
        assert!(asm.finish().is_none());
    }

    #[test]
    fn short_rows_degrade_to_empty_fields() {
        let mut asm = Assembler::new();
        let row = TableRow {
            cells: vec![text_cell("Tufts University")],
            ..TableRow::default()
        };
        asm.feed(&row, None);
        let rec = asm.finish().unwrap();
        assert_eq!(rec.university, "Tufts University");
        assert_eq!(rec.program_name, "");
        assert_eq!(rec.applicant_status, "");
        assert_eq!(rec.applicant_url, "");
    }

    #[test]
    fn started_url_reported_on_entry_rows_only() {
        let mut asm = Assembler::new();
        let fed = asm.feed(&entry_row("CMU", "CS", "PhD", "Accepted"), Some(RowKind::Continuation));
        assert_eq!(fed.started_url.as_deref(), Some("/result/901234"));
        let fed = asm.feed(&badge_row(&["Fall 2025"]), Some(RowKind::Entry));
        assert!(fed.started_url.is_none());
    }
}
