//! Materializes a survey listing page into plain row data.
//!
//! All markup-library specifics stay in this module: the rest of the
//! pipeline (classify / extract / assemble) operates on [`TableRow`] values
//! and can be driven with synthetic rows in tests.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::ScrapeError;

/// Class the site puts on the second and third row of a survey entry.
/// The first row carries no marker.
pub const CONTINUATION_MARKER: &str = "tw-border-none";

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static HEADER_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static DATA_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static SUB_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span, div").unwrap());
static RESULT_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[data-ext-page-id][href]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubKind {
    /// span-like element (inline)
    Inline,
    /// div-like element (block)
    Block,
}

#[derive(Debug, Clone)]
pub struct SubItem {
    pub kind: SubKind,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct TableCell {
    /// Full cell text, text nodes trimmed and joined with single spaces.
    pub text: String,
    /// Nested span/div descendants in document order. Nested elements show
    /// up both through their parent's text and as their own entry; the
    /// token classifier tolerates the duplication.
    pub subs: Vec<SubItem>,
}

#[derive(Debug, Clone, Default)]
pub struct TableRow {
    pub has_header_cell: bool,
    pub continuation: bool,
    pub cells: Vec<TableCell>,
    /// href of the row's external-page-id anchor, cut at the first `#`.
    pub result_link: Option<String>,
}

/// Parse one listing page and return every `<tr>` of its first `<table>`.
pub fn parse_listing(html: &str) -> Result<Vec<TableRow>, ScrapeError> {
    let document = Html::parse_document(html);
    let table = document
        .select(&TABLE)
        .next()
        .ok_or(ScrapeError::NoResultsTable)?;
    Ok(table.select(&ROW).map(materialize_row).collect())
}

fn materialize_row(tr: ElementRef) -> TableRow {
    let has_header_cell = tr.select(&HEADER_CELL).next().is_some();
    let continuation = tr.value().classes().any(|c| c == CONTINUATION_MARKER);
    let cells = tr.select(&DATA_CELL).map(materialize_cell).collect();
    let result_link = tr
        .select(&RESULT_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.split('#').next().unwrap_or("").to_string());
    TableRow {
        has_header_cell,
        continuation,
        cells,
        result_link,
    }
}

fn materialize_cell(td: ElementRef) -> TableCell {
    let subs = td
        .select(&SUB_ITEM)
        .map(|el| SubItem {
            kind: if el.value().name() == "span" {
                SubKind::Inline
            } else {
                SubKind::Block
            },
            text: element_text(&el),
        })
        .collect();
    TableCell {
        text: element_text(&td),
        subs,
    }
}

fn element_text(el: &ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
