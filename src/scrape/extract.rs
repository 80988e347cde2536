//! Cell tokenizer.
//!
//! The site jams several conceptual fields into one text run, separated only
//! by wide internal whitespace, so every extracted text unit is additionally
//! split on runs of two or more whitespace characters.

use std::sync::LazyLock;

use regex::Regex;

use super::dom::{TableCell, TableRow};

static FIELD_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Split one text unit into trimmed, non-empty tokens.
pub fn split_fields(text: &str) -> Vec<String> {
    FIELD_GAP
        .split(text)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ordered tokens of one cell: each nested sub-item tokenized independently
/// when any exist, otherwise the cell's own text. An empty cell yields no
/// tokens.
pub fn cell_tokens(cell: &TableCell) -> Vec<String> {
    if cell.subs.is_empty() {
        split_fields(&cell.text)
    } else {
        cell.subs
            .iter()
            .flat_map(|sub| split_fields(&sub.text))
            .collect()
    }
}

/// Tokens of every cell of a row, in document order.
pub fn row_tokens(row: &TableRow) -> Vec<String> {
    row.cells.iter().flat_map(cell_tokens).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::dom::{SubItem, SubKind};

    fn sub(text: &str) -> SubItem {
        SubItem {
            kind: SubKind::Block,
            text: text.to_string(),
        }
    }

    #[test]
    fn splits_on_wide_whitespace_only() {
        assert_eq!(
            split_fields("Fall 2025  GRE 322"),
            vec!["Fall 2025", "GRE 322"]
        );
        assert_eq!(split_fields("Fall 2025 GRE 322"), vec!["Fall 2025 GRE 322"]);
    }

    #[test]
    fn drops_empty_parts() {
        assert_eq!(split_fields("   "), Vec::<String>::new());
        assert_eq!(split_fields("a    \t  b"), vec!["a", "b"]);
    }

    #[test]
    fn plain_cell_uses_own_text() {
        let cell = TableCell {
            text: "GPA 3.72  International".to_string(),
            subs: vec![],
        };
        assert_eq!(cell_tokens(&cell), vec!["GPA 3.72", "International"]);
    }

    #[test]
    fn nested_cell_tokenizes_each_sub_item() {
        let cell = TableCell {
            text: "Fall 2025 GPA 3.72".to_string(),
            subs: vec![sub("Fall 2025"), sub("GPA 3.72")],
        };
        assert_eq!(cell_tokens(&cell), vec!["Fall 2025", "GPA 3.72"]);
    }

    #[test]
    fn empty_cell_yields_no_tokens() {
        let cell = TableCell::default();
        assert!(cell_tokens(&cell).is_empty());
    }
}
