//! Receipt line parsing - turns raw OCR lines into structured items.
//!
//! The parser is a pure function over recognized lines: no side effects, no
//! session state. It is heuristic and lossy by design; a line the heuristics
//! cannot make sense of is dropped, and any reconciliation happens later via
//! the declared-total comparison in the session store.

use crate::models::{ReceiptItem, ReceiptLine};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// A "total" line: the keyword, a three-letter currency code, and an amount.
/// Matches e.g. `Total CHF 23.40` or `TOTAL EUR 7,95`.
static TOTAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\btotal\b\s*[A-Za-z]{3}\s*(\d+[.,]\d+)").expect("total pattern is valid")
});

/// A decimal amount: digits, one `.` or `,` separator, digits. Bare integers
/// (quantities, PLU codes) deliberately do not match.
static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+[.,]\d+").expect("price pattern is valid"));

/// Footer/header keywords that never describe a purchasable item.
/// German/Swiss receipt wording plus the English equivalents.
const SKIP_KEYWORDS: &[&str] = &[
    "ersparnis",
    "savings",
    "rundung",
    "rounding",
    "artikelbezeichnung",
    "item description",
];

/// Options controlling which text variant the parser reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Read `translated_text` instead of the original `text` where available.
    pub show_translated: bool,
}

/// Result of parsing a batch of recognized lines.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    /// Structured items in input line order
    pub items: Vec<ReceiptItem>,
    /// Declared total per source file, when a "total" line was recognized
    pub totals: HashMap<String, f64>,
}

/// Parses an ordered sequence of recognized lines into receipt items plus at
/// most one declared total per source file.
///
/// For each line, in order:
/// 1. A "total" line records the source file's declared total and emits nothing.
/// 2. A line containing a non-item keyword (savings, rounding, column headers)
///    is skipped.
/// 3. Otherwise the last decimal-shaped number in the line is the price and
///    everything before the first one is the name. Lines with no price or an
///    empty name are OCR noise and are dropped without comment.
///
/// Emitted items carry over the line's confidence and source file, start with
/// an empty assignment set, and use `source_file:source_index` as identity.
#[must_use]
pub fn parse_lines(lines: &[ReceiptLine], options: ParseOptions) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for line in lines {
        let text = effective_text(line, options);

        if let Some(total) = match_total(text) {
            outcome.totals.insert(line.source_file.clone(), total);
            continue;
        }

        if is_skip_line(text) {
            continue;
        }

        let Some((name, price)) = split_name_and_price(text) else {
            continue;
        };

        outcome.items.push(ReceiptItem {
            id: format!("{}:{}", line.source_file, line.source_index),
            name,
            original_price: price,
            current_price: price,
            assigned_to: HashSet::new(),
            confidence: line.confidence,
            source_file: line.source_file.clone(),
        });
    }

    outcome
}

fn effective_text(line: &ReceiptLine, options: ParseOptions) -> &str {
    if options.show_translated {
        line.translated_text.as_deref().unwrap_or(&line.text)
    } else {
        &line.text
    }
}

/// Recognizes a declared-total line and extracts its amount.
fn match_total(text: &str) -> Option<f64> {
    let captures = TOTAL_RE.captures(text)?;
    parse_amount(captures.get(1)?.as_str())
}

fn is_skip_line(text: &str) -> bool {
    let lowered = text.to_lowercase();
    SKIP_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// Splits an item line into a name and a price.
///
/// Receipt lines often show quantity, unit price, and line total in sequence;
/// the last decimal-shaped number is the most reliable "amount to pay", while
/// the name is everything before the first one.
fn split_name_and_price(text: &str) -> Option<(String, f64)> {
    let mut matches = PRICE_RE.find_iter(text).peekable();
    let first = matches.peek().copied()?;
    let last = matches.last()?;

    let price = parse_amount(last.as_str())?;
    let name = text[..first.start()]
        .trim()
        .trim_end_matches('|')
        .trim()
        .to_string();
    if name.is_empty() {
        return None;
    }

    Some((name, price))
}

/// Parses a decimal amount, normalizing `,` to `.` as the separator.
fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::recognized_line;

    #[test]
    fn test_parse_item_with_quantity_columns() {
        // Quantity/unit-price/total columns: the last decimal match wins
        // and the bare trailing "1" is not decimal-shaped.
        let lines = vec![recognized_line("Alnatura Mais Chips Na | 1.95 1.95 1", 90, "a.jpg", 0)];
        let outcome = parse_lines(&lines, ParseOptions::default());

        assert_eq!(outcome.items.len(), 1);
        let item = &outcome.items[0];
        assert_eq!(item.name, "Alnatura Mais Chips Na");
        assert_eq!(item.current_price, 1.95);
        assert_eq!(item.original_price, 1.95);
        assert_eq!(item.id, "a.jpg:0");
        assert!(item.assigned_to.is_empty());
    }

    #[test]
    fn test_parse_total_line_sets_declared_total() {
        let lines = vec![recognized_line("Total CHF 23.40", 95, "a.jpg", 4)];
        let outcome = parse_lines(&lines, ParseOptions::default());

        assert!(outcome.items.is_empty());
        assert_eq!(outcome.totals.get("a.jpg"), Some(&23.40));
    }

    #[test]
    fn test_parse_total_line_case_insensitive_comma_separator() {
        let lines = vec![recognized_line("TOTAL EUR 7,95", 80, "b.jpg", 9)];
        let outcome = parse_lines(&lines, ParseOptions::default());

        assert!(outcome.items.is_empty());
        assert_eq!(outcome.totals.get("b.jpg"), Some(&7.95));
    }

    #[test]
    fn test_skip_keyword_lines_emit_nothing() {
        let lines = vec![
            recognized_line("Ersparnis 2.50", 90, "a.jpg", 0),
            recognized_line("Rundung 0.02", 90, "a.jpg", 1),
            recognized_line("Artikelbezeichnung Menge Preis", 90, "a.jpg", 2),
        ];
        let outcome = parse_lines(&lines, ParseOptions::default());

        assert!(outcome.items.is_empty());
        assert!(outcome.totals.is_empty());
    }

    #[test]
    fn test_line_without_price_is_dropped() {
        let lines = vec![recognized_line("Migros Genossenschaft", 85, "a.jpg", 0)];
        let outcome = parse_lines(&lines, ParseOptions::default());
        assert!(outcome.items.is_empty());
    }

    #[test]
    fn test_line_with_price_but_no_name_is_dropped() {
        let lines = vec![recognized_line("  3.50 ", 85, "a.jpg", 0)];
        let outcome = parse_lines(&lines, ParseOptions::default());
        assert!(outcome.items.is_empty());
    }

    #[test]
    fn test_comma_separator_normalized() {
        let lines = vec![recognized_line("Vollmilch 1L 1,65", 88, "a.jpg", 3)];
        let outcome = parse_lines(&lines, ParseOptions::default());

        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].current_price, 1.65);
        // "1L" is not decimal-shaped, so the name keeps it.
        assert_eq!(outcome.items[0].name, "Vollmilch 1L");
    }

    #[test]
    fn test_items_keep_input_order_per_source_file() {
        let lines = vec![
            recognized_line("Brot 2.20", 90, "a.jpg", 0),
            recognized_line("Butter 3.10", 90, "a.jpg", 1),
            recognized_line("Kaese 5.45", 90, "a.jpg", 2),
        ];
        let outcome = parse_lines(&lines, ParseOptions::default());

        let names: Vec<&str> = outcome.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Brot", "Butter", "Kaese"]);
        assert_eq!(outcome.items[2].id, "a.jpg:2");
    }

    #[test]
    fn test_show_translated_reads_translated_text() {
        let mut line = recognized_line("Vollmilch 1.65", 90, "a.jpg", 0);
        line.translated_text = Some("Whole milk 1.65".to_string());
        let lines = vec![line];

        let translated = parse_lines(
            &lines,
            ParseOptions {
                show_translated: true,
            },
        );
        assert_eq!(translated.items[0].name, "Whole milk");

        let original = parse_lines(&lines, ParseOptions::default());
        assert_eq!(original.items[0].name, "Vollmilch");
    }

    #[test]
    fn test_show_translated_falls_back_to_original_text() {
        let lines = vec![recognized_line("Butter 3.10", 90, "a.jpg", 0)];
        let outcome = parse_lines(
            &lines,
            ParseOptions {
                show_translated: true,
            },
        );
        assert_eq!(outcome.items[0].name, "Butter");
    }

    #[test]
    fn test_later_total_line_overwrites_earlier() {
        let lines = vec![
            recognized_line("Total CHF 10.00", 90, "a.jpg", 0),
            recognized_line("Total CHF 23.40", 95, "a.jpg", 1),
        ];
        let outcome = parse_lines(&lines, ParseOptions::default());
        assert_eq!(outcome.totals.get("a.jpg"), Some(&23.40));
    }
}
