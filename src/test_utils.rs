//! Shared test utilities.
//!
//! Helper constructors for recognized lines, sessions, and parse outcomes
//! with sensible defaults, so individual tests only spell out what they
//! actually care about.

use crate::core::parser::ParseOutcome;
use crate::core::session::SplitSession;
use crate::models::{ReceiptItem, ReceiptLine};
use std::collections::HashSet;

/// Creates a recognized line with no translation attached.
#[must_use]
pub fn recognized_line(text: &str, confidence: u8, source_file: &str, source_index: usize) -> ReceiptLine {
    ReceiptLine {
        text: text.to_string(),
        confidence,
        source_file: source_file.to_string(),
        source_index,
        translated_text: None,
        detected_language: None,
    }
}

/// A fresh session with the minimum two roommates, Alice and Bob.
/// Alice is the initial payer.
#[must_use]
pub fn two_person_session() -> SplitSession {
    SplitSession::new("Alice", "Bob")
}

/// A two-person session that has already absorbed a small receipt, so every
/// item starts fully assigned.
#[must_use]
pub fn session_with_items() -> SplitSession {
    let mut session = two_person_session();
    session.absorb(parsed_outcome(
        &[("a.jpg:0", "Brot", 2.20), ("a.jpg:1", "Milch", 1.65)],
        &[],
    ));
    session
}

/// Builds a parse outcome from `(id, name, price)` items and
/// `(source_file, declared_total)` pairs, the shape the parser produces.
#[must_use]
pub fn parsed_outcome(items: &[(&str, &str, f64)], totals: &[(&str, f64)]) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    for (id, name, price) in items {
        let source_file = id.split(':').next().unwrap_or(id).to_string();
        outcome.items.push(ReceiptItem {
            id: (*id).to_string(),
            name: (*name).to_string(),
            original_price: *price,
            current_price: *price,
            assigned_to: HashSet::new(),
            confidence: 90,
            source_file,
        });
    }
    for (file, total) in totals {
        outcome.totals.insert((*file).to_string(), *total);
    }
    outcome
}
