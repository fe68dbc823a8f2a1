//! Plain data types shared across the parsing, session, and export layers.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Identifier for a roommate, unique within a session.
///
/// Ids are derived from a millisecond timestamp and bumped on collision, so
/// they are monotonically distinct for interactive use.
pub type RoommateId = i64;

/// Source-file label attached to items entered by hand rather than parsed
/// from a receipt image.
pub const MANUAL_ENTRY: &str = "Manual entry";

/// A single recognized line of receipt text, as produced by the OCR adapter.
///
/// Immutable once produced. The confidence score (0-100) is only used to
/// filter unreliable lines before they reach the parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLine {
    /// Recognized text, trimmed
    pub text: String,
    /// Recognition confidence, 0-100
    pub confidence: u8,
    /// Name of the image file this line came from
    pub source_file: String,
    /// Position of the line within its source file
    pub source_index: usize,
    /// Machine translation of `text`, if translation was requested
    pub translated_text: Option<String>,
    /// Language marker reported by the translation service ("unknown" on failure)
    pub detected_language: Option<String>,
}

/// A structured receipt item with a price and an assignment set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptItem {
    /// Unique key within the session (source file + line position)
    pub id: String,
    /// Item name as read from the receipt or entered by the user
    pub name: String,
    /// Price as originally parsed; retained for display, not used in computation
    pub original_price: f64,
    /// User-editable price used for all balance computation
    pub current_price: f64,
    /// Roommates sharing this item's cost
    pub assigned_to: HashSet<RoommateId>,
    /// Confidence of the OCR line this item came from (100 for manual entries)
    pub confidence: u8,
    /// File the item was parsed from, or [`MANUAL_ENTRY`]
    pub source_file: String,
}

/// Display color pair for a roommate, one variant per theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorPair {
    pub light: String,
    pub dark: String,
}

/// A person sharing costs, identified by a stable id and display color.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roommate {
    pub id: RoommateId,
    pub name: String,
    pub color: ColorPair,
}

/// Derived per-roommate balance. Recomputed on demand, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub roommate_id: RoommateId,
    /// Amount this roommate paid out of pocket
    pub paid: f64,
    /// This roommate's owed share of the visible items
    pub share: f64,
    /// Who this roommate settles up with (the designated payer), if anyone
    pub owes_to: Option<RoommateId>,
}

impl Balance {
    /// Net position: positive means "to receive", negative means "to pay".
    #[must_use]
    pub fn net(&self) -> f64 {
        self.paid - self.share
    }
}
