//! Session store - holds the mutable item and roommate collections.
//!
//! A [`SplitSession`] is the single owner of all mutable state for one
//! splitting session: roommates, items, declared totals, the designated
//! payer, and per-file visibility. All mutations are synchronous and happen
//! in response to a discrete user action; invalid edits are silent no-ops
//! rather than errors.

use crate::core::parser::ParseOutcome;
use crate::models::{ColorPair, MANUAL_ENTRY, ReceiptItem, Roommate, RoommateId};
use chrono::Utc;
use std::collections::{HashMap, HashSet};

/// Fixed rotating palette of display colors, one light/dark pair per entry.
const COLOR_PALETTE: &[(&str, &str)] = &[
    ("#3b82f6", "#60a5fa"), // blue
    ("#10b981", "#34d399"), // green
    ("#8b5cf6", "#a78bfa"), // purple
    ("#ec4899", "#f472b6"), // pink
    ("#f59e0b", "#fbbf24"), // amber
    ("#14b8a6", "#2dd4bf"), // teal
];

/// Items summing to within this distance of the declared total are considered
/// reconciled; beyond it, an advisory warning is surfaced.
pub const RECONCILIATION_TOLERANCE: f64 = 0.05;

/// Session-scoped mutable state: roommates, items, and their relationships.
#[derive(Debug, Clone)]
pub struct SplitSession {
    roommates: Vec<Roommate>,
    items: Vec<ReceiptItem>,
    declared_totals: HashMap<String, f64>,
    hidden_files: HashSet<String>,
    who_paid: RoommateId,
    last_id: RoommateId,
    color_cursor: usize,
    manual_counter: u32,
}

impl SplitSession {
    /// Creates a session with the two initial roommates the invariant
    /// requires. Blank names fall back to generic labels so the
    /// floor-of-two invariant holds from the start. The first roommate is
    /// the initial designated payer.
    #[must_use]
    pub fn new(first: &str, second: &str) -> Self {
        let mut session = Self {
            roommates: Vec::new(),
            items: Vec::new(),
            declared_totals: HashMap::new(),
            hidden_files: HashSet::new(),
            who_paid: 0,
            last_id: 0,
            color_cursor: 0,
            manual_counter: 0,
        };

        let first = non_blank(first, "Roommate 1");
        let second = non_blank(second, "Roommate 2");
        let first_id = session.push_roommate(&first);
        session.push_roommate(&second);
        session.who_paid = first_id;
        session
    }

    /// All roommates, in the order they were added.
    #[must_use]
    pub fn roommates(&self) -> &[Roommate] {
        &self.roommates
    }

    /// All items, in the order they were added.
    #[must_use]
    pub fn items(&self) -> &[ReceiptItem] {
        &self.items
    }

    /// Items whose source file has not been hidden. Only these feed balance
    /// computation.
    pub fn visible_items(&self) -> impl Iterator<Item = &ReceiptItem> {
        self.items
            .iter()
            .filter(|item| !self.hidden_files.contains(&item.source_file))
    }

    /// The designated payer.
    #[must_use]
    pub fn who_paid(&self) -> RoommateId {
        self.who_paid
    }

    /// Declared total per source file, as detected by the parser.
    #[must_use]
    pub fn declared_totals(&self) -> &HashMap<String, f64> {
        &self.declared_totals
    }

    /// Source files currently excluded from balance computation.
    #[must_use]
    pub fn hidden_files(&self) -> &HashSet<String> {
        &self.hidden_files
    }

    /// Looks up a roommate by (case-insensitive) name.
    #[must_use]
    pub fn roommate_by_name(&self, name: &str) -> Option<&Roommate> {
        let wanted = name.trim();
        self.roommates
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(wanted))
    }

    /// Looks up a roommate by id.
    #[must_use]
    pub fn roommate(&self, id: RoommateId) -> Option<&Roommate> {
        self.roommates.iter().find(|r| r.id == id)
    }

    /// Looks up an item by id.
    #[must_use]
    pub fn item(&self, item_id: &str) -> Option<&ReceiptItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Adds a roommate and resets every item's assignment to the full
    /// roommate set. Returns the new id, or `None` if the name is blank.
    pub fn add_roommate(&mut self, name: &str) -> Option<RoommateId> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let id = self.push_roommate(name);
        self.reset_assignments();
        Some(id)
    }

    /// Removes a roommate. A no-op returning `false` if the roommate does not
    /// exist or removal would leave fewer than two roommates. On success the
    /// removed id disappears from every item's assignment set (every item is
    /// reset to the full remaining roommate set) and, if the payer was
    /// removed, the first remaining roommate becomes the payer.
    pub fn remove_roommate(&mut self, id: RoommateId) -> bool {
        if self.roommates.len() <= 2 || !self.roommates.iter().any(|r| r.id == id) {
            return false;
        }
        self.roommates.retain(|r| r.id != id);
        if self.who_paid == id {
            self.who_paid = self.roommates[0].id;
        }
        self.reset_assignments();
        true
    }

    /// Renames a roommate. A no-op if the new name is blank or the id is
    /// unknown. Renaming does not change the roommate set, so assignments
    /// are left untouched.
    pub fn rename_roommate(&mut self, id: RoommateId, new_name: &str) -> bool {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return false;
        }
        match self.roommates.iter_mut().find(|r| r.id == id) {
            Some(roommate) => {
                roommate.name = new_name.to_string();
                true
            }
            None => false,
        }
    }

    /// Designates a different payer. A no-op if the id is unknown.
    pub fn set_payer(&mut self, id: RoommateId) -> bool {
        if self.roommates.iter().any(|r| r.id == id) {
            self.who_paid = id;
            true
        } else {
            false
        }
    }

    /// Flips one roommate's membership in an item's assignment set. A no-op
    /// if either the item or the roommate does not exist.
    pub fn toggle_assignment(&mut self, item_id: &str, roommate_id: RoommateId) -> bool {
        if !self.roommates.iter().any(|r| r.id == roommate_id) {
            return false;
        }
        match self.items.iter_mut().find(|i| i.id == item_id) {
            Some(item) => {
                if !item.assigned_to.remove(&roommate_id) {
                    item.assigned_to.insert(roommate_id);
                }
                true
            }
            None => false,
        }
    }

    /// If every roommate is assigned to the item, clears the set; otherwise
    /// assigns everyone.
    pub fn toggle_all_assignments(&mut self, item_id: &str) -> bool {
        let everyone: HashSet<RoommateId> = self.roommates.iter().map(|r| r.id).collect();
        match self.items.iter_mut().find(|i| i.id == item_id) {
            Some(item) => {
                if item.assigned_to == everyone {
                    item.assigned_to.clear();
                } else {
                    item.assigned_to = everyone;
                }
                true
            }
            None => false,
        }
    }

    /// Overwrites an item's current price, leaving the original price
    /// untouched. Rejects non-finite values.
    pub fn set_item_price(&mut self, item_id: &str, new_price: f64) -> bool {
        if !new_price.is_finite() {
            return false;
        }
        match self.items.iter_mut().find(|i| i.id == item_id) {
            Some(item) => {
                item.current_price = new_price;
                true
            }
            None => false,
        }
    }

    /// Appends a hand-entered item, defaulted to full assignment and
    /// confidence 100. Rejects blank names and non-finite prices.
    pub fn add_manual_item(&mut self, name: &str, price: f64) -> Option<&ReceiptItem> {
        let name = name.trim();
        if name.is_empty() || !price.is_finite() {
            return None;
        }
        self.manual_counter += 1;
        let item = ReceiptItem {
            id: format!("{MANUAL_ENTRY}:{}", self.manual_counter),
            name: name.to_string(),
            original_price: price,
            current_price: price,
            assigned_to: self.roommates.iter().map(|r| r.id).collect(),
            confidence: 100,
            source_file: MANUAL_ENTRY.to_string(),
        };
        self.items.push(item);
        self.items.last()
    }

    /// Absorbs a parse outcome: appends its items (defaulted to full
    /// assignment, "everyone splits everything") and records declared totals.
    /// Item ids must stay unique for the session, so an id seen before is
    /// skipped.
    pub fn absorb(&mut self, outcome: ParseOutcome) {
        let everyone: HashSet<RoommateId> = self.roommates.iter().map(|r| r.id).collect();
        for mut item in outcome.items {
            if self.items.iter().any(|existing| existing.id == item.id) {
                continue;
            }
            item.assigned_to = everyone.clone();
            self.items.push(item);
        }
        self.declared_totals.extend(outcome.totals);
    }

    /// Excludes a source file's items from balance computation without
    /// deleting them.
    pub fn hide_file(&mut self, source_file: &str) {
        self.hidden_files.insert(source_file.to_string());
    }

    /// Re-includes a previously hidden source file.
    pub fn unhide_file(&mut self, source_file: &str) {
        self.hidden_files.remove(source_file);
    }

    /// Compares each source file's item sum against its declared total and
    /// returns one concatenated advisory message for every file that is off
    /// by more than [`RECONCILIATION_TOLERANCE`]. Advisory only: balances are
    /// computed from item prices regardless.
    #[must_use]
    pub fn reconciliation_warnings(&self, currency: &str) -> Option<String> {
        let mut files: Vec<(&String, &f64)> = self.declared_totals.iter().collect();
        files.sort_by_key(|(file, _)| file.as_str());

        let mut warnings = Vec::new();
        for (file, declared) in files {
            let item_sum: f64 = self
                .items
                .iter()
                .filter(|item| &item.source_file == file)
                .map(|item| item.current_price)
                .sum();
            if (item_sum - declared).abs() > RECONCILIATION_TOLERANCE {
                warnings.push(format!(
                    "{file}: items sum to {currency} {item_sum:.2} but the receipt declares {currency} {declared:.2}"
                ));
            }
        }

        if warnings.is_empty() {
            None
        } else {
            Some(warnings.join("; "))
        }
    }

    /// Appends a roommate without touching assignments; used during
    /// construction and by `add_roommate`.
    fn push_roommate(&mut self, name: &str) -> RoommateId {
        let id = self.next_roommate_id();
        let (light, dark) = COLOR_PALETTE[self.color_cursor % COLOR_PALETTE.len()];
        self.color_cursor += 1;
        self.roommates.push(Roommate {
            id,
            name: name.to_string(),
            color: ColorPair {
                light: light.to_string(),
                dark: dark.to_string(),
            },
        });
        id
    }

    /// Every item's assignment resets to the full current roommate set
    /// whenever the roommate list changes; per-item customization only
    /// persists until the next roommate-list edit.
    fn reset_assignments(&mut self) {
        let everyone: HashSet<RoommateId> = self.roommates.iter().map(|r| r.id).collect();
        for item in &mut self.items {
            item.assigned_to = everyone.clone();
        }
    }

    /// Millisecond timestamp, bumped past the last issued id so ids stay
    /// distinct even within one millisecond.
    fn next_roommate_id(&mut self) -> RoommateId {
        let candidate = Utc::now().timestamp_millis();
        self.last_id = candidate.max(self.last_id + 1);
        self.last_id
    }
}

fn non_blank(name: &str, fallback: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
