//! Balance computation and settlement formatting.
//!
//! Balances are derived data: given the visible items, the roommates, and
//! the designated payer, [`compute_balances`] recomputes everything from
//! scratch. There is no incremental update and no rounding during
//! accumulation; rounding to two decimals happens only when an amount is
//! formatted for display.

use crate::core::session::SplitSession;
use crate::models::{Balance, Roommate, RoommateId};

/// The full set of balances for one computation, plus the totals the
/// presentation layer displays alongside them.
#[derive(Debug, Clone)]
pub struct BalanceSheet {
    /// One balance per roommate, in roommate order
    pub balances: Vec<Balance>,
    /// Sum of `current_price` over all visible items, assigned or not
    pub total_visible: f64,
    /// Portion of the visible total actually distributed to shares
    pub total_distributed: f64,
}

impl BalanceSheet {
    /// The balance for a specific roommate, if present.
    #[must_use]
    pub fn balance_for(&self, roommate_id: RoommateId) -> Option<&Balance> {
        self.balances.iter().find(|b| b.roommate_id == roommate_id)
    }
}

/// Computes each roommate's paid amount, owed share, and settlement
/// direction from the session's visible items.
///
/// Each visible item with a non-empty assignment splits evenly across its
/// assignees (exact real division). Items with an empty assignment
/// contribute zero to every share but still count toward the visible total.
/// The single designated payer is assumed to have paid the entire visible
/// total, so their net is `total_visible - their share`; everyone else owes
/// the payer their share.
#[must_use]
pub fn compute_balances(session: &SplitSession) -> BalanceSheet {
    let payer = session.who_paid();
    let mut balances: Vec<Balance> = session
        .roommates()
        .iter()
        .map(|r| Balance {
            roommate_id: r.id,
            paid: 0.0,
            share: 0.0,
            owes_to: None,
        })
        .collect();

    let mut total_visible = 0.0;
    let mut total_distributed = 0.0;

    for item in session.visible_items() {
        total_visible += item.current_price;
        if item.assigned_to.is_empty() {
            continue;
        }
        total_distributed += item.current_price;

        // Exact real division; assignment sets are kept consistent with the
        // roommate list by the session, so this never divides by zero.
        #[allow(clippy::cast_precision_loss)]
        let per_person = item.current_price / item.assigned_to.len() as f64;
        for balance in &mut balances {
            if item.assigned_to.contains(&balance.roommate_id) {
                balance.share += per_person;
                if balance.roommate_id != payer {
                    balance.owes_to = Some(payer);
                }
            }
        }
    }

    if let Some(balance) = balances.iter_mut().find(|b| b.roommate_id == payer) {
        balance.paid = total_visible;
    }

    BalanceSheet {
        balances,
        total_visible,
        total_distributed,
    }
}

/// Formats a net position for display: `+ CHF 12.00` to receive,
/// `- CHF 3.50` to pay, or `Settled`.
#[must_use]
pub fn format_net(net: f64, currency: &str) -> String {
    if net > 0.0 {
        format!("+ {currency} {net:.2}")
    } else if net < 0.0 {
        format!("- {currency} {:.2}", net.abs())
    } else {
        "Settled".to_string()
    }
}

/// One-line settlement summary for a roommate, e.g.
/// `Bob owes Alice CHF 3.50` or `Alice is owed CHF 3.50`.
#[must_use]
pub fn settlement_line(roommate: &Roommate, balance: &Balance, session: &SplitSession, currency: &str) -> String {
    let net = balance.net();
    if net > 0.0 {
        format!("{} is owed {currency} {net:.2}", roommate.name)
    } else if net < 0.0 {
        let payer_name = balance
            .owes_to
            .and_then(|id| session.roommate(id))
            .map_or("the payer", |r| r.name.as_str());
        format!("{} owes {payer_name} {currency} {:.2}", roommate.name, net.abs())
    } else {
        format!("{} is settled", roommate.name)
    }
}
