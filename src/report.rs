//! Console report rendering.
//!
//! Every function here is pure: the caller passes the nesting level explicitly
//! and gets a string back.

use crate::config::DisplayConfig;
use crate::format::{format_amount, format_rate};
use crate::models::{CardState, RunSnapshot};

/// Prefix shown before a report line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// A step being performed.
    Step,
    /// A computed value.
    Result,
    /// Something the reader should look at.
    Warning,
}

impl Marker {
    fn as_str(&self) -> &'static str {
        match self {
            Marker::Step => "[+]",
            Marker::Result => "[=]",
            Marker::Warning => "[!]",
        }
    }
}

/// Render one line at the given nesting level (one tab per level).
pub fn render_line(level: usize, marker: Marker, text: &str) -> String {
    format!("{}{} {}", "\t".repeat(level), marker.as_str(), text)
}

/// Render a whole snapshot as report lines.
pub fn render_snapshot(snapshot: &RunSnapshot, display: &DisplayConfig) -> Vec<String> {
    let mut lines = vec![
        render_line(
            0,
            Marker::Step,
            &format!("Snapshot {}", snapshot.timestamp.to_rfc3339()),
        ),
        render_line(
            1,
            Marker::Result,
            &format!("USD rate: {}", format_rate(snapshot.usd_rate)),
        ),
    ];

    for card in snapshot.cards.values() {
        let label = if card.display_name.is_empty() {
            card.card_id.clone()
        } else {
            format!("{} {}", card.display_name, card.masked_number)
        };
        lines.push(render_line(1, Marker::Step, &format!("Card: {label}")));
        let state = match card.state {
            CardState::Billed => "period already billed (statement summary)",
            CardState::Pending => "period open (itemized movements)",
        };
        lines.push(render_line(2, Marker::Result, state));
        lines.push(render_line(
            2,
            Marker::Result,
            &format!("Unbilled: {}", format_amount(card.unbilled_total, display)),
        ));
        lines.push(render_line(
            2,
            Marker::Result,
            &format!(
                "Installments: {}",
                format_amount(card.outstanding_installment_total, display)
            ),
        ));
        lines.push(render_line(
            2,
            Marker::Result,
            &format!(
                "Recurring ({}): {}",
                card.recurring_count,
                format_amount(card.recurring_total, display)
            ),
        ));
    }

    for card_id in &snapshot.failed_cards {
        lines.push(render_line(
            1,
            Marker::Warning,
            &format!("Card {card_id} skipped: data could not be fetched"),
        ));
    }

    let totals = &snapshot.totals;
    lines.push(render_line(0, Marker::Step, "Totals"));
    lines.push(render_line(
        1,
        Marker::Result,
        &format!("Unbilled: {}", format_amount(totals.unbilled_total, display)),
    ));
    lines.push(render_line(
        1,
        Marker::Result,
        &format!(
            "Installments: {}",
            format_amount(totals.outstanding_installment_total, display)
        ),
    ));
    lines.push(render_line(
        1,
        Marker::Result,
        &format!("Recurring: {}", format_amount(totals.recurring_total, display)),
    ));
    lines.push(render_line(
        1,
        Marker::Result,
        &format!("Total: {}", format_amount(totals.grand_total, display)),
    ));
    lines.push(render_line(
        1,
        Marker::Result,
        &format!(
            "Fixed expenses: {}",
            format_amount(snapshot.fixed_expenses_total, display)
        ),
    ));

    lines
}
