use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which aggregation path produced a card's totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    /// Current period already billed; totals come from the coarse statement summary.
    Billed,
    /// Period still open; totals come from itemized movements.
    Pending,
}

/// Per-card result of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardTotals {
    pub card_id: String,
    pub display_name: String,
    pub masked_number: String,
    pub state: CardState,
    pub unbilled_total: Decimal,
    pub outstanding_installment_total: Decimal,
    pub recurring_total: Decimal,
    /// Number of distinct recurring charges behind `recurring_total`.
    #[serde(default)]
    pub recurring_count: usize,
}

/// Sums across every card in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateTotals {
    pub unbilled_total: Decimal,
    pub outstanding_installment_total: Decimal,
    pub recurring_total: Decimal,
    pub grand_total: Decimal,
}

impl AggregateTotals {
    pub fn from_cards<'a>(cards: impl IntoIterator<Item = &'a CardTotals>) -> Self {
        let mut totals = Self::default();
        for card in cards {
            totals.unbilled_total += card.unbilled_total;
            totals.outstanding_installment_total += card.outstanding_installment_total;
            totals.recurring_total += card.recurring_total;
        }
        totals.grand_total =
            totals.unbilled_total + totals.outstanding_installment_total + totals.recurring_total;
        totals
    }
}

/// The persisted aggregate result of one run. Never edited once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub timestamp: DateTime<Utc>,
    pub usd_rate: Decimal,
    pub cards: BTreeMap<String, CardTotals>,
    pub totals: AggregateTotals,
    pub fixed_expenses_total: Decimal,
    /// Cards skipped because their data could not be fetched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_cards: Vec<String>,
}

impl RunSnapshot {
    pub fn new(
        timestamp: DateTime<Utc>,
        usd_rate: Decimal,
        cards: Vec<CardTotals>,
        fixed_expenses_total: Decimal,
    ) -> Self {
        let totals = AggregateTotals::from_cards(&cards);
        let cards = cards
            .into_iter()
            .map(|card| (card.card_id.clone(), card))
            .collect();
        Self {
            timestamp,
            usd_rate,
            cards,
            totals,
            fixed_expenses_total,
            failed_cards: Vec::new(),
        }
    }

    pub fn with_failed_cards(mut self, failed: Vec<String>) -> Self {
        self.failed_cards = failed;
        self
    }
}
