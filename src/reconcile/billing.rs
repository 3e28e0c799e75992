//! Whether a card's latest billing period already closed this month.

use chrono::{Datelike, NaiveDate};

use crate::models::{BillingDates, BillingPeriod, Id};

/// True when `billing_date` falls in the same calendar month and year as `today`.
pub fn already_billed_this_month(billing_date: NaiveDate, today: NaiveDate) -> bool {
    billing_date.year() == today.year() && billing_date.month() == today.month()
}

/// Which aggregation path a card takes this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingState {
    /// The most recent period closed this month; only its summary is meaningful.
    Billed { period: BillingPeriod },
    /// Movements are still itemized. `periods` holds the most recent period
    /// first and may be empty for a card that was never billed.
    Pending { periods: Vec<BillingPeriod> },
}

impl BillingState {
    pub fn resolve(card_id: &Id, dates: &BillingDates, today: NaiveDate) -> Self {
        let mut periods = dates.recent_periods(card_id);
        match periods.first() {
            Some(latest) if already_billed_this_month(latest.billing_date.date, today) => {
                BillingState::Billed {
                    period: periods.swap_remove(0),
                }
            }
            _ => BillingState::Pending { periods },
        }
    }

    pub fn is_billed(&self) -> bool {
        matches!(self, BillingState::Billed { .. })
    }
}
