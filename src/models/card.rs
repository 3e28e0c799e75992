use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Id;

/// One credit product under the authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardAccount {
    pub id: Id,
    pub display_name: String,
    pub masked_number: String,
}

impl CardAccount {
    pub fn new(
        id: impl Into<Id>,
        display_name: impl Into<String>,
        masked_number: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            masked_number: masked_number.into(),
        }
    }
}

/// A billing date as published by the provider.
///
/// `raw` is the provider's own text and is what gets sent back when asking
/// for that period's statement; `date` is only used for calendar logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDate {
    pub date: NaiveDate,
    pub raw: String,
}

impl BillingDate {
    pub fn new(date: NaiveDate, raw: impl Into<String>) -> Self {
        Self {
            date,
            raw: raw.into(),
        }
    }

    /// A date whose wire form is `YYYY-MM-DD`.
    pub fn iso(date: NaiveDate) -> Self {
        Self::new(date, date.format("%Y-%m-%d").to_string())
    }
}

impl fmt::Display for BillingDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.date.fmt(f)
    }
}

/// Billing dates published for a card, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDates {
    pub national: Vec<BillingDate>,
    pub international: Vec<BillingDate>,
    pub account_number: String,
}

impl BillingDates {
    /// The most recent (index 0) and prior (index 1) periods, as far as they exist.
    pub fn recent_periods(&self, card_id: &Id) -> Vec<BillingPeriod> {
        self.national
            .iter()
            .take(2)
            .enumerate()
            .map(|(idx, national)| BillingPeriod {
                card_id: card_id.clone(),
                billing_date: national.clone(),
                international_billing_date: self.international.get(idx).cloned(),
                account_number: self.account_number.clone(),
            })
            .collect()
    }
}

/// A closed billing cycle, used as the join key for billed-movement reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub card_id: Id,
    pub billing_date: BillingDate,
    /// International statements may close on a different day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub international_billing_date: Option<BillingDate>,
    pub account_number: String,
}

impl BillingPeriod {
    pub fn international_date(&self) -> &BillingDate {
        self.international_billing_date
            .as_ref()
            .unwrap_or(&self.billing_date)
    }
}
