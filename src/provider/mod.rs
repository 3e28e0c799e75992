//! Read access to the card provider.

mod client;
mod error;
mod retry;
pub mod types;

pub use client::BankClient;
pub use error::FetchError;
pub use retry::RetryPolicy;
pub use types::{BilledRow, BilledStatement, UnbilledRow};

use anyhow::Result;
use rust_decimal::Decimal;

use crate::models::{BillingDates, BillingPeriod, CardAccount, Id, MovementKind};

/// The five reads the reconciler needs from the provider.
///
/// All reads are independent and side-effect free, so implementations may be
/// called concurrently for different periods of the same card.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Credit cards held by the authenticated identity.
    async fn list_cards(&self) -> Result<Vec<CardAccount>>;

    /// National and international billing dates, most recent first.
    async fn billing_dates(&self, card_id: &Id) -> Result<BillingDates>;

    /// Movements not yet attributed to a billing period.
    async fn unbilled_movements(&self, card_id: &Id) -> Result<Vec<UnbilledRow>>;

    /// Billed statement of one period in one domain: itemized rows plus the
    /// statement total.
    async fn billed_statement(
        &self,
        period: &BillingPeriod,
        domain: MovementKind,
    ) -> Result<BilledStatement>;

    /// Current USD exchange rate in local currency.
    async fn usd_rate(&self) -> Result<Decimal>;
}
