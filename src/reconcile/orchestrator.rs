//! Runs one reconciliation across every card and produces a snapshot.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_decimal::Decimal;

use crate::clock::{Clock, SystemClock};
use crate::config::ResolvedConfig;
use crate::models::{
    BillingPeriod, CardAccount, CardState, CardTotals, IdGenerator, Movement, MovementKind,
    RunSnapshot, UuidIdGenerator,
};
use crate::provider::{BilledStatement, DataSource};
use crate::storage::{SavedSnapshot, SnapshotStore};

use super::billing::BillingState;
use super::detector::detect_recurring;
use super::matcher::{policy_from_config, SimilarityPolicy, WordOverlap};
use super::normalize::{
    normalize_international_billed, normalize_national_billed, normalize_unbilled,
};
use super::totals::{installments_total, periodic_movements_amount, total_billed_amount};

/// Coordinates provider reads, normalization, detection and aggregation.
pub struct Reconciler {
    source: Arc<dyn DataSource>,
    policy: Box<dyn SimilarityPolicy>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    timezone: Tz,
    isolate_card_failures: bool,
    fixed_expenses_total: Decimal,
}

impl Reconciler {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            policy: Box::new(WordOverlap::default()),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidIdGenerator),
            timezone: chrono_tz::America::Santiago,
            isolate_card_failures: false,
            fixed_expenses_total: Decimal::ZERO,
        }
    }

    pub fn from_config(source: Arc<dyn DataSource>, config: &ResolvedConfig) -> Self {
        Self::new(source)
            .with_policy(policy_from_config(&config.matching))
            .with_timezone(config.timezone)
            .isolate_card_failures(config.run.isolate_card_failures)
            .with_fixed_expenses_total(config.fixed_expenses_total())
    }

    pub fn with_policy(mut self, policy: Box<dyn SimilarityPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn isolate_card_failures(mut self, isolate: bool) -> Self {
        self.isolate_card_failures = isolate;
        self
    }

    pub fn with_fixed_expenses_total(mut self, total: Decimal) -> Self {
        self.fixed_expenses_total = total;
        self
    }

    /// Reconcile every card. Cards are processed one at a time since they
    /// share one session.
    pub async fn run(&self) -> Result<RunSnapshot> {
        let timestamp = self.clock.now();
        let today = self.clock.today_in(self.timezone);

        let usd_rate = self
            .source
            .usd_rate()
            .await
            .context("Failed to fetch USD exchange rate")?;
        tracing::info!(usd_rate = %usd_rate, "fetched exchange rate");

        let cards = self
            .source
            .list_cards()
            .await
            .context("Failed to list credit cards")?;
        tracing::info!(cards = cards.len(), "found credit cards");

        let mut totals = Vec::with_capacity(cards.len());
        let mut failed = Vec::new();

        for card in &cards {
            match self.reconcile_card(card, usd_rate, today).await {
                Ok(card_totals) => totals.push(card_totals),
                Err(err) if self.isolate_card_failures => {
                    let error = format!("{err:#}");
                    tracing::warn!(card_id = %card.id, error = %error, "skipping card after fetch failure");
                    failed.push(card.id.to_string());
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("Failed to reconcile card {}", card.id))
                }
            }
        }

        Ok(RunSnapshot::new(timestamp, usd_rate, totals, self.fixed_expenses_total)
            .with_failed_cards(failed))
    }

    /// Run and persist the snapshot.
    pub async fn run_and_save(
        &self,
        store: &dyn SnapshotStore,
    ) -> Result<(RunSnapshot, SavedSnapshot)> {
        let snapshot = self.run().await?;
        let saved = store
            .save(&snapshot)
            .await
            .context("Failed to save snapshot")?;
        Ok((snapshot, saved))
    }

    async fn reconcile_card(
        &self,
        card: &CardAccount,
        usd_rate: Decimal,
        today: NaiveDate,
    ) -> Result<CardTotals> {
        let dates = self
            .source
            .billing_dates(&card.id)
            .await
            .context("Failed to fetch billing dates")?;

        let mut totals = CardTotals {
            card_id: card.id.to_string(),
            display_name: card.display_name.clone(),
            masked_number: card.masked_number.clone(),
            state: CardState::Pending,
            unbilled_total: Decimal::ZERO,
            outstanding_installment_total: Decimal::ZERO,
            recurring_total: Decimal::ZERO,
            recurring_count: 0,
        };

        match BillingState::resolve(&card.id, &dates, today) {
            BillingState::Billed { period } => {
                tracing::info!(
                    card_id = %card.id,
                    billing_date = %period.billing_date,
                    "period already billed, using statement summary"
                );
                let (national, international) = tokio::try_join!(
                    self.source.billed_statement(&period, MovementKind::National),
                    self.source
                        .billed_statement(&period, MovementKind::International),
                )
                .context("Failed to fetch billed summary")?;

                totals.state = CardState::Billed;
                totals.unbilled_total =
                    national.billed_amount + international.billed_amount * usd_rate;
            }
            BillingState::Pending { periods } => {
                tracing::info!(
                    card_id = %card.id,
                    periods = periods.len(),
                    "period open, reconciling movements"
                );
                self.reconcile_movements(card, &periods, usd_rate, &mut totals)
                    .await?;
            }
        }

        tracing::info!(
            card_id = %card.id,
            unbilled = %totals.unbilled_total,
            installments = %totals.outstanding_installment_total,
            recurring = %totals.recurring_total,
            "card reconciled"
        );
        Ok(totals)
    }

    async fn reconcile_movements(
        &self,
        card: &CardAccount,
        periods: &[BillingPeriod],
        usd_rate: Decimal,
        totals: &mut CardTotals,
    ) -> Result<()> {
        let ids = self.ids.as_ref();

        let unbilled_rows = self
            .source
            .unbilled_movements(&card.id)
            .await
            .context("Failed to fetch unbilled movements")?;
        let unbilled = normalize_unbilled(&unbilled_rows, ids);

        let national = self
            .fetch_statements(periods, MovementKind::National)
            .await
            .context("Failed to fetch national billed movements")?;
        let international = self
            .fetch_statements(periods, MovementKind::International)
            .await
            .context("Failed to fetch international billed movements")?;

        let national: Vec<Vec<Movement>> = national
            .iter()
            .map(|statement| normalize_national_billed(statement, ids))
            .collect();
        let international: Vec<Vec<Movement>> = international
            .iter()
            .map(|statement| normalize_international_billed(statement, ids))
            .collect();

        let mut pool = unbilled.clone();
        pool.extend(national.iter().flatten().cloned());
        pool.extend(international.iter().flatten().cloned());
        let recurring = detect_recurring(&pool, self.policy.as_ref());

        totals.unbilled_total = total_billed_amount(&unbilled, usd_rate);
        totals.outstanding_installment_total = national
            .first()
            .map(|latest| installments_total(latest))
            .unwrap_or(Decimal::ZERO);
        totals.recurring_total = periodic_movements_amount(&recurring, usd_rate);
        totals.recurring_count = recurring.len();
        Ok(())
    }

    /// Billed statements for the given periods, most recent first. Both periods
    /// are fetched concurrently.
    async fn fetch_statements(
        &self,
        periods: &[BillingPeriod],
        domain: MovementKind,
    ) -> Result<Vec<BilledStatement>> {
        match periods {
            [] => Ok(Vec::new()),
            [only] => Ok(vec![self.source.billed_statement(only, domain).await?]),
            [latest, prior, ..] => {
                let (latest, prior) = tokio::try_join!(
                    self.source.billed_statement(latest, domain),
                    self.source.billed_statement(prior, domain),
                )?;
                Ok(vec![latest, prior])
            }
        }
    }
}
