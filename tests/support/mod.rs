#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use cardbook::models::{BillingDate, BillingDates, BillingPeriod, CardAccount, Id, MovementKind};
use cardbook::provider::{BilledRow, BilledStatement, DataSource, UnbilledRow};
use rust_decimal::Decimal;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

pub fn unbilled(amount: &str, origin: &str, description: &str, current: &str, total: &str) -> UnbilledRow {
    UnbilledRow {
        monto_compra: dec(amount),
        origen_transaccion: origin.to_string(),
        fecha_transaccion: "2024-05-10".to_string(),
        glosa_transaccion: description.to_string(),
        numero_cuotas: current.to_string(),
        numero_total_cuotas: total.to_string(),
    }
}

pub fn billed(amount: &str, description: &str, cuotas: &str) -> BilledRow {
    BilledRow {
        monto_transaccion: dec(amount),
        fecha_transaccion: "2024-04-10".to_string(),
        descripcion: description.to_string(),
        cuotas: cuotas.to_string(),
        totales: Some(false),
    }
}

pub fn statement(rows: Vec<BilledRow>) -> BilledStatement {
    BilledStatement {
        operations: rows,
        installment_purchases: Vec::new(),
        billed_amount: Decimal::ZERO,
    }
}

pub fn summary(amount: &str) -> BilledStatement {
    BilledStatement {
        billed_amount: dec(amount),
        ..BilledStatement::default()
    }
}

/// In-memory data source keyed by card id and billing date.
#[derive(Default)]
pub struct MockSource {
    pub usd_rate: Decimal,
    pub cards: Vec<CardAccount>,
    pub dates: HashMap<String, BillingDates>,
    pub unbilled: HashMap<String, Vec<UnbilledRow>>,
    pub statements: HashMap<(String, NaiveDate, MovementKind), BilledStatement>,
    pub failing_cards: HashSet<String>,
    pub statement_calls: AtomicUsize,
    pub unbilled_calls: AtomicUsize,
}

impl MockSource {
    pub fn new(usd_rate: &str) -> Self {
        Self {
            usd_rate: dec(usd_rate),
            ..Self::default()
        }
    }

    pub fn with_card(mut self, id: &str, national_dates: Vec<NaiveDate>) -> Self {
        self.cards
            .push(CardAccount::new(id, format!("Visa {id}"), "****1234"));
        self.dates.insert(
            id.to_string(),
            BillingDates {
                national: national_dates.into_iter().map(BillingDate::iso).collect(),
                international: Vec::new(),
                account_number: format!("acct-{id}"),
            },
        );
        self
    }

    pub fn with_unbilled(mut self, id: &str, rows: Vec<UnbilledRow>) -> Self {
        self.unbilled.insert(id.to_string(), rows);
        self
    }

    pub fn with_statement(
        mut self,
        id: &str,
        billing_date: NaiveDate,
        domain: MovementKind,
        statement: BilledStatement,
    ) -> Self {
        self.statements
            .insert((id.to_string(), billing_date, domain), statement);
        self
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failing_cards.insert(id.to_string());
        self
    }

    fn check(&self, card_id: &Id) -> Result<()> {
        if self.failing_cards.contains(card_id.as_str()) {
            anyhow::bail!("provider unavailable for card {card_id}");
        }
        Ok(())
    }
}

#[async_trait]
impl DataSource for MockSource {
    async fn list_cards(&self) -> Result<Vec<CardAccount>> {
        Ok(self.cards.clone())
    }

    async fn billing_dates(&self, card_id: &Id) -> Result<BillingDates> {
        self.check(card_id)?;
        Ok(self.dates.get(card_id.as_str()).cloned().unwrap_or_default())
    }

    async fn unbilled_movements(&self, card_id: &Id) -> Result<Vec<UnbilledRow>> {
        self.check(card_id)?;
        self.unbilled_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.unbilled.get(card_id.as_str()).cloned().unwrap_or_default())
    }

    async fn billed_statement(
        &self,
        period: &BillingPeriod,
        domain: MovementKind,
    ) -> Result<BilledStatement> {
        self.check(&period.card_id)?;
        self.statement_calls.fetch_add(1, Ordering::SeqCst);
        let date = match domain {
            MovementKind::National => period.billing_date.date,
            MovementKind::International => period.international_date().date,
        };
        Ok(self
            .statements
            .get(&(period.card_id.to_string(), date, domain))
            .cloned()
            .unwrap_or_default())
    }

    async fn usd_rate(&self) -> Result<Decimal> {
        Ok(self.usd_rate)
    }
}
