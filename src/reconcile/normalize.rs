//! Raw provider rows to [`Movement`]s.

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::models::{IdGenerator, Movement, MovementKind};
use crate::provider::types::{parse_provider_date, NATIONAL_ORIGIN};
use crate::provider::{BilledRow, BilledStatement, UnbilledRow};

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s{2,}").expect("valid whitespace regex"))
}

/// Collapse every run of two or more whitespace characters into one space.
pub fn normalize_description(raw: &str) -> String {
    whitespace_runs().replace_all(raw, " ").into_owned()
}

fn parse_count(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

/// Parse a `"current/total"` installment field; anything unparseable is 1/1.
pub fn parse_installments(raw: &str) -> (u32, u32) {
    let mut parts = raw.split('/');
    let current = parts.next().and_then(parse_count);
    let total = parts.next().and_then(parse_count);
    match (current, total) {
        (Some(current), Some(total)) => (current, total),
        _ => (1, 1),
    }
}

fn parse_date(raw: &str) -> Option<chrono::NaiveDate> {
    let date = parse_provider_date(raw);
    if date.is_none() && !raw.trim().is_empty() {
        tracing::debug!(raw, "unrecognized movement date");
    }
    date
}

/// Normalize unbilled rows. Refunds and reversals (negative amounts) are dropped.
pub fn normalize_unbilled(rows: &[UnbilledRow], ids: &dyn IdGenerator) -> Vec<Movement> {
    rows.iter()
        .filter(|row| row.monto_compra >= Decimal::ZERO)
        .map(|row| {
            let kind = if row.origen_transaccion == NATIONAL_ORIGIN {
                MovementKind::National
            } else {
                MovementKind::International
            };
            // A total of "0" marks a purchase without installments.
            let total = parse_count(&row.numero_total_cuotas).unwrap_or(1);
            let current = parse_count(&row.numero_cuotas).unwrap_or(1);

            let mut movement = Movement::new_with_generator(
                ids,
                kind,
                row.monto_compra,
                normalize_description(&row.glosa_transaccion),
            )
            .with_installments(current, total);
            movement.date = parse_date(&row.fecha_transaccion);
            movement
        })
        .collect()
}

fn billed_rows(statement: &BilledStatement) -> impl Iterator<Item = &BilledRow> {
    statement
        .operations
        .iter()
        .chain(statement.installment_purchases.iter())
        .filter(|row| row.totales == Some(false) && row.monto_transaccion >= Decimal::ZERO)
}

/// Normalize a national billed statement: both sections, subtotal rows dropped.
pub fn normalize_national_billed(
    statement: &BilledStatement,
    ids: &dyn IdGenerator,
) -> Vec<Movement> {
    billed_rows(statement)
        .map(|row| {
            let (current, total) = parse_installments(&row.cuotas);
            let mut movement = Movement::new_with_generator(
                ids,
                MovementKind::National,
                row.monto_transaccion,
                normalize_description(&row.descripcion),
            )
            .with_installments(current, total);
            movement.date = parse_date(&row.fecha_transaccion);
            movement
        })
        .collect()
}

/// Normalize an international billed statement. These never carry installments.
pub fn normalize_international_billed(
    statement: &BilledStatement,
    ids: &dyn IdGenerator,
) -> Vec<Movement> {
    billed_rows(statement)
        .map(|row| {
            let mut movement = Movement::new_with_generator(
                ids,
                MovementKind::International,
                row.monto_transaccion,
                normalize_description(&row.descripcion),
            );
            movement.date = parse_date(&row.fecha_transaccion);
            movement
        })
        .collect()
}
