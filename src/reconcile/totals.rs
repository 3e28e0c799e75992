//! Monetary totals over normalized movements, in local currency.

use rust_decimal::Decimal;

use crate::models::{Movement, MovementKind};

fn to_local(kind: MovementKind, amount: Decimal, usd_rate: Decimal) -> Decimal {
    match kind {
        MovementKind::National => amount,
        MovementKind::International => amount * usd_rate,
    }
}

/// Per-period share of every movement: installment purchases are prorated and
/// international amounts converted.
pub fn total_billed_amount(movements: &[Movement], usd_rate: Decimal) -> Decimal {
    movements
        .iter()
        .map(|m| {
            let share = m.amount / Decimal::from(m.total_installments.max(1));
            to_local(m.kind, share, usd_rate)
        })
        .sum()
}

/// Full amount of every installment row that is not the final installment.
pub fn installments_total(movements: &[Movement]) -> Decimal {
    movements
        .iter()
        .filter(|m| m.total_installments > 1 && !m.is_last_installment())
        .map(|m| m.amount)
        .sum()
}

/// Sum of recurring charges, converted to local currency.
pub fn periodic_movements_amount(movements: &[Movement], usd_rate: Decimal) -> Decimal {
    movements
        .iter()
        .map(|m| to_local(m.kind, m.amount, usd_rate))
        .sum()
}
