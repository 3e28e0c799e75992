use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Id, IdGenerator};

/// Settlement domain of a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Settled in local currency (CLP).
    National,
    /// Settled in USD and converted at the run's exchange rate.
    International,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::National => "national",
            MovementKind::International => "international",
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single card charge, normalized from provider data.
///
/// Movements are rebuilt on every run and never persisted; `id` only exists so
/// the recurring-charge detector can tell a movement apart from an identical
/// twin in the same pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: Id,
    pub kind: MovementKind,
    /// Non-negative amount in the movement's own currency.
    pub amount: Decimal,
    pub date: Option<NaiveDate>,
    pub description: String,
    pub installment: u32,
    pub total_installments: u32,
}

impl Movement {
    pub fn new(kind: MovementKind, amount: Decimal, description: impl Into<String>) -> Self {
        Self::new_with_generator(&super::UuidIdGenerator, kind, amount, description)
    }

    pub fn new_with_generator(
        ids: &dyn IdGenerator,
        kind: MovementKind,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: ids.new_id(),
            kind,
            amount,
            date: None,
            description: description.into(),
            installment: 1,
            total_installments: 1,
        }
    }

    /// Set the installment slice, keeping `1 <= installment <= total`.
    pub fn with_installments(mut self, installment: u32, total: u32) -> Self {
        let total = total.max(1);
        self.total_installments = total;
        self.installment = installment.clamp(1, total);
        self
    }

    /// True for single-shot purchases, the only candidates for recurring detection.
    pub fn is_single_payment(&self) -> bool {
        self.total_installments == 1
    }

    /// True when this row is the final slice of an installment purchase.
    pub fn is_last_installment(&self) -> bool {
        self.installment == self.total_installments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installments_are_clamped_to_total() {
        let movement = Movement::new(MovementKind::National, Decimal::ONE, "x")
            .with_installments(9, 6);
        assert_eq!(movement.installment, 6);
        assert_eq!(movement.total_installments, 6);

        let movement = Movement::new(MovementKind::National, Decimal::ONE, "x")
            .with_installments(0, 0);
        assert_eq!(movement.installment, 1);
        assert_eq!(movement.total_installments, 1);
        assert!(movement.is_single_payment());
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&MovementKind::International).unwrap();
        assert_eq!(json, "\"international\"");
    }
}
