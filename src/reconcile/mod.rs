//! Movement reconciliation: normalization, recurring-charge detection,
//! billing-state resolution and totals.

pub mod billing;
pub mod detector;
pub mod matcher;
pub mod normalize;
mod orchestrator;
pub mod totals;

pub use billing::{already_billed_this_month, BillingState};
pub use detector::detect_recurring;
pub use matcher::{policy_from_config, SimilarityPolicy, StrictWordOverlap, WordOverlap};
pub use orchestrator::Reconciler;
pub use totals::{installments_total, periodic_movements_amount, total_billed_amount};
