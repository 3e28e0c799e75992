mod card;
mod id;
mod id_generator;
mod movement;
mod snapshot;

pub use card::{BillingDate, BillingDates, BillingPeriod, CardAccount};
pub use id::Id;
pub use id_generator::{FixedIdGenerator, IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use movement::{Movement, MovementKind};
pub use snapshot::{AggregateTotals, CardState, CardTotals, RunSnapshot};
