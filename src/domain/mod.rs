// Domain types and value objects
mod observation;

pub use observation::{FundingObservation, ObservationKey, Record, SnapshotRow};
