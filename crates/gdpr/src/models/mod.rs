//! Value objects for the inactive-customer pipeline.

pub mod customer;
pub mod outcome;

pub use customer::{Customer, InactiveCandidate, InactivityCriteria};
pub use outcome::{DeletionOutcome, ProgressEvent};
