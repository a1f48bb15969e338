//! Batch orchestration for export and removal runs.

pub mod inactive_users;

pub use inactive_users::{CustomerStore, InactiveUserService};
