//! Clementine GDPR - Inactive-customer identification and removal.
//!
//! This crate implements the batched scan-and-mutate pipeline behind the
//! `clem export-emails` and `clem remove` maintenance commands:
//!
//! - [`db`] - `PostgreSQL` query layer ([`db::InactiveUserRepository`]):
//!   counting and paginated fetching of inactivity candidates, plus the
//!   delete-time order safety check.
//! - [`services`] - The batch orchestrator ([`services::InactiveUserService`]):
//!   drives export and removal runs page by page, reports progress through a
//!   caller-supplied callback, and aggregates outcome counts.
//! - [`models`] - Value objects shared by both layers.
//!
//! The orchestrator depends only on the [`services::CustomerStore`] trait,
//! never on the concrete repository, so it can be exercised against an
//! in-memory store in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod db;
pub mod models;
pub mod services;

pub use db::{InactiveUserRepository, RepositoryError, create_pool};
pub use models::{Customer, DeletionOutcome, InactiveCandidate, InactivityCriteria, ProgressEvent};
pub use services::{CustomerStore, InactiveUserService};
