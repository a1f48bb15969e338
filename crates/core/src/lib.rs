//! Clementine Core - Shared types library.
//!
//! This crate provides common types used across all Clementine components:
//! - `gdpr` - Inactive-customer identification and removal
//! - `cli` - Command-line tools for maintenance jobs
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access. This
//! keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
