//! Customer entities and the inactivity criteria value object.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use clementine_core::{CustomerId, Email, ShopId};

/// A customer account as stored in `storefront.customer`.
///
/// Customers pre-exist this module and outlive it; the pipeline only reads
/// them and conditionally deletes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    /// Stable primary key.
    pub id: CustomerId,
    /// Email address, used both as identity and as export payload.
    pub email: Email,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Soft-delete flag; soft-deleted accounts are never candidates.
    pub deleted: bool,
    /// Guest checkout accounts are never candidates.
    pub is_guest: bool,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

/// One row of a candidate batch page.
///
/// Pages are produced in strictly ascending `id` order, so a single
/// read-only scan neither duplicates nor skips records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InactiveCandidate {
    /// Stable primary key.
    pub id: CustomerId,
    /// Email address.
    pub email: Email,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

/// Criteria selecting which customers count as inactive.
///
/// Immutable per invocation. `inactive_days` is validated to be positive at
/// the CLI boundary before a criteria value is ever constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InactivityCriteria {
    /// Days without login or order activity before an account is a candidate.
    pub inactive_days: u32,
    /// Restrict the scan to customers associated with this shop.
    pub shop_id: Option<ShopId>,
}

impl InactivityCriteria {
    /// Create criteria covering all shops.
    #[must_use]
    pub const fn new(inactive_days: u32) -> Self {
        Self {
            inactive_days,
            shop_id: None,
        }
    }

    /// Restrict the criteria to a single shop.
    #[must_use]
    pub const fn with_shop(mut self, shop_id: ShopId) -> Self {
        self.shop_id = Some(shop_id);
        self
    }

    /// The activity cutoff: now minus `inactive_days` days.
    ///
    /// Registrations, logins and orders at or after this instant keep an
    /// account out of the candidate set.
    #[must_use]
    pub fn cutoff(&self) -> DateTime<Utc> {
        Utc::now() - Duration::days(i64::from(self.inactive_days))
    }
}
