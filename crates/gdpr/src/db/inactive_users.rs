//! Repository for inactive-customer queries and deletion.
//!
//! The candidate predicate is assembled at runtime because the shop-scope
//! filter is optional; binds use `$n` placeholders throughout. The two
//! activity exclusions are independent `NOT EXISTS` anti-joins against the
//! connection and order relations: a customer may have zero or many rows in
//! each, and either one alone disqualifies a candidate, so a plain join
//! cannot express the predicate.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use clementine_core::{CustomerId, Email};

use super::RepositoryError;
use crate::models::{Customer, InactiveCandidate, InactivityCriteria};
use crate::services::CustomerStore;

/// Internal row type for candidate batch queries.
#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    id: i32,
    email: String,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CandidateRow> for InactiveCandidate {
    type Error = RepositoryError;

    fn try_from(row: CandidateRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: CustomerId::new(row.id),
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
        })
    }
}

/// Internal row type for full customer fetches.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    email: String,
    first_name: String,
    last_name: String,
    deleted: bool,
    is_guest: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: CustomerId::new(row.id),
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            deleted: row.deleted,
            is_guest: row.is_guest,
            created_at: row.created_at,
        })
    }
}

/// The inactivity predicate shared by the count and batch queries.
///
/// Bind order: `$1` = cutoff, `$2` = shop id (only when `with_shop`).
fn candidate_filter_sql(with_shop: bool) -> String {
    let mut sql = String::from(
        "c.created_at < $1 \
         AND c.deleted = FALSE \
         AND c.is_guest = FALSE \
         AND NOT EXISTS ( \
             SELECT 1 FROM storefront.customer_connection con \
             WHERE con.customer_id = c.id AND con.created_at >= $1 \
         ) \
         AND NOT EXISTS ( \
             SELECT 1 FROM storefront.customer_order o \
             WHERE o.customer_id = c.id AND o.created_at >= $1 \
         )",
    );

    if with_shop {
        sql.push_str(" AND cs.shop_id = $2");
    }

    sql
}

/// The optional shop-association join.
fn shop_join_sql(with_shop: bool) -> &'static str {
    if with_shop {
        " INNER JOIN storefront.customer_shop cs ON cs.customer_id = c.id"
    } else {
        ""
    }
}

/// COUNT query. DISTINCT is required: a customer can be associated with
/// several shops and the join would otherwise count it once per association.
fn count_sql(with_shop: bool) -> String {
    format!(
        "SELECT COUNT(DISTINCT c.id) FROM storefront.customer c{} WHERE {}",
        shop_join_sql(with_shop),
        candidate_filter_sql(with_shop),
    )
}

/// Batch query. Ordered by ascending id: the anti-join subqueries make pure
/// offset pagination order-sensitive, so a stable sort key is mandatory.
/// Bind order: cutoff, [shop id,] limit, offset.
fn batch_sql(with_shop: bool) -> String {
    let (limit_bind, offset_bind) = if with_shop { ("$3", "$4") } else { ("$2", "$3") };

    format!(
        "SELECT c.id, c.email, c.first_name, c.last_name, c.created_at \
         FROM storefront.customer c{} WHERE {} \
         ORDER BY c.id ASC LIMIT {limit_bind} OFFSET {offset_bind}",
        shop_join_sql(with_shop),
        candidate_filter_sql(with_shop),
    )
}

/// Repository for inactive-customer database operations.
///
/// Reads go to the read pool when one was supplied (replica routing for the
/// heavy scan queries); deletes always go to the primary.
pub struct InactiveUserRepository<'a> {
    pool: &'a PgPool,
    read_pool: Option<&'a PgPool>,
}

impl<'a> InactiveUserRepository<'a> {
    /// Create a repository that reads and writes through one pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            read_pool: None,
        }
    }

    /// Route read queries to a replica pool.
    #[must_use]
    pub const fn with_read_pool(mut self, read_pool: &'a PgPool) -> Self {
        self.read_pool = Some(read_pool);
        self
    }

    const fn read(&self) -> &PgPool {
        match self.read_pool {
            Some(pool) => pool,
            None => self.pool,
        }
    }

    /// Count distinct customers matching the inactivity criteria.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails. Never retried.
    pub async fn count_inactive(
        &self,
        criteria: &InactivityCriteria,
    ) -> Result<u64, RepositoryError> {
        let sql = count_sql(criteria.shop_id.is_some());
        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(criteria.cutoff());

        if let Some(shop_id) = criteria.shop_id {
            query = query.bind(shop_id.as_i32());
        }

        let count = query.fetch_one(self.read()).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Fetch one page of candidates at the given offset.
    ///
    /// Returns an empty vec, never an error, once the offset is past the end
    /// of the candidate set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if a stored email is invalid.
    pub async fn fetch_inactive_batch(
        &self,
        criteria: &InactivityCriteria,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<InactiveCandidate>, RepositoryError> {
        let sql = batch_sql(criteria.shop_id.is_some());
        let mut query = sqlx::query_as::<_, CandidateRow>(&sql).bind(criteria.cutoff());

        if let Some(shop_id) = criteria.shop_id {
            query = query.bind(shop_id.as_i32());
        }

        let rows = query
            .bind(limit)
            .bind(offset)
            .fetch_all(self.read())
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Whether the customer has at least one order, regardless of status or
    /// date.
    ///
    /// The batch query only excludes orders after the cutoff; an old order
    /// still blocks deletion, so this gate is re-checked at delete time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_orders(&self, id: CustomerId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM storefront.customer_order WHERE customer_id = $1)",
        )
        .bind(id)
        .fetch_one(self.read())
        .await?;

        Ok(exists)
    }

    /// Re-fetch a customer by id. `None` means the row no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT id, email, first_name, last_name, deleted, is_guest, created_at \
             FROM storefront.customer WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.read())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Delete a customer row. Returns `true` iff a row was removed.
    ///
    /// Always executed against the primary pool.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn delete(&self, id: CustomerId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.customer WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl CustomerStore for InactiveUserRepository<'_> {
    async fn count_inactive(&self, criteria: &InactivityCriteria) -> Result<u64, RepositoryError> {
        Self::count_inactive(self, criteria).await
    }

    async fn fetch_inactive_batch(
        &self,
        criteria: &InactivityCriteria,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<InactiveCandidate>, RepositoryError> {
        Self::fetch_inactive_batch(self, criteria, limit, offset).await
    }

    async fn has_orders(&self, id: CustomerId) -> Result<bool, RepositoryError> {
        Self::has_orders(self, id).await
    }

    async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Self::get_by_id(self, id).await
    }

    async fn delete(&self, id: CustomerId) -> Result<bool, RepositoryError> {
        Self::delete(self, id).await
    }
}
