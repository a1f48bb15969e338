//! The batch orchestrator: read-only email export and destructive removal.
//!
//! Both paths page through the candidate set one batch at a time and never
//! hold more than one page in memory (plus, for export, the emails collected
//! so far). The offset policy differs between modes and is load-bearing; see
//! [`InactiveUserService::remove_inactive_users`].

use clementine_core::{CustomerId, Email};

use crate::db::RepositoryError;
use crate::models::{Customer, DeletionOutcome, InactiveCandidate, InactivityCriteria, ProgressEvent};

/// Storage operations the orchestrator needs.
///
/// [`crate::db::InactiveUserRepository`] is the production implementation;
/// tests use an in-memory store. The orchestrator is generic over this
/// trait, so no dynamic dispatch is involved.
#[allow(async_fn_in_trait)]
pub trait CustomerStore {
    /// Count distinct customers matching the criteria.
    async fn count_inactive(&self, criteria: &InactivityCriteria) -> Result<u64, RepositoryError>;

    /// Fetch one candidate page, ascending by id. Empty once exhausted.
    async fn fetch_inactive_batch(
        &self,
        criteria: &InactivityCriteria,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<InactiveCandidate>, RepositoryError>;

    /// Whether the customer has at least one order of any age.
    async fn has_orders(&self, id: CustomerId) -> Result<bool, RepositoryError>;

    /// Re-fetch a customer by id; `None` if the row no longer exists.
    async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;

    /// Delete a customer row; `true` iff a row was removed.
    async fn delete(&self, id: CustomerId) -> Result<bool, RepositoryError>;
}

/// Per-record progress callback. Advisory only: display formatting and
/// throttling belong to the caller.
pub type ProgressFn<'a> = &'a mut dyn FnMut(&ProgressEvent);

/// Drives the inactive-customer scan over a [`CustomerStore`].
pub struct InactiveUserService<S> {
    store: S,
}

impl<S: CustomerStore> InactiveUserService<S> {
    /// Create a service over the given store.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Count customers matching the criteria.
    ///
    /// # Errors
    ///
    /// Propagates `RepositoryError` from the store.
    pub async fn count_inactive(
        &self,
        criteria: &InactivityCriteria,
    ) -> Result<u64, RepositoryError> {
        self.store.count_inactive(criteria).await
    }

    /// Collect the email of every matching customer.
    ///
    /// Pages at offsets 0, `batch_size`, 2 * `batch_size`, ... and stops when
    /// a page comes back shorter than `batch_size`. Pure read path: the
    /// offset always advances.
    ///
    /// # Errors
    ///
    /// Propagates `RepositoryError` from the store.
    pub async fn export_emails(
        &self,
        criteria: &InactivityCriteria,
        batch_size: u32,
    ) -> Result<Vec<Email>, RepositoryError> {
        // A zero batch size would never terminate the loop.
        let batch_size = batch_size.max(1);
        let limit = i64::from(batch_size);

        let mut emails = Vec::new();
        let mut offset: i64 = 0;

        loop {
            let page = self
                .store
                .fetch_inactive_batch(criteria, limit, offset)
                .await?;

            emails.extend(page.iter().map(|candidate| candidate.email.clone()));
            offset += limit;

            if page.len() < batch_size as usize {
                break;
            }
        }

        Ok(emails)
    }

    /// Delete (or simulate deleting) every matching customer.
    ///
    /// `total` is measured once up front and used only for progress display;
    /// it is not refreshed as live deletions shrink the candidate set.
    ///
    /// Offset policy: in dry-run mode the offset advances by `batch_size`
    /// after each page, since nothing is removed and pagination must move
    /// forward. In live mode the offset stays at 0 for every fetch, because
    /// deleting rows shifts the remaining candidates into the current
    /// window; advancing would skip records.
    ///
    /// Per-record failures are captured into the outcome and the run
    /// continues; only page-level fetch or count failures abort the run.
    ///
    /// # Errors
    ///
    /// Propagates `RepositoryError` from the initial count or a page fetch.
    pub async fn remove_inactive_users(
        &self,
        criteria: &InactivityCriteria,
        batch_size: u32,
        dry_run: bool,
        mut on_progress: Option<ProgressFn<'_>>,
    ) -> Result<DeletionOutcome, RepositoryError> {
        let batch_size = batch_size.max(1);
        let limit = i64::from(batch_size);

        let total = self.store.count_inactive(criteria).await?;

        let mut outcome = DeletionOutcome::default();
        let mut processed: u64 = 0;
        let mut offset: i64 = 0;

        loop {
            let page = self
                .store
                .fetch_inactive_batch(criteria, limit, offset)
                .await?;

            for candidate in &page {
                processed += 1;

                if let Err(e) = self
                    .process_candidate(
                        candidate,
                        dry_run,
                        processed,
                        total,
                        &mut on_progress,
                        &mut outcome,
                    )
                    .await
                {
                    outcome
                        .errors
                        .push(format!("error processing customer #{}: {e}", candidate.id));
                }
            }

            if dry_run {
                offset += limit;
            }

            if page.len() < batch_size as usize {
                break;
            }
        }

        tracing::debug!(
            deleted = outcome.deleted,
            skipped = outcome.skipped,
            errors = outcome.errors.len(),
            dry_run,
            "removal run finished"
        );

        Ok(outcome)
    }

    /// Handle one candidate record. Store errors bubble up to be recorded
    /// against this record; they never abort the run.
    async fn process_candidate(
        &self,
        candidate: &InactiveCandidate,
        dry_run: bool,
        processed: u64,
        total: u64,
        on_progress: &mut Option<ProgressFn<'_>>,
        outcome: &mut DeletionOutcome,
    ) -> Result<(), RepositoryError> {
        // Re-validate: the row may have changed since the page was read. A
        // vanished record is a silent skip, not an error.
        let Some(customer) = self.store.get_by_id(candidate.id).await? else {
            return Ok(());
        };

        if let Some(callback) = on_progress.as_deref_mut() {
            callback(&ProgressEvent {
                current: processed,
                total,
                email: customer.email.to_string(),
            });
        }

        // Orders of any age block deletion; the batch query only excluded
        // orders after the cutoff. This re-check must happen at delete time.
        if self.store.has_orders(customer.id).await? {
            outcome.skipped += 1;
            outcome.errors.push(format!(
                "customer #{} ({}) has orders and cannot be deleted",
                customer.id, customer.email
            ));
            return Ok(());
        }

        if dry_run {
            outcome.deleted += 1;
        } else if self.store.delete(customer.id).await? {
            outcome.deleted += 1;
        } else {
            outcome.errors.push(format!(
                "failed to delete customer #{} ({})",
                customer.id, customer.email
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use chrono::{Duration, Utc};

    use super::*;

    /// In-memory store: every stored customer is a candidate (the SQL
    /// predicate is the repository's concern, not the orchestrator's).
    /// `orders` holds ids with an order older than any cutoff, which is
    /// exactly the case the delete-time safety gate exists for.
    #[derive(Default)]
    struct MemoryStore {
        state: Mutex<State>,
    }

    #[derive(Default)]
    struct State {
        customers: Vec<Customer>,
        orders: HashSet<i32>,
        vanished: HashSet<i32>,
        fail_delete: HashSet<i32>,
        error_on_has_orders: HashSet<i32>,
        fetch_offsets: Vec<i64>,
        fetch_page_sizes: Vec<usize>,
    }

    impl MemoryStore {
        fn with_customers(ids: &[i32]) -> Self {
            let store = Self::default();
            {
                let mut state = store.state.lock().unwrap();
                for &id in ids {
                    state.customers.push(customer(id));
                }
            }
            store
        }

        fn remaining_ids(&self) -> Vec<i32> {
            self.state
                .lock()
                .unwrap()
                .customers
                .iter()
                .map(|c| c.id.as_i32())
                .collect()
        }
    }

    fn customer(id: i32) -> Customer {
        Customer {
            id: CustomerId::new(id),
            email: Email::parse(&format!("user{id}@example.com")).unwrap(),
            first_name: format!("First{id}"),
            last_name: format!("Last{id}"),
            deleted: false,
            is_guest: false,
            created_at: Utc::now() - Duration::days(1000),
        }
    }

    impl CustomerStore for MemoryStore {
        async fn count_inactive(
            &self,
            _criteria: &InactivityCriteria,
        ) -> Result<u64, RepositoryError> {
            Ok(self.state.lock().unwrap().customers.len() as u64)
        }

        async fn fetch_inactive_batch(
            &self,
            _criteria: &InactivityCriteria,
            limit: i64,
            offset: i64,
        ) -> Result<Vec<InactiveCandidate>, RepositoryError> {
            let mut state = self.state.lock().unwrap();
            state.fetch_offsets.push(offset);

            let mut sorted: Vec<_> = state.customers.clone();
            sorted.sort_by_key(|c| c.id);

            let page: Vec<InactiveCandidate> = sorted
                .into_iter()
                .skip(usize::try_from(offset).unwrap())
                .take(usize::try_from(limit).unwrap())
                .map(|c| InactiveCandidate {
                    id: c.id,
                    email: c.email,
                    first_name: c.first_name,
                    last_name: c.last_name,
                    created_at: c.created_at,
                })
                .collect();

            state.fetch_page_sizes.push(page.len());
            Ok(page)
        }

        async fn has_orders(&self, id: CustomerId) -> Result<bool, RepositoryError> {
            let state = self.state.lock().unwrap();
            if state.error_on_has_orders.contains(&id.as_i32()) {
                return Err(RepositoryError::DataCorruption(format!(
                    "simulated failure for customer {id}"
                )));
            }
            Ok(state.orders.contains(&id.as_i32()))
        }

        async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
            let state = self.state.lock().unwrap();
            if state.vanished.contains(&id.as_i32()) {
                return Ok(None);
            }
            Ok(state.customers.iter().find(|c| c.id == id).cloned())
        }

        async fn delete(&self, id: CustomerId) -> Result<bool, RepositoryError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_delete.contains(&id.as_i32()) {
                return Ok(false);
            }
            let before = state.customers.len();
            state.customers.retain(|c| c.id != id);
            Ok(state.customers.len() < before)
        }
    }

    const CRITERIA: InactivityCriteria = InactivityCriteria::new(365);

    #[tokio::test]
    async fn test_export_collects_all_pages() {
        let service = InactiveUserService::new(MemoryStore::with_customers(&[1, 2, 3, 4, 5]));

        let emails = service.export_emails(&CRITERIA, 2).await.unwrap();

        let emails: Vec<String> = emails.into_iter().map(Email::into_inner).collect();
        assert_eq!(
            emails,
            vec![
                "user1@example.com",
                "user2@example.com",
                "user3@example.com",
                "user4@example.com",
                "user5@example.com",
            ]
        );

        let state = service.store.state.lock().unwrap();
        assert_eq!(state.fetch_offsets, vec![0, 2, 4]);
        assert_eq!(state.fetch_page_sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_export_exact_page_multiple_needs_trailing_empty_fetch() {
        let service = InactiveUserService::new(MemoryStore::with_customers(&[1, 2, 3, 4]));

        let emails = service.export_emails(&CRITERIA, 2).await.unwrap();
        assert_eq!(emails.len(), 4);

        // Full final page cannot signal end-of-data; one extra empty fetch.
        let state = service.store.state.lock().unwrap();
        assert_eq!(state.fetch_offsets, vec![0, 2, 4]);
        assert_eq!(state.fetch_page_sizes, vec![2, 2, 0]);
    }

    #[tokio::test]
    async fn test_export_empty_store() {
        let service = InactiveUserService::new(MemoryStore::default());

        let emails = service.export_emails(&CRITERIA, 100).await.unwrap();
        assert!(emails.is_empty());
        assert_eq!(service.store.state.lock().unwrap().fetch_offsets, vec![0]);
    }

    #[tokio::test]
    async fn test_export_is_idempotent() {
        let service = InactiveUserService::new(MemoryStore::with_customers(&[1, 2, 3]));

        let first = service.export_emails(&CRITERIA, 2).await.unwrap();
        let second = service.export_emails(&CRITERIA, 2).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(service.store.remaining_ids(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_live_mode_deletes_eligible_candidates() {
        let service = InactiveUserService::new(MemoryStore::with_customers(&[1, 2, 3]));

        let outcome = service
            .remove_inactive_users(&CRITERIA, 10, false, None)
            .await
            .unwrap();

        assert_eq!(outcome.deleted, 3);
        assert_eq!(outcome.skipped, 0);
        assert!(outcome.errors.is_empty());
        assert!(service.store.remaining_ids().is_empty());
    }

    #[tokio::test]
    async fn test_live_mode_fetches_at_offset_zero() {
        let service = InactiveUserService::new(MemoryStore::with_customers(&[1, 2, 3, 4, 5]));

        let outcome = service
            .remove_inactive_users(&CRITERIA, 2, false, None)
            .await
            .unwrap();

        assert_eq!(outcome.deleted, 5);
        let state = service.store.state.lock().unwrap();
        assert_eq!(state.fetch_offsets, vec![0, 0, 0]);
        assert_eq!(state.fetch_page_sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_dry_run_advances_offset_and_mutates_nothing() {
        let service = InactiveUserService::new(MemoryStore::with_customers(&[1, 2, 3, 4, 5]));

        let outcome = service
            .remove_inactive_users(&CRITERIA, 2, true, None)
            .await
            .unwrap();

        assert_eq!(outcome.deleted, 5);
        assert_eq!(outcome.skipped, 0);
        assert!(outcome.errors.is_empty());
        assert_eq!(service.store.remaining_ids(), vec![1, 2, 3, 4, 5]);

        let state = service.store.state.lock().unwrap();
        assert_eq!(state.fetch_offsets, vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn test_customer_with_orders_is_skipped_in_both_modes() {
        for dry_run in [true, false] {
            let service = InactiveUserService::new(MemoryStore::with_customers(&[1, 2, 3]));
            service.store.state.lock().unwrap().orders.insert(2);

            let outcome = service
                .remove_inactive_users(&CRITERIA, 10, dry_run, None)
                .await
                .unwrap();

            assert_eq!(outcome.deleted, 2, "dry_run={dry_run}");
            assert_eq!(outcome.skipped, 1, "dry_run={dry_run}");
            assert_eq!(outcome.errors.len(), 1);
            assert!(outcome.errors[0].contains("customer #2"));
            assert!(outcome.errors[0].contains("has orders"));

            if !dry_run {
                assert_eq!(service.store.remaining_ids(), vec![2]);
            }
        }
    }

    #[tokio::test]
    async fn test_failed_delete_is_recorded_and_run_continues() {
        let service = InactiveUserService::new(MemoryStore::with_customers(&[1, 2, 3]));
        service.store.state.lock().unwrap().fail_delete.insert(2);

        let outcome = service
            .remove_inactive_users(&CRITERIA, 10, false, None)
            .await
            .unwrap();

        assert_eq!(outcome.deleted, 2);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("failed to delete customer #2"));
        assert_eq!(service.store.remaining_ids(), vec![2]);
    }

    #[tokio::test]
    async fn test_per_record_store_error_is_captured() {
        let service = InactiveUserService::new(MemoryStore::with_customers(&[1, 2, 3]));
        service
            .store
            .state
            .lock()
            .unwrap()
            .error_on_has_orders
            .insert(2);

        let outcome = service
            .remove_inactive_users(&CRITERIA, 10, false, None)
            .await
            .unwrap();

        assert_eq!(outcome.deleted, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("error processing customer #2"));
    }

    #[tokio::test]
    async fn test_vanished_record_is_a_silent_skip() {
        let service = InactiveUserService::new(MemoryStore::with_customers(&[1, 2, 3]));
        service.store.state.lock().unwrap().vanished.insert(2);

        let mut events = Vec::new();
        let mut callback = |event: &ProgressEvent| events.push(event.clone());

        let outcome = service
            .remove_inactive_users(&CRITERIA, 10, true, Some(&mut callback))
            .await
            .unwrap();

        assert_eq!(outcome.deleted, 2);
        assert!(outcome.errors.is_empty());

        // No callback for the vanished record, but `current` still counts it.
        let currents: Vec<u64> = events.iter().map(|e| e.current).collect();
        assert_eq!(currents, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_progress_callback_once_per_record_monotonic() {
        let service = InactiveUserService::new(MemoryStore::with_customers(&[1, 2, 3, 4]));

        let mut events = Vec::new();
        let mut callback = |event: &ProgressEvent| events.push(event.clone());

        let outcome = service
            .remove_inactive_users(&CRITERIA, 10, true, Some(&mut callback))
            .await
            .unwrap();

        assert_eq!(outcome.deleted, 4);
        assert_eq!(events.len(), 4);

        let currents: Vec<u64> = events.iter().map(|e| e.current).collect();
        assert_eq!(currents, vec![1, 2, 3, 4]);
        assert!(events.iter().all(|e| e.total == 4));
        assert_eq!(events[0].email, "user1@example.com");
    }

    #[tokio::test]
    async fn test_dry_run_outcome_arithmetic() {
        // 5 candidates: one has orders, one errors during processing.
        let service = InactiveUserService::new(MemoryStore::with_customers(&[1, 2, 3, 4, 5]));
        {
            let mut state = service.store.state.lock().unwrap();
            state.orders.insert(2);
            state.error_on_has_orders.insert(4);
        }

        let outcome = service
            .remove_inactive_users(&CRITERIA, 10, true, None)
            .await
            .unwrap();

        assert_eq!(outcome.deleted, 3); // 5 found - 1 skipped - 1 errored
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(service.store.remaining_ids(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_count_passthrough() {
        let service = InactiveUserService::new(MemoryStore::with_customers(&[1, 2, 3]));
        assert_eq!(service.count_inactive(&CRITERIA).await.unwrap(), 3);
    }
}
