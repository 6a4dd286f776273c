//! Reconciliation engine for credit card balance timelines
//!
//! The engine applies batches of balance observations to a card's stored
//! timeline. Each card is handled as one unit: the replacement timeline is
//! built in memory and saved with the version read at load time, so a
//! concurrent writer causes a storage failure instead of a lost update.
//! Submissions covering several cards report every failing card without
//! stopping the others.

pub mod report;

pub use report::*;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::timeline::{merge_observations, BalanceTimeline};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_observations;

/// Balance timeline engine operating over a storage backend
pub struct ReconciliationEngine<S: BalanceStorage> {
    storage: S,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
}

impl<S: BalanceStorage> ReconciliationEngine<S> {
    /// Create an engine using the system date and default limits
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    /// Create an engine with an injected clock
    pub fn with_clock(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            config: TrackerConfig::default(),
        }
    }

    /// Replace the engine's limits
    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Load a card's timeline
    pub async fn load(&self, card_id: &str) -> BalanceResult<BalanceTimeline> {
        let stored = self.storage.load_timeline(card_id).await?;
        Self::decode(card_id, stored.entries)
    }

    /// Merge observations for one card and commit the resulting timeline
    pub async fn reconcile(
        &mut self,
        card_id: &str,
        observations: &[BalanceObservation],
    ) -> Result<BalanceTimeline, ReconcileError> {
        self.apply(card_id, observations)
            .await
            .map_err(|e| ReconcileError::new(card_id, e))
    }

    /// Apply a submission of raw updates, possibly spanning several cards
    ///
    /// Updates are grouped by card number and each group is reconciled on
    /// its own. A failing card is recorded in the report and the remaining
    /// cards are still processed.
    pub async fn submit(&mut self, updates: &[BalanceUpdate]) -> UpdateReport {
        let mut grouped: BTreeMap<&str, Vec<&BalanceUpdate>> = BTreeMap::new();
        for update in updates {
            grouped
                .entry(update.credit_card_number.as_str())
                .or_default()
                .push(update);
        }

        info!(
            updates = updates.len(),
            cards = grouped.len(),
            "Applying balance submission"
        );

        let mut report = UpdateReport::default();
        for (card_number, group) in grouped {
            match self.reconcile_by_number(card_number, &group).await {
                Ok(timeline) => {
                    debug!(card_number, entries = timeline.len(), "Card updated");
                    report.record_success(card_number);
                }
                Err(e) => {
                    warn!(card_number, error = %e.source, "Card update failed");
                    report.record_failure(card_number, e.source.to_string());
                }
            }
        }

        report
    }

    /// Balance recorded on exactly `date`
    pub async fn lookup_exact(
        &self,
        card_id: &str,
        date: NaiveDate,
    ) -> BalanceResult<Option<BigDecimal>> {
        self.storage.balance_on(card_id, date).await
    }

    /// Entry with the smallest date on or after `date`
    pub async fn lookup_nearest_at_or_after(
        &self,
        card_id: &str,
        date: NaiveDate,
    ) -> BalanceResult<Option<BalanceEntry>> {
        self.storage.entry_at_or_after(card_id, date).await
    }

    /// Entry with the largest date on or before `date`, i.e. the balance as
    /// of that day
    pub async fn lookup_at_or_before(
        &self,
        card_id: &str,
        date: NaiveDate,
    ) -> BalanceResult<Option<BalanceEntry>> {
        self.storage.entry_at_or_before(card_id, date).await
    }

    /// Full history in ascending date order
    pub async fn traverse(&self, card_id: &str) -> BalanceResult<Vec<BalanceEntry>> {
        Ok(self.load(card_id).await?.entries())
    }

    /// Set a single day's balance without reconciling the rest of the timeline
    ///
    /// A new latest day before today is carried forward to today.
    pub async fn insert_entry(
        &mut self,
        card_id: &str,
        date: NaiveDate,
        balance: BigDecimal,
    ) -> BalanceResult<Option<BigDecimal>> {
        let today = self.today();
        if date > today {
            return Err(BalanceError::MalformedObservation(format!(
                "Cannot record a balance for {} after today ({})",
                date, today
            )));
        }

        let stored = self.storage.load_timeline(card_id).await?;
        let mut timeline = Self::decode(card_id, stored.entries)?;
        let previous = timeline.set_balance(date, balance, today);

        self.storage
            .save_timeline(card_id, &timeline.entries(), stored.version)
            .await?;
        debug!(card_id, %date, "Balance entry inserted");
        Ok(previous)
    }

    /// Remove a single day's balance
    ///
    /// Removing the latest entry re-derives today's balance from the entry
    /// that becomes latest.
    pub async fn delete_entry(
        &mut self,
        card_id: &str,
        date: NaiveDate,
    ) -> BalanceResult<BigDecimal> {
        let today = self.today();
        let stored = self.storage.load_timeline(card_id).await?;
        let mut timeline = Self::decode(card_id, stored.entries)?;
        let removed = timeline.remove(date, today)?;

        self.storage
            .save_timeline(card_id, &timeline.entries(), stored.version)
            .await?;
        debug!(card_id, %date, "Balance entry deleted");
        Ok(removed)
    }

    async fn reconcile_by_number(
        &mut self,
        card_number: &str,
        updates: &[&BalanceUpdate],
    ) -> Result<BalanceTimeline, ReconcileError> {
        let card = self
            .storage
            .find_card_by_number(card_number)
            .await
            .and_then(|card| {
                card.ok_or_else(|| BalanceError::CardNotFound(card_number.to_string()))
            })
            .map_err(|e| ReconcileError::new(card_number, e))?;

        let observations = updates
            .iter()
            .map(|update| update.to_observation(&card.id))
            .collect::<BalanceResult<Vec<_>>>()
            .map_err(|e| ReconcileError::new(card_number, e))?;

        self.apply(&card.id, &observations)
            .await
            .map_err(|e| ReconcileError::new(card_number, e))
    }

    async fn apply(
        &mut self,
        card_id: &str,
        observations: &[BalanceObservation],
    ) -> BalanceResult<BalanceTimeline> {
        if let Some(stray) = observations.iter().find(|o| o.card_id != card_id) {
            return Err(BalanceError::MalformedObservation(format!(
                "Observation for card {} submitted in the batch for card {}",
                stray.card_id, card_id
            )));
        }

        let today = self.today();
        validate_observations(observations, today, &self.config)?;

        let stored = self.storage.load_timeline(card_id).await?;
        let existing = Self::decode(card_id, stored.entries)?;
        let merged = merge_observations(&existing, observations, today)?;

        let version = self
            .storage
            .save_timeline(card_id, &merged.entries(), stored.version)
            .await?;

        info!(
            card_id,
            observations = observations.len(),
            previous_entries = existing.len(),
            entries = merged.len(),
            version,
            "Timeline reconciled"
        );
        Ok(merged)
    }

    fn decode(card_id: &str, entries: Vec<BalanceEntry>) -> BalanceResult<BalanceTimeline> {
        BalanceTimeline::from_entries(card_id.to_string(), entries).map_err(|e| {
            BalanceError::Storage(format!(
                "Stored timeline for card {} is corrupt: {}",
                card_id, e
            ))
        })
    }
}
