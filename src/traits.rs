//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::types::*;

/// Storage abstraction for users, cards and balance timelines
///
/// This trait allows the balance tracker to work with any storage backend
/// (PostgreSQL, SQLite, in-memory, etc.) by implementing these methods.
#[async_trait]
pub trait BalanceStorage: Send + Sync {
    /// Save a user to storage
    async fn save_user(&mut self, user: &User) -> BalanceResult<()>;

    /// Get a user by ID
    async fn get_user(&self, user_id: &str) -> BalanceResult<Option<User>>;

    /// Delete a user together with their cards and timelines
    async fn delete_user(&mut self, user_id: &str) -> BalanceResult<()>;

    /// Save a credit card to storage with an empty timeline
    async fn save_card(&mut self, card: &CreditCard) -> BalanceResult<()>;

    /// Get a card by ID
    async fn get_card(&self, card_id: &str) -> BalanceResult<Option<CreditCard>>;

    /// Find a card by its number
    async fn find_card_by_number(&self, number: &str) -> BalanceResult<Option<CreditCard>>;

    /// List all cards owned by a user
    async fn list_user_cards(&self, user_id: &str) -> BalanceResult<Vec<CreditCard>>;

    /// Delete a card and its timeline
    async fn delete_card(&mut self, card_id: &str) -> BalanceResult<()>;

    /// Load a card's timeline in ascending date order
    async fn load_timeline(&self, card_id: &str) -> BalanceResult<StoredTimeline>;

    /// Replace a card's timeline as one unit
    ///
    /// Fails with [`BalanceError::Storage`] when the stored version no longer
    /// matches `expected_version`. Returns the new version.
    async fn save_timeline(
        &mut self,
        card_id: &str,
        entries: &[BalanceEntry],
        expected_version: u64,
    ) -> BalanceResult<u64>;

    /// Balance recorded for a card on exactly `date`
    ///
    /// The default searches the loaded timeline; backends that keep a day
    /// index should answer directly.
    async fn balance_on(
        &self,
        card_id: &str,
        date: NaiveDate,
    ) -> BalanceResult<Option<BigDecimal>> {
        let entries = self.load_timeline(card_id).await?.entries;
        Ok(entries
            .binary_search_by_key(&date, |entry| entry.date)
            .ok()
            .map(|index| entries[index].balance.clone()))
    }

    /// Entry with the smallest date on or after `date`
    async fn entry_at_or_after(
        &self,
        card_id: &str,
        date: NaiveDate,
    ) -> BalanceResult<Option<BalanceEntry>> {
        let mut entries = self.load_timeline(card_id).await?.entries;
        let index = entries.partition_point(|entry| entry.date < date);
        Ok((index < entries.len()).then(|| entries.swap_remove(index)))
    }

    /// Entry with the largest date on or before `date`
    async fn entry_at_or_before(
        &self,
        card_id: &str,
        date: NaiveDate,
    ) -> BalanceResult<Option<BalanceEntry>> {
        let mut entries = self.load_timeline(card_id).await?.entries;
        let index = entries.partition_point(|entry| entry.date <= date);
        Ok(index.checked_sub(1).map(|last| entries.swap_remove(last)))
    }
}

/// Source of the current calendar day
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Clock backed by the local system date
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Clock pinned to a single day, for tests and replays
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Trait for implementing custom user validation rules
pub trait UserValidator: Send + Sync {
    /// Validate a user before saving
    fn validate_user(&self, user: &User) -> BalanceResult<()>;
}

/// Trait for implementing custom credit card validation rules
pub trait CardValidator: Send + Sync {
    /// Validate a card before saving
    fn validate_card(&self, card: &CreditCard) -> BalanceResult<()>;
}

/// Default user validator with basic rules
pub struct DefaultUserValidator;

impl UserValidator for DefaultUserValidator {
    fn validate_user(&self, user: &User) -> BalanceResult<()> {
        if user.name.trim().is_empty() {
            return Err(BalanceError::Validation(
                "User name cannot be empty".to_string(),
            ));
        }

        if !user.email.contains('@') {
            return Err(BalanceError::Validation(format!(
                "Invalid email address '{}'",
                user.email
            )));
        }

        Ok(())
    }
}

/// Default card validator with basic rules
pub struct DefaultCardValidator;

impl CardValidator for DefaultCardValidator {
    fn validate_card(&self, card: &CreditCard) -> BalanceResult<()> {
        if card.number.trim().is_empty() {
            return Err(BalanceError::Validation(
                "Card number cannot be empty".to_string(),
            ));
        }

        if card.issuance_bank.trim().is_empty() {
            return Err(BalanceError::Validation(
                "Issuance bank cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
