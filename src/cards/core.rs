//! Main tracker that coordinates users, cards and balance timelines

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::cards::{CardManager, UserManager};
use crate::config::TrackerConfig;
use crate::reconciliation::{ReconciliationEngine, UpdateReport};
use crate::traits::*;
use crate::types::*;

/// Credit card balance tracker over a single storage backend
pub struct BalanceTracker<S: BalanceStorage> {
    user_manager: UserManager<S>,
    card_manager: CardManager<S>,
    engine: ReconciliationEngine<S>,
}

impl<S: BalanceStorage + Clone> BalanceTracker<S> {
    /// Create a new tracker using the system date
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    /// Create a new tracker with an injected clock
    pub fn with_clock(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            user_manager: UserManager::new(storage.clone()),
            card_manager: CardManager::new(storage.clone()),
            engine: ReconciliationEngine::with_clock(storage, clock),
        }
    }

    /// Replace the default validators
    pub fn with_validators(
        mut self,
        user_validator: Box<dyn UserValidator>,
        card_validator: Box<dyn CardValidator>,
    ) -> Self {
        self.user_manager =
            UserManager::with_validator(self.user_manager.storage.clone(), user_validator);
        self.card_manager =
            CardManager::with_validator(self.user_manager.storage.clone(), card_validator);
        self
    }

    /// Apply limits from a configuration
    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.engine = self.engine.with_config(config);
        self
    }

    // User operations
    /// Create a new user
    pub async fn create_user(&mut self, name: String, email: String) -> BalanceResult<User> {
        self.user_manager.create_user(name, email).await
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: &str) -> BalanceResult<Option<User>> {
        self.user_manager.get_user(user_id).await
    }

    /// Delete a user together with their cards
    pub async fn delete_user(&mut self, user_id: &str) -> BalanceResult<()> {
        self.user_manager.delete_user(user_id).await
    }

    // Card operations
    /// Register a credit card for a user
    pub async fn add_credit_card(
        &mut self,
        user_id: &str,
        issuance_bank: String,
        number: String,
    ) -> BalanceResult<CreditCard> {
        self.card_manager
            .add_card(user_id, issuance_bank, number)
            .await
    }

    /// List all cards of a user
    pub async fn get_all_cards_of_user(
        &self,
        user_id: &str,
    ) -> BalanceResult<Vec<CreditCardView>> {
        self.card_manager.list_user_cards(user_id).await
    }

    /// Resolve which user owns a card
    pub async fn get_user_id_for_card(&self, number: &str) -> BalanceResult<String> {
        self.card_manager.get_user_id_for_card(number).await
    }

    /// Delete a card and its history
    pub async fn delete_credit_card(&mut self, number: &str) -> BalanceResult<()> {
        self.card_manager.delete_card(number).await
    }

    // Balance operations
    /// Apply a batch of balance updates across any number of cards
    pub async fn update_balances(&mut self, updates: &[BalanceUpdate]) -> UpdateReport {
        self.engine.submit(updates).await
    }

    /// Apply a JSON array of balance updates
    pub async fn update_balances_json(&mut self, json: &str) -> BalanceResult<UpdateReport> {
        let updates = parse_balance_updates(json)?;
        Ok(self.update_balances(&updates).await)
    }

    /// Full balance history of a card, oldest first
    pub async fn balance_history(&self, number: &str) -> BalanceResult<Vec<BalanceEntry>> {
        let card = self.card_manager.find_card_required(number).await?;
        self.engine.traverse(&card.id).await
    }

    /// Balance recorded for a card on exactly `date`
    pub async fn balance_on(
        &self,
        number: &str,
        date: NaiveDate,
    ) -> BalanceResult<Option<BigDecimal>> {
        let card = self.card_manager.find_card_required(number).await?;
        self.engine.lookup_exact(&card.id, date).await
    }

    /// Closest recorded balance on or after `date`
    pub async fn closest_balance(
        &self,
        number: &str,
        date: NaiveDate,
    ) -> BalanceResult<Option<BalanceEntry>> {
        let card = self.card_manager.find_card_required(number).await?;
        self.engine.lookup_nearest_at_or_after(&card.id, date).await
    }

    /// Balance in effect on `date`, from the latest entry not after it
    pub async fn balance_as_of(
        &self,
        number: &str,
        date: NaiveDate,
    ) -> BalanceResult<Option<BalanceEntry>> {
        let card = self.card_manager.find_card_required(number).await?;
        self.engine.lookup_at_or_before(&card.id, date).await
    }

    /// Set one day's balance directly
    pub async fn insert_balance(
        &mut self,
        number: &str,
        date: NaiveDate,
        balance: BigDecimal,
    ) -> BalanceResult<Option<BigDecimal>> {
        let card = self.card_manager.find_card_required(number).await?;
        self.engine.insert_entry(&card.id, date, balance).await
    }

    /// Remove one day's balance
    pub async fn delete_balance(
        &mut self,
        number: &str,
        date: NaiveDate,
    ) -> BalanceResult<BigDecimal> {
        let card = self.card_manager.find_card_required(number).await?;
        self.engine.delete_entry(&card.id, date).await
    }
}
