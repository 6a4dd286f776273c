//! Credit card registration and lookup

use crate::traits::*;
use crate::types::*;

/// Card manager for registering cards and resolving ownership
pub struct CardManager<S: BalanceStorage> {
    storage: S,
    validator: Box<dyn CardValidator>,
}

impl<S: BalanceStorage> CardManager<S> {
    /// Create a new card manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultCardValidator),
        }
    }

    /// Create a new card manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn CardValidator>) -> Self {
        Self { storage, validator }
    }

    /// Register a card for an existing user
    ///
    /// The card starts with an empty balance history.
    pub async fn add_card(
        &mut self,
        user_id: &str,
        issuance_bank: String,
        number: String,
    ) -> BalanceResult<CreditCard> {
        let card = CreditCard::new(user_id.to_string(), issuance_bank, number);

        self.validator.validate_card(&card)?;

        if self.storage.get_user(user_id).await?.is_none() {
            return Err(BalanceError::UserNotFound(user_id.to_string()));
        }

        if self
            .storage
            .find_card_by_number(&card.number)
            .await?
            .is_some()
        {
            return Err(BalanceError::Validation(format!(
                "Card with number '{}' already exists",
                card.number
            )));
        }

        self.storage.save_card(&card).await?;

        tracing::info!(user_id, card_id = %card.id, "Credit card registered");
        Ok(card)
    }

    /// Find a card by its number
    pub async fn find_card(&self, number: &str) -> BalanceResult<Option<CreditCard>> {
        self.storage.find_card_by_number(number).await
    }

    /// Find a card by its number, returning an error if not found
    pub async fn find_card_required(&self, number: &str) -> BalanceResult<CreditCard> {
        self.storage
            .find_card_by_number(number)
            .await?
            .ok_or_else(|| BalanceError::CardNotFound(number.to_string()))
    }

    /// List a user's cards; an unknown user has no cards
    pub async fn list_user_cards(&self, user_id: &str) -> BalanceResult<Vec<CreditCardView>> {
        Ok(self
            .storage
            .list_user_cards(user_id)
            .await?
            .iter()
            .map(CreditCard::view)
            .collect())
    }

    /// Resolve the owning user of a card
    pub async fn get_user_id_for_card(&self, number: &str) -> BalanceResult<String> {
        Ok(self.find_card_required(number).await?.user_id)
    }

    /// Delete a card and its balance history
    pub async fn delete_card(&mut self, number: &str) -> BalanceResult<()> {
        let card = self.find_card_required(number).await?;
        self.storage.delete_card(&card.id).await?;
        tracing::info!(card_id = %card.id, "Credit card deleted");
        Ok(())
    }
}
