//! Core types and data structures for credit card balance tracking

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A registered user who owns credit cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for the user
    pub id: String,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// When the user was created
    pub created_at: NaiveDateTime,
}

impl User {
    /// Create a new user with a generated ID
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// A credit card owned by a user
///
/// The card refers to its owner by ID only. Its balance history lives in
/// storage keyed by the card ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCard {
    /// Unique identifier for the card
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Bank that issued the card
    pub issuance_bank: String,
    /// Card number, unique across the store
    pub number: String,
    /// When the card was registered
    pub created_at: NaiveDateTime,
}

impl CreditCard {
    /// Create a new card with a generated ID
    pub fn new(user_id: String, issuance_bank: String, number: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            issuance_bank,
            number,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Listing projection of this card
    pub fn view(&self) -> CreditCardView {
        CreditCardView {
            issuance_bank: self.issuance_bank.clone(),
            number: self.number.clone(),
        }
    }
}

/// Public view of a credit card used in listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardView {
    pub issuance_bank: String,
    pub number: String,
}

/// One day's balance in a card's timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub date: NaiveDate,
    pub balance: BigDecimal,
}

impl BalanceEntry {
    pub fn new(date: NaiveDate, balance: BigDecimal) -> Self {
        Self { date, balance }
    }
}

/// A parsed balance observation for a known card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceObservation {
    pub card_id: String,
    pub date: NaiveDate,
    pub balance: BigDecimal,
}

impl BalanceObservation {
    pub fn new(card_id: String, date: NaiveDate, balance: BigDecimal) -> Self {
        Self {
            card_id,
            date,
            balance,
        }
    }
}

/// Balance amount as submitted, either a JSON number or a decimal string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BalanceAmount {
    Number(serde_json::Number),
    Text(String),
}

impl BalanceAmount {
    /// Parse the amount into a decimal
    pub fn to_decimal(&self) -> BalanceResult<BigDecimal> {
        let raw = match self {
            BalanceAmount::Number(number) => number.to_string(),
            BalanceAmount::Text(text) => text.trim().to_string(),
        };
        BigDecimal::from_str(&raw).map_err(|_| {
            BalanceError::MalformedObservation(format!("Invalid balance amount '{}'", raw))
        })
    }
}

impl From<BigDecimal> for BalanceAmount {
    fn from(amount: BigDecimal) -> Self {
        BalanceAmount::Text(amount.to_string())
    }
}

/// Raw balance update as submitted by a caller
///
/// Dates and amounts are kept unparsed so that one bad update only fails
/// the card it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceUpdate {
    pub credit_card_number: String,
    pub balance_date: String,
    pub balance_amount: BalanceAmount,
}

impl BalanceUpdate {
    /// Create an update from already typed values
    pub fn new(credit_card_number: String, balance_date: NaiveDate, amount: BigDecimal) -> Self {
        Self {
            credit_card_number,
            balance_date: balance_date.format("%Y-%m-%d").to_string(),
            balance_amount: amount.into(),
        }
    }

    /// Parse the date of this update
    pub fn date(&self) -> BalanceResult<NaiveDate> {
        NaiveDate::parse_from_str(self.balance_date.trim(), "%Y-%m-%d").map_err(|_| {
            BalanceError::MalformedObservation(format!(
                "Invalid balance date '{}'",
                self.balance_date
            ))
        })
    }

    /// Parse this update into an observation for the given card
    pub fn to_observation(&self, card_id: &str) -> BalanceResult<BalanceObservation> {
        Ok(BalanceObservation::new(
            card_id.to_string(),
            self.date()?,
            self.balance_amount.to_decimal()?,
        ))
    }
}

/// Parse a JSON array of balance updates
pub fn parse_balance_updates(json: &str) -> BalanceResult<Vec<BalanceUpdate>> {
    Ok(serde_json::from_str(json)?)
}

/// A card's persisted timeline together with its version
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoredTimeline {
    /// Entries in ascending date order
    pub entries: Vec<BalanceEntry>,
    /// Incremented on every successful save
    pub version: u64,
}

/// Errors that can occur while tracking balances
#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Credit card not found: {0}")]
    CardNotFound(String),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Malformed observation: {0}")]
    MalformedObservation(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for balance tracking operations
pub type BalanceResult<T> = Result<T, BalanceError>;

/// Failure to reconcile one card's observations
#[derive(Debug, thiserror::Error)]
#[error("Failed to reconcile card {card}: {source}")]
pub struct ReconcileError {
    /// Card whose batch failed, by number when submitted by number
    pub card: String,
    #[source]
    pub source: BalanceError,
}

impl ReconcileError {
    pub fn new(card: impl Into<String>, source: BalanceError) -> Self {
        Self {
            card: card.into(),
            source,
        }
    }

    /// The underlying failure
    pub fn kind(&self) -> &BalanceError {
        &self.source
    }
}
