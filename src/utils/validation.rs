//! Validation utilities

use chrono::{Duration, NaiveDate};

use crate::config::TrackerConfig;
use crate::traits::*;
use crate::types::*;

/// Validate that a card number looks like a payment card number
pub fn validate_card_number(number: &str) -> BalanceResult<()> {
    let digits: Vec<char> = number.chars().filter(|c| !matches!(c, ' ' | '-')).collect();

    if digits.is_empty() {
        return Err(BalanceError::Validation(
            "Card number cannot be empty".to_string(),
        ));
    }

    if !digits.iter().all(|c| c.is_ascii_digit()) {
        return Err(BalanceError::Validation(
            "Card number can only contain digits, spaces, and dashes".to_string(),
        ));
    }

    if !(12..=19).contains(&digits.len()) {
        return Err(BalanceError::Validation(format!(
            "Card number must have between 12 and 19 digits, got {}",
            digits.len()
        )));
    }

    Ok(())
}

/// Validate that an issuing bank name is valid
pub fn validate_bank_name(name: &str) -> BalanceResult<()> {
    if name.trim().is_empty() {
        return Err(BalanceError::Validation(
            "Issuance bank cannot be empty".to_string(),
        ));
    }

    if name.len() > 100 {
        return Err(BalanceError::Validation(
            "Issuance bank cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that an email address is plausible
pub fn validate_email(email: &str) -> BalanceResult<()> {
    let Some((local, domain)) = email.trim().split_once('@') else {
        return Err(BalanceError::Validation(format!(
            "Invalid email address '{}'",
            email
        )));
    };

    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') {
        return Err(BalanceError::Validation(format!(
            "Invalid email address '{}'",
            email
        )));
    }

    Ok(())
}

/// Validate that a user name is valid
pub fn validate_user_name(name: &str) -> BalanceResult<()> {
    if name.trim().is_empty() {
        return Err(BalanceError::Validation(
            "User name cannot be empty".to_string(),
        ));
    }

    if name.len() > 100 {
        return Err(BalanceError::Validation(
            "User name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Check a card's batch against the configured size and backfill limits
pub fn validate_observations(
    observations: &[BalanceObservation],
    today: NaiveDate,
    config: &TrackerConfig,
) -> BalanceResult<()> {
    if observations.len() > config.max_batch_size {
        return Err(BalanceError::Validation(format!(
            "Batch of {} observations exceeds the limit of {}",
            observations.len(),
            config.max_batch_size
        )));
    }

    let earliest_allowed = Duration::try_days(config.max_backfill_days)
        .and_then(|window| today.checked_sub_signed(window));
    let oldest = observations.iter().map(|o| o.date).min();
    if let (Some(oldest), Some(earliest_allowed)) = (oldest, earliest_allowed) {
        if oldest < earliest_allowed {
            return Err(BalanceError::Validation(format!(
                "Observation dated {} is older than the backfill window starting {}",
                oldest, earliest_allowed
            )));
        }
    }

    Ok(())
}

/// Enhanced user validator with detailed checks
pub struct EnhancedUserValidator;

impl UserValidator for EnhancedUserValidator {
    fn validate_user(&self, user: &User) -> BalanceResult<()> {
        validate_user_name(&user.name)?;
        validate_email(&user.email)?;
        Ok(())
    }
}

/// Enhanced card validator with detailed checks
pub struct EnhancedCardValidator;

impl CardValidator for EnhancedCardValidator {
    fn validate_card(&self, card: &CreditCard) -> BalanceResult<()> {
        validate_card_number(&card.number)?;
        validate_bank_name(&card.issuance_bank)?;
        Ok(())
    }
}
