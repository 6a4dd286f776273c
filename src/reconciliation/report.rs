//! Outcome of a multi-card balance submission

use serde::{Deserialize, Serialize};

/// A card whose sub-batch could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFailure {
    pub card_number: String,
    pub reason: String,
}

/// Per-card results of one submission
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateReport {
    /// Card numbers whose timelines were replaced
    pub updated: Vec<String>,
    /// Cards that failed, in card number order
    pub failures: Vec<CardFailure>,
}

impl UpdateReport {
    pub fn record_success(&mut self, card_number: &str) {
        self.updated.push(card_number.to_string());
    }

    pub fn record_failure(&mut self, card_number: &str, reason: String) {
        self.failures.push(CardFailure {
            card_number: card_number.to_string(),
            reason,
        });
    }

    /// True when every card in the submission was updated
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_card_numbers(&self) -> Vec<&str> {
        self.failures
            .iter()
            .map(|failure| failure.card_number.as_str())
            .collect()
    }

    /// Caller-facing message listing every failed card
    pub fn summary(&self) -> String {
        if self.is_success() {
            "All credit cards updated".to_string()
        } else {
            format!(
                "Credit cards not updated: {}",
                self.failed_card_numbers().join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let mut report = UpdateReport::default();
        report.record_success("4111");
        assert!(report.is_success());
        assert_eq!(report.summary(), "All credit cards updated");

        report.record_failure("5500", "Credit card not found: 5500".to_string());
        report.record_failure("6011", "Malformed observation".to_string());
        assert!(!report.is_success());
        assert_eq!(report.failed_card_numbers(), vec!["5500", "6011"]);
        assert_eq!(report.summary(), "Credit cards not updated: 5500, 6011");
    }
}
