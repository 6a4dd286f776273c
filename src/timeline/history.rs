//! Per-card ordered day index of balances

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

use crate::types::*;

/// A card's balance history keyed by calendar day
///
/// Exact-day reads go through a hash index, while an ordered set of dates
/// answers nearest-date queries and drives ascending traversal. Both are
/// only mutated together through [`BalanceTimeline::insert`] and
/// [`BalanceTimeline::remove`].
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceTimeline {
    card_id: String,
    dates: BTreeSet<NaiveDate>,
    balances: HashMap<NaiveDate, BigDecimal>,
}

impl BalanceTimeline {
    /// Create an empty timeline for a card
    pub fn new(card_id: String) -> Self {
        Self {
            card_id,
            dates: BTreeSet::new(),
            balances: HashMap::new(),
        }
    }

    /// Build a timeline from entries that must already be strictly ascending
    pub fn from_entries(card_id: String, entries: Vec<BalanceEntry>) -> BalanceResult<Self> {
        let mut timeline = Self::new(card_id);
        let mut previous: Option<NaiveDate> = None;

        for entry in entries {
            if let Some(previous) = previous {
                if entry.date <= previous {
                    return Err(BalanceError::Validation(format!(
                        "Timeline for card {} is not strictly ascending at {}",
                        timeline.card_id, entry.date
                    )));
                }
            }
            previous = Some(entry.date);
            timeline.insert(entry.date, entry.balance);
        }

        Ok(timeline)
    }

    /// Parse a timeline from its JSON form
    pub fn from_json(card_id: String, json: &str) -> BalanceResult<Self> {
        let entries: Vec<BalanceEntry> = serde_json::from_str(json)?;
        Self::from_entries(card_id, entries)
    }

    /// Serialize the timeline as an ascending JSON array of entries
    pub fn to_json(&self) -> BalanceResult<String> {
        Ok(serde_json::to_string(&self.entries())?)
    }

    pub fn card_id(&self) -> &str {
        &self.card_id
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Balance recorded on exactly this day
    pub fn get(&self, date: NaiveDate) -> Option<&BigDecimal> {
        self.balances.get(&date)
    }

    /// Entry with the smallest date on or after `date`
    pub fn at_or_after(&self, date: NaiveDate) -> Option<BalanceEntry> {
        self.dates
            .range(date..)
            .next()
            .and_then(|found| self.entry(*found))
    }

    /// Entry with the largest date on or before `date`
    pub fn at_or_before(&self, date: NaiveDate) -> Option<BalanceEntry> {
        self.dates
            .range(..=date)
            .next_back()
            .and_then(|found| self.entry(*found))
    }

    pub fn first(&self) -> Option<BalanceEntry> {
        self.dates.first().and_then(|date| self.entry(*date))
    }

    pub fn last(&self) -> Option<BalanceEntry> {
        self.dates.last().and_then(|date| self.entry(*date))
    }

    /// Iterate entries in ascending date order
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &BigDecimal)> + '_ {
        self.dates
            .iter()
            .filter_map(|date| self.balances.get(date).map(|balance| (*date, balance)))
    }

    /// Owned copy of all entries in ascending date order
    pub fn entries(&self) -> Vec<BalanceEntry> {
        self.iter()
            .map(|(date, balance)| BalanceEntry::new(date, balance.clone()))
            .collect()
    }

    /// Set the balance for a day, returning the balance it replaced
    pub fn insert(&mut self, date: NaiveDate, balance: BigDecimal) -> Option<BigDecimal> {
        self.dates.insert(date);
        self.balances.insert(date, balance)
    }

    /// Set the balance for a day as a single edit
    ///
    /// When the day becomes the latest entry and lies before `today`, its
    /// balance is carried to `today` so the timeline still ends on today.
    pub fn set_balance(
        &mut self,
        date: NaiveDate,
        balance: BigDecimal,
        today: NaiveDate,
    ) -> Option<BigDecimal> {
        let previous = self.insert(date, balance);
        if self.dates.last() == Some(&date) {
            self.carry_to(today);
        }
        previous
    }

    /// Remove the balance recorded on `date`
    ///
    /// Removing the latest entry re-derives an entry for `today` from the
    /// balance that becomes latest, so a reconciled timeline still ends on
    /// today. Removing the only entry leaves the timeline empty.
    pub fn remove(&mut self, date: NaiveDate, today: NaiveDate) -> BalanceResult<BigDecimal> {
        let was_latest = self.dates.last() == Some(&date);

        let removed = self.balances.remove(&date).ok_or_else(|| {
            BalanceError::Validation(format!(
                "No balance recorded on {} for card {}",
                date, self.card_id
            ))
        })?;
        self.dates.remove(&date);

        if was_latest {
            self.carry_to(today);
        }

        Ok(removed)
    }

    fn carry_to(&mut self, today: NaiveDate) {
        if let Some(latest) = self.last() {
            if latest.date < today {
                self.insert(today, latest.balance);
            }
        }
    }

    /// Check that the timeline ends on `today`
    ///
    /// An empty timeline has no balance to report yet and passes.
    pub fn ensure_current(&self, today: NaiveDate) -> BalanceResult<()> {
        match self.dates.last() {
            Some(latest) if *latest != today => Err(BalanceError::Validation(format!(
                "Timeline for card {} ends on {} instead of {}",
                self.card_id, latest, today
            ))),
            _ => Ok(()),
        }
    }

    fn entry(&self, date: NaiveDate) -> Option<BalanceEntry> {
        self.balances
            .get(&date)
            .map(|balance| BalanceEntry::new(date, balance.clone()))
    }
}
