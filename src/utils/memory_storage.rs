//! In-memory storage implementation for testing

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::timeline::BalanceTimeline;
use crate::traits::*;
use crate::types::*;

fn poisoned<T>(_: PoisonError<T>) -> BalanceError {
    BalanceError::Storage("Storage lock poisoned".to_string())
}

/// A card's indexed timeline and its write version
#[derive(Debug, Clone)]
struct TimelineSlot {
    timeline: BalanceTimeline,
    version: u64,
}

impl TimelineSlot {
    fn new(card_id: &str) -> Self {
        Self {
            timeline: BalanceTimeline::new(card_id.to_string()),
            version: 0,
        }
    }
}

/// In-memory storage implementation for testing and development
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    users: Arc<RwLock<HashMap<String, User>>>,
    cards: Arc<RwLock<HashMap<String, CreditCard>>>,
    timelines: Arc<RwLock<HashMap<String, TimelineSlot>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            cards: Arc::new(RwLock::new(HashMap::new())),
            timelines: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> BalanceResult<()> {
        self.users.write().map_err(poisoned)?.clear();
        self.cards.write().map_err(poisoned)?.clear();
        self.timelines.write().map_err(poisoned)?.clear();
        Ok(())
    }

    /// Run a query against a card's indexed timeline
    fn with_timeline<T>(
        &self,
        card_id: &str,
        query: impl FnOnce(&BalanceTimeline) -> T,
    ) -> BalanceResult<T> {
        if !self.cards.read().map_err(poisoned)?.contains_key(card_id) {
            return Err(BalanceError::CardNotFound(card_id.to_string()));
        }

        let timelines = self.timelines.read().map_err(poisoned)?;
        Ok(match timelines.get(card_id) {
            Some(slot) => query(&slot.timeline),
            None => query(&BalanceTimeline::new(card_id.to_string())),
        })
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceStorage for MemoryStorage {
    async fn save_user(&mut self, user: &User) -> BalanceResult<()> {
        self.users
            .write()
            .map_err(poisoned)?
            .insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> BalanceResult<Option<User>> {
        Ok(self.users.read().map_err(poisoned)?.get(user_id).cloned())
    }

    async fn delete_user(&mut self, user_id: &str) -> BalanceResult<()> {
        if self.users.write().map_err(poisoned)?.remove(user_id).is_none() {
            return Err(BalanceError::UserNotFound(user_id.to_string()));
        }

        let owned: Vec<String> = self
            .cards
            .read()
            .map_err(poisoned)?
            .values()
            .filter(|card| card.user_id == user_id)
            .map(|card| card.id.clone())
            .collect();

        for card_id in owned {
            self.delete_card(&card_id).await?;
        }

        Ok(())
    }

    async fn save_card(&mut self, card: &CreditCard) -> BalanceResult<()> {
        self.cards
            .write()
            .map_err(poisoned)?
            .insert(card.id.clone(), card.clone());
        self.timelines
            .write()
            .map_err(poisoned)?
            .entry(card.id.clone())
            .or_insert_with(|| TimelineSlot::new(&card.id));
        Ok(())
    }

    async fn get_card(&self, card_id: &str) -> BalanceResult<Option<CreditCard>> {
        Ok(self.cards.read().map_err(poisoned)?.get(card_id).cloned())
    }

    async fn find_card_by_number(&self, number: &str) -> BalanceResult<Option<CreditCard>> {
        Ok(self
            .cards
            .read()
            .map_err(poisoned)?
            .values()
            .find(|card| card.number == number)
            .cloned())
    }

    async fn list_user_cards(&self, user_id: &str) -> BalanceResult<Vec<CreditCard>> {
        let mut cards: Vec<CreditCard> = self
            .cards
            .read()
            .map_err(poisoned)?
            .values()
            .filter(|card| card.user_id == user_id)
            .cloned()
            .collect();
        cards.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.number.cmp(&b.number)));
        Ok(cards)
    }

    async fn delete_card(&mut self, card_id: &str) -> BalanceResult<()> {
        if self.cards.write().map_err(poisoned)?.remove(card_id).is_none() {
            return Err(BalanceError::CardNotFound(card_id.to_string()));
        }
        self.timelines.write().map_err(poisoned)?.remove(card_id);
        Ok(())
    }

    async fn load_timeline(&self, card_id: &str) -> BalanceResult<StoredTimeline> {
        if !self.cards.read().map_err(poisoned)?.contains_key(card_id) {
            return Err(BalanceError::CardNotFound(card_id.to_string()));
        }

        Ok(self
            .timelines
            .read()
            .map_err(poisoned)?
            .get(card_id)
            .map(|slot| StoredTimeline {
                entries: slot.timeline.entries(),
                version: slot.version,
            })
            .unwrap_or_default())
    }

    async fn save_timeline(
        &mut self,
        card_id: &str,
        entries: &[BalanceEntry],
        expected_version: u64,
    ) -> BalanceResult<u64> {
        if !self.cards.read().map_err(poisoned)?.contains_key(card_id) {
            return Err(BalanceError::CardNotFound(card_id.to_string()));
        }

        let timeline = BalanceTimeline::from_entries(card_id.to_string(), entries.to_vec())?;

        let mut timelines = self.timelines.write().map_err(poisoned)?;
        let slot = timelines
            .entry(card_id.to_string())
            .or_insert_with(|| TimelineSlot::new(card_id));

        if slot.version != expected_version {
            return Err(BalanceError::Storage(format!(
                "Timeline for card {} was modified concurrently (expected version {}, found {})",
                card_id, expected_version, slot.version
            )));
        }

        slot.timeline = timeline;
        slot.version += 1;
        Ok(slot.version)
    }

    async fn balance_on(
        &self,
        card_id: &str,
        date: NaiveDate,
    ) -> BalanceResult<Option<BigDecimal>> {
        self.with_timeline(card_id, |timeline| timeline.get(date).cloned())
    }

    async fn entry_at_or_after(
        &self,
        card_id: &str,
        date: NaiveDate,
    ) -> BalanceResult<Option<BalanceEntry>> {
        self.with_timeline(card_id, |timeline| timeline.at_or_after(date))
    }

    async fn entry_at_or_before(
        &self,
        card_id: &str,
        date: NaiveDate,
    ) -> BalanceResult<Option<BalanceEntry>> {
        self.with_timeline(card_id, |timeline| timeline.at_or_before(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let mut storage = MemoryStorage::new();
        let card = CreditCard::new("user".to_string(), "Chase".to_string(), "4111".to_string());
        storage.save_card(&card).await.unwrap();

        let entries = vec![BalanceEntry::new(
            NaiveDate::from_ymd_opt(2023, 4, 10).unwrap(),
            BigDecimal::from(10),
        )];

        let version = storage.save_timeline(&card.id, &entries, 0).await.unwrap();
        assert_eq!(version, 1);

        let result = storage.save_timeline(&card.id, &entries, 0).await;
        assert!(matches!(result, Err(BalanceError::Storage(_))));

        let stored = storage.load_timeline(&card.id).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.entries, entries);
    }

    #[tokio::test]
    async fn test_indexed_lookups() {
        let mut storage = MemoryStorage::new();
        let card = CreditCard::new("user".to_string(), "Chase".to_string(), "4111".to_string());
        storage.save_card(&card).await.unwrap();

        let day = |d: u32| NaiveDate::from_ymd_opt(2023, 4, d).unwrap();
        let entries = vec![
            BalanceEntry::new(day(13), BigDecimal::from(1100)),
            BalanceEntry::new(day(16), BigDecimal::from(900)),
        ];
        storage.save_timeline(&card.id, &entries, 0).await.unwrap();

        assert_eq!(
            storage.balance_on(&card.id, day(13)).await.unwrap(),
            Some(BigDecimal::from(1100))
        );
        assert_eq!(storage.balance_on(&card.id, day(14)).await.unwrap(), None);

        let after = storage.entry_at_or_after(&card.id, day(14)).await.unwrap();
        assert_eq!(after, Some(entries[1].clone()));
        assert_eq!(storage.entry_at_or_after(&card.id, day(17)).await.unwrap(), None);

        let before = storage.entry_at_or_before(&card.id, day(15)).await.unwrap();
        assert_eq!(before, Some(entries[0].clone()));
        assert_eq!(storage.entry_at_or_before(&card.id, day(12)).await.unwrap(), None);

        assert!(matches!(
            storage.balance_on("missing", day(13)).await,
            Err(BalanceError::CardNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unordered_entries_are_not_saved() {
        let mut storage = MemoryStorage::new();
        let card = CreditCard::new("user".to_string(), "Chase".to_string(), "4111".to_string());
        storage.save_card(&card).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2023, 4, 10).unwrap();
        let entries = vec![
            BalanceEntry::new(day, BigDecimal::from(1)),
            BalanceEntry::new(day, BigDecimal::from(2)),
        ];
        let result = storage.save_timeline(&card.id, &entries, 0).await;
        assert!(matches!(result, Err(BalanceError::Validation(_))));
        assert_eq!(storage.load_timeline(&card.id).await.unwrap().version, 0);
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let mut storage = MemoryStorage::new();
        let user = User::new("Ada".to_string(), "ada@example.com".to_string());
        storage.save_user(&user).await.unwrap();

        let card = CreditCard::new(user.id.clone(), "Chase".to_string(), "4111".to_string());
        storage.save_card(&card).await.unwrap();

        storage.delete_user(&user.id).await.unwrap();

        assert!(storage.get_card(&card.id).await.unwrap().is_none());
        assert!(matches!(
            storage.load_timeline(&card.id).await,
            Err(BalanceError::CardNotFound(_))
        ));
        assert!(matches!(
            storage.delete_user(&user.id).await,
            Err(BalanceError::UserNotFound(_))
        ));
    }
}
