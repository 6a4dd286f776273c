//! Two-pointer merge of a balance batch into an existing timeline

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::timeline::BalanceTimeline;
use crate::types::*;

/// Sort a batch by date, keeping the last observation submitted for a day
pub fn sort_batch(observations: &[BalanceObservation]) -> Vec<BalanceEntry> {
    let mut sorted: Vec<&BalanceObservation> = observations.iter().collect();
    sorted.sort_by_key(|observation| observation.date);

    let mut batch: Vec<BalanceEntry> = Vec::with_capacity(sorted.len());
    for observation in sorted {
        match batch.last_mut() {
            Some(previous) if previous.date == observation.date => {
                previous.balance = observation.balance.clone();
            }
            _ => batch.push(BalanceEntry::new(
                observation.date,
                observation.balance.clone(),
            )),
        }
    }
    batch
}

/// Accumulates the merged timeline in ascending order
struct TimelineWriter {
    entries: Vec<BalanceEntry>,
    dense_from: NaiveDate,
}

impl TimelineWriter {
    fn new(dense_from: NaiveDate, capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            dense_from,
        }
    }

    fn push(&mut self, date: NaiveDate, balance: BigDecimal) {
        self.entries.push(BalanceEntry::new(date, balance));
    }

    /// Emit `balance` for every day from `from` up to, not including, `before`
    fn fill_from(&mut self, from: NaiveDate, before: NaiveDate, balance: &BigDecimal) {
        for day in from.iter_days().take_while(|day| *day < before) {
            self.push(day, balance.clone());
        }
    }

    /// Emit `balance` for the days strictly between `after` and `before`
    /// that fall inside the dense window
    fn fill_between(&mut self, after: NaiveDate, before: NaiveDate, balance: &BigDecimal) {
        let dense_from = self.dense_from;
        for day in after
            .iter_days()
            .skip(1)
            .skip_while(|day| *day < dense_from)
            .take_while(|day| *day < before)
        {
            self.push(day, balance.clone());
        }
    }

    /// Flat-fill from the latest emitted day through `today`
    fn extend_through(&mut self, today: NaiveDate) {
        let Some(latest) = self.entries.last().cloned() else {
            return;
        };
        for day in latest
            .date
            .iter_days()
            .skip(1)
            .take_while(|day| *day <= today)
        {
            self.push(day, latest.balance.clone());
        }
    }

    fn latest(&self) -> Option<&BalanceEntry> {
        self.entries.last()
    }
}

/// Earliest of the next stored day and the next observed day
fn next_boundary(
    stored: Option<&BalanceEntry>,
    observed: Option<&BalanceEntry>,
) -> Option<NaiveDate> {
    match (stored, observed) {
        (Some(stored), Some(observed)) => Some(stored.date.min(observed.date)),
        (stored, observed) => stored.or(observed).map(|entry| entry.date),
    }
}

/// Merge a batch of observations into `existing`, producing the replacement
/// timeline
///
/// Matching days take the observed balance and record the drift against the
/// stored one; untouched stored days after that carry the drift forward.
/// Days before a stored entry that the batch reaches are flat-filled with
/// the observed balance. Every day from the earlier of the first observation
/// and the latest stored day through `today` is materialized, while stored
/// days before that window are copied unchanged.
pub fn merge_observations(
    existing: &BalanceTimeline,
    observations: &[BalanceObservation],
    today: NaiveDate,
) -> BalanceResult<BalanceTimeline> {
    let card_id = existing.card_id().to_string();
    let stored = existing.entries();
    let batch = sort_batch(observations);

    if let Some(latest) = stored.last() {
        if latest.date > today {
            return Err(BalanceError::Validation(format!(
                "Stored timeline for card {} extends to {}, past today ({})",
                card_id, latest.date, today
            )));
        }
    }
    if let Some(latest) = batch.last() {
        if latest.date > today {
            return Err(BalanceError::MalformedObservation(format!(
                "Observation dated {} is in the future (today is {})",
                latest.date, today
            )));
        }
    }

    let dense_from = match (batch.first(), stored.last()) {
        (Some(observed), Some(latest)) => observed.date.min(latest.date),
        (Some(observed), None) => observed.date,
        (None, Some(latest)) => latest.date,
        (None, None) => return Ok(BalanceTimeline::new(card_id)),
    };

    let mut out = TimelineWriter::new(dense_from, stored.len() + batch.len());
    let mut diff = BigDecimal::from(0);
    let (mut i, mut j) = (0, 0);

    while i < stored.len() && j < batch.len() {
        let current = &stored[i];
        let observed = &batch[j];

        match current.date.cmp(&observed.date) {
            Ordering::Equal => {
                diff = &observed.balance - &current.balance;
                out.push(observed.date, observed.balance.clone());
                if let Some(until) = next_boundary(stored.get(i + 1), batch.get(j + 1)) {
                    out.fill_between(observed.date, until, &observed.balance);
                }
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                let carried = &current.balance + &diff;
                let until = stored
                    .get(i + 1)
                    .map_or(observed.date, |next| next.date.min(observed.date));
                out.push(current.date, carried.clone());
                out.fill_between(current.date, until, &carried);
                i += 1;
            }
            Ordering::Greater => match batch.get(j + 1) {
                Some(next) if next.date <= current.date => {
                    out.fill_from(observed.date, next.date, &observed.balance);
                    j += 1;
                }
                _ => {
                    out.fill_from(observed.date, current.date, &observed.balance);
                    diff = &observed.balance - &current.balance;
                    out.push(current.date, observed.balance.clone());
                    if let Some(until) = next_boundary(stored.get(i + 1), batch.get(j + 1)) {
                        out.fill_between(current.date, until, &observed.balance);
                    }
                    i += 1;
                    j += 1;
                }
            },
        }
    }

    while i < stored.len() {
        let current = &stored[i];
        let carried = &current.balance + &diff;
        out.push(current.date, carried.clone());
        if let Some(next) = stored.get(i + 1) {
            out.fill_between(current.date, next.date, &carried);
        }
        i += 1;
    }

    for observed in &batch[j..] {
        if let Some(latest) = out.latest().cloned() {
            out.fill_between(latest.date, observed.date, &latest.balance);
        }
        out.push(observed.date, observed.balance.clone());
    }

    out.extend_through(today);

    let merged = BalanceTimeline::from_entries(card_id, out.entries)?;
    merged.ensure_current(today)?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 4, d).unwrap()
    }

    fn observation(d: u32, balance: i64) -> BalanceObservation {
        BalanceObservation::new("card".to_string(), day(d), BigDecimal::from(balance))
    }

    fn timeline(entries: &[(u32, i64)]) -> BalanceTimeline {
        BalanceTimeline::from_entries(
            "card".to_string(),
            entries
                .iter()
                .map(|(d, b)| BalanceEntry::new(day(*d), BigDecimal::from(*b)))
                .collect(),
        )
        .unwrap()
    }

    fn pairs(timeline: &BalanceTimeline) -> Vec<(u32, BigDecimal)> {
        use chrono::Datelike;
        timeline
            .iter()
            .map(|(date, balance)| (date.day(), balance.clone()))
            .collect()
    }

    fn expected(entries: &[(u32, i64)]) -> Vec<(u32, BigDecimal)> {
        entries
            .iter()
            .map(|(d, b)| (*d, BigDecimal::from(*b)))
            .collect()
    }

    #[test]
    fn test_single_observation_fills_through_today() {
        let empty = BalanceTimeline::new("card".to_string());
        let merged = merge_observations(&empty, &[observation(10, 800)], day(13)).unwrap();

        assert_eq!(
            pairs(&merged),
            expected(&[(10, 800), (11, 800), (12, 800), (13, 800)])
        );
    }

    #[test]
    fn test_overwrite_carries_drift_forward() {
        let existing = timeline(&[(10, 800), (11, 1000), (12, 1200)]);
        let merged = merge_observations(&existing, &[observation(11, 1100)], day(14)).unwrap();

        assert_eq!(
            pairs(&merged),
            expected(&[(10, 800), (11, 1100), (12, 1300), (13, 1300), (14, 1300)])
        );
    }

    #[test]
    fn test_sparse_gaps_inside_window_take_stepped_values() {
        let existing = timeline(&[(10, 500), (13, 1100), (16, 900)]);
        let merged = merge_observations(&existing, &[observation(12, 1000)], day(17)).unwrap();

        // 12 lands between stored days, so 13 becomes the boundary day.
        assert_eq!(
            pairs(&merged),
            expected(&[
                (10, 500),
                (12, 1000),
                (13, 1000),
                (14, 1000),
                (15, 1000),
                (16, 800),
                (17, 800),
            ])
        );
    }

    #[test]
    fn test_observations_before_first_entry_backfill() {
        let existing = timeline(&[(10, 1000)]);
        let merged = merge_observations(
            &existing,
            &[observation(7, 900), observation(5, 800)],
            day(12),
        )
        .unwrap();

        assert_eq!(
            pairs(&merged),
            expected(&[
                (5, 800),
                (6, 800),
                (7, 900),
                (8, 900),
                (9, 900),
                (10, 900),
                (11, 900),
                (12, 900),
            ])
        );
    }

    #[test]
    fn test_appending_after_stale_timeline() {
        let existing = timeline(&[(3, 200), (5, 300)]);
        let merged = merge_observations(&existing, &[observation(8, 450)], day(9)).unwrap();

        // Gap 3..5 lies before the window and stays sparse.
        assert_eq!(
            pairs(&merged),
            expected(&[(3, 200), (5, 300), (6, 300), (7, 300), (8, 450), (9, 450)])
        );
    }

    #[test]
    fn test_empty_batch_extends_to_today() {
        let existing = timeline(&[(10, 75)]);
        let merged = merge_observations(&existing, &[], day(12)).unwrap();
        assert_eq!(pairs(&merged), expected(&[(10, 75), (11, 75), (12, 75)]));

        let empty = BalanceTimeline::new("card".to_string());
        assert!(merge_observations(&empty, &[], day(12)).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_dates_last_in_batch_wins() {
        let batch = vec![observation(10, 1), observation(11, 5), observation(10, 2)];
        let sorted = sort_batch(&batch);
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].balance, BigDecimal::from(2));

        let empty = BalanceTimeline::new("card".to_string());
        let merged = merge_observations(&empty, &batch, day(11)).unwrap();
        assert_eq!(pairs(&merged), expected(&[(10, 2), (11, 5)]));
    }

    #[test]
    fn test_order_independence() {
        let existing = timeline(&[(2, 40), (4, 60), (9, 90)]);
        let forward = vec![observation(3, 50), observation(6, 70), observation(11, 10)];
        let reverse: Vec<BalanceObservation> = forward.iter().rev().cloned().collect();

        let a = merge_observations(&existing, &forward, day(14)).unwrap();
        let b = merge_observations(&existing, &reverse, day(14)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_resubmission_is_idempotent() {
        let existing = timeline(&[(2, 40), (4, 60), (9, 90)]);
        let batch = vec![observation(3, 50), observation(6, 70), observation(11, 10)];

        let once = merge_observations(&existing, &batch, day(14)).unwrap();
        let twice = merge_observations(&once, &batch, day(14)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_result_is_dense_and_current() {
        let existing = timeline(&[(1, 10), (6, 60), (8, 80)]);
        let batch = vec![observation(2, 20), observation(8, 85), observation(12, 120)];
        let merged = merge_observations(&existing, &batch, day(20)).unwrap();

        let dates: Vec<NaiveDate> = merged.iter().map(|(date, _)| date).collect();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*dates.last().unwrap(), day(20));
        let from_first_observation: Vec<&NaiveDate> =
            dates.iter().filter(|date| **date >= day(2)).collect();
        assert_eq!(from_first_observation.len(), 19);
    }

    #[test]
    fn test_decimal_drift() {
        let existing = BalanceTimeline::from_entries(
            "card".to_string(),
            vec![
                BalanceEntry::new(day(1), BigDecimal::from_str("10.50").unwrap()),
                BalanceEntry::new(day(2), BigDecimal::from_str("20.25").unwrap()),
            ],
        )
        .unwrap();
        let batch = vec![BalanceObservation::new(
            "card".to_string(),
            day(1),
            BigDecimal::from_str("10.75").unwrap(),
        )];

        let merged = merge_observations(&existing, &batch, day(2)).unwrap();
        assert_eq!(merged.get(day(2)), Some(&BigDecimal::from_str("20.50").unwrap()));
    }

    #[test]
    fn test_rejects_future_observation_and_stale_clock() {
        let empty = BalanceTimeline::new("card".to_string());
        let result = merge_observations(&empty, &[observation(20, 1)], day(19));
        assert!(matches!(result, Err(BalanceError::MalformedObservation(_))));

        let ahead = timeline(&[(20, 1)]);
        let result = merge_observations(&ahead, &[], day(19));
        assert!(matches!(result, Err(BalanceError::Validation(_))));
    }
}
