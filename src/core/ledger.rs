//! The session trip ledger: ordered line-items plus the aggregates the
//! documents are built from.

use crate::errors::{Error, Result};
use crate::models::TripLineItem;
use chrono::NaiveDate;

/// Ordered, session-scoped collection of expense line-items. Items keep
/// their add order until generation, which works on a chronologically
/// sorted view.
#[derive(Debug, Clone, Default)]
pub struct TripLedger {
    items: Vec<TripLineItem>,
}

impl TripLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[TripLineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends expanded line-items in order.
    pub fn append<I: IntoIterator<Item = TripLineItem>>(&mut self, items: I) {
        self.items.extend(items);
    }

    /// Removes the item at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<TripLineItem> {
        if index >= self.items.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// A chronologically sorted copy. The sort is stable, so same-day items
    /// keep their add order; the ledger itself is left untouched.
    pub fn sorted_by_date(&self) -> Vec<TripLineItem> {
        let mut sorted = self.items.clone();
        sorted.sort_by_key(|item| item.date);
        sorted
    }

    /// Sum of food + misc over all items.
    pub fn total(&self) -> f64 {
        self.items.iter().map(TripLineItem::cost).sum()
    }

    /// Earliest and latest leg dates.
    pub fn date_span(&self) -> Result<(NaiveDate, NaiveDate)> {
        let min = self.items.iter().map(|i| i.date).min();
        let max = self.items.iter().map(|i| i.date).max();
        match (min, max) {
            (Some(min), Some(max)) => Ok((min, max)),
            _ => Err(Error::EmptyLedger),
        }
    }

    /// One display row per item for list surfaces: leg date (`MM-DD`),
    /// route, cost, and whether a no-car certificate is due.
    pub fn summary_rows(&self) -> Vec<(String, String, f64, bool)> {
        self.items
            .iter()
            .map(|item| {
                (
                    item.date.format("%m-%d").to_string(),
                    format!("{}->{}", item.start_place, item.end_place),
                    item.cost(),
                    item.needs_no_car_proof,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(date: &str, food: f64, misc: f64) -> TripLineItem {
        TripLineItem {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            start_place: "龙潭".to_string(),
            end_place: "辖区".to_string(),
            food_amount: food,
            misc_amount: misc,
            needs_no_car_proof: false,
            reason: "差旅".to_string(),
            full_span: None,
            is_return_leg: false,
        }
    }

    #[test]
    fn test_total_is_order_independent() {
        let mut a = TripLedger::new();
        a.append([item("2024-05-10", 0.0, 25.0), item("2024-05-06", 40.0, 0.0)]);
        let mut b = TripLedger::new();
        b.append([item("2024-05-06", 40.0, 0.0), item("2024-05-10", 0.0, 25.0)]);
        assert_eq!(a.total(), 65.0);
        assert_eq!(a.total(), b.total());
        assert_eq!(a.date_span().unwrap(), b.date_span().unwrap());
    }

    #[test]
    fn test_sorted_by_date_is_stable_and_non_mutating() {
        let mut ledger = TripLedger::new();
        let mut first = item("2024-05-10", 0.0, 25.0);
        first.reason = "first".to_string();
        let mut second = item("2024-05-10", 0.0, 30.0);
        second.reason = "second".to_string();
        ledger.append([first, item("2024-05-06", 40.0, 0.0), second]);

        let sorted = ledger.sorted_by_date();
        assert_eq!(sorted[0].date.to_string(), "2024-05-06");
        assert_eq!(sorted[1].reason, "first");
        assert_eq!(sorted[2].reason, "second");
        // Add order preserved in the ledger itself.
        assert_eq!(ledger.items()[0].reason, "first");
    }

    #[test]
    fn test_remove_at_bounds() {
        let mut ledger = TripLedger::new();
        ledger.append([item("2024-05-06", 40.0, 0.0)]);
        assert!(matches!(
            ledger.remove_at(1),
            Err(Error::IndexOutOfRange { index: 1, len: 1 })
        ));
        ledger.remove_at(0).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_empty_ledger_has_no_date_span() {
        let ledger = TripLedger::new();
        assert!(matches!(ledger.date_span(), Err(Error::EmptyLedger)));
    }

    #[test]
    fn test_summary_rows() {
        let mut ledger = TripLedger::new();
        ledger.append([item("2024-05-06", 40.0, 0.0)]);
        let rows = ledger.summary_rows();
        assert_eq!(rows[0].0, "05-06");
        assert_eq!(rows[0].1, "龙潭->辖区");
        assert_eq!(rows[0].2, 40.0);
    }
}
