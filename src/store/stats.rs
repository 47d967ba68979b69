//! Sales statistics derived from the daily mint counters.

use std::collections::BTreeMap;

use serde::Serialize;

/// One point of the cumulative sales series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesPoint {
    /// UTC day, `YYYY-MM-DD`.
    pub date: String,
    /// Mints on this day.
    pub daily: u64,
    /// Running total up to and including this day.
    pub sales: u64,
}

/// Running totals over daily counters, oldest day first.
///
/// ISO dates sort lexicographically, so the map order is the calendar order.
pub fn cumulative_sales(daily: &BTreeMap<String, u64>) -> Vec<SalesPoint> {
    daily
        .iter()
        .scan(0u64, |total, (date, count)| {
            *total = total.saturating_add(*count);
            Some(SalesPoint {
                date: date.clone(),
                daily: *count,
                sales: *total,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_total() {
        let mut daily = BTreeMap::new();
        daily.insert("2026-01-16".to_string(), 2);
        daily.insert("2026-01-15".to_string(), 3);
        daily.insert("2026-02-01".to_string(), 1);

        let series = cumulative_sales(&daily);
        let totals: Vec<_> = series.iter().map(|p| (p.date.as_str(), p.sales)).collect();
        assert_eq!(
            totals,
            vec![("2026-01-15", 3), ("2026-01-16", 5), ("2026-02-01", 6)]
        );
        assert_eq!(series[1].daily, 2);
    }

    #[test]
    fn test_empty() {
        assert!(cumulative_sales(&BTreeMap::new()).is_empty());
    }
}
