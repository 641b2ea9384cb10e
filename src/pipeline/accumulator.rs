use crate::error::{FetcherError, Result};
use std::collections::HashMap;

/// Running totals for one country code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub confirmed: i64,
    pub dead: i64,
}

/// Rebuilds cumulative series from daily deltas, keyed by (remapped)
/// country code. Scoped to one run.
///
/// Deltas for a code must be added in chronological order: every total
/// emitted after an out-of-order delta is wrong for the rest of the run.
#[derive(Debug, Default)]
pub struct CumulativeAccumulator {
    totals: HashMap<String, Totals>,
}

impl CumulativeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one day's deltas and return the new running totals for `code`.
    /// Unknown codes start from zero. A total that leaves the `i64` range is
    /// an error and leaves the stored totals untouched.
    pub fn add(&mut self, code: &str, confirmed: i64, dead: i64) -> Result<Totals> {
        let entry = self.totals.entry(code.to_string()).or_default();
        let overflow = |column| FetcherError::TotalOverflow {
            countrycode: code.to_string(),
            column,
        };
        let next = Totals {
            confirmed: entry
                .confirmed
                .checked_add(confirmed)
                .ok_or_else(|| overflow("confirmed"))?,
            dead: entry.dead.checked_add(dead).ok_or_else(|| overflow("dead"))?,
        };
        *entry = next;
        Ok(next)
    }

    pub fn totals(&self, code: &str) -> Option<Totals> {
        self.totals.get(code).copied()
    }

    pub fn countries(&self) -> usize {
        self.totals.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmed_series(acc: &mut CumulativeAccumulator, code: &str, deltas: &[i64]) -> Vec<i64> {
        deltas
            .iter()
            .map(|d| acc.add(code, *d, 0).unwrap().confirmed)
            .collect()
    }

    #[test]
    fn test_emits_prefix_sums() {
        let deltas = [3, 0, 7, 12, 1, 0, 5];
        let mut acc = CumulativeAccumulator::new();

        let emitted = confirmed_series(&mut acc, "ITA", &deltas);

        let mut expected = Vec::new();
        let mut sum = 0;
        for d in deltas {
            sum += d;
            expected.push(sum);
        }
        assert_eq!(emitted, expected);
        assert_eq!(acc.totals("ITA").unwrap().confirmed, 28);
    }

    #[test]
    fn test_out_of_order_deltas_change_the_series() {
        // (day, delta) pairs; the emitted total is attributed to the day
        let chronological = [(1, 10), (2, 5), (3, 2)];
        let shuffled = [(2, 5), (1, 10), (3, 2)];

        let run = |rows: &[(u32, i64)]| {
            let mut acc = CumulativeAccumulator::new();
            let mut by_day: Vec<(u32, i64)> = rows
                .iter()
                .map(|(day, d)| (*day, acc.add("ITA", *d, 0).unwrap().confirmed))
                .collect();
            by_day.sort();
            by_day
        };

        assert_eq!(run(&chronological), vec![(1, 10), (2, 15), (3, 17)]);
        assert_eq!(run(&shuffled), vec![(1, 15), (2, 5), (3, 17)]);
        assert_ne!(run(&chronological), run(&shuffled));
    }

    #[test]
    fn test_countries_are_independent() {
        let mut acc = CumulativeAccumulator::new();
        acc.add("ITA", 10, 1).unwrap();
        acc.add("FRA", 4, 0).unwrap();
        let ita = acc.add("ITA", 5, 0).unwrap();

        assert_eq!(ita, Totals { confirmed: 15, dead: 1 });
        assert_eq!(acc.totals("FRA"), Some(Totals { confirmed: 4, dead: 0 }));
        assert_eq!(acc.totals("DEU"), None);
        assert_eq!(acc.countries(), 2);
    }

    #[test]
    fn test_overflowing_total_is_an_error_not_a_panic() {
        let mut acc = CumulativeAccumulator::new();
        acc.add("ITA", i64::MAX, 0).unwrap();

        let err = acc.add("ITA", 1, 0).unwrap_err();
        match err {
            FetcherError::TotalOverflow { countrycode, column } => {
                assert_eq!(countrycode, "ITA");
                assert_eq!(column, "confirmed");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(acc.totals("ITA"), Some(Totals { confirmed: i64::MAX, dead: 0 }));

        acc.add("FRA", 0, i64::MIN).unwrap();
        let err = acc.add("FRA", 0, -1).unwrap_err();
        assert!(matches!(err, FetcherError::TotalOverflow { column: "dead", .. }));
    }
}
