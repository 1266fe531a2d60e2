use std::collections::{HashMap, VecDeque};

use common::Bar;

/// How an incoming bar was reconciled into its series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Newer than everything stored.
    Appended,
    /// Same `time_key` as a stored bar; the stored bar was overwritten.
    Replaced,
    /// Older than the newest stored bar, placed at its ordered position.
    Inserted,
}

/// Bars of one instrument plus one derived row per bar.
///
/// Bars are ordered by `time_key` with no duplicates. `rows` is only
/// meaningful once the owning engine has recomputed after a mutation.
#[derive(Debug, Clone)]
pub struct InstrumentSeries<R> {
    bars: VecDeque<Bar>,
    rows: Vec<R>,
    faulted: bool,
}

impl<R> Default for InstrumentSeries<R> {
    fn default() -> Self {
        Self {
            bars: VecDeque::new(),
            rows: Vec::new(),
            faulted: false,
        }
    }
}

impl<R> InstrumentSeries<R> {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> impl ExactSizeIterator<Item = &Bar> + '_ {
        self.bars.iter()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn latest_bar(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// Last update for this instrument failed; no signal until the next
    /// successful one.
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// `(previous, current)` rows, if at least two exist.
    pub fn last_two_rows(&self) -> Option<(&R, &R)> {
        match self.rows.as_slice() {
            [.., previous, current] => Some((previous, current)),
            _ => None,
        }
    }

    pub(crate) fn replace_all(&mut self, bars: Vec<Bar>) {
        self.bars = normalize(bars);
        self.rows.clear();
    }

    pub(crate) fn upsert(&mut self, bar: Bar) -> Reconcile {
        let outcome = match self
            .bars
            .binary_search_by(|stored| stored.time_key.cmp(&bar.time_key))
        {
            Ok(i) => {
                self.bars[i] = bar;
                Reconcile::Replaced
            }
            Err(i) if i == self.bars.len() => {
                self.bars.push_back(bar);
                Reconcile::Appended
            }
            Err(i) => {
                self.bars.insert(i, bar);
                Reconcile::Inserted
            }
        };
        self.rows.clear();
        outcome
    }

    /// Drop the oldest bars until at most `max` remain. Returns how many
    /// were dropped.
    pub(crate) fn truncate_front(&mut self, max: usize) -> usize {
        let excess = self.bars.len().saturating_sub(max);
        self.bars.drain(..excess);
        excess
    }

    pub(crate) fn recompute_with(&mut self, compute: impl FnOnce(&[Bar]) -> Vec<R>) {
        let rows = compute(self.bars.make_contiguous());
        debug_assert_eq!(rows.len(), self.bars.len());
        self.rows = rows;
        self.faulted = false;
    }

    pub(crate) fn set_faulted(&mut self) {
        self.faulted = true;
    }
}

/// Sort by `time_key` and collapse duplicates, the later one in input
/// order winning.
fn normalize(mut bars: Vec<Bar>) -> VecDeque<Bar> {
    bars.sort_by(|a, b| a.time_key.cmp(&b.time_key));
    let mut out: VecDeque<Bar> = VecDeque::with_capacity(bars.len());
    for bar in bars {
        match out.back_mut() {
            Some(last) if last.time_key == bar.time_key => *last = bar,
            _ => out.push_back(bar),
        }
    }
    out
}

/// Per-instrument series, keyed by instrument code.
///
/// Series are created on first use and live as long as the store. Callers
/// outside this crate only ever get shared references.
#[derive(Debug, Clone)]
pub struct BarStore<R> {
    series: HashMap<String, InstrumentSeries<R>>,
}

impl<R> Default for BarStore<R> {
    fn default() -> Self {
        Self {
            series: HashMap::new(),
        }
    }
}

impl<R> BarStore<R> {
    pub fn get(&self, code: &str) -> Option<&InstrumentSeries<R>> {
        self.series.get(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> + '_ {
        self.series.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub(crate) fn entry(&mut self, code: &str) -> &mut InstrumentSeries<R> {
        self.series.entry(code.to_string()).or_default()
    }

    pub(crate) fn get_mut(&mut self, code: &str) -> Option<&mut InstrumentSeries<R>> {
        self.series.get_mut(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn series_of(closes: &[f64]) -> InstrumentSeries<f64> {
        let mut s = InstrumentSeries::default();
        s.replace_all(make_bars("HK.00700", closes));
        s
    }

    #[test]
    fn newer_bar_is_appended() {
        let mut s = series_of(&[1.0, 2.0]);
        let next = make_bars("HK.00700", &[1.0, 2.0, 3.0]).pop().unwrap();
        assert_eq!(s.upsert(next), Reconcile::Appended);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn same_time_key_replaces_in_place() {
        let mut s = series_of(&[1.0, 2.0, 3.0]);
        let mut corrected = make_bars("HK.00700", &[1.0, 2.0, 3.0])[1].clone();
        corrected.close = 2.5;
        assert_eq!(s.upsert(corrected), Reconcile::Replaced);
        assert_eq!(s.len(), 3);
        let closes: Vec<f64> = s.bars().map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 2.5, 3.0]);
    }

    #[test]
    fn late_bar_keeps_series_ordered() {
        let all = make_bars("HK.00700", &[1.0, 2.0, 3.0]);
        let mut s = InstrumentSeries::<f64>::default();
        s.replace_all(vec![all[0].clone(), all[2].clone()]);
        assert_eq!(s.upsert(all[1].clone()), Reconcile::Inserted);
        let keys: Vec<_> = s.bars().map(|b| b.time_key).collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn batch_is_sorted_and_deduplicated_last_wins() {
        let bars = make_bars("HK.00700", &[1.0, 2.0, 3.0]);
        let mut dup = bars[0].clone();
        dup.close = 9.0;
        let mut s = InstrumentSeries::<f64>::default();
        s.replace_all(vec![bars[2].clone(), bars[0].clone(), bars[1].clone(), dup]);
        let closes: Vec<f64> = s.bars().map(|b| b.close).collect();
        assert_eq!(closes, vec![9.0, 2.0, 3.0]);
    }

    #[test]
    fn truncate_drops_oldest_first() {
        let mut s = series_of(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(s.truncate_front(3), 2);
        let closes: Vec<f64> = s.bars().map(|b| b.close).collect();
        assert_eq!(closes, vec![3.0, 4.0, 5.0]);
        assert_eq!(s.truncate_front(10), 0);
    }

    #[test]
    fn last_two_rows_needs_two() {
        let mut s = series_of(&[1.0]);
        s.recompute_with(|bars| bars.iter().map(|b| b.close).collect());
        assert!(s.last_two_rows().is_none());

        let mut s = series_of(&[1.0, 2.0, 3.0]);
        s.recompute_with(|bars| bars.iter().map(|b| b.close).collect());
        assert_eq!(s.last_two_rows(), Some((&2.0, &3.0)));
    }

    #[test]
    fn store_creates_series_on_first_use() {
        let mut store = BarStore::<f64>::default();
        assert!(store.get("HK.00700").is_none());
        store.entry("HK.00700").replace_all(make_bars("HK.00700", &[1.0]));
        assert_eq!(store.get("HK.00700").map(|s| s.len()), Some(1));
        assert_eq!(store.len(), 1);
    }
}
