use common::{Bar, Error, Result};

use super::{closes, Ewm, Indicator, IndicatorRow};

/// RSI (Relative Strength Index) over three periods with a lower/upper band.
///
/// Decisions are taken on the short RSI only; the medium and long lines
/// are computed for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiConfig {
    pub short: usize,
    pub medium: usize,
    pub long: usize,
    pub lower: f64,
    pub upper: f64,
}

impl Default for RsiConfig {
    fn default() -> Self {
        Self {
            short: 6,
            medium: 12,
            long: 24,
            lower: 30.0,
            upper: 70.0,
        }
    }
}

impl RsiConfig {
    pub fn validate(&self) -> Result<()> {
        if self.short < 2 || self.medium < 2 || self.long < 2 {
            return Err(Error::Config(format!(
                "RSI periods must be >= 2, got {}/{}/{}",
                self.short, self.medium, self.long
            )));
        }
        if !(0.0..=100.0).contains(&self.lower)
            || !(0.0..=100.0).contains(&self.upper)
            || self.lower >= self.upper
        {
            return Err(Error::Config(format!(
                "RSI thresholds must satisfy 0 <= lower < upper <= 100, got {}/{}",
                self.lower, self.upper
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiRow {
    pub short: f64,
    pub medium: f64,
    pub long: f64,
}

impl IndicatorRow for RsiRow {
    const COLUMNS: [&'static str; 3] = ["rsi_1", "rsi_2", "rsi_3"];

    fn values(&self) -> [f64; 3] {
        [self.short, self.medium, self.long]
    }

    fn is_defined(&self) -> bool {
        self.short.is_finite()
    }
}

/// RSI threshold cross.
#[derive(Debug, Clone)]
pub struct Rsi {
    cfg: RsiConfig,
}

impl Rsi {
    pub fn new(cfg: RsiConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &RsiConfig {
        &self.cfg
    }
}

/// RSI per bar for one period. The first bar has no change and is NaN, as
/// is every bar before `period` changes have been seen.
///
/// Average gain/loss use the adjusted exponential mean with `α = 1/period`.
/// Only losses → 0, only gains → 100, no movement at all → NaN.
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; closes.len()];
    if closes.len() < 2 {
        return out;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = changes.iter().map(|c| c.max(0.0)).collect();
    let losses: Vec<f64> = changes.iter().map(|c| c.min(0.0)).collect();

    let smoothing = Ewm::com(period.saturating_sub(1) as f64).min_periods(period);
    let avg_gain = smoothing.apply(&gains);
    let avg_loss = smoothing.apply(&losses);

    for (i, (gain, loss)) in avg_gain.iter().zip(&avg_loss).enumerate() {
        let rs = (gain / loss).abs();
        out[i + 1] = 100.0 - 100.0 / (1.0 + rs);
    }
    out
}

impl Indicator for Rsi {
    type Row = RsiRow;

    fn kind(&self) -> &'static str {
        "rsi"
    }

    fn compute(&self, bars: &[Bar]) -> Vec<RsiRow> {
        let closes = closes(bars);
        let short = rsi_series(&closes, self.cfg.short);
        let medium = rsi_series(&closes, self.cfg.medium);
        let long = rsi_series(&closes, self.cfg.long);

        short
            .into_iter()
            .zip(medium)
            .zip(long)
            .map(|((short, medium), long)| RsiRow { short, medium, long })
            .collect()
    }

    /// Short RSI falls through the lower band.
    fn is_buy(&self, previous: &RsiRow, current: &RsiRow) -> bool {
        current.short < self.cfg.lower && self.cfg.lower < previous.short
    }

    /// Short RSI rises through the upper band.
    fn is_sell(&self, previous: &RsiRow, current: &RsiRow) -> bool {
        current.short > self.cfg.upper && self.cfg.upper > previous.short
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn rsi_is_nan_until_period_changes_seen() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let out = rsi_series(&closes, 6);
        assert!(out[..6].iter().all(|v| v.is_nan()));
        assert!(out[6..].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn rsi_all_gains_returns_100() {
        let out = rsi_series(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        assert_approx(*out.last().unwrap(), 100.0, 1e-6);
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        let out = rsi_series(&[14.0, 13.0, 12.0, 11.0, 10.0], 3);
        assert_approx(*out.last().unwrap(), 0.0, 1e-6);
    }

    #[test]
    fn rsi_flat_prices_are_undefined() {
        let out = rsi_series(&[10.0; 8], 3);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_stays_in_range() {
        let closes = [
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.15, 43.61, 44.33, 44.83, 45.10,
            45.15, 44.34, 44.09,
        ];
        for v in rsi_series(&closes, 6).into_iter().filter(|v| v.is_finite()) {
            assert!((0.0..=100.0).contains(&v), "RSI out of range: {v}");
        }
    }

    #[test]
    fn dropping_through_lower_band_is_a_buy() {
        let rsi = Rsi::new(RsiConfig::default());
        // Gentle rise keeps RSI high, then a sell-off drags it under 30.
        let mut closes: Vec<f64> = (0..15).map(|i| 100.0 + (i % 2) as f64 * 0.5 + i as f64 * 0.1).collect();
        closes.extend((1..=6).map(|i| 101.0 - 2.0 * i as f64));
        let rows = rsi.compute(&make_bars("HK.00700", &closes));
        let buys: Vec<usize> = (1..rows.len())
            .filter(|&i| rsi.is_buy(&rows[i - 1], &rows[i]))
            .collect();
        assert_eq!(buys.len(), 1);
        assert!(buys[0] >= 15);
    }

    #[test]
    fn short_rsi_is_enough_for_a_decision() {
        let row = RsiRow { short: 25.0, medium: f64::NAN, long: f64::NAN };
        assert!(row.is_defined());
    }
}
