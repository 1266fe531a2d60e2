//! Indicator calculators.
//!
//! Each calculator is a pure function from a bar slice to one row per bar,
//! plus the crossover rules that turn the last two rows into a decision.
//! The streaming engine re-runs `compute` over the whole stored window on
//! every update, so live and backtest runs agree numerically on equal input.

pub mod ema_ribbon;
pub mod ewm;
pub mod kdj;
pub mod macd;
pub mod rsi;

use std::fmt::Debug;

use common::{Bar, IndicatorSnapshot};

pub use ema_ribbon::{EmaRibbon, EmaRibbonConfig, RibbonRow};
pub use ewm::Ewm;
pub use kdj::{Kdj, KdjConfig, KdjRow};
pub use macd::{Macd, MacdConfig, MacdRow};
pub use rsi::{Rsi, RsiConfig, RsiRow};

/// Three derived columns attached to one bar.
pub trait IndicatorRow: Copy + Debug + Send + Sync + 'static {
    const COLUMNS: [&'static str; 3];

    fn values(&self) -> [f64; 3];

    /// Whether this row can take part in a buy/sell decision.
    fn is_defined(&self) -> bool {
        self.values().iter().all(|v| v.is_finite())
    }

    fn snapshot(&self) -> IndicatorSnapshot {
        Self::COLUMNS
            .iter()
            .zip(self.values())
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

/// A strategy variant: how to compute its rows and how to read a crossing.
pub trait Indicator: Send + Sync {
    type Row: IndicatorRow;

    /// Identifier used in the strategy file (`type = "..."`).
    fn kind(&self) -> &'static str;

    /// One row per input bar, oldest first.
    fn compute(&self, bars: &[Bar]) -> Vec<Self::Row>;

    fn is_buy(&self, previous: &Self::Row, current: &Self::Row) -> bool;

    fn is_sell(&self, previous: &Self::Row, current: &Self::Row) -> bool;
}

pub(crate) fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Create synthetic bars from close prices for testing.
///
/// high = close + 1, low = close - 1, open = previous close,
/// one bar per minute from 2022-04-13 09:30.
#[cfg(test)]
pub fn make_bars(code: &str, closes: &[f64]) -> Vec<Bar> {
    let start = chrono::NaiveDate::from_ymd_opt(2022, 4, 13)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            code: code.to_string(),
            time_key: start + chrono::Duration::minutes(i as i64),
            open: if i == 0 { close } else { closes[i - 1] },
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}
