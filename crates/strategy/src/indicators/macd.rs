use common::{Bar, Error, Result};

use super::{closes, Ewm, Indicator, IndicatorRow};

/// MACD (Moving Average Convergence/Divergence) periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdConfig {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

impl MacdConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fast == 0 || self.signal == 0 {
            return Err(Error::Config(format!(
                "MACD periods must be >= 1, got {}/{}/{}",
                self.fast, self.slow, self.signal
            )));
        }
        if self.fast >= self.slow {
            return Err(Error::Config(format!(
                "MACD fast period must be less than slow period, got {} >= {}",
                self.fast, self.slow
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdRow {
    pub macd: f64,
    pub signal: f64,
    pub hist: f64,
}

impl IndicatorRow for MacdRow {
    const COLUMNS: [&'static str; 3] = ["macd", "macd_signal", "macd_hist"];

    fn values(&self) -> [f64; 3] {
        [self.macd, self.signal, self.hist]
    }
}

/// MACD line = EMA(fast) − EMA(slow), signal = EMA(MACD, signal period),
/// histogram = (MACD − signal) × 2. A decision is a single-bar crossing of
/// the MACD line through the signal line.
#[derive(Debug, Clone)]
pub struct Macd {
    cfg: MacdConfig,
}

impl Macd {
    pub fn new(cfg: MacdConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &MacdConfig {
        &self.cfg
    }
}

impl Indicator for Macd {
    type Row = MacdRow;

    fn kind(&self) -> &'static str {
        "macd"
    }

    fn compute(&self, bars: &[Bar]) -> Vec<MacdRow> {
        let closes = closes(bars);
        let fast = Ewm::span(self.cfg.fast).apply(&closes);
        let slow = Ewm::span(self.cfg.slow).apply(&closes);
        let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = Ewm::span(self.cfg.signal).apply(&macd);

        macd.into_iter()
            .zip(signal)
            .map(|(macd, signal)| MacdRow {
                macd,
                signal,
                hist: (macd - signal) * 2.0,
            })
            .collect()
    }

    fn is_buy(&self, previous: &MacdRow, current: &MacdRow) -> bool {
        current.macd > current.signal && previous.macd <= previous.signal
    }

    fn is_sell(&self, previous: &MacdRow, current: &MacdRow) -> bool {
        current.macd < current.signal && previous.macd >= previous.signal
    }
}
