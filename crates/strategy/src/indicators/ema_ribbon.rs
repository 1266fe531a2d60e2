use common::{Bar, Error, Result};

use super::{closes, Ewm, Indicator, IndicatorRow};

/// Spans of the three ribbon EMAs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmaRibbonConfig {
    pub fast: usize,
    pub slow: usize,
    pub support: usize,
}

impl Default for EmaRibbonConfig {
    fn default() -> Self {
        Self {
            fast: 5,
            slow: 8,
            support: 13,
        }
    }
}

impl EmaRibbonConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fast == 0 || self.slow == 0 || self.support == 0 {
            return Err(Error::Config(format!(
                "EMA ribbon spans must be >= 1, got {}/{}/{}",
                self.fast, self.slow, self.support
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RibbonRow {
    pub fast: f64,
    pub slow: f64,
    pub support: f64,
}

impl RibbonRow {
    fn fast_above_all(&self) -> bool {
        self.fast > self.slow && self.fast > self.support
    }

    fn fast_below_any(&self) -> bool {
        self.fast < self.slow || self.fast < self.support
    }
}

impl IndicatorRow for RibbonRow {
    const COLUMNS: [&'static str; 3] = ["ema_fast", "ema_slow", "ema_supp"];

    fn values(&self) -> [f64; 3] {
        [self.fast, self.slow, self.support]
    }
}

/// EMA ribbon crossover: the fast EMA breaking out above (or dropping
/// below) the slow and support EMAs.
#[derive(Debug, Clone)]
pub struct EmaRibbon {
    cfg: EmaRibbonConfig,
}

impl EmaRibbon {
    pub fn new(cfg: EmaRibbonConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &EmaRibbonConfig {
        &self.cfg
    }
}

impl Indicator for EmaRibbon {
    type Row = RibbonRow;

    fn kind(&self) -> &'static str {
        "ema_ribbon"
    }

    fn compute(&self, bars: &[Bar]) -> Vec<RibbonRow> {
        let closes = closes(bars);
        let fast = Ewm::span(self.cfg.fast).apply(&closes);
        let slow = Ewm::span(self.cfg.slow).apply(&closes);
        let support = Ewm::span(self.cfg.support).apply(&closes);

        fast.into_iter()
            .zip(slow)
            .zip(support)
            .map(|((fast, slow), support)| RibbonRow { fast, slow, support })
            .collect()
    }

    /// Fast EMA is above both others now, and was not on the previous bar.
    fn is_buy(&self, previous: &RibbonRow, current: &RibbonRow) -> bool {
        current.fast_above_all() && !previous.fast_above_all()
    }

    /// Fast EMA dropped below at least one of the others on this bar.
    fn is_sell(&self, previous: &RibbonRow, current: &RibbonRow) -> bool {
        current.fast_below_any() && !previous.fast_below_any()
    }
}
