use common::{Bar, Error, Result};

use super::{Ewm, Indicator, IndicatorRow};

/// Stochastic KDJ parameters (the common 9-3-3 with 80/20 bands).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdjConfig {
    /// Lookback of the rolling high/low.
    pub fast_k: usize,
    /// Smoothing of RSV into %K (centre of mass `slow_k - 1`).
    pub slow_k: usize,
    /// Smoothing of %K into %D (centre of mass `slow_d - 1`).
    pub slow_d: usize,
    pub over_buy: f64,
    pub over_sell: f64,
}

impl Default for KdjConfig {
    fn default() -> Self {
        Self {
            fast_k: 9,
            slow_k: 3,
            slow_d: 3,
            over_buy: 80.0,
            over_sell: 20.0,
        }
    }
}

impl KdjConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fast_k == 0 || self.slow_k == 0 || self.slow_d == 0 {
            return Err(Error::Config(format!(
                "KDJ periods must be >= 1, got {}/{}/{}",
                self.fast_k, self.slow_k, self.slow_d
            )));
        }
        if !(0.0..=100.0).contains(&self.over_sell)
            || !(0.0..=100.0).contains(&self.over_buy)
            || self.over_sell >= self.over_buy
        {
            return Err(Error::Config(format!(
                "KDJ thresholds must satisfy 0 <= over_sell < over_buy <= 100, got {}/{}",
                self.over_sell, self.over_buy
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdjRow {
    pub k: f64,
    pub d: f64,
    pub j: f64,
}

impl IndicatorRow for KdjRow {
    const COLUMNS: [&'static str; 3] = ["%k", "%d", "%j"];

    fn values(&self) -> [f64; 3] {
        [self.k, self.d, self.j]
    }
}

/// KDJ cross: %K crossing %D out of an over-sold / over-bought zone.
#[derive(Debug, Clone)]
pub struct Kdj {
    cfg: KdjConfig,
}

impl Kdj {
    pub fn new(cfg: KdjConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &KdjConfig {
        &self.cfg
    }

    /// Raw stochastic value per bar.
    ///
    /// Until `fast_k` bars exist the window is everything seen so far
    /// (an expanding high/low). Early readings are biased by this; it is
    /// kept because signal timing depends on it. A flat range gives NaN.
    pub fn rsv(&self, bars: &[Bar]) -> Vec<f64> {
        (0..bars.len())
            .map(|i| {
                let window = &bars[(i + 1).saturating_sub(self.cfg.fast_k)..=i];
                let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
                let high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
                let range = high - low;
                if range == 0.0 {
                    f64::NAN
                } else {
                    (bars[i].close - low) / range * 100.0
                }
            })
            .collect()
    }
}

impl Indicator for Kdj {
    type Row = KdjRow;

    fn kind(&self) -> &'static str {
        "kdj"
    }

    fn compute(&self, bars: &[Bar]) -> Vec<KdjRow> {
        let rsv = self.rsv(bars);
        let k = Ewm::com(self.cfg.slow_k.saturating_sub(1) as f64).apply(&rsv);
        let d = Ewm::com(self.cfg.slow_d.saturating_sub(1) as f64).apply(&k);

        k.into_iter()
            .zip(d)
            .map(|(k, d)| KdjRow { k, d, j: 3.0 * k - 2.0 * d })
            .collect()
    }

    /// %D was over-sold with %K under it; now %K is rising and above %D.
    fn is_buy(&self, previous: &KdjRow, current: &KdjRow) -> bool {
        previous.d < self.cfg.over_sell
            && previous.d > previous.k
            && current.k > current.d
            && current.k > previous.k
    }

    /// %D was over-bought with %K over it; now %K is falling and below %D.
    fn is_sell(&self, previous: &KdjRow, current: &KdjRow) -> bool {
        previous.d > self.cfg.over_buy
            && previous.d < previous.k
            && current.k < current.d
            && current.k < previous.k
    }
}
