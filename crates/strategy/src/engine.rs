use tracing::{debug, info};

use common::config::MIN_OBSERVATION_WINDOW;
use common::{Bar, Config, Error, IndicatorSnapshot, Result, RunMode};

use crate::indicators::{Indicator, IndicatorRow};
use crate::store::{BarStore, InstrumentSeries, Reconcile};
use crate::Strategy;

/// How much history each instrument keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub mode: RunMode,
    /// Maximum bars per instrument in live mode. Ignored in backtest mode.
    /// Values below [`MIN_OBSERVATION_WINDOW`] are treated as that minimum.
    pub observation: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            mode: RunMode::Live,
            observation: Config::DEFAULT_OBSERVATION_WINDOW,
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            mode: cfg.run_mode,
            observation: cfg.observation_window,
        }
    }
}

impl EngineSettings {
    pub fn backtest() -> Self {
        Self {
            mode: RunMode::Backtest,
            ..Self::default()
        }
    }

    pub fn live(observation: usize) -> Self {
        Self {
            mode: RunMode::Live,
            observation: observation.max(MIN_OBSERVATION_WINDOW),
        }
    }

    fn window(&self) -> Option<usize> {
        match self.mode {
            RunMode::Live => Some(self.observation.max(MIN_OBSERVATION_WINDOW)),
            RunMode::Backtest => None,
        }
    }
}

/// Streaming signal engine for one strategy variant.
///
/// Owns the per-instrument bar store. Every accepted update recomputes the
/// variant's indicator over the instrument's whole stored window; other
/// instruments are never touched. Updates for the same code must be
/// serialized by the caller (`&mut self` enforces this within one engine).
pub struct SignalEngine<I: Indicator> {
    name: String,
    indicator: I,
    settings: EngineSettings,
    store: BarStore<I::Row>,
}

impl<I: Indicator> SignalEngine<I> {
    pub fn new(name: impl Into<String>, indicator: I, settings: EngineSettings) -> Self {
        Self {
            name: name.into(),
            indicator,
            settings,
            store: BarStore::default(),
        }
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    /// Read-only view of one instrument's bars and indicator rows.
    pub fn series(&self, code: &str) -> Option<&InstrumentSeries<I::Row>> {
        self.store.get(code)
    }

    pub fn store(&self) -> &BarStore<I::Row> {
        &self.store
    }

    /// Replace the stored series for `code` wholesale and recompute it.
    ///
    /// Bars for a different code are a structural error. A non-numeric
    /// price leaves any existing series in place and marks it faulted.
    pub fn ingest_batch(&mut self, code: &str, bars: Vec<Bar>) -> Result<()> {
        if code.is_empty() {
            return Err(Error::Structure("batch without instrument code".into()));
        }
        if let Some(stray) = bars.iter().find(|b| b.code != code) {
            return Err(Error::Structure(format!(
                "batch for {code} contains a bar for {}",
                stray.code
            )));
        }
        if let Err(e) = bars.iter().try_for_each(Bar::validate) {
            if let Some(series) = self.store.get_mut(code) {
                series.set_faulted();
            }
            return Err(e);
        }

        let window = self.settings.window();
        let indicator = &self.indicator;
        let series = self.store.entry(code);
        series.replace_all(bars);
        if let Some(max) = window {
            series.truncate_front(max);
        }
        series.recompute_with(|bars| indicator.compute(bars));

        debug!(strategy = %self.name, code = %code, bars = series.len(), "Series reloaded");
        Ok(())
    }

    /// Reconcile one bar into its instrument's series and recompute it.
    ///
    /// A bar with an existing `time_key` overwrites the stored one. In live
    /// mode the series is then cut back to the observation window.
    pub fn ingest_incremental(&mut self, bar: Bar) -> Result<Reconcile> {
        if bar.code.is_empty() {
            return Err(Error::Structure("bar without instrument code".into()));
        }
        if let Err(e) = bar.validate() {
            if let Some(series) = self.store.get_mut(&bar.code) {
                series.set_faulted();
            }
            return Err(e);
        }

        let code = bar.code.clone();
        let window = self.settings.window();
        let indicator = &self.indicator;
        let series = self.store.entry(&code);
        let outcome = series.upsert(bar);
        let dropped = window.map_or(0, |max| series.truncate_front(max));
        series.recompute_with(|bars| indicator.compute(bars));

        if outcome != Reconcile::Appended || dropped > 0 {
            debug!(strategy = %self.name, code = %code, ?outcome, dropped, "Series reconciled");
        }
        Ok(outcome)
    }

    /// Previous and current rows for a decision, or `None` when the
    /// instrument is unknown, faulted, or lacks two defined rows.
    fn decision_rows(&self, code: &str) -> Option<(&Bar, &I::Row, &I::Row)> {
        let series = self.store.get(code)?;
        if series.is_faulted() {
            return None;
        }
        let (previous, current) = series.last_two_rows()?;
        if !previous.is_defined() || !current.is_defined() {
            return None;
        }
        Some((series.latest_bar()?, previous, current))
    }

    pub fn buy(&self, code: &str) -> bool {
        let Some((bar, previous, current)) = self.decision_rows(code) else {
            return false;
        };
        let decision = self.indicator.is_buy(previous, current);
        if decision {
            info!(
                strategy = %self.name,
                code = %code,
                time_key = %bar.time_key,
                previous = ?previous,
                current = ?current,
                "Buy decision"
            );
        }
        decision
    }

    pub fn sell(&self, code: &str) -> bool {
        let Some((bar, previous, current)) = self.decision_rows(code) else {
            return false;
        };
        let decision = self.indicator.is_sell(previous, current);
        if decision {
            info!(
                strategy = %self.name,
                code = %code,
                time_key = %bar.time_key,
                previous = ?previous,
                current = ?current,
                "Sell decision"
            );
        }
        decision
    }

    /// Latest row as named columns, unless the instrument is faulted.
    pub fn snapshot(&self, code: &str) -> Option<IndicatorSnapshot> {
        let series = self.store.get(code)?;
        if series.is_faulted() {
            return None;
        }
        series.rows().last().map(IndicatorRow::snapshot)
    }
}

impl<I: Indicator> Strategy for SignalEngine<I> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.indicator.kind()
    }

    fn load(&mut self, code: &str, bars: Vec<Bar>) -> Result<()> {
        self.ingest_batch(code, bars)
    }

    fn update(&mut self, bar: Bar) -> Result<Reconcile> {
        self.ingest_incremental(bar)
    }

    fn buy(&self, code: &str) -> bool {
        SignalEngine::buy(self, code)
    }

    fn sell(&self, code: &str) -> bool {
        SignalEngine::sell(self, code)
    }

    fn snapshot(&self, code: &str) -> Option<IndicatorSnapshot> {
        SignalEngine::snapshot(self, code)
    }

    fn series_len(&self, code: &str) -> usize {
        self.series(code).map_or(0, InstrumentSeries::len)
    }

    fn latest_bar(&self, code: &str) -> Option<&Bar> {
        self.series(code)?.latest_bar()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_bars, Macd, MacdConfig};

    fn macd_engine(settings: EngineSettings) -> SignalEngine<Macd> {
        SignalEngine::new("MACD 12/26/9", Macd::new(MacdConfig::default()), settings)
    }

    #[test]
    fn unknown_code_has_no_signal() {
        let engine = macd_engine(EngineSettings::backtest());
        assert!(!engine.buy("HK.00700"));
        assert!(!engine.sell("HK.00700"));
        assert!(engine.snapshot("HK.00700").is_none());
    }

    #[test]
    fn single_bar_has_no_signal() {
        let mut engine = macd_engine(EngineSettings::backtest());
        engine.ingest_batch("HK.00700", make_bars("HK.00700", &[10.0])).unwrap();
        assert!(!engine.buy("HK.00700"));
        assert!(!engine.sell("HK.00700"));
        assert!(engine.snapshot("HK.00700").is_some());
    }

    #[test]
    fn batch_with_foreign_code_is_structural() {
        let mut engine = macd_engine(EngineSettings::backtest());
        let err = engine
            .ingest_batch("HK.00700", make_bars("HK.09988", &[1.0, 2.0]))
            .unwrap_err();
        assert!(matches!(err, Error::Structure(_)));
        assert!(!err.is_instrument_scoped());
    }

    #[test]
    fn live_batch_is_truncated_to_window() {
        let mut engine = macd_engine(EngineSettings::live(5));
        let closes: Vec<f64> = (0..12).map(|i| i as f64).collect();
        engine.ingest_batch("HK.00700", make_bars("HK.00700", &closes)).unwrap();
        let series = engine.series("HK.00700").unwrap();
        assert_eq!(series.len(), 5);
        assert_eq!(series.rows().len(), 5);
        assert_eq!(series.bars().next().unwrap().close, 7.0);
    }

    #[test]
    fn live_window_never_drops_below_two_bars() {
        assert_eq!(EngineSettings::live(0).observation, MIN_OBSERVATION_WINDOW);

        let mut settings = EngineSettings::live(5);
        settings.observation = 1;
        let mut engine = macd_engine(settings);
        for bar in make_bars("HK.00700", &[10.0, 11.0, 12.0, 13.0]) {
            engine.ingest_incremental(bar).unwrap();
        }
        let series = engine.series("HK.00700").unwrap();
        assert_eq!(series.len(), MIN_OBSERVATION_WINDOW);
        assert!(series.last_two_rows().is_some());
    }

    #[test]
    fn bad_bar_faults_until_next_good_update() {
        let mut engine = macd_engine(EngineSettings::backtest());
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let mut bars = make_bars("HK.00700", &closes);
        let last = bars.pop().unwrap();
        engine.ingest_batch("HK.00700", bars).unwrap();

        let mut broken = last.clone();
        broken.close = f64::NAN;
        let err = engine.ingest_incremental(broken).unwrap_err();
        assert!(err.is_instrument_scoped());
        assert_eq!(engine.series("HK.00700").unwrap().len(), 29);
        assert!(engine.snapshot("HK.00700").is_none());

        engine.ingest_incremental(last).unwrap();
        assert_eq!(engine.series("HK.00700").unwrap().len(), 30);
        assert!(engine.snapshot("HK.00700").is_some());
    }
}
