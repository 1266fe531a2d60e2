use std::collections::{BTreeSet, HashMap, HashSet};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use common::{Bar, Config, Error, Result, Signal, SignalEvent};

use crate::config::{StrategyConfig, StrategyFileConfig};
use crate::engine::{EngineSettings, SignalEngine};
use crate::indicators::{
    EmaRibbon, EmaRibbonConfig, Kdj, KdjConfig, Macd, MacdConfig, Rsi, RsiConfig,
};
use crate::Strategy;

struct Registered {
    strategy: Box<dyn Strategy>,
    /// Empty = every code.
    codes: HashSet<String>,
}

impl Registered {
    fn watches(&self, code: &str) -> bool {
        self.codes.is_empty() || self.codes.contains(code)
    }
}

/// Holds all active strategy instances and dispatches bars to them.
pub struct StrategyRegistry {
    strategies: Vec<Registered>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Build the registry from the strategy file, using the runtime config
    /// for mode and default observation window.
    pub fn from_config(file_cfg: &StrategyFileConfig, runtime: &Config) -> Result<Self> {
        let mut registry = Self::new();
        for cfg in &file_cfg.strategies {
            let mut settings = EngineSettings::from(runtime);
            if let Some(observation) = cfg.observation {
                settings.observation = observation;
            }
            if settings.observation < common::config::MIN_OBSERVATION_WINDOW {
                return Err(Error::Config(format!(
                    "strategy '{}': observation must be at least {}",
                    cfg.name,
                    common::config::MIN_OBSERVATION_WINDOW
                )));
            }

            let strategy = build_strategy(cfg, settings)?;
            info!(
                name = %strategy.name(),
                kind = strategy.kind(),
                codes = ?cfg.codes,
                mode = %settings.mode,
                observation = settings.observation,
                "Registered strategy"
            );
            registry.register(strategy, cfg.codes.iter().cloned());
        }
        Ok(registry)
    }

    pub fn register(&mut self, strategy: Box<dyn Strategy>, codes: impl IntoIterator<Item = String>) {
        self.strategies.push(Registered {
            strategy,
            codes: codes.into_iter().collect(),
        });
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Codes named by any strategy. Strategies watching every code add none.
    pub fn watched_codes(&self) -> BTreeSet<String> {
        self.strategies
            .iter()
            .flat_map(|r| r.codes.iter().cloned())
            .collect()
    }

    pub fn strategies(&self) -> impl Iterator<Item = &dyn Strategy> + '_ {
        self.strategies.iter().map(|r| r.strategy.as_ref())
    }

    /// Full reload of every code into every strategy watching it.
    ///
    /// A data error for one code is logged and skipped; structural errors
    /// abort the load. Returns the codes that failed.
    pub fn load_history(&mut self, history: &HashMap<String, Vec<Bar>>) -> Result<Vec<String>> {
        let mut failed = BTreeSet::new();
        for (code, bars) in history {
            for reg in self.strategies.iter_mut().filter(|r| r.watches(code)) {
                match reg.strategy.load(code, bars.clone()) {
                    Ok(()) => {}
                    Err(e) if e.is_instrument_scoped() => {
                        warn!(strategy = %reg.strategy.name(), code = %code, error = %e, "History rejected");
                        failed.insert(code.clone());
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        info!(codes = history.len(), failed = failed.len(), "History loaded");
        Ok(failed.into_iter().collect())
    }

    /// Process one bar. Returns one event per strategy watching its code.
    ///
    /// A strategy that rejects the bar reports HOLD without indicators for
    /// that code; the other strategies and codes are unaffected. A late or
    /// corrected bar that is not the newest one in its series is stored and
    /// recomputed, but reports HOLD without indicators: decisions only ever
    /// describe the newest bar.
    pub fn process(&mut self, bar: &Bar) -> Vec<SignalEvent> {
        if bar.code.is_empty() {
            warn!(time_key = %bar.time_key, "Dropping bar without instrument code");
            return Vec::new();
        }

        self.strategies
            .iter_mut()
            .filter(|r| r.watches(&bar.code))
            .map(|reg| {
                let strategy = reg.strategy.as_mut();
                let mut event = SignalEvent {
                    strategy: strategy.name().to_string(),
                    code: bar.code.clone(),
                    time_key: bar.time_key,
                    signal: Signal::Hold,
                    indicators: None,
                };
                match strategy.update(bar.clone()) {
                    Ok(outcome) => {
                        let is_newest = strategy
                            .latest_bar(&bar.code)
                            .is_some_and(|latest| latest.time_key == bar.time_key);
                        if is_newest {
                            event.signal = strategy.signal(&bar.code);
                            event.indicators = strategy.snapshot(&bar.code);
                        } else {
                            debug!(
                                strategy = %strategy.name(),
                                code = %bar.code,
                                time_key = %bar.time_key,
                                ?outcome,
                                "Historical bar reconciled, no decision"
                            );
                        }
                    }
                    Err(e) => {
                        warn!(strategy = %strategy.name(), code = %bar.code, error = %e, "Update rejected");
                    }
                }
                event
            })
            .collect()
    }

    /// Run the strategy dispatch loop.
    /// Reads bars from `bar_rx`, pushes events to `signal_tx`.
    pub async fn run(mut self, mut bar_rx: mpsc::Receiver<Bar>, signal_tx: mpsc::Sender<SignalEvent>) {
        info!(strategies = self.len(), "StrategyRegistry running");
        while let Some(bar) = bar_rx.recv().await {
            for event in self.process(&bar) {
                if signal_tx.send(event).await.is_err() {
                    warn!("Signal channel closed, stopping strategy registry");
                    return;
                }
            }
        }
        info!("Bar channel closed, strategy registry finished");
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Strategy builders ────────────────────────────────────────────────────────

pub fn build_strategy(cfg: &StrategyConfig, settings: EngineSettings) -> Result<Box<dyn Strategy>> {
    match cfg.strategy_type.as_str() {
        "ema_ribbon" => {
            let defaults = EmaRibbonConfig::default();
            let params = EmaRibbonConfig {
                fast: cfg.param_usize("fast", defaults.fast)?,
                slow: cfg.param_usize("slow", defaults.slow)?,
                support: cfg.param_usize("support", defaults.support)?,
            };
            params.validate()?;
            Ok(Box::new(SignalEngine::new(&cfg.name, EmaRibbon::new(params), settings)))
        }
        "kdj" => {
            let defaults = KdjConfig::default();
            let params = KdjConfig {
                fast_k: cfg.param_usize("fast_k", defaults.fast_k)?,
                slow_k: cfg.param_usize("slow_k", defaults.slow_k)?,
                slow_d: cfg.param_usize("slow_d", defaults.slow_d)?,
                over_buy: cfg.param_f64("over_buy", defaults.over_buy)?,
                over_sell: cfg.param_f64("over_sell", defaults.over_sell)?,
            };
            params.validate()?;
            Ok(Box::new(SignalEngine::new(&cfg.name, Kdj::new(params), settings)))
        }
        "macd" => {
            let defaults = MacdConfig::default();
            let params = MacdConfig {
                fast: cfg.param_usize("fast", defaults.fast)?,
                slow: cfg.param_usize("slow", defaults.slow)?,
                signal: cfg.param_usize("signal", defaults.signal)?,
            };
            params.validate()?;
            Ok(Box::new(SignalEngine::new(&cfg.name, Macd::new(params), settings)))
        }
        "rsi" => {
            let defaults = RsiConfig::default();
            let params = RsiConfig {
                short: cfg.param_usize("rsi_1", defaults.short)?,
                medium: cfg.param_usize("rsi_2", defaults.medium)?,
                long: cfg.param_usize("rsi_3", defaults.long)?,
                lower: cfg.param_f64("lower", defaults.lower)?,
                upper: cfg.param_f64("upper", defaults.upper)?,
            };
            params.validate()?;
            Ok(Box::new(SignalEngine::new(&cfg.name, Rsi::new(params), settings)))
        }
        other => Err(Error::Config(format!(
            "strategy '{}': unknown type '{other}'",
            cfg.name
        ))),
    }
}
