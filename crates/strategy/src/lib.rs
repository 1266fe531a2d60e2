pub mod config;
pub mod engine;
pub mod indicators;
pub mod registry;
pub mod store;

pub use config::{StrategyConfig, StrategyFileConfig};
pub use engine::{EngineSettings, SignalEngine};
pub use registry::StrategyRegistry;
pub use store::{BarStore, InstrumentSeries, Reconcile};

use common::{Bar, IndicatorSnapshot, Result, Signal};

/// All strategy variants satisfy this trait.
///
/// Updates take `&mut self`: the engine never hands out a mutable series,
/// and two updates for the same code cannot overlap. Callers that shard
/// work across threads should shard by instrument code.
pub trait Strategy: Send + Sync {
    /// Human-readable name of this strategy instance.
    fn name(&self) -> &str;

    /// Variant identifier ("ema_ribbon", "kdj", "macd", "rsi").
    fn kind(&self) -> &'static str;

    /// Replace the full history of `code` (start-up or reload).
    fn load(&mut self, code: &str, bars: Vec<Bar>) -> Result<()>;

    /// Reconcile one new or corrected bar.
    fn update(&mut self, bar: Bar) -> Result<Reconcile>;

    /// A buy crossing happened on the latest bar of `code`.
    /// False when there is not enough history.
    fn buy(&self, code: &str) -> bool;

    /// A sell crossing happened on the latest bar of `code`.
    fn sell(&self, code: &str) -> bool;

    fn signal(&self, code: &str) -> Signal {
        Signal::from_decisions(self.buy(code), self.sell(code))
    }

    /// Latest indicator values of `code` for display.
    fn snapshot(&self, code: &str) -> Option<IndicatorSnapshot>;

    /// Number of bars currently held for `code`.
    fn series_len(&self, code: &str) -> usize;

    /// Newest stored bar of `code`, the one `buy`/`sell` describe.
    fn latest_bar(&self, code: &str) -> Option<&Bar>;
}
