mod support;

use chrono::Duration;
use common::Bar;
use proptest::prelude::*;
use strategy::indicators::{EmaRibbon, EmaRibbonConfig, Kdj, KdjConfig, Macd, MacdConfig, Rsi, RsiConfig};
use strategy::{EngineSettings, SignalEngine, Strategy};
use support::start;

const CODE: &str = "HK.00700";

fn variants(settings: EngineSettings) -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(SignalEngine::new("ribbon", EmaRibbon::new(EmaRibbonConfig::default()), settings)),
        Box::new(SignalEngine::new("kdj", Kdj::new(KdjConfig::default()), settings)),
        Box::new(SignalEngine::new("macd", Macd::new(MacdConfig::default()), settings)),
        Box::new(SignalEngine::new("rsi", Rsi::new(RsiConfig::default()), settings)),
    ]
}

fn bar_at(minute: i64, close: f64) -> Bar {
    Bar {
        code: CODE.to_string(),
        time_key: start() + Duration::minutes(minute),
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 1.0,
    }
}

proptest! {
    /// A live series never holds more bars than the observation window.
    #[test]
    fn live_series_never_exceeds_window(
        window in 2usize..40,
        closes in prop::collection::vec(0.01f64..10_000.0, 1..120),
    ) {
        for mut strategy in variants(EngineSettings::live(window)) {
            for (i, &close) in closes.iter().enumerate() {
                strategy.update(bar_at(i as i64, close)).unwrap();
                prop_assert!(strategy.series_len(CODE) <= window);
            }
            prop_assert_eq!(strategy.series_len(CODE), closes.len().min(window));
        }
    }

    /// Repeated and out-of-order time keys never grow the series past the
    /// number of distinct keys.
    #[test]
    fn series_length_counts_distinct_time_keys(
        updates in prop::collection::vec((0i64..30, 1.0f64..500.0), 1..150),
    ) {
        let distinct: std::collections::BTreeSet<i64> = updates.iter().map(|(m, _)| *m).collect();
        for mut strategy in variants(EngineSettings::backtest()) {
            for &(minute, close) in &updates {
                strategy.update(bar_at(minute, close)).unwrap();
            }
            prop_assert_eq!(strategy.series_len(CODE), distinct.len());
        }
    }

    /// Decisions on arbitrary price paths never panic, and never fire both ways.
    #[test]
    fn decisions_never_panic_or_conflict(
        closes in prop::collection::vec(0.0001f64..1_000_000.0, 0..200),
    ) {
        for mut strategy in variants(EngineSettings::backtest()) {
            for (i, &close) in closes.iter().enumerate() {
                strategy.update(bar_at(i as i64, close)).unwrap();
                prop_assert!(!(strategy.buy(CODE) && strategy.sell(CODE)));
            }
        }
    }
}
