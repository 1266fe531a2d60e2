use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use common::{Error, Result};

/// Top-level strategy config file (TOML).
///
/// Example `config/strategies.toml`:
/// ```toml
/// [[strategy]]
/// type = "kdj"
/// name = "Alibaba KDJ 9-3-3"
/// codes = ["HK.09988"]
///
/// [strategy.params]
/// fast_k = 9
/// slow_k = 3
/// slow_d = 3
/// over_buy = 80
/// over_sell = 20
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    #[serde(rename = "strategy")]
    pub strategies: Vec<StrategyConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Strategy type identifier: "ema_ribbon", "kdj", "macd" or "rsi".
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Human-readable name shown in logs and the signal stream.
    pub name: String,
    /// Instrument codes this strategy watches, e.g. "HK.00700".
    /// Empty means every code that arrives.
    #[serde(default)]
    pub codes: Vec<String>,
    /// Per-strategy override of the observation window.
    #[serde(default)]
    pub observation: Option<usize>,
    /// Indicator-specific parameters.
    #[serde(default)]
    pub params: HashMap<String, toml::Value>,
}

impl StrategyFileConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read strategy config at '{path}': {e}"))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content)?;
        if cfg.strategies.is_empty() {
            return Err(Error::Config("strategy config defines no strategies".into()));
        }
        Ok(cfg)
    }
}

impl StrategyConfig {
    /// Integer parameter, `default` when absent.
    pub fn param_usize(&self, key: &str, default: usize) -> Result<usize> {
        match self.params.get(key) {
            None => Ok(default),
            Some(v) => v
                .as_integer()
                .and_then(|i| usize::try_from(i).ok())
                .ok_or_else(|| self.bad_param(key, v, "a non-negative integer")),
        }
    }

    /// Float parameter, `default` when absent. Integers are accepted.
    pub fn param_f64(&self, key: &str, default: f64) -> Result<f64> {
        match self.params.get(key) {
            None => Ok(default),
            Some(v) => v
                .as_float()
                .or_else(|| v.as_integer().map(|i| i as f64))
                .ok_or_else(|| self.bad_param(key, v, "a number")),
        }
    }

    fn bad_param(&self, key: &str, value: &toml::Value, expected: &str) -> Error {
        Error::Config(format!(
            "strategy '{}': param '{key}' must be {expected}, got {value}",
            self.name
        ))
    }
}
