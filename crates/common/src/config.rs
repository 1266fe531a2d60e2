use crate::{Error, Result, RunMode};

/// Smallest window that still leaves a previous and a current row.
pub const MIN_OBSERVATION_WINDOW: usize = 2;

/// Runtime configuration loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Live (windowed) or backtest (full history) recomputation.
    pub run_mode: RunMode,
    /// Bars kept per instrument in live mode.
    pub observation_window: usize,

    // Strategy config file path
    pub strategy_config_path: String,

    /// JSON-lines bars replayed through the strategies.
    pub bars_path: Option<String>,
    /// JSON-lines bars loaded as full history before the replay starts.
    pub history_path: Option<String>,
}

impl Config {
    pub const DEFAULT_OBSERVATION_WINDOW: usize = 100;

    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let run_mode = match optional_env("RUN_MODE") {
            Some(v) => v.parse()?,
            None => RunMode::default(),
        };

        let observation_window = match optional_env("OBSERVATION_WINDOW") {
            Some(v) => v.trim().parse::<usize>().map_err(|_| {
                Error::Config(format!("OBSERVATION_WINDOW must be a positive integer, got: '{v}'"))
            })?,
            None => Self::DEFAULT_OBSERVATION_WINDOW,
        };

        let cfg = Config {
            run_mode,
            observation_window,
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH")
                .unwrap_or_else(|| "config/strategies.toml".to_string()),
            bars_path: optional_env("BARS_PATH"),
            history_path: optional_env("HISTORY_PATH"),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.observation_window < MIN_OBSERVATION_WINDOW {
            return Err(Error::Config(format!(
                "OBSERVATION_WINDOW must be at least {MIN_OBSERVATION_WINDOW}, got {}",
                self.observation_window
            )));
        }
        Ok(())
    }

    /// The replay source is required by the binary but not by library users.
    pub fn require_bars_path(&self) -> Result<&str> {
        self.bars_path.as_deref().ok_or_else(|| {
            Error::Config("Required environment variable 'BARS_PATH' is not set. Check your .env file.".into())
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run_mode: RunMode::default(),
            observation_window: Self::DEFAULT_OBSERVATION_WINDOW,
            strategy_config_path: "config/strategies.toml".to_string(),
            bars_path: None,
            history_path: None,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
