use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// One OHLCV observation for one instrument.
///
/// Numeric fields accept JSON numbers or numeric strings, since brokerage
/// feeds commonly quote prices as text. A value that does not parse is
/// kept as NaN and rejected later by [`Bar::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub code: String,
    #[serde(with = "time_key_format")]
    pub time_key: NaiveDateTime,
    #[serde(deserialize_with = "numeric")]
    pub open: f64,
    #[serde(deserialize_with = "numeric")]
    pub high: f64,
    #[serde(deserialize_with = "numeric")]
    pub low: f64,
    #[serde(deserialize_with = "numeric")]
    pub close: f64,
    #[serde(deserialize_with = "numeric", default)]
    pub volume: f64,
}

impl Bar {
    /// Check that every price column indicators depend on is a finite number.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() {
                return Err(Error::Data {
                    code: self.code.clone(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

fn numeric<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    Ok(match Numeric::deserialize(deserializer)? {
        Numeric::Number(v) => v,
        Numeric::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
    })
}

/// `time_key` as sent by the feed (`2022-04-13 09:52:00`), with ISO-8601
/// accepted on input as well.
pub mod time_key_format {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(t: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&t.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid time_key '{raw}'")))
    }

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, FORMAT)
            .or_else(|_| raw.parse::<NaiveDateTime>())
            .ok()
    }
}

/// Classification of the current market moment for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl Signal {
    pub fn from_decisions(buy: bool, sell: bool) -> Self {
        match (buy, sell) {
            (true, false) => Signal::Buy,
            (false, true) => Signal::Sell,
            _ => Signal::Hold,
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self, Signal::Hold)
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

/// Live mode bounds every series to the observation window; backtest mode
/// keeps the full history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Live,
    Backtest,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Live => write!(f, "live"),
            RunMode::Backtest => write!(f, "backtest"),
        }
    }
}

impl std::str::FromStr for RunMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(RunMode::Live),
            "backtest" => Ok(RunMode::Backtest),
            other => Err(Error::Config(format!(
                "RUN_MODE must be 'live' or 'backtest', got: '{other}'"
            ))),
        }
    }
}

/// Latest indicator row as named columns, for display.
pub type IndicatorSnapshot = BTreeMap<String, f64>;

/// What the UI / order layer receives for each strategy after every bar.
#[derive(Debug, Clone, Serialize)]
pub struct SignalEvent {
    pub strategy: String,
    pub code: String,
    #[serde(serialize_with = "serialize_time_key")]
    pub time_key: NaiveDateTime,
    pub signal: Signal,
    /// `None` when the instrument has no usable indicator state.
    pub indicators: Option<IndicatorSnapshot>,
}

fn serialize_time_key<S: Serializer>(t: &NaiveDateTime, s: S) -> std::result::Result<S::Ok, S::Error> {
    time_key_format::serialize(t, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_accepts_numeric_strings() {
        let bar: Bar = serde_json::from_str(
            r#"{"code":"HK.00700","time_key":"2022-04-13 09:52:00",
                "open":"310.2","high":311,"low":"309.8","close":"310.6","volume":"1200"}"#,
        )
        .unwrap();
        assert_eq!(bar.high, 311.0);
        assert_eq!(bar.close, 310.6);
        assert!(bar.validate().is_ok());
    }

    #[test]
    fn unparseable_price_is_a_data_error() {
        let bar: Bar = serde_json::from_str(
            r#"{"code":"HK.00700","time_key":"2022-04-13T09:52:00",
                "open":1,"high":2,"low":"n/a","close":1.5}"#,
        )
        .unwrap();
        match bar.validate() {
            Err(Error::Data { code, field, .. }) => {
                assert_eq!(code, "HK.00700");
                assert_eq!(field, "low");
            }
            other => panic!("expected data error, got {other:?}"),
        }
    }

    #[test]
    fn signal_from_decisions() {
        assert_eq!(Signal::from_decisions(true, false), Signal::Buy);
        assert_eq!(Signal::from_decisions(false, true), Signal::Sell);
        assert_eq!(Signal::from_decisions(false, false), Signal::Hold);
        assert_eq!(Signal::from_decisions(true, true), Signal::Hold);
    }

    #[test]
    fn run_mode_parses_case_insensitively() {
        assert_eq!("Backtest".parse::<RunMode>().unwrap(), RunMode::Backtest);
        assert!("paper".parse::<RunMode>().is_err());
    }
}
