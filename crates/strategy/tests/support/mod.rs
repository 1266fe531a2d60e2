#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use common::Bar;

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 4, 13)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

/// One bar per minute; high = close + 1, low = close - 1.
pub fn make_bars(code: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            code: code.to_string(),
            time_key: start() + Duration::minutes(i as i64),
            open: if i == 0 { close } else { closes[i - 1] },
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Closes falling by one for 21 bars, then a gap up and a steady climb.
pub fn v_shape() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..21).map(|i| 100.0 - i as f64).collect();
    closes.extend((0..9).map(|i| 100.0 + 2.0 * i as f64));
    closes
}
