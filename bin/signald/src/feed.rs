//! JSON-lines bar source: one bar object per line.
//!
//! Blank lines and lines starting with `#` are ignored. A line that does
//! not parse is logged and skipped so one bad row cannot stop a replay.
//! A file with bar lines of which none parse is structurally wrong (for
//! example a required column missing everywhere) and is an error.

use std::collections::HashMap;
use std::path::Path;

use anyhow::bail;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use common::{Bar, Result};

pub fn parse_line(line: &str) -> Result<Option<Bar>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// Read a whole file and group its bars by instrument code, in file order.
pub async fn load_history(path: impl AsRef<Path>) -> anyhow::Result<HashMap<String, Vec<Bar>>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;

    let mut history: HashMap<String, Vec<Bar>> = HashMap::new();
    let mut malformed = 0;
    for (number, line) in content.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(bar)) => history.entry(bar.code.clone()).or_default().push(bar),
            Ok(None) => {}
            Err(e) => {
                malformed += 1;
                warn!(path = %path.display(), line = number + 1, error = %e, "Skipping malformed bar");
            }
        }
    }
    if history.is_empty() && malformed > 0 {
        bail!("{}: none of {malformed} bar lines could be parsed", path.display());
    }
    info!(path = %path.display(), codes = history.len(), "History file read");
    Ok(history)
}

/// Stream every bar of `path` into `bar_tx` in file order.
/// Returns the number of bars sent. Stops early if the receiver is gone.
pub async fn replay(path: impl AsRef<Path>, bar_tx: mpsc::Sender<Bar>) -> anyhow::Result<usize> {
    let path = path.as_ref();
    let mut lines = BufReader::new(File::open(path).await?).lines();

    let mut sent = 0;
    let mut malformed = 0;
    let mut number = 0;
    while let Some(line) = lines.next_line().await? {
        number += 1;
        let bar = match parse_line(&line) {
            Ok(Some(bar)) => bar,
            Ok(None) => continue,
            Err(e) => {
                malformed += 1;
                warn!(path = %path.display(), line = number, error = %e, "Skipping malformed bar");
                continue;
            }
        };
        if bar_tx.send(bar).await.is_err() {
            warn!("Bar channel closed, stopping replay");
            break;
        }
        sent += 1;
    }
    if sent == 0 && malformed > 0 {
        bail!("{}: none of {malformed} bar lines could be parsed", path.display());
    }
    Ok(sent)
}
