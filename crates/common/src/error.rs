use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A required OHLC value for one instrument is missing or non-numeric.
    /// Only the named instrument is affected.
    #[error("Data error for {code}: {field} is not numeric ({value})")]
    Data {
        code: String,
        field: &'static str,
        value: f64,
    },

    /// Input that cannot be processed at all, for any instrument.
    #[error("Invalid input: {0}")]
    Structure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that are scoped to a single instrument and must not
    /// abort processing of the others.
    pub fn is_instrument_scoped(&self) -> bool {
        matches!(self, Error::Data { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
