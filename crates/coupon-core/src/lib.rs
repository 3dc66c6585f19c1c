pub mod clock;
pub mod code;
pub mod config;
pub mod handler;

pub use clock::{Clock, FixedClock, SystemClock};
pub use code::{
    KEYSPACE, ParseCodeError, ParsedCode, generate_batch, generate_code, parse_code,
    validate_code_format,
};
pub use config::GeneratorConfig;
pub use handler::{Action, CouponService, Payload, Response, handle};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CouponError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("Cannot generate {requested} unique codes: only {available} exist per prefix and day")]
    KeyspaceExhausted { requested: u64, available: u64 },
    #[error("Gave up after {attempts} attempts with {produced} of {requested} unique codes")]
    AttemptsExhausted {
        produced: usize,
        requested: u64,
        attempts: u64,
    },
}

pub type Result<T> = std::result::Result<T, CouponError>;
