//! Callback entry point for the chat platform: JSON request in, JSON response out.

use crate::clock::{Clock, SystemClock};
use crate::code::{generate_batch, generate_code};
use crate::config::GeneratorConfig;
use crate::{CouponError, Result};
use rand::Rng;
use rand::rngs::ThreadRng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

const ENCODE_FAILURE: &str = r#"{"success":false,"error":"failed to encode response"}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    GenerateSingle,
    GenerateMultiple,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::GenerateSingle => "generate_single",
            Action::GenerateMultiple => "generate_multiple",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = CouponError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "generate_single" => Ok(Action::GenerateSingle),
            "generate_multiple" => Ok(Action::GenerateMultiple),
            other => Err(CouponError::UnknownAction(other.to_string())),
        }
    }
}

/// What the caller handed over: raw JSON text or an already-decoded value.
#[derive(Debug, Clone)]
pub enum Payload {
    Text(String),
    Value(Value),
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Value(value)
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Payload::Value(Value::Object(map))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Single {
        success: bool,
        code: String,
        message: String,
    },
    Multiple {
        success: bool,
        codes: Vec<String>,
        count: usize,
        message: String,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl Response {
    pub fn single(code: String) -> Self {
        let message = format!("Код успешно сгенерирован: {code}");
        Response::Single {
            success: true,
            code,
            message,
        }
    }

    pub fn multiple(codes: Vec<String>) -> Self {
        let count = codes.len();
        Response::Multiple {
            success: true,
            codes,
            count,
            message: format!("Успешно сгенерировано {count} кодов"),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Response::Failure {
            success: false,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Response::Single { success, .. }
            | Response::Multiple { success, .. }
            | Response::Failure { success, .. } => *success,
        }
    }

    /// Encode as compact JSON. Non-ASCII text is written as-is.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!("failed to encode response: {e}");
            ENCODE_FAILURE.to_string()
        })
    }
}

/// A request after defaults are applied and `count` is coerced.
///
/// `action` stays a string until dispatch so that a bad `count` is reported
/// ahead of an unknown action.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Request {
    action: String,
    count: i64,
    prefix: String,
}

impl Request {
    fn from_value(value: &Value, config: &GeneratorConfig) -> Result<Self> {
        let params = value.as_object().ok_or_else(|| CouponError::InvalidField {
            field: "request",
            reason: format!("expected a JSON object, got {value}"),
        })?;

        let action = match params.get("action") {
            None => config.default_action.as_str().to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        let count = match params.get("count") {
            None => config.default_count,
            Some(raw) => coerce_count(raw)?,
        };
        let prefix = match present(params, "prefix") {
            None => config.default_prefix.clone(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(true)) => "True".to_string(),
            Some(Value::Bool(false)) => "False".to_string(),
            Some(other) => {
                return Err(CouponError::InvalidField {
                    field: "prefix",
                    reason: format!("expected a string, got {other}"),
                });
            }
        };

        Ok(Request {
            action,
            count,
            prefix,
        })
    }
}

/// Look up a key, treating an explicit `null` like a missing key. Only the
/// prefix gets this leniency.
fn present<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    params.get(key).filter(|v| !v.is_null())
}

/// Integers pass through, floats truncate toward zero, numeric strings are
/// parsed after trimming, booleans become 0 or 1.
fn coerce_count(raw: &Value) -> Result<i64> {
    let invalid = || CouponError::InvalidField {
        field: "count",
        reason: format!("expected an integer, got {raw}"),
    };
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if n.is_u64() {
                Ok(i64::MAX)
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                    .map(|f| f.trunc() as i64)
                    .ok_or_else(invalid)
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
        Value::Bool(b) => Ok(i64::from(*b)),
        _ => Err(invalid()),
    }
}

/// Generates codes for callback requests with an injectable clock and
/// randomness source.
#[derive(Debug)]
pub struct CouponService<C = SystemClock, R = ThreadRng> {
    config: GeneratorConfig,
    clock: C,
    rng: R,
}

impl CouponService {
    /// Service backed by the local clock and the thread-local RNG.
    pub fn new(config: GeneratorConfig) -> Self {
        CouponService::with_sources(config, SystemClock, rand::rng())
    }
}

impl<C: Clock, R: Rng> CouponService<C, R> {
    pub fn with_sources(config: GeneratorConfig, clock: C, rng: R) -> Self {
        CouponService { config, clock, rng }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Handle one request and return the JSON-encoded response.
    pub fn handle(&mut self, input: impl Into<Payload>) -> String {
        self.respond(input).to_json()
    }

    /// Handle one request. Every failure becomes a [`Response::Failure`].
    pub fn respond(&mut self, input: impl Into<Payload>) -> Response {
        match self.dispatch(input.into()) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("coupon request failed: {e}");
                Response::failure(e.to_string())
            }
        }
    }

    fn dispatch(&mut self, payload: Payload) -> Result<Response> {
        let value = match payload {
            Payload::Text(text) => serde_json::from_str(&text)?,
            Payload::Value(value) => value,
        };
        let request = Request::from_value(&value, &self.config)?;
        tracing::debug!(?request, "dispatching coupon request");

        match request.action.parse::<Action>()? {
            Action::GenerateSingle => {
                let code = generate_code(&request.prefix, &self.clock, &mut self.rng);
                Ok(Response::single(code))
            }
            Action::GenerateMultiple => {
                let codes = generate_batch(
                    request.count,
                    &request.prefix,
                    &self.clock,
                    &mut self.rng,
                    self.config.max_attempts,
                )?;
                Ok(Response::multiple(codes))
            }
        }
    }
}

/// Handle one request with default settings, the local clock and the
/// thread-local RNG.
pub fn handle(input: impl Into<Payload>) -> String {
    CouponService::new(GeneratorConfig::default()).handle(input)
}
