use std::fmt;

use serde_json::Value;

/// Lowest accepted temperature in degrees Celsius (inclusive).
pub const TEMPERATURE_MIN: f64 = -40.0;
/// Highest accepted temperature in degrees Celsius (inclusive).
pub const TEMPERATURE_MAX: f64 = 100.0;

/// A validated telemetry sample.
///
/// Only `validate` builds one, so every present field already satisfies
/// its type and range constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub temperature: f64,
    pub status: Option<String>,
    pub counter: Option<i64>,
    pub humidity: Option<f64>,
    pub machine_id: Option<String>,
}

/// A single constraint failure found in a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    MissingTemperature,
    TemperatureOutOfRange(f64),
    StatusNotText,
    CounterNotInteger,
    CounterTooLarge,
    CounterNegative,
    HumidityNotNumeric,
    MachineIdNotText,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingTemperature => write!(f, "missing or invalid temperature"),
            Violation::TemperatureOutOfRange(value) => write!(
                f,
                "temperature {value}°C is out of valid range ({TEMPERATURE_MIN} to {TEMPERATURE_MAX})"
            ),
            Violation::StatusNotText => write!(f, "status must be a string"),
            Violation::CounterNotInteger => write!(f, "counter must be an integer"),
            Violation::CounterTooLarge => write!(f, "counter does not fit a 64-bit integer"),
            Violation::CounterNegative => write!(f, "counter cannot be negative"),
            Violation::HumidityNotNumeric => write!(f, "humidity must be a number"),
            Violation::MachineIdNotText => write!(f, "machine_id must be a string"),
        }
    }
}

/// Parse a raw broker payload as JSON.
///
/// Any well-formed JSON value is returned; whether it is usable is the
/// validator's call.
pub fn decode(payload: &[u8]) -> Result<Value, serde_json::Error> {
    serde_json::from_slice(payload)
}

/// Validate a decoded payload.
///
/// Every rule is evaluated so the caller sees all violations at once. Any
/// violation voids the whole payload; there is no partial acceptance.
/// Non-object payloads have no fields and fail on the missing temperature.
pub fn validate(payload: &Value) -> Result<Reading, Vec<Violation>> {
    let mut violations = Vec::new();

    let temperature = match payload.get("temp").and_then(Value::as_f64) {
        Some(t) if (TEMPERATURE_MIN..=TEMPERATURE_MAX).contains(&t) => Some(t),
        Some(t) => {
            violations.push(Violation::TemperatureOutOfRange(t));
            None
        }
        None => {
            violations.push(Violation::MissingTemperature);
            None
        }
    };

    let status = match payload.get("status") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            violations.push(Violation::StatusNotText);
            None
        }
    };

    let counter = match payload.get("counter") {
        None => None,
        Some(value) => match integer_of(value) {
            Ok(c) if c < 0 => {
                violations.push(Violation::CounterNegative);
                None
            }
            Ok(c) => Some(c),
            Err(v) => {
                violations.push(v);
                None
            }
        },
    };

    let humidity = match payload.get("humidity") {
        None => None,
        Some(value) => match value.as_f64() {
            Some(h) => Some(h),
            None => {
                violations.push(Violation::HumidityNotNumeric);
                None
            }
        },
    };

    let machine_id = match payload.get("machine_id") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            violations.push(Violation::MachineIdNotText);
            None
        }
    };

    match temperature {
        Some(temperature) if violations.is_empty() => Ok(Reading {
            temperature,
            status,
            counter,
            humidity,
            machine_id,
        }),
        _ => Err(violations),
    }
}

/// Integral JSON numbers only. `10.0` counts as 10; `10.5`, strings and
/// `null` do not.
fn integer_of(value: &Value) -> Result<i64, Violation> {
    if let Some(i) = value.as_i64() {
        return Ok(i);
    }
    if value.is_u64() {
        return Err(Violation::CounterTooLarge);
    }
    match value.as_f64() {
        // below i64::MIN saturates and is still reported as negative
        Some(f) if f.fract() == 0.0 && f < 0.0 => Ok(f as i64),
        Some(f) if f.fract() == 0.0 => {
            if f < 2f64.powi(63) {
                Ok(f as i64)
            } else {
                Err(Violation::CounterTooLarge)
            }
        }
        _ => Err(Violation::CounterNotInteger),
    }
}
