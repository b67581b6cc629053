//! Observation result values.
//!
//! The stored discriminator ([`ResultKind`](crate::ResultKind)) decides
//! which variant is produced; nothing here inspects content to guess a type.

use rust_decimal::Decimal;
use serde_json::Value;

/// A numeric result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Exact decimal read from the string form of the result.
    Exact(Decimal),
    /// Floating point fallback when the string form is not a decimal.
    Approximate(f64),
}

impl Number {
    /// JSON form. Decimals are emitted as JSON numbers, not strings, with
    /// every stored digit kept.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Exact(d) => serde_json::from_str::<Value>(&d.to_string())
                .unwrap_or_else(|_| Value::String(d.to_string())),
            Self::Approximate(f) => {
                serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number)
            }
        }
    }
}

/// The result of an observation.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    /// Boolean result.
    Boolean(bool),
    /// Numeric result.
    Number(Number),
    /// Structured result (JSON object or array).
    ObjectArray(Value),
    /// Plain string result.
    String(String),
}

impl ResultValue {
    /// JSON form of the result.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Boolean(b) => Value::Bool(*b),
            Self::Number(n) => n.to_json(),
            Self::ObjectArray(v) => v.clone(),
            Self::String(s) => Value::String(s.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn exact_number_serializes_as_json_number() {
        let value = ResultValue::Number(Number::Exact(dec!(21.5)));
        assert_eq!(value.to_json(), json!(21.5));
    }

    #[test]
    fn exact_number_keeps_digits_beyond_f64() {
        let value = Number::Exact(dec!(0.1000000000000000055));
        assert_eq!(value.to_json().to_string(), "0.1000000000000000055");

        let large = Number::Exact(dec!(12345678901234567890.123456789));
        assert_eq!(large.to_json().to_string(), "12345678901234567890.123456789");
    }

    #[test]
    fn non_finite_float_serializes_as_null() {
        let value = ResultValue::Number(Number::Approximate(f64::NAN));
        assert_eq!(value.to_json(), Value::Null);
    }

    #[test]
    fn object_array_is_passed_through() {
        let value = ResultValue::ObjectArray(json!([1, {"a": true}]));
        assert_eq!(value.to_json(), json!([1, {"a": true}]));
    }
}
