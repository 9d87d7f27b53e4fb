//! Counter modifiers.
//!
//! Counters are never overwritten wholesale by the object-body write path.
//! Writers express intent as a modifier: `"+N"` and `"-N"` are relative,
//! `"=N"` (or a bare JSON number) is absolute.

use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A change to apply to a server-side counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CounterModifier {
    /// Add `N` to the current value.
    Increment(i64),
    /// Subtract `N` from the current value.
    Decrement(i64),
    /// Replace the current value with `N`.
    Set(i64),
}

impl CounterModifier {
    /// Converts a payload value into a modifier.
    ///
    /// Integral numbers become an absolute `Set`; strings are parsed as
    /// modifiers. Anything else yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Self::Set),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Applies the modifier to the current counter value.
    #[must_use]
    pub fn apply(self, current: i64) -> i64 {
        match self {
            Self::Increment(n) => current.saturating_add(n),
            Self::Decrement(n) => current.saturating_sub(n),
            Self::Set(n) => n,
        }
    }
}

impl FromStr for CounterModifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidCounterModifier(s.to_string());
        let mut chars = s.chars();
        let op = chars.next().ok_or_else(invalid)?;
        let digits = chars.as_str().trim();
        // Deltas carry their sign in the operator; only `=` takes a signed amount.
        if op != '=' && !digits.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let amount: i64 = digits.parse().map_err(|_| invalid())?;
        match op {
            '+' => Ok(Self::Increment(amount)),
            '-' => Ok(Self::Decrement(amount)),
            '=' => Ok(Self::Set(amount)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for CounterModifier {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CounterModifier> for String {
    fn from(modifier: CounterModifier) -> Self {
        modifier.to_string()
    }
}

impl fmt::Display for CounterModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increment(n) => write!(f, "+{n}"),
            Self::Decrement(n) => write!(f, "-{n}"),
            Self::Set(n) => write!(f, "={n}"),
        }
    }
}
