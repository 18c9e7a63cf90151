use serde_json::Value;

use crate::error::{AuthError, Result};

/// Current Unix timestamp in seconds.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Read a claim value as a Unix timestamp.
///
/// Accepts JSON numbers and numeric strings (`"1700000000"`, `"1.7e9"`),
/// which is what PHP issuers put on the wire.  Fractions are truncated.
pub fn timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => s
            .parse::<i64>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64)),
        _ => None,
    }
}

/// The registered claim names plus an escape hatch for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClaimKind {
    Subject,
    Issuer,
    Audience,
    IssuedAt,
    Expiration,
    NotBefore,
    JwtId,
    Custom(String),
}

impl ClaimKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "sub" => Self::Subject,
            "iss" => Self::Issuer,
            "aud" => Self::Audience,
            "iat" => Self::IssuedAt,
            "exp" => Self::Expiration,
            "nbf" => Self::NotBefore,
            "jti" => Self::JwtId,
            other => Self::Custom(other.to_owned()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Subject => "sub",
            Self::Issuer => "iss",
            Self::Audience => "aud",
            Self::IssuedAt => "iat",
            Self::Expiration => "exp",
            Self::NotBefore => "nbf",
            Self::JwtId => "jti",
            Self::Custom(name) => name,
        }
    }

    /// Check `value` against this kind's rule, with `now` as the reference
    /// time for `iat`.  Returns the reason on failure.
    pub fn validate(&self, value: &Value, now: i64) -> Result<(), &'static str> {
        match self {
            Self::Custom(_) => Ok(()),
            Self::Subject => match value {
                Value::Null => Err("must not be null"),
                _ => Ok(()),
            },
            Self::Issuer | Self::JwtId => match value {
                Value::String(_) => Ok(()),
                _ => Err("must be a string"),
            },
            Self::Audience => match value {
                Value::String(_) => Ok(()),
                Value::Array(items) if items.iter().all(Value::is_string) => Ok(()),
                _ => Err("must be a string or an array of strings"),
            },
            Self::Expiration | Self::NotBefore => timestamp(value)
                .map(|_| ())
                .ok_or("must be a numeric timestamp"),
            Self::IssuedAt => match timestamp(value) {
                None => Err("must be a numeric timestamp"),
                Some(iat) if iat > now => Err("cannot be in the future"),
                Some(_) => Ok(()),
            },
        }
    }
}

/// A single named claim whose value passed its kind's rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    kind: ClaimKind,
    value: Value,
}

impl Claim {
    /// Validate against the current time.  See [`Claim::new_at`].
    pub fn new(kind: ClaimKind, value: impl Into<Value>) -> Result<Self> {
        Self::new_at(kind, value, now())
    }

    pub fn new_at(kind: ClaimKind, value: impl Into<Value>, now: i64) -> Result<Self> {
        let value = value.into();
        kind.validate(&value, now)
            .map_err(|reason| AuthError::invalid_claim(kind.name(), reason))?;
        Ok(Self { kind, value })
    }

    pub fn kind(&self) -> &ClaimKind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        self.kind.name()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Builds claims by name, falling back to [`ClaimKind::Custom`] for names
/// that are not registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimFactory;

impl ClaimFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn get(&self, name: &str, value: impl Into<Value>) -> Result<Claim> {
        self.get_at(name, value, now())
    }

    pub fn get_at(&self, name: &str, value: impl Into<Value>, now: i64) -> Result<Claim> {
        Claim::new_at(ClaimKind::from_name(name), value, now)
    }
}
