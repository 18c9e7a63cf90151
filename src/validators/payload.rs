use serde_json::{Map, Value};

use crate::claims::{now, timestamp};
use crate::error::{AuthError, Result};

/// Claims every token must carry unless configured otherwise.
pub const DEFAULT_REQUIRED_CLAIMS: [&str; 6] = ["iss", "iat", "exp", "nbf", "sub", "jti"];

/// Which temporal rules apply to a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// `exp`, `nbf` and `iat` are checked against the clock.
    #[default]
    Standard,
    /// The token is being exchanged for a new one.  Only the refresh window
    /// (`iat + refresh_ttl`) is checked, so an expired token still passes.
    RefreshFlow,
}

/// Enforces required-claim and temporal rules over a decoded claim mapping.
///
/// Checks fail fast and report the first violation.  The mode is passed per
/// call so one validator can serve both flows without leaking state.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadValidator {
    required_claims: Vec<String>,
    refresh_ttl: Option<i64>,
    leeway: i64,
}

impl Default for PayloadValidator {
    fn default() -> Self {
        Self {
            required_claims: DEFAULT_REQUIRED_CLAIMS.iter().map(|c| c.to_string()).collect(),
            refresh_ttl: None,
            leeway: 0,
        }
    }
}

impl PayloadValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required_claims(&self) -> &[String] {
        &self.required_claims
    }

    /// Refresh window in minutes.
    pub fn refresh_ttl(&self) -> Option<i64> {
        self.refresh_ttl
    }

    /// Clock-skew tolerance in seconds.
    pub fn leeway(&self) -> i64 {
        self.leeway
    }

    pub fn set_required_claims<I, S>(&mut self, claims: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_claims = claims.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_refresh_ttl(&mut self, minutes: Option<i64>) -> &mut Self {
        self.refresh_ttl = minutes;
        self
    }

    pub fn set_leeway(&mut self, seconds: i64) -> &mut Self {
        self.leeway = seconds;
        self
    }

    pub fn with_required_claims<I, S>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_required_claims(claims);
        self
    }

    pub fn with_refresh_ttl(mut self, minutes: Option<i64>) -> Self {
        self.refresh_ttl = minutes;
        self
    }

    pub fn with_leeway(mut self, seconds: i64) -> Self {
        self.leeway = seconds;
        self
    }

    /// Validate against the current time, returning the input on success.
    pub fn check<'a>(
        &self,
        claims: &'a Map<String, Value>,
        mode: ValidationMode,
    ) -> Result<&'a Map<String, Value>> {
        self.check_at(claims, mode, now())
    }

    pub fn is_valid(&self, claims: &Map<String, Value>, mode: ValidationMode) -> bool {
        self.check(claims, mode).is_ok()
    }

    pub fn is_valid_at(&self, claims: &Map<String, Value>, mode: ValidationMode, now: i64) -> bool {
        self.check_at(claims, mode, now).is_ok()
    }

    /// Validate with `now` as the single clock reading for every rule.
    pub fn check_at<'a>(
        &self,
        claims: &'a Map<String, Value>,
        mode: ValidationMode,
        now: i64,
    ) -> Result<&'a Map<String, Value>> {
        self.validate_structure(claims)?;

        match mode {
            ValidationMode::Standard => self.validate_timestamps(claims, now)?,
            ValidationMode::RefreshFlow => self.validate_refresh(claims, now)?,
        }

        Ok(claims)
    }

    fn validate_structure(&self, claims: &Map<String, Value>) -> Result<()> {
        match self.required_claims.iter().find(|c| !claims.contains_key(c.as_str())) {
            Some(missing) => Err(AuthError::TokenInvalid(format!(
                "JWT payload does not contain the required claim [{missing}]"
            ))),
            None => Ok(()),
        }
    }

    fn validate_timestamps(&self, claims: &Map<String, Value>, now: i64) -> Result<()> {
        if let Some(exp) = numeric_claim(claims, "exp")? {
            if exp.saturating_add(self.leeway) < now {
                return Err(AuthError::TokenExpired("Token has expired".into()));
            }
        }

        if let Some(nbf) = numeric_claim(claims, "nbf")? {
            if nbf.saturating_sub(self.leeway) > now {
                return Err(AuthError::TokenInvalid(
                    "Not Before (nbf) timestamp cannot be in the future".into(),
                ));
            }
        }

        if let Some(iat) = numeric_claim(claims, "iat")? {
            if iat.saturating_sub(self.leeway) > now {
                return Err(AuthError::TokenInvalid(
                    "Issued At (iat) timestamp cannot be in the future".into(),
                ));
            }
        }

        Ok(())
    }

    // The issued-at future check does not apply here; only the refresh window does.
    fn validate_refresh(&self, claims: &Map<String, Value>, now: i64) -> Result<()> {
        let ttl = self.refresh_ttl.ok_or_else(|| {
            AuthError::Config("refresh TTL must be set before validating a refresh".into())
        })?;

        if let Some(iat) = numeric_claim(claims, "iat")? {
            if iat.saturating_add(ttl.saturating_mul(60)) < now.saturating_sub(self.leeway) {
                return Err(AuthError::TokenExpired(
                    "Token has expired and can no longer be refreshed".into(),
                ));
            }
        }

        Ok(())
    }
}

/// `Ok(None)` when absent, an error when present but not a timestamp.
fn numeric_claim(claims: &Map<String, Value>, name: &str) -> Result<Option<i64>> {
    match claims.get(name) {
        None => Ok(None),
        Some(value) => timestamp(value).map(Some).ok_or_else(|| {
            AuthError::TokenInvalid(format!("Invalid value provided for claim [{name}]"))
        }),
    }
}
