use serde_json::{Map, Value};
use tracing::debug;

use crate::claims::{now, ClaimFactory};
use crate::config::JwtConfig;
use crate::error::Result;
use crate::payload::Payload;
use crate::token::generate_jti;
use crate::validators::{PayloadValidator, ValidationMode};

/// Claims filled in by [`Factory::make`] when the caller did not stage them.
pub const DEFAULT_CLAIMS: [&str; 5] = ["iss", "iat", "exp", "nbf", "jti"];

/// Assembles the claims of a new token.
///
/// Stage claims with [`claims`](Self::claims), [`claim`](Self::claim) or the
/// per-claim setters, then call [`make`](Self::make):
///
/// ```rust
/// use jwt_auth_bridge::{Factory, JwtConfig};
///
/// let mut factory = Factory::new(&JwtConfig::new("secret").issuer("https://example.com/api/login"));
/// let payload = factory.sub(42).claim("role", "admin").make().unwrap();
///
/// assert_eq!(payload["sub"], 42);
/// assert_eq!(payload["iss"], "https://example.com/api/login");
/// assert!(payload.has("exp"));
/// ```
#[derive(Debug, Clone)]
pub struct Factory {
    claim_factory: ClaimFactory,
    validator: PayloadValidator,
    issuer: String,
    ttl: Option<i64>,
    default_claims: Vec<String>,
    staged: Map<String, Value>,
}

impl Factory {
    pub fn new(config: &JwtConfig) -> Self {
        let validator = PayloadValidator::new()
            .with_required_claims(config.required_claims.iter().cloned())
            .with_refresh_ttl(Some(config.refresh_ttl))
            .with_leeway(config.leeway);

        Self {
            claim_factory: ClaimFactory::new(),
            validator,
            issuer: config.issuer.clone(),
            ttl: config.ttl,
            default_claims: DEFAULT_CLAIMS.iter().map(|c| c.to_string()).collect(),
            staged: Map::new(),
        }
    }

    /// Stage several claims at once.  Later values for the same name win.
    pub fn claims<I, K, V>(&mut self, claims: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in claims {
            self.staged.insert(name.into(), value.into());
        }
        self
    }

    /// Stage a single claim by name; unregistered names become custom claims.
    pub fn claim(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.staged.insert(name.into(), value.into());
        self
    }

    pub fn sub(&mut self, value: impl Into<Value>) -> &mut Self {
        self.claim("sub", value)
    }

    pub fn iss(&mut self, value: impl Into<Value>) -> &mut Self {
        self.claim("iss", value)
    }

    pub fn aud(&mut self, value: impl Into<Value>) -> &mut Self {
        self.claim("aud", value)
    }

    pub fn iat(&mut self, value: impl Into<Value>) -> &mut Self {
        self.claim("iat", value)
    }

    pub fn exp(&mut self, value: impl Into<Value>) -> &mut Self {
        self.claim("exp", value)
    }

    pub fn nbf(&mut self, value: impl Into<Value>) -> &mut Self {
        self.claim("nbf", value)
    }

    pub fn jti(&mut self, value: impl Into<Value>) -> &mut Self {
        self.claim("jti", value)
    }

    /// Build and validate a payload from the defaults and the staged claims.
    ///
    /// The staged claims are consumed whether or not this succeeds.
    pub fn make(&mut self) -> Result<Payload> {
        self.make_at(now())
    }

    pub fn make_at(&mut self, now: i64) -> Result<Payload> {
        let staged = std::mem::take(&mut self.staged);

        let mut values = Map::new();
        for name in &self.default_claims {
            let value = match staged.get(name) {
                Some(value) => value.clone(),
                None => match self.default_value(name, now) {
                    Some(value) => value,
                    None => continue,
                },
            };
            values.insert(name.clone(), value);
        }
        for (name, value) in staged {
            if !values.contains_key(&name) {
                values.insert(name, value);
            }
        }

        let claims = values
            .iter()
            .map(|(name, value)| self.claim_factory.get_at(name, value.clone(), now))
            .collect::<Result<Vec<_>>>()?;

        self.validator_for(&values)
            .check_at(&values, ValidationMode::Standard, now)?;

        debug!(claims = claims.len(), "jwt payload assembled");
        Ok(Payload::new(claims))
    }

    fn default_value(&self, name: &str, now: i64) -> Option<Value> {
        match name {
            "iss" => Some(self.issuer.clone().into()),
            "iat" | "nbf" => Some(now.into()),
            "jti" => Some(generate_jti(16).into()),
            "exp" => self
                .ttl
                .map(|minutes| now.saturating_add(minutes.saturating_mul(60)).into()),
            _ => None,
        }
    }

    // A factory with no TTL issues tokens without `exp`, so it cannot require one.
    fn validator_for(&self, values: &Map<String, Value>) -> PayloadValidator {
        let mut validator = self.validator.clone();
        if self.ttl.is_none() && !values.contains_key("exp") {
            let required: Vec<String> = validator
                .required_claims()
                .iter()
                .filter(|c| c.as_str() != "exp")
                .cloned()
                .collect();
            validator.set_required_claims(required);
        }
        validator
    }

    /// Token lifetime in minutes; `None` omits `exp`.
    pub fn ttl(&self) -> Option<i64> {
        self.ttl
    }

    pub fn set_ttl(&mut self, minutes: Option<i64>) -> &mut Self {
        self.ttl = minutes;
        self
    }

    pub fn default_claims(&self) -> &[String] {
        &self.default_claims
    }

    pub fn set_default_claims<I, S>(&mut self, claims: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_claims = claims.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_required_claims<I, S>(&mut self, claims: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validator.set_required_claims(claims);
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn set_issuer(&mut self, issuer: impl Into<String>) -> &mut Self {
        self.issuer = issuer.into();
        self
    }

    pub fn validator(&self) -> &PayloadValidator {
        &self.validator
    }

    pub fn validator_mut(&mut self) -> &mut PayloadValidator {
        &mut self.validator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthError;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn factory() -> Factory {
        Factory::new(&JwtConfig::new("secret").issuer("/foo"))
    }

    #[test]
    fn make_from_claim_map() {
        let mut f = factory();
        let payload = f
            .claims([("sub", json!(1)), ("jti", json!("foo")), ("iat", json!(123)), ("nbf", json!(123))])
            .make_at(NOW)
            .unwrap();

        assert_eq!(payload.get("sub"), Some(&json!(1)));
        assert_eq!(payload.get("iat"), Some(&json!(123)));
        assert_eq!(payload["exp"], json!(NOW + 3600));
        assert_eq!(payload["iss"], json!("/foo"));
        assert_eq!(payload["jti"], json!("foo"));
    }

    #[test]
    fn make_from_chained_setters() {
        let mut f = factory();
        let payload = f.sub(1).claim("foo", "baz").make_at(NOW).unwrap();

        assert_eq!(payload["sub"], json!(1));
        assert_eq!(payload.get("foo"), Some(&json!("baz")));
        assert_eq!(payload["iat"], json!(NOW));
        assert_eq!(payload["nbf"], json!(NOW));
        assert_eq!(payload.jwt_id().map(str::len), Some(16));
    }

    #[test]
    fn nested_custom_claim_is_reachable_by_path() {
        let mut f = factory();
        let payload = f
            .sub(1)
            .claim("foo", json!({"bar": [0, 0, 0]}))
            .make_at(NOW)
            .unwrap();

        assert_eq!(payload.get("foo"), Some(&json!({"bar": [0, 0, 0]})));
        assert_eq!(payload.get("foo.bar"), Some(&json!([0, 0, 0])));
    }

    #[test]
    fn null_ttl_omits_exp() {
        let mut f = factory();
        let payload = f.set_ttl(None).sub(1).make_at(NOW).unwrap();
        assert_eq!(payload.get("exp"), None);
        assert!(payload.has("iat"));
    }

    #[test]
    fn staged_claims_override_defaults_without_duplicates() {
        let mut f = factory();
        let payload = f
            .sub(1)
            .iss("https://other.example.com")
            .claim("role", "admin")
            .make_at(NOW)
            .unwrap();

        let names: Vec<_> = payload.claims().iter().map(|c| c.name().to_owned()).collect();
        assert_eq!(names, ["iss", "iat", "exp", "nbf", "jti", "sub", "role"]);
        assert_eq!(payload["iss"], json!("https://other.example.com"));
    }

    #[test]
    fn staged_buffer_is_cleared_after_make() {
        let mut f = factory();
        f.sub(1).claim("foo", "bar").make_at(NOW).unwrap();
        let err = f.make_at(NOW).unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(ref m) if m.contains("[sub]")));
    }

    #[test]
    fn staged_buffer_is_cleared_after_failure() {
        let mut f = factory();
        assert!(f.sub(1).iat("soon").make_at(NOW).is_err());
        let payload = f.sub(2).make_at(NOW).unwrap();
        assert_eq!(payload["iat"], json!(NOW));
    }

    #[test]
    fn invalid_claim_value_propagates() {
        let mut f = factory();
        let err = f.sub(1).iat(NOW + 60).make_at(NOW).unwrap_err();
        assert!(matches!(err, AuthError::InvalidClaim { ref name, .. } if name == "iat"));
    }

    #[test]
    fn validator_error_propagates() {
        let mut f = factory();
        let err = f.sub(1).nbf(NOW + 3600).make_at(NOW).unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(_)));
    }

    #[test]
    fn configuration_accessors() {
        let mut f = factory();
        f.set_ttl(Some(12345));
        assert_eq!(f.ttl(), Some(12345));

        f.set_default_claims(["sub", "iat"]);
        assert_eq!(f.default_claims(), ["sub", "iat"]);

        f.set_required_claims(["iat"]);
        assert_eq!(f.validator().required_claims(), ["iat"]);

        let payload = f.make_at(NOW).unwrap();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload["iat"], json!(NOW));
    }

    #[test]
    fn ttl_is_minutes() {
        let mut f = factory();
        let payload = f.set_ttl(Some(5)).sub(1).make_at(NOW).unwrap();
        assert_eq!(payload.expiration(), Some(NOW + 300));
    }

    #[test]
    fn null_subject_is_not_issued() {
        let mut f = factory();
        let err = f.sub(Value::Null).make_at(NOW).unwrap_err();
        assert!(matches!(err, AuthError::InvalidClaim { ref name, .. } if name == "sub"));
    }

    #[test]
    fn huge_ttl_saturates() {
        let mut f = factory();
        let payload = f.set_ttl(Some(i64::MAX)).sub(1).make_at(NOW).unwrap();
        assert_eq!(payload.expiration(), Some(i64::MAX));
    }
}
