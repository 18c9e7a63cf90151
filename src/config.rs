use crate::error::AuthError;
use crate::validators::DEFAULT_REQUIRED_CLAIMS;

/// Configuration for issuing and validating tokens.
///
/// Build with [`new`](Self::new) or [`from_env`](Self::from_env) and adjust
/// with the builder setters.  Durations follow the Laravel package: TTLs in
/// minutes, leeway and grace period in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct JwtConfig {
    pub secret: String,
    pub algo: String,
    /// PEM keys for the asymmetric algorithms.  Unused for HS*.
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    /// Token lifetime in minutes.  `None` issues tokens without `exp`.
    pub ttl: Option<i64>,
    /// Minutes after `iat` during which a token may be refreshed.
    pub refresh_ttl: i64,
    pub required_claims: Vec<String>,
    pub leeway: i64,
    pub blacklist_enabled: bool,
    /// Seconds a blacklisted token keeps working, for concurrent requests.
    pub blacklist_grace_period: i64,
    /// Value of the `iss` claim, normally the URL the token is issued from.
    pub issuer: String,
}

impl JwtConfig {
    /// New config with the Laravel package defaults: HS256, one hour TTL,
    /// two week refresh window, blacklist on.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algo: "HS256".into(),
            public_key: None,
            private_key: None,
            ttl: Some(60),
            refresh_ttl: 20_160,
            required_claims: DEFAULT_REQUIRED_CLAIMS.iter().map(|c| c.to_string()).collect(),
            leeway: 0,
            blacklist_enabled: true,
            blacklist_grace_period: 0,
            issuer: "http://localhost".into(),
        }
    }

    /// Build from environment variables already set in the process.
    ///
    /// | Variable                     | Required | Default                      |
    /// |------------------------------|----------|------------------------------|
    /// | `JWT_SECRET`                 | **yes**  | —                            |
    /// | `JWT_ALGO`                   | no       | `HS256`                      |
    /// | `JWT_PUBLIC_KEY`             | no       | *(unset)*                    |
    /// | `JWT_PRIVATE_KEY`            | no       | *(unset)*                    |
    /// | `JWT_TTL`                    | no       | `60`; `null` disables `exp`  |
    /// | `JWT_REFRESH_TTL`            | no       | `20160`                      |
    /// | `JWT_REQUIRED_CLAIMS`        | no       | `iss,iat,exp,nbf,sub,jti`    |
    /// | `JWT_LEEWAY`                 | no       | `0`                          |
    /// | `JWT_BLACKLIST_ENABLED`      | no       | `true`                       |
    /// | `JWT_BLACKLIST_GRACE_PERIOD` | no       | `0`                          |
    /// | `JWT_ISSUER`                 | no       | `http://localhost`           |
    pub fn from_env() -> Result<Self, AuthError> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AuthError::Config("JWT_SECRET is not set".into()))?;
        let mut config = Self::new(secret);

        if let Ok(algo) = std::env::var("JWT_ALGO") {
            config.algo = algo;
        }
        config.public_key = std::env::var("JWT_PUBLIC_KEY").ok().filter(|v| !v.is_empty());
        config.private_key = std::env::var("JWT_PRIVATE_KEY").ok().filter(|v| !v.is_empty());

        if let Ok(ttl) = std::env::var("JWT_TTL") {
            config.ttl = match ttl.trim() {
                "" | "null" => None,
                minutes => Some(parse_env("JWT_TTL", minutes)?),
            };
        }
        if let Ok(v) = std::env::var("JWT_REFRESH_TTL") {
            config.refresh_ttl = parse_env("JWT_REFRESH_TTL", &v)?;
        }
        if let Ok(v) = std::env::var("JWT_LEEWAY") {
            config.leeway = parse_env("JWT_LEEWAY", &v)?;
        }
        if let Ok(v) = std::env::var("JWT_BLACKLIST_GRACE_PERIOD") {
            config.blacklist_grace_period = parse_env("JWT_BLACKLIST_GRACE_PERIOD", &v)?;
        }
        if let Ok(v) = std::env::var("JWT_BLACKLIST_ENABLED") {
            config.blacklist_enabled = v == "true" || v == "1";
        }

        // Comma-separated, e.g. "iss,sub,exp"
        if let Ok(v) = std::env::var("JWT_REQUIRED_CLAIMS") {
            config.required_claims = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(issuer) = std::env::var("JWT_ISSUER") {
            config.issuer = issuer;
        }

        Ok(config)
    }

    pub fn algo(mut self, v: impl Into<String>) -> Self {
        self.algo = v.into();
        self
    }
    pub fn public_key(mut self, pem: impl Into<String>) -> Self {
        self.public_key = Some(pem.into());
        self
    }
    pub fn private_key(mut self, pem: impl Into<String>) -> Self {
        self.private_key = Some(pem.into());
        self
    }
    pub fn ttl(mut self, minutes: Option<i64>) -> Self {
        self.ttl = minutes;
        self
    }
    pub fn refresh_ttl(mut self, minutes: i64) -> Self {
        self.refresh_ttl = minutes;
        self
    }
    pub fn required_claims(mut self, v: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.required_claims = v.into_iter().map(Into::into).collect();
        self
    }
    pub fn leeway(mut self, seconds: i64) -> Self {
        self.leeway = seconds;
        self
    }
    pub fn blacklist_enabled(mut self, v: bool) -> Self {
        self.blacklist_enabled = v;
        self
    }
    pub fn blacklist_grace_period(mut self, seconds: i64) -> Self {
        self.blacklist_grace_period = seconds;
        self
    }
    pub fn issuer(mut self, v: impl Into<String>) -> Self {
        self.issuer = v.into();
        self
    }
}

fn parse_env(name: &str, value: &str) -> Result<i64, AuthError> {
    value
        .trim()
        .parse()
        .map_err(|_| AuthError::Config(format!("{name} must be an integer, got {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_laravel_package() {
        let cfg = JwtConfig::new("s");
        assert_eq!(cfg.algo, "HS256");
        assert_eq!(cfg.ttl, Some(60));
        assert_eq!(cfg.refresh_ttl, 20_160);
        assert_eq!(cfg.leeway, 0);
        assert!(cfg.blacklist_enabled);
        assert_eq!(cfg.required_claims, ["iss", "iat", "exp", "nbf", "sub", "jti"]);
    }

    #[test]
    fn builder_setters_chain() {
        let cfg = JwtConfig::new("s")
            .algo("HS512")
            .ttl(None)
            .refresh_ttl(30)
            .leeway(5)
            .required_claims(["sub"])
            .blacklist_enabled(false)
            .issuer("https://example.com/api/login");
        assert_eq!(cfg.algo, "HS512");
        assert_eq!(cfg.ttl, None);
        assert_eq!(cfg.refresh_ttl, 30);
        assert_eq!(cfg.leeway, 5);
        assert_eq!(cfg.required_claims, ["sub"]);
        assert!(!cfg.blacklist_enabled);
        assert_eq!(cfg.issuer, "https://example.com/api/login");
    }

    #[test]
    fn bad_integer_is_a_config_error() {
        assert!(matches!(
            parse_env("JWT_TTL", "an hour"),
            Err(AuthError::Config(_))
        ));
        assert_eq!(parse_env("JWT_TTL", " 15 "), Ok(15));
    }
}
