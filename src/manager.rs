use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::blacklist::Blacklist;
use crate::claims::{now, ClaimFactory};
use crate::config::JwtConfig;
use crate::error::{AuthError, Result};
use crate::factory::Factory;
use crate::payload::Payload;
use crate::provider::{JsonWebTokenProvider, JwtProvider};
use crate::token::Token;
use crate::validators::{PayloadValidator, ValidationMode};

/// Claims that are re-issued rather than carried over on refresh.
const REFRESHED_CLAIMS: [&str; 4] = ["iat", "exp", "nbf", "jti"];

/// Encodes payloads, decodes and validates tokens, refreshes and
/// invalidates them.
#[derive(Clone)]
pub struct Manager {
    provider: Arc<dyn JwtProvider>,
    factory: Factory,
    validator: PayloadValidator,
    blacklist: Blacklist,
    blacklist_enabled: bool,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("factory", &self.factory)
            .field("validator", &self.validator)
            .field("blacklist", &self.blacklist)
            .field("blacklist_enabled", &self.blacklist_enabled)
            .finish_non_exhaustive()
    }
}

impl Manager {
    /// Manager signing with `jsonwebtoken` and an in-memory blacklist.
    pub fn new(config: &JwtConfig) -> Result<Self> {
        let provider = JsonWebTokenProvider::new(config)?;
        let blacklist = Blacklist::in_memory(config.blacklist_grace_period, config.refresh_ttl);
        Ok(Self::with_provider(config, Arc::new(provider), blacklist))
    }

    pub fn with_provider(
        config: &JwtConfig,
        provider: Arc<dyn JwtProvider>,
        blacklist: Blacklist,
    ) -> Self {
        let factory = Factory::new(config);
        let mut validator = factory.validator().clone();
        // Tokens issued without a TTL carry no `exp` to require.
        if config.ttl.is_none() {
            let required: Vec<String> = validator
                .required_claims()
                .iter()
                .filter(|c| c.as_str() != "exp")
                .cloned()
                .collect();
            validator.set_required_claims(required);
        }
        Self {
            provider,
            factory,
            validator,
            blacklist,
            blacklist_enabled: config.blacklist_enabled,
        }
    }

    pub fn encode(&self, payload: &Payload) -> Result<Token> {
        let raw = self.provider.encode(&payload.to_map())?;
        Token::new(raw).map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify the signature and the standard temporal rules, then consult the
    /// blacklist.
    pub fn decode(&self, token: &Token) -> Result<Payload> {
        self.decode_with(token, ValidationMode::Standard, true)
    }

    pub fn decode_with(
        &self,
        token: &Token,
        mode: ValidationMode,
        check_blacklist: bool,
    ) -> Result<Payload> {
        let now = now();
        let claims = self.provider.decode(token.as_str())?;

        if let Err(e) = self.validator.check_at(&claims, mode, now) {
            warn!(error = %e, ?mode, "jwt rejected");
            return Err(e);
        }

        // Skew already tolerated by the validator must not trip the iat rule
        // at claim construction; during refresh that rule does not apply.
        let reference = match mode {
            ValidationMode::Standard => now.saturating_add(self.validator.leeway()),
            ValidationMode::RefreshFlow => i64::MAX,
        };
        let payload = payload_from(&claims, reference)?;

        if check_blacklist && self.blacklist_enabled && self.blacklist.has_at(&payload, now) {
            warn!(jti = payload.jwt_id(), "blacklisted jwt rejected");
            return Err(AuthError::TokenBlacklisted);
        }

        Ok(payload)
    }

    /// Exchange a token, expired or not, for a new one while it is inside the
    /// refresh window.  The old token is blacklisted when the blacklist is on.
    pub fn refresh(&self, token: &Token) -> Result<Token> {
        let payload = self.decode_with(token, ValidationMode::RefreshFlow, true)?;

        if self.blacklist_enabled {
            self.blacklist.add(&payload)?;
        }

        let carried = payload
            .claims()
            .iter()
            .filter(|c| !REFRESHED_CLAIMS.contains(&c.name()))
            .map(|c| (c.name().to_owned(), c.value().clone()));

        let mut factory = self.factory.clone();
        let refreshed = factory.claims(carried).make()?;
        debug!(sub = ?refreshed.subject(), "jwt refreshed");
        self.encode(&refreshed)
    }

    /// Blacklist a token.  Tokens that are expired but still refreshable can
    /// be invalidated too.
    pub fn invalidate(&self, token: &Token, forever: bool) -> Result<()> {
        if !self.blacklist_enabled {
            return Err(AuthError::Config(
                "You must have the blacklist enabled to invalidate a token".into(),
            ));
        }

        let payload = self.decode_with(token, ValidationMode::RefreshFlow, false)?;
        if forever {
            self.blacklist.add_forever(&payload)
        } else {
            self.blacklist.add(&payload)
        }
    }

    /// A fresh copy of the payload factory for building a new token.
    pub fn factory(&self) -> Factory {
        self.factory.clone()
    }

    pub fn validator(&self) -> &PayloadValidator {
        &self.validator
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    pub fn blacklist_enabled(&self) -> bool {
        self.blacklist_enabled
    }

    pub fn set_blacklist_enabled(&mut self, enabled: bool) -> &mut Self {
        self.blacklist_enabled = enabled;
        self
    }
}

fn payload_from(claims: &Map<String, Value>, now: i64) -> Result<Payload> {
    let factory = ClaimFactory::new();
    let claims = claims
        .iter()
        .map(|(name, value)| factory.get_at(name, value.clone(), now))
        .collect::<Result<Vec<_>>>()?;
    Ok(Payload::new(claims))
}
