/// Errors from issuing, decoding and validating JWTs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid value provided for claim [{name}]: {reason}")]
    InvalidClaim { name: String, reason: String },

    #[error("Token is invalid: {0}")]
    TokenInvalid(String),

    #[error("Token has expired: {0}")]
    TokenExpired(String),

    #[error("The token has been blacklisted")]
    TokenBlacklisted,

    #[error("Could not create token: {0}")]
    Signing(String),

    #[error("A token is required")]
    MissingToken,

    #[error("Auth not configured: {0}")]
    Config(String),
}

impl AuthError {
    pub(crate) fn invalid_claim(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidClaim {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for an expired token or an elapsed refresh window.  Callers use
    /// this to offer a refresh instead of a fresh login.
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::TokenExpired(_))
    }

    /// True when the token must be treated as unusable, blacklisting included.
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::TokenInvalid(_) | Self::TokenBlacklisted)
    }
}

pub type Result<T, E = AuthError> = std::result::Result<T, E>;
