use crate::error::{AuthError, Result};

/// Syntactic pre-check on a raw token: `header.payload.signature`.
///
/// Nothing is decoded here; that is the signer's job.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenValidator;

impl TokenValidator {
    pub fn check(token: &str) -> Result<()> {
        if token.split('.').count() != 3 {
            return Err(AuthError::TokenInvalid("Wrong number of segments".into()));
        }
        Ok(())
    }

    pub fn is_valid(token: &str) -> bool {
        Self::check(token).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_segments_pass() {
        assert!(TokenValidator::check("a.b.c").is_ok());
        assert!(TokenValidator::is_valid("eyJhbGciOiJIUzI1NiJ9.e30.sig"));
    }

    #[test]
    fn wrong_segment_count_fails() {
        for token in ["a.b", "a.b.c.d", "", "abc"] {
            assert!(matches!(
                TokenValidator::check(token),
                Err(AuthError::TokenInvalid(_))
            ));
        }
    }
}
