use std::fmt;

use rand::Rng;

use crate::error::Result;
use crate::validators::TokenValidator;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn random_string(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// Random alphanumeric `jti`.
pub fn generate_jti(length: usize) -> String {
    random_string(length)
}

/// Random 32 character signing secret, suitable for `JWT_SECRET`.
pub fn generate_secret() -> String {
    random_string(32)
}

/// A raw token string that has passed the segment-count check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        TokenValidator::check(&value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Token {
    type Error = crate::AuthError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Token {
    type Error = crate::AuthError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthError;

    #[test]
    fn jti_is_alphanumeric_of_requested_length() {
        let jti = generate_jti(16);
        assert_eq!(jti.len(), 16);
        assert!(jti.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(generate_jti(16), generate_jti(16));
    }

    #[test]
    fn secret_is_32_chars() {
        assert_eq!(generate_secret().len(), 32);
    }

    #[test]
    fn token_requires_three_segments() {
        assert_eq!(Token::new("foo.bar.baz").unwrap().as_str(), "foo.bar.baz");
        assert!(matches!(
            Token::try_from("foo.bar"),
            Err(AuthError::TokenInvalid(_))
        ));
    }
}
