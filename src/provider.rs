use std::str::FromStr;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};

use crate::config::JwtConfig;
use crate::error::{AuthError, Result};

/// Signs claim mappings into tokens and recovers them again.
///
/// Implementations only deal with the JOSE layer.  Temporal and
/// required-claim rules belong to the
/// [`PayloadValidator`](crate::PayloadValidator), so `decode` must not reject
/// a token for being expired.
pub trait JwtProvider: Send + Sync {
    /// Fails with [`AuthError::Signing`].
    fn encode(&self, claims: &Map<String, Value>) -> Result<String>;

    /// Fails with [`AuthError::TokenInvalid`] when the token cannot be parsed
    /// or its signature does not verify.
    fn decode(&self, token: &str) -> Result<Map<String, Value>>;
}

/// [`JwtProvider`] backed by the `jsonwebtoken` crate.
///
/// HS* algorithms sign with the shared secret; RS*, PS*, ES* and EdDSA need
/// PEM keys in the config.
#[derive(Clone)]
pub struct JsonWebTokenProvider {
    secret: String,
    algorithm: Algorithm,
    public_key: Option<String>,
    private_key: Option<String>,
}

impl std::fmt::Debug for JsonWebTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonWebTokenProvider")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl JsonWebTokenProvider {
    pub fn new(config: &JwtConfig) -> Result<Self> {
        Ok(Self {
            secret: config.secret.clone(),
            algorithm: parse_algorithm(&config.algo)?,
            public_key: config.public_key.clone(),
            private_key: config.private_key.clone(),
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn set_algorithm(&mut self, algo: &str) -> Result<&mut Self> {
        self.algorithm = parse_algorithm(algo)?;
        Ok(self)
    }

    fn encoding_key(&self) -> Result<EncodingKey> {
        let key = match self.algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                if self.secret.is_empty() {
                    return Err(AuthError::Signing("JWT secret must not be empty".into()));
                }
                return Ok(EncodingKey::from_secret(self.secret.as_bytes()));
            }
            _ => self
                .private_key
                .as_deref()
                .ok_or_else(|| AuthError::Signing("private key is not configured".into()))?,
        };

        match self.algorithm {
            Algorithm::ES256 | Algorithm::ES384 => EncodingKey::from_ec_pem(key.as_bytes()),
            Algorithm::EdDSA => EncodingKey::from_ed_pem(key.as_bytes()),
            _ => EncodingKey::from_rsa_pem(key.as_bytes()),
        }
        .map_err(|e| AuthError::Signing(e.to_string()))
    }

    fn decoding_key(&self) -> Result<DecodingKey> {
        let key = match self.algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                return Ok(DecodingKey::from_secret(self.secret.as_bytes()));
            }
            _ => self
                .public_key
                .as_deref()
                .ok_or_else(|| AuthError::Config("public key is not configured".into()))?,
        };

        match self.algorithm {
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(key.as_bytes()),
            Algorithm::EdDSA => DecodingKey::from_ed_pem(key.as_bytes()),
            _ => DecodingKey::from_rsa_pem(key.as_bytes()),
        }
        .map_err(|e| AuthError::Config(format!("invalid public key: {e}")))
    }
}

impl JwtProvider for JsonWebTokenProvider {
    fn encode(&self, claims: &Map<String, Value>) -> Result<String> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key()?)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    fn decode(&self, token: &str) -> Result<Map<String, Value>> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Map<String, Value>>(token, &self.decoding_key()?, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => {
                    AuthError::TokenInvalid("Token Signature could not be verified.".into())
                }
                _ => AuthError::TokenInvalid(format!("Could not decode token: {e}")),
            })?;

        Ok(data.claims)
    }
}

fn parse_algorithm(algo: &str) -> Result<Algorithm> {
    Algorithm::from_str(algo)
        .map_err(|_| AuthError::Config(format!("unsupported signing algorithm {algo:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims() -> Map<String, Value> {
        match json!({"sub": 42, "iss": "http://example.com", "exp": 1, "foo": {"bar": [1, 2]}}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn roundtrip_keeps_claims_and_ignores_expiry() {
        let provider = JsonWebTokenProvider::new(&JwtConfig::new("test-secret")).unwrap();
        let token = provider.encode(&claims()).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(provider.decode(&token).unwrap(), claims());
    }

    #[test]
    fn wrong_secret_rejected() {
        let good = JsonWebTokenProvider::new(&JwtConfig::new("good")).unwrap();
        let bad = JsonWebTokenProvider::new(&JwtConfig::new("bad")).unwrap();
        let token = good.encode(&claims()).unwrap();
        assert!(matches!(bad.decode(&token), Err(AuthError::TokenInvalid(_))));
    }

    #[test]
    fn garbage_rejected() {
        let provider = JsonWebTokenProvider::new(&JwtConfig::new("s")).unwrap();
        assert!(matches!(
            provider.decode("foo.bar.baz"),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn algorithm_mismatch_rejected() {
        let hs256 = JsonWebTokenProvider::new(&JwtConfig::new("s")).unwrap();
        let mut hs512 = hs256.clone();
        hs512.set_algorithm("HS512").unwrap();
        assert_eq!(hs512.algorithm(), Algorithm::HS512);
        let token = hs256.encode(&claims()).unwrap();
        assert!(hs512.decode(&token).is_err());
    }

    #[test]
    fn unknown_algorithm_is_a_config_error() {
        let err = JsonWebTokenProvider::new(&JwtConfig::new("s").algo("XX999")).unwrap_err();
        assert!(matches!(err, AuthError::Config(_)));
    }

    #[test]
    fn empty_secret_cannot_sign() {
        let provider = JsonWebTokenProvider::new(&JwtConfig::new("")).unwrap();
        assert!(matches!(provider.encode(&claims()), Err(AuthError::Signing(_))));
    }

    #[test]
    fn asymmetric_algorithm_without_keys_cannot_sign() {
        let provider = JsonWebTokenProvider::new(&JwtConfig::new("s").algo("RS256")).unwrap();
        assert!(matches!(provider.encode(&claims()), Err(AuthError::Signing(_))));
    }
}
