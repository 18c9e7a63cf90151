use http::header::HOST;
use http::request::Parts;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::JwtConfig;
use crate::error::{AuthError, Result};
use crate::manager::Manager;
use crate::parser::Parser;
use crate::payload::Payload;
use crate::token::Token;
use crate::user::{JwtSubject, UserProvider};

/// Request-scoped entry point: find the token in a request, authenticate
/// it, and issue, refresh or invalidate tokens.
///
/// ```rust
/// use jwt_auth_bridge::{JwtAuth, JwtConfig};
///
/// let mut auth = JwtAuth::new(&JwtConfig::new("secret")).unwrap();
/// let token = auth.token_for(42).unwrap();
///
/// let request = http::Request::builder()
///     .header("Authorization", format!("Bearer {token}"))
///     .body(())
///     .unwrap();
/// let (parts, _) = request.into_parts();
///
/// auth.parse_token(&parts).unwrap();
/// assert_eq!(auth.payload().unwrap()["sub"], 42);
/// ```
#[derive(Debug)]
pub struct JwtAuth {
    manager: Manager,
    parser: Parser,
    token: Option<Token>,
}

impl JwtAuth {
    pub fn new(config: &JwtConfig) -> Result<Self> {
        Ok(Self::with_parts(Manager::new(config)?, Parser::default()))
    }

    pub fn with_parts(manager: Manager, parser: Parser) -> Self {
        Self {
            manager,
            parser,
            token: None,
        }
    }

    /// Issue a token for `subject`.
    pub fn token_for(&self, subject: impl Into<Value>) -> Result<Token> {
        self.token_for_with(subject, std::iter::empty::<(String, Value)>())
    }

    /// Issue a token for `subject` carrying extra claims.
    pub fn token_for_with<I, K, V>(&self, subject: impl Into<Value>, claims: I) -> Result<Token>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let payload = self.manager.factory().claims(claims).sub(subject).make()?;
        let token = self.manager.encode(&payload)?;
        debug!(sub = ?payload.subject(), "jwt issued");
        Ok(token)
    }

    /// Issue a token for `subject` whose `iss` is the URL of `parts`, the way
    /// a login endpoint stamps its own address.  Falls back to the configured
    /// issuer when the request carries no host.
    pub fn token_for_request(&self, parts: &Parts, subject: impl Into<Value>) -> Result<Token> {
        let mut factory = self.manager.factory();
        if let Some(url) = request_url(parts) {
            factory.set_issuer(url);
        }
        let payload = factory.sub(subject).make()?;
        self.manager.encode(&payload)
    }

    /// Issue a token for `user` carrying its custom claims.
    pub fn token_from_user<U: JwtSubject>(&self, user: &U) -> Result<Token> {
        self.token_for_with(user.jwt_identifier(), user.jwt_custom_claims())
    }

    /// Issue a token for `user` and make it the current token.
    pub fn login<U: JwtSubject>(&mut self, user: &U) -> Result<Token> {
        let token = self.token_from_user(user)?;
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Log in with credentials.  `Ok(None)` when no user matches or the
    /// credentials are wrong.
    pub fn attempt<P>(
        &mut self,
        provider: &P,
        credentials: &Map<String, Value>,
    ) -> Result<Option<Token>>
    where
        P: UserProvider,
        P::User: JwtSubject,
    {
        match find_user(provider, credentials) {
            Some(user) => self.login(&user).map(Some),
            None => Ok(None),
        }
    }

    /// Check credentials without issuing a token.
    pub fn validate<P>(&self, provider: &P, credentials: &Map<String, Value>) -> bool
    where
        P: UserProvider,
    {
        find_user(provider, credentials).is_some()
    }

    /// The user behind the current token.  `Ok(None)` when the token does not
    /// validate or its subject is unknown; an error only when there is no
    /// token at all.
    pub fn user<P: UserProvider>(&self, provider: &P) -> Result<Option<P::User>> {
        let token = self.require_token()?;
        let payload = match self.manager.decode(token) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(error = %e, "no user for invalid jwt");
                return Ok(None);
            }
        };
        Ok(payload.get("sub").and_then(|id| provider.retrieve_by_id(id)))
    }

    /// Issue a token for the user with `id`, without making it current.
    pub fn token_by_id<P>(&self, provider: &P, id: impl Into<Value>) -> Result<Option<Token>>
    where
        P: UserProvider,
        P::User: JwtSubject,
    {
        provider
            .retrieve_by_id(&id.into())
            .map(|user| self.token_from_user(&user))
            .transpose()
    }

    /// Find the token in the request and remember it.  A request without a
    /// token is [`AuthError::MissingToken`]; one that is not three segments
    /// is [`AuthError::TokenInvalid`].
    pub fn parse_token(&mut self, parts: &Parts) -> Result<&Token> {
        let raw = self.parser.parse_token(parts).ok_or(AuthError::MissingToken)?;
        Ok(self.token.insert(Token::new(raw)?))
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn set_token(&mut self, token: Token) -> &mut Self {
        self.token = Some(token);
        self
    }

    pub fn unset_token(&mut self) -> &mut Self {
        self.token = None;
        self
    }

    fn require_token(&self) -> Result<&Token> {
        self.token.as_ref().ok_or(AuthError::MissingToken)
    }

    /// Decode and validate the current token.
    pub fn payload(&self) -> Result<Payload> {
        self.manager.decode(self.require_token()?)
    }

    /// Alias of [`payload`](Self::payload), for readability at call sites.
    pub fn authenticate(&self) -> Result<Payload> {
        self.payload()
    }

    /// Whether the current token is present and valid.
    pub fn check(&self) -> bool {
        self.payload().is_ok()
    }

    /// Replace the current token with a refreshed one and return it.
    pub fn refresh(&mut self) -> Result<Token> {
        let token = self.manager.refresh(self.require_token()?)?;
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Blacklist the current token and forget it.
    pub fn invalidate(&mut self, forever: bool) -> Result<()> {
        self.manager.invalidate(self.require_token()?, forever)?;
        self.token = None;
        Ok(())
    }

    /// Invalidate the current token.  Alias of [`invalidate`](Self::invalidate).
    pub fn logout(&mut self, forever: bool) -> Result<()> {
        self.invalidate(forever)
    }

    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn parser_mut(&mut self) -> &mut Parser {
        &mut self.parser
    }
}

fn find_user<P: UserProvider>(provider: &P, credentials: &Map<String, Value>) -> Option<P::User> {
    let user = provider.retrieve_by_credentials(credentials)?;
    if provider.validate_credentials(&user, credentials) {
        Some(user)
    } else {
        warn!("credentials rejected");
        None
    }
}

// Scheme, host and path of the request, without the query string.
fn request_url(parts: &Parts) -> Option<String> {
    let host = match parts.uri.authority() {
        Some(authority) => authority.as_str().to_owned(),
        None => parts.headers.get(HOST)?.to_str().ok()?.to_owned(),
    };
    let scheme = parts.uri.scheme_str().unwrap_or("http");
    Some(format!("{scheme}://{host}{}", parts.uri.path()))
}
