use std::borrow::Cow;

use http::header::{HeaderName, AUTHORIZATION, COOKIE};
use http::request::Parts;

/// One way of finding a token in a request.
pub trait TokenParser: Send + Sync {
    /// `None` when this source carries no token.  Never an error.
    fn parse(&self, parts: &Parts) -> Option<String>;
}

/// `Authorization: Bearer <token>`.  The prefix match is case-insensitive.
#[derive(Debug, Clone)]
pub struct AuthHeaders {
    header: HeaderName,
    prefix: String,
}

impl Default for AuthHeaders {
    fn default() -> Self {
        Self {
            header: AUTHORIZATION,
            prefix: "bearer".into(),
        }
    }
}

impl AuthHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, header: HeaderName) -> Self {
        self.header = header;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

impl TokenParser for AuthHeaders {
    fn parse(&self, parts: &Parts) -> Option<String> {
        let value = parts.headers.get(&self.header)?.to_str().ok()?.trim();
        let head = value.get(..self.prefix.len())?;
        if !head.eq_ignore_ascii_case(&self.prefix) {
            return None;
        }
        let token = value[self.prefix.len()..].trim();
        (!token.is_empty()).then(|| token.to_owned())
    }
}

/// `?token=<token>` in the query string.
#[derive(Debug, Clone)]
pub struct QueryString {
    key: String,
}

impl Default for QueryString {
    fn default() -> Self {
        Self {
            key: "token".into(),
        }
    }
}

impl QueryString {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl TokenParser for QueryString {
    fn parse(&self, parts: &Parts) -> Option<String> {
        parts
            .uri
            .query()?
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, value)| *key == self.key && !value.is_empty())
            .and_then(|(_, value)| decode(value))
    }
}

/// A `token` cookie.
#[derive(Debug, Clone)]
pub struct Cookies {
    key: String,
}

impl Default for Cookies {
    fn default() -> Self {
        Self {
            key: "token".into(),
        }
    }
}

impl Cookies {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl TokenParser for Cookies {
    fn parse(&self, parts: &Parts) -> Option<String> {
        parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(|h| h.split(';'))
            .filter_map(|c| c.trim().split_once('='))
            .find(|(name, value)| *name == self.key && !value.is_empty())
            .and_then(|(_, value)| decode(value.trim_matches('"')))
    }
}

// Percent-decoded value; `None` if it does not decode to UTF-8.
fn decode(value: &str) -> Option<String> {
    urlencoding::decode(value).ok().map(Cow::into_owned)
}

/// Tries each [`TokenParser`] in order; the first token found wins.
pub struct Parser {
    chain: Vec<Box<dyn TokenParser>>,
}

impl Default for Parser {
    /// Header, then query string, then cookie.
    fn default() -> Self {
        Self::new(vec![
            Box::new(AuthHeaders::default()),
            Box::new(QueryString::default()),
            Box::new(Cookies::default()),
        ])
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("chain", &self.chain.len())
            .finish()
    }
}

impl Parser {
    pub fn new(chain: Vec<Box<dyn TokenParser>>) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &[Box<dyn TokenParser>] {
        &self.chain
    }

    pub fn set_chain(&mut self, chain: Vec<Box<dyn TokenParser>>) -> &mut Self {
        self.chain = chain;
        self
    }

    pub fn parse_token(&self, parts: &Parts) -> Option<String> {
        self.chain.iter().find_map(|parser| parser.parse(parts))
    }

    pub fn has_token(&self, parts: &Parts) -> bool {
        self.parse_token(parts).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(uri: &str, headers: &[(&str, &str)]) -> Parts {
        let mut builder = http::Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_header() {
        let p = parts("/foo", &[("authorization", "Bearer foo.bar.baz")]);
        assert_eq!(AuthHeaders::default().parse(&p).as_deref(), Some("foo.bar.baz"));

        let p = parts("/foo", &[("authorization", "bearer   foo.bar.baz ")]);
        assert_eq!(AuthHeaders::default().parse(&p).as_deref(), Some("foo.bar.baz"));
    }

    #[test]
    fn non_bearer_header_is_ignored() {
        for value in ["Basic Zm9vOmJhcg==", "Bearer", "Bear"] {
            let p = parts("/foo", &[("authorization", value)]);
            assert_eq!(AuthHeaders::default().parse(&p), None);
        }
    }

    #[test]
    fn custom_header_and_prefix() {
        let parser = AuthHeaders::new()
            .header(HeaderName::from_static("x-auth-token"))
            .prefix("Token");
        let p = parts("/foo", &[("x-auth-token", "Token abc.def.ghi")]);
        assert_eq!(parser.parse(&p).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn query_string() {
        let p = parts("/foo?page=2&token=foo.bar.baz", &[]);
        assert_eq!(QueryString::default().parse(&p).as_deref(), Some("foo.bar.baz"));
        assert_eq!(QueryString::new("jwt").parse(&p), None);
        assert_eq!(QueryString::default().parse(&parts("/foo?token=", &[])), None);
    }

    #[test]
    fn cookie() {
        let p = parts("/foo", &[("cookie", "session=abc; token=foo.bar.baz")]);
        assert_eq!(Cookies::default().parse(&p).as_deref(), Some("foo.bar.baz"));
        assert_eq!(Cookies::new("other").parse(&p), None);
    }

    #[test]
    fn encoded_values_are_decoded() {
        let p = parts("/foo?token=foo%2Ebar%2Ebaz", &[("cookie", "token=a%2Eb%2Ec")]);
        assert_eq!(QueryString::default().parse(&p).as_deref(), Some("foo.bar.baz"));
        assert_eq!(Cookies::default().parse(&p).as_deref(), Some("a.b.c"));

        let p = parts("/foo?token=%FF%FE", &[]);
        assert_eq!(QueryString::default().parse(&p), None);
    }

    #[test]
    fn chain_order_decides() {
        let p = parts(
            "/foo?token=from.query.string",
            &[
                ("authorization", "Bearer from.the.header"),
                ("cookie", "token=from.the.cookie"),
            ],
        );
        let mut parser = Parser::default();
        assert_eq!(parser.parse_token(&p).as_deref(), Some("from.the.header"));

        parser.set_chain(vec![Box::new(Cookies::default()), Box::new(QueryString::default())]);
        assert_eq!(parser.chain().len(), 2);
        assert_eq!(parser.parse_token(&p).as_deref(), Some("from.the.cookie"));
    }

    #[test]
    fn no_token_is_none() {
        let parser = Parser::default();
        let p = parts("/foo", &[]);
        assert_eq!(parser.parse_token(&p), None);
        assert!(!parser.has_token(&p));
        assert!(!Parser::new(Vec::new()).has_token(&p));
    }
}
