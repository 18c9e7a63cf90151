use std::ops::Index;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::claims::{timestamp, Claim};

static NULL: Value = Value::Null;

/// The validated claims of a token, in insertion order.
///
/// Only built by [`Factory::make`](crate::Factory::make) and by
/// [`Manager::decode`](crate::Manager::decode), both of which run the claims
/// through the payload validator first.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    claims: Vec<Claim>,
}

impl Payload {
    pub(crate) fn new(claims: Vec<Claim>) -> Self {
        Self { claims }
    }

    /// Look up a claim by name, or by a dotted path into a nested value.
    ///
    /// An exact name match wins, so a custom claim literally named `a.b` is
    /// still reachable.  Path segments index into objects by key and into
    /// arrays by position.
    ///
    /// ```rust
    /// # use jwt_auth_bridge::{Factory, JwtConfig};
    /// # use serde_json::json;
    /// let mut factory = Factory::new(&JwtConfig::new("secret"));
    /// let payload = factory.sub(1).claim("foo", json!({"bar": [0, 0, 0]})).make().unwrap();
    /// assert_eq!(payload.get("foo.bar"), Some(&json!([0, 0, 0])));
    /// ```
    pub fn get(&self, path: &str) -> Option<&Value> {
        if let Some(claim) = self.claim(path) {
            return Some(claim.value());
        }

        let mut segments = path.split('.');
        let mut current = self.claim(segments.next()?)?.value();
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn claim(&self, name: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.name() == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.claim(name).is_some()
    }

    /// The subject as a string, whether it was issued as a number or a string.
    pub fn subject(&self) -> Option<String> {
        match self.get("sub")? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn jwt_id(&self) -> Option<&str> {
        self.get("jti")?.as_str()
    }

    pub fn issued_at(&self) -> Option<i64> {
        timestamp(self.get("iat")?)
    }

    pub fn expiration(&self) -> Option<i64> {
        timestamp(self.get("exp")?)
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// The name → value mapping handed to the signer.
    pub fn to_map(&self) -> Map<String, Value> {
        self.claims
            .iter()
            .map(|c| (c.name().to_owned(), c.value().clone()))
            .collect()
    }
}

impl Index<&str> for Payload {
    type Output = Value;

    /// Same lookup as [`Payload::get`]; absent claims read as `null`.
    fn index(&self, path: &str) -> &Value {
        self.get(path).unwrap_or(&NULL)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = s.serialize_map(Some(self.claims.len()))?;
        for claim in &self.claims {
            map.serialize_entry(claim.name(), claim.value())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::ClaimFactory;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn payload(pairs: &[(&str, Value)]) -> Payload {
        let factory = ClaimFactory::new();
        Payload::new(
            pairs
                .iter()
                .map(|(name, value)| factory.get_at(name, value.clone(), NOW).unwrap())
                .collect(),
        )
    }

    #[test]
    fn get_and_index_agree() {
        let p = payload(&[("sub", json!(1)), ("iat", json!(NOW))]);
        assert_eq!(p.get("sub"), Some(&json!(1)));
        assert_eq!(&p["sub"], &json!(1));
        assert_eq!(p.issued_at(), Some(NOW));
    }

    #[test]
    fn missing_claim_indexes_as_null() {
        let p = payload(&[("sub", json!(1))]);
        assert_eq!(p.get("exp"), None);
        assert!(p["exp"].is_null());
    }

    #[test]
    fn dotted_path_reaches_nested_values() {
        let p = payload(&[("foo", json!({"bar": [0, 0, 0], "baz": {"qux": "deep"}}))]);
        assert_eq!(p.get("foo.bar"), Some(&json!([0, 0, 0])));
        assert_eq!(p.get("foo.bar.1"), Some(&json!(0)));
        assert_eq!(p.get("foo.baz.qux"), Some(&json!("deep")));
        assert_eq!(p.get("foo.nope"), None);
        assert_eq!(p.get("foo.bar.9"), None);
    }

    #[test]
    fn exact_name_beats_path() {
        let p = payload(&[("a.b", json!("flat")), ("a", json!({"b": "nested"}))]);
        assert_eq!(p.get("a.b"), Some(&json!("flat")));
    }

    #[test]
    fn keeps_insertion_order() {
        let p = payload(&[("sub", json!(1)), ("iss", json!("x")), ("foo", json!("bar"))]);
        let names: Vec<_> = p.to_map().keys().cloned().collect();
        assert_eq!(names, ["sub", "iss", "foo"]);
        assert_eq!(
            serde_json::to_string(&p).unwrap(),
            r#"{"sub":1,"iss":"x","foo":"bar"}"#
        );
    }

    #[test]
    fn numeric_subject_reads_as_string() {
        assert_eq!(payload(&[("sub", json!(42))]).subject().as_deref(), Some("42"));
        assert_eq!(payload(&[("sub", json!("42"))]).subject().as_deref(), Some("42"));
    }
}
