//! User lookup for the guard methods of [`JwtAuth`](crate::JwtAuth).

use serde_json::{Map, Value};

/// Something a token can be issued for.
pub trait JwtSubject {
    /// Stored as the `sub` claim and handed back to
    /// [`UserProvider::retrieve_by_id`].
    fn jwt_identifier(&self) -> Value;

    /// Extra claims added to every token issued for this subject.
    fn jwt_custom_claims(&self) -> Map<String, Value> {
        Map::new()
    }
}

/// Finds users by id or by credentials and checks their credentials.
pub trait UserProvider {
    type User;

    fn retrieve_by_id(&self, id: &Value) -> Option<Self::User>;

    fn retrieve_by_credentials(&self, credentials: &Map<String, Value>) -> Option<Self::User>;

    fn validate_credentials(&self, user: &Self::User, credentials: &Map<String, Value>) -> bool;
}
