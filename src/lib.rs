//! # jwt-auth-bridge
//!
//! Issue, decode and validate JWTs with the claim rules of Laravel's
//! `tymon/jwt-auth`, so tokens can move between a PHP application and Rust
//! services sharing the same secret.
//!
//! ## Issuing
//!
//! ```rust
//! use jwt_auth_bridge::{JwtConfig, Manager};
//!
//! let manager = Manager::new(&JwtConfig::new("secret")).unwrap();
//! let payload = manager.factory().sub(42).claim("role", "admin").make().unwrap();
//! let token = manager.encode(&payload).unwrap();
//!
//! let decoded = manager.decode(&token).unwrap();
//! assert_eq!(decoded["role"], "admin");
//! ```
//!
//! ## Validation rules
//!
//! [`PayloadValidator`] checks, in order and failing on the first violation:
//! required claims, `exp` (plus leeway) has not passed, `nbf` and `iat` are
//! not in the future.  In [`ValidationMode::RefreshFlow`] only the refresh
//! window `iat + refresh_ttl` is checked, which lets an expired token be
//! exchanged through [`Manager::refresh`].
//!
//! ## Environment variables (`JwtConfig::from_env`)
//!
//! This crate does **not** load `.env` files.  See [`JwtConfig::from_env`]
//! for the variables read; only `JWT_SECRET` is required.

pub mod auth;
pub mod blacklist;
pub mod claims;
pub mod config;
pub mod error;
pub mod factory;
pub mod manager;
pub mod parser;
pub mod payload;
pub mod provider;
pub mod token;
pub mod user;
pub mod validators;

pub use auth::JwtAuth;
pub use blacklist::{Blacklist, BlacklistEntry, BlacklistStorage, MemoryStorage};
pub use claims::{Claim, ClaimFactory, ClaimKind};
pub use config::JwtConfig;
pub use error::{AuthError, Result};
pub use factory::{Factory, DEFAULT_CLAIMS};
pub use manager::Manager;
pub use parser::{AuthHeaders, Cookies, Parser, QueryString, TokenParser};
pub use payload::Payload;
pub use provider::{JsonWebTokenProvider, JwtProvider};
pub use token::{generate_jti, generate_secret, Token};
pub use user::{JwtSubject, UserProvider};
pub use validators::{PayloadValidator, TokenValidator, ValidationMode, DEFAULT_REQUIRED_CLAIMS};
