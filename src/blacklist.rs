//! Invalidated-token store.
//!
//! Tokens are blacklisted by `jti`.  An entry is kept until the token could no
//! longer be used or refreshed anyway.  Stale entries are evicted when they
//! are looked up, and the whole store is swept every [`PRUNE_INTERVAL`]
//! insertions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::claims::now;
use crate::error::{AuthError, Result};
use crate::payload::Payload;

/// Insertions between two sweeps of the backing store.
pub const PRUNE_INTERVAL: usize = 64;

/// A blacklisted token id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlacklistEntry {
    /// The token keeps working until this timestamp (the grace period).
    pub valid_until: i64,
    /// When the entry can be forgotten.  `None` keeps it forever.
    pub expires_at: Option<i64>,
}

impl BlacklistEntry {
    pub fn is_stale(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }
}

/// Backing store for the [`Blacklist`].
pub trait BlacklistStorage: Send + Sync {
    fn add(&self, key: &str, entry: BlacklistEntry);
    fn get(&self, key: &str) -> Option<BlacklistEntry>;
    fn remove(&self, key: &str) -> bool;
    fn flush(&self);
    /// Drop entries that are stale at `now`.  Returns how many were removed.
    fn prune(&self, now: i64) -> usize;
}

/// In-process storage.  Shared between requests through the `Arc` inside
/// [`Blacklist`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, BlacklistEntry>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BlacklistStorage for MemoryStorage {
    fn add(&self, key: &str, entry: BlacklistEntry) {
        self.entries.insert(key.to_owned(), entry);
    }

    fn get(&self, key: &str) -> Option<BlacklistEntry> {
        self.entries.get(key).map(|e| *e)
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn flush(&self) {
        self.entries.clear();
    }

    fn prune(&self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_stale(now));
        before.saturating_sub(self.entries.len())
    }
}

#[derive(Clone)]
pub struct Blacklist {
    storage: Arc<dyn BlacklistStorage>,
    grace_period: i64,
    refresh_ttl: i64,
    inserts: Arc<AtomicUsize>,
}

impl std::fmt::Debug for Blacklist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blacklist")
            .field("grace_period", &self.grace_period)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl Blacklist {
    /// `grace_period` is in seconds, `refresh_ttl` in minutes.
    pub fn new(storage: Arc<dyn BlacklistStorage>, grace_period: i64, refresh_ttl: i64) -> Self {
        Self {
            storage,
            grace_period,
            refresh_ttl,
            inserts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn in_memory(grace_period: i64, refresh_ttl: i64) -> Self {
        Self::new(Arc::new(MemoryStorage::new()), grace_period, refresh_ttl)
    }

    pub fn grace_period(&self) -> i64 {
        self.grace_period
    }

    pub fn set_grace_period(&mut self, seconds: i64) -> &mut Self {
        self.grace_period = seconds;
        self
    }

    pub fn set_refresh_ttl(&mut self, minutes: i64) -> &mut Self {
        self.refresh_ttl = minutes;
        self
    }

    pub fn add(&self, payload: &Payload) -> Result<()> {
        self.add_at(payload, now())
    }

    pub fn add_at(&self, payload: &Payload, now: i64) -> Result<()> {
        let key = key(payload)?;

        // Without `exp` the token never expires, so neither does the entry.
        let expires_at = payload.expiration().map(|exp| {
            let refreshable_until = payload
                .issued_at()
                .map(|iat| iat.saturating_add(self.refresh_ttl.saturating_mul(60)))
                .unwrap_or(exp);
            exp.max(refreshable_until)
        });

        self.storage.add(
            key,
            BlacklistEntry {
                valid_until: now.saturating_add(self.grace_period),
                expires_at,
            },
        );
        debug!(jti = key, ?expires_at, "token blacklisted");
        self.sweep(now);
        Ok(())
    }

    /// Blacklist with no expiry and no grace period.
    pub fn add_forever(&self, payload: &Payload) -> Result<()> {
        let key = key(payload)?;
        self.storage.add(
            key,
            BlacklistEntry {
                valid_until: i64::MIN,
                expires_at: None,
            },
        );
        debug!(jti = key, "token blacklisted forever");
        self.sweep(now());
        Ok(())
    }

    pub fn has(&self, payload: &Payload) -> bool {
        self.has_at(payload, now())
    }

    /// True once the grace period of a blacklisted token has passed.  A stale
    /// entry is evicted instead.
    pub fn has_at(&self, payload: &Payload, now: i64) -> bool {
        let Ok(key) = key(payload) else {
            return false;
        };
        match self.storage.get(key) {
            Some(entry) if entry.is_stale(now) => {
                self.storage.remove(key);
                false
            }
            Some(entry) => now >= entry.valid_until,
            None => false,
        }
    }

    pub fn remove(&self, payload: &Payload) -> Result<bool> {
        Ok(self.storage.remove(key(payload)?))
    }

    pub fn clear(&self) {
        self.storage.flush();
    }

    fn sweep(&self, now: i64) {
        let count = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        if count % PRUNE_INTERVAL == 0 {
            let removed = self.storage.prune(now);
            if removed > 0 {
                debug!(removed, "stale blacklist entries pruned");
            }
        }
    }
}

fn key(payload: &Payload) -> Result<&str> {
    payload
        .jwt_id()
        .ok_or_else(|| AuthError::TokenInvalid("payload has no jti claim to blacklist".into()))
}
