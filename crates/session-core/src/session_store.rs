//! Persistent client-to-user session binding.
//!
//! A client id (opaque, chosen by the client software) maps to the user
//! it last authenticated as, together with an opaque session token. A
//! client reconnecting within the lifetime window may re-present the
//! token as its password and skip directory interaction.
//!
//! The map is serialized to one JSON file on every mutation
//! (overwrite-then-rename) and re-ingested on startup. Persistence
//! failures are logged; in-memory state proceeds and the next mutation
//! retries the write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use voxloop_infra_common::time::now_usecs;

/// Default lifetime: one hour, in microseconds.
pub const DEFAULT_MAX_LIFETIME_USEC: u64 = 3_600_000_000;

/// File name inside the configured directory.
pub const SESSIONS_FILE: &str = "sessions.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub last_update: u64,
    pub id: Uuid,
    pub client: String,
    pub user: String,
}

#[derive(Debug)]
pub struct UserSessionStore {
    path: Option<PathBuf>,
    max_lifetime_usec: u64,
    sessions: HashMap<String, UserSession>,
}

impl UserSessionStore {
    /// Create a store persisting into `dir` (pass `None` for a purely
    /// in-memory store). Existing state is re-ingested; unknown fields in
    /// the file are tolerated.
    pub fn new(dir: Option<&Path>, max_lifetime_usec: u64) -> Self {
        let mut store = Self {
            path: dir.map(|d| d.join(SESSIONS_FILE)),
            max_lifetime_usec: if max_lifetime_usec == 0 {
                DEFAULT_MAX_LIFETIME_USEC
            } else {
                max_lifetime_usec
            },
            sessions: HashMap::new(),
        };
        store.load();
        store
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Mint a fresh session token for `client` as `user`.
    pub fn init(&mut self, client: &str, user: &str) -> Uuid {
        let token = Uuid::new_v4();
        self.sessions.insert(
            client.to_string(),
            UserSession {
                last_update: now_usecs(),
                id: token,
                client: client.to_string(),
                user: user.to_string(),
            },
        );
        self.save();
        token
    }

    /// Refresh `last_update` iff `(user, token)` match the stored record.
    pub fn update(&mut self, client: &str, user: &str, token: &str) -> bool {
        let Some(session) = self.sessions.get_mut(client) else {
            return false;
        };
        if session.user != user || !token_matches(session.id, token) {
            return false;
        }
        session.last_update = now_usecs();
        self.save();
        true
    }

    /// True iff `(user, token)` match the stored record for `client`.
    pub fn verify(&self, client: &str, user: &str, token: &str) -> bool {
        self.sessions
            .get(client)
            .map(|s| s.user == user && token_matches(s.id, token))
            .unwrap_or(false)
    }

    /// The user `client` last authenticated as.
    pub fn user_of(&self, client: &str) -> Option<&str> {
        self.sessions.get(client).map(|s| s.user.as_str())
    }

    pub fn delete(&mut self, client: &str) -> bool {
        let removed = self.sessions.remove(client).is_some();
        self.save();
        removed
    }

    /// Evict records older than the lifetime. Returns the eviction count.
    pub fn evict_expired(&mut self, now_usec: u64) -> usize {
        let max_lifetime = self.max_lifetime_usec;
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| now_usec.saturating_sub(s.last_update) <= max_lifetime);
        let evicted = before - self.sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, "evicted expired user sessions");
            self.save();
        }
        evicted
    }

    fn load(&mut self) {
        let Some(path) = &self.path else {
            return;
        };
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to read sessions file");
                return;
            }
        };
        match serde_json::from_slice::<HashMap<String, UserSession>>(&data) {
            Ok(sessions) => {
                tracing::info!(count = sessions.len(), "re-ingested persisted sessions");
                self.sessions = sessions;
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to parse sessions file");
            }
        }
    }

    fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = self.try_save(path) {
            tracing::error!(path = %path.display(), error = %e, "failed to persist sessions");
        }
    }

    fn try_save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_vec_pretty(&self.sessions)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, path)
    }
}

fn token_matches(stored: Uuid, presented: &str) -> bool {
    Uuid::parse_str(presented)
        .map(|t| t == stored)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> UserSessionStore {
        UserSessionStore::new(None, 0)
    }

    #[test]
    fn init_verify_cycle() {
        let mut store = memory_store();
        let token = store.init("client-1", "alice");

        assert!(store.verify("client-1", "alice", &token.to_string()));
        assert!(!store.verify("client-1", "bob", &token.to_string()));
        assert!(!store.verify("client-1", "alice", &Uuid::new_v4().to_string()));
        assert!(!store.verify("client-2", "alice", &token.to_string()));
        assert_eq!(store.user_of("client-1"), Some("alice"));
    }

    #[test]
    fn update_requires_matching_pair() {
        let mut store = memory_store();
        let token = store.init("client-1", "alice");

        assert!(store.update("client-1", "alice", &token.to_string()));
        assert!(!store.update("client-1", "bob", &token.to_string()));
        assert!(!store.update("client-1", "alice", "not-a-token"));
        assert!(!store.update("unknown", "alice", &token.to_string()));
    }

    #[test]
    fn eviction_respects_lifetime() {
        let mut store = memory_store();
        store.init("client-1", "alice");
        let now = now_usecs();

        assert_eq!(store.evict_expired(now + DEFAULT_MAX_LIFETIME_USEC / 2), 0);
        assert_eq!(store.len(), 1);

        assert_eq!(store.evict_expired(now + DEFAULT_MAX_LIFETIME_USEC + 1), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn relogin_after_init_replaces_token() {
        let mut store = memory_store();
        let first = store.init("client-1", "alice");
        let second = store.init("client-1", "alice");
        assert_ne!(first, second);
        assert!(!store.verify("client-1", "alice", &first.to_string()));
        assert!(store.verify("client-1", "alice", &second.to_string()));
    }
}
