// Session registry - Bearer tokens mapped onto one shared manager per user
use crate::application::reading_manager::ReadingManager;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub type SharedManager = Arc<Mutex<ReadingManager>>;

/// Oldest tokens of a user are dropped beyond this many.
pub const MAX_TOKENS_PER_USER: usize = 8;

struct Token {
    username: String,
    issued: Instant,
    serial: u64,
}

#[derive(Default)]
struct Sessions {
    next_serial: u64,
    tokens: HashMap<Uuid, Token>,
    managers: HashMap<String, SharedManager>,
}

impl Sessions {
    fn prune(&mut self, ttl: Duration, now: Instant) {
        let expired: Vec<Uuid> = self
            .tokens
            .iter()
            .filter(|(_, token)| now.duration_since(token.issued) >= ttl)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            self.remove(&id);
        }
    }

    fn remove(&mut self, id: &Uuid) -> bool {
        let Some(token) = self.tokens.remove(id) else {
            return false;
        };
        if !self.tokens.values().any(|t| t.username == token.username) {
            self.managers.remove(&token.username);
            tracing::debug!("Released reading manager of user {}", token.username);
        }
        true
    }

    fn enforce_cap(&mut self, username: &str) {
        let mut owned: Vec<(Uuid, u64)> = self
            .tokens
            .iter()
            .filter(|(_, token)| token.username == username)
            .map(|(id, token)| (*id, token.serial))
            .collect();
        if owned.len() <= MAX_TOKENS_PER_USER {
            return;
        }
        owned.sort_by_key(|(_, serial)| *serial);
        for (id, _) in owned.iter().take(owned.len() - MAX_TOKENS_PER_USER) {
            self.tokens.remove(id);
        }
    }
}

/// All tokens of one user share a single manager, so every session sees and
/// writes the same in-memory list.
pub struct SessionRegistry {
    ttl: Duration,
    inner: Mutex<Sessions>,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(Sessions::default()),
        }
    }

    /// Issues a token for `username`. The user's manager is reused when one
    /// is live, otherwise `open_manager` builds it.
    pub fn open<E>(
        &self,
        username: &str,
        open_manager: impl FnOnce() -> Result<ReadingManager, E>,
    ) -> Result<Uuid, E> {
        let now = Instant::now();
        let mut sessions = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.prune(self.ttl, now);

        if !sessions.managers.contains_key(username) {
            let manager = open_manager()?;
            tracing::debug!("Loaded reading manager for user {}", manager.username());
            sessions
                .managers
                .insert(username.to_string(), Arc::new(Mutex::new(manager)));
        }

        let token = Uuid::new_v4();
        let serial = sessions.next_serial;
        sessions.next_serial += 1;
        sessions.tokens.insert(
            token,
            Token {
                username: username.to_string(),
                issued: now,
                serial,
            },
        );
        sessions.enforce_cap(username);
        Ok(token)
    }

    /// Resolves a live token. Expired tokens are dropped on the way.
    pub fn get(&self, token: &Uuid) -> Option<SharedManager> {
        let mut sessions = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.prune(self.ttl, Instant::now());
        let username = &sessions.tokens.get(token)?.username;
        sessions.managers.get(username).cloned()
    }

    /// Drops the token, and the manager once its user has no tokens left.
    /// The manager has nothing to flush.
    pub fn close(&self, token: &Uuid) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
    }

    /// Number of live tokens.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tokens
            .len()
    }

    /// Number of users with a loaded manager.
    pub fn users(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .managers
            .len()
    }
}
