use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use parking_lot::RwLock;
use tracing::debug;

use super::principal::Principal;
use crate::error::{AppError, AppResult};

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub token: SessionToken,
    pub principal: Principal,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

#[derive(Debug, Default)]
struct SessionTables {
    by_token: HashMap<SessionToken, Session>,
    user_index: HashMap<u64, HashSet<SessionToken>>,
}

impl SessionTables {
    fn forget(&mut self, token: &str) -> Option<Session> {
        let s = self.by_token.remove(token)?;
        if let Some(set) = self.user_index.get_mut(&s.principal.user_id) {
            set.remove(token);
            if set.is_empty() { self.user_index.remove(&s.principal.user_id); }
        }
        Some(s)
    }
}

fn gen_id() -> AppResult<String> { id_from(getrandom::getrandom) }

// 256 random bits, base64url without padding
fn id_from(fill: impl FnOnce(&mut [u8]) -> Result<(), getrandom::Error>) -> AppResult<String> {
    let mut buf = [0u8; 32];
    fill(&mut buf).map_err(|e| AppError::Internal { code: "rng_unavailable".into(), message: e.to_string() })?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Issues and validates opaque session tokens. Cloning shares the tables.
#[derive(Debug, Clone)]
pub struct SessionManager {
    pub ttl: Duration,
    tables: Arc<RwLock<SessionTables>>,
}

impl Default for SessionManager {
    fn default() -> Self { Self::with_ttl(Duration::from_secs(60 * 60)) }
}

impl SessionManager {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl, tables: Arc::new(RwLock::new(SessionTables::default())) }
    }

    /// Fails only when the system RNG is unavailable.
    pub fn issue(&self, principal: Principal) -> AppResult<Session> {
        let now = Instant::now();
        let sess = Session {
            session_id: gen_id()?,
            token: gen_id()?,
            principal,
            issued_at: now,
            expires_at: now + self.ttl,
        };
        {
            let mut t = self.tables.write();
            t.user_index.entry(sess.principal.user_id).or_default().insert(sess.token.clone());
            t.by_token.insert(sess.token.clone(), sess.clone());
        }
        debug!(target: "session", user_id = sess.principal.user_id, sid = %sess.session_id, ttl_secs = self.ttl.as_secs(), "session.issue");
        Ok(sess)
    }

    pub fn validate(&self, token: &str) -> Option<Principal> {
        let now = Instant::now();
        {
            let t = self.tables.read();
            match t.by_token.get(token) {
                Some(s) if s.expires_at > now => return Some(s.principal.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // expired: drop it
        self.tables.write().forget(token);
        None
    }

    pub fn logout(&self, token: &str) -> bool {
        self.tables.write().forget(token).is_some()
    }

    pub fn revoke_user(&self, user_id: u64) -> usize {
        let mut t = self.tables.write();
        let tokens = t.user_index.remove(&user_id).unwrap_or_default();
        let mut count = 0usize;
        for tok in tokens {
            if t.by_token.remove(&tok).is_some() { count += 1; }
        }
        debug!(target: "session", user_id, count, "session.revoke");
        count
    }

    pub fn active_count(&self) -> usize { self.tables.read().by_token.len() }
}
