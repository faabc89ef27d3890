//! In-memory session token store.

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use vidbot_models::{SearchCandidate, SessionToken};

use crate::error::{SessionError, SessionResult};

/// Random bytes per token (128 bits).
const TOKEN_BYTES: usize = 16;

/// Longest accepted lifetime (one year).
const MAX_TTL_SECONDS: u64 = 365 * 24 * 3600;

fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Issues and resolves time-boxed session tokens.
///
/// Expiry is checked on every read, so an expired token is never returned
/// even if it has not been purged yet.
#[derive(Default)]
pub struct SessionStore {
    tokens: RwLock<HashMap<String, SessionToken>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token for a query, valid for `ttl_seconds`.
    ///
    /// Expired tokens are purged first.
    pub async fn issue(
        &self,
        query_text: &str,
        query_norm: &str,
        ttl_seconds: u64,
    ) -> SessionToken {
        let now = Utc::now();
        let mut tokens = self.tokens.write().await;

        let purged = Self::purge_locked(&mut tokens, now);
        if purged > 0 {
            debug!(purged, "Purged expired session tokens");
        }

        let mut token = generate_token();
        while tokens.contains_key(&token) {
            token = generate_token();
        }

        let ttl = Duration::seconds(ttl_seconds.min(MAX_TTL_SECONDS) as i64);
        let session = SessionToken {
            token: token.clone(),
            query_text: query_text.to_string(),
            query_norm: query_norm.to_string(),
            created_at: now,
            expires_at: now + ttl,
            candidates: Vec::new(),
        };
        tokens.insert(token, session.clone());

        session
    }

    /// Replace the candidate list stored under `token`.
    pub async fn attach_candidates(
        &self,
        token: &str,
        candidates: Vec<SearchCandidate>,
    ) -> SessionResult<()> {
        let now = Utc::now();
        let mut tokens = self.tokens.write().await;
        let session = tokens
            .get_mut(token)
            .ok_or_else(|| SessionError::not_found(token))?;
        if session.is_expired_at(now) {
            return Err(SessionError::expired(token));
        }
        session.candidates = candidates;
        Ok(())
    }

    /// Resolve a token.
    pub async fn resolve(&self, token: &str) -> SessionResult<SessionToken> {
        self.resolve_at(token, Utc::now()).await
    }

    /// Resolve a token as of `now`.
    pub async fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> SessionResult<SessionToken> {
        let tokens = self.tokens.read().await;
        match tokens.get(token) {
            Some(session) if session.is_expired_at(now) => Err(SessionError::expired(token)),
            Some(session) => Ok(session.clone()),
            None => Err(SessionError::not_found(token)),
        }
    }

    /// Candidates stored under `token`, ordered by rank.
    pub async fn candidates(&self, token: &str) -> SessionResult<Vec<SearchCandidate>> {
        let mut candidates = self.resolve(token).await?.candidates;
        candidates.sort_by_key(|c| c.rank);
        Ok(candidates)
    }

    /// Remove every token with `expires_at <= now`. Returns how many were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut tokens = self.tokens.write().await;
        Self::purge_locked(&mut tokens, now)
    }

    /// Number of stored tokens, expired or not.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }

    fn purge_locked(tokens: &mut HashMap<String, SessionToken>, now: DateTime<Utc>) -> usize {
        let before = tokens.len();
        tokens.retain(|_, session| !session.is_expired_at(now));
        before - tokens.len()
    }
}
