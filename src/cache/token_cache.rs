use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::token::TokenReply;
use crate::cache::token_context::CachedToken;
use crate::config::services::ServiceSettings;
use crate::helpers::time::{system_clock, Clock};
use crate::observability::metrics::get_metrics;

/// Identity of a cached token: one entry per (client id, client secret, scope, token endpoint).
///
/// Fields are kept apart instead of being concatenated, so tuples whose field boundaries
/// shift (`"ab" + "c"` vs `"a" + "bc"`) never share an entry.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TokenCacheKey {
    client_id: String,
    client_secret: String,
    scope: String,
    token_endpoint: String,
}

impl TokenCacheKey {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: impl Into<String>,
        token_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: scope.into(),
            token_endpoint: token_endpoint.into(),
        }
    }

    pub fn from_settings(settings: &ServiceSettings) -> Self {
        Self::new(
            settings.oauth_client_id.as_str(),
            settings.oauth_client_secret.as_str(),
            settings.oauth_scope.as_str(),
            settings.oauth_token_endpoint(),
        )
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }
}

impl fmt::Debug for TokenCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCacheKey")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("scope", &self.scope)
            .field("token_endpoint", &self.token_endpoint)
            .finish()
    }
}

/// Expiring token store shared by every in-flight request.
#[derive(Debug, Clone)]
pub struct TokenCache {
    inner: Arc<RwLock<HashMap<TokenCacheKey, CachedToken>>>,
    clock: Arc<dyn Clock>,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCache {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Get token if it exists and is not expired
    pub async fn get(&self, key: &TokenCacheKey) -> Option<TokenReply> {
        let now = self.clock.now_unix();
        let map = self.inner.read().await;
        map.get(key)
            .filter(|cached| !cached.is_expired(now))
            .map(|cached| cached.reply.clone())
    }

    /// Store or replace the token for `key`; it goes stale `ttl_seconds` from now.
    pub async fn set(&self, key: TokenCacheKey, reply: TokenReply, ttl_seconds: u64) {
        let now = self.clock.now_unix();
        let cached = CachedToken::new(reply, now, ttl_seconds);
        debug!(client_id = %key.client_id, expires_at = cached.expires_at, "caching token");

        let live = {
            let mut map = self.inner.write().await;
            map.retain(|_, entry| !entry.is_expired(now));
            map.insert(key, cached);
            map.len()
        };
        get_metrics().await.cached_tokens.set(live as i64);
    }

    /// Drop every entry that went stale, returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now_unix();
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, entry| !entry.is_expired(now));
        before - map.len()
    }

    /// Number of live (not expired) entries.
    pub async fn len(&self) -> usize {
        let now = self.clock.now_unix();
        self.inner
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
