use tracing::{debug, warn};

use crate::cache::token::TokenReply;
use crate::cache::token_cache::{TokenCache, TokenCacheKey};
use crate::config::services::ServiceSettings;
use crate::error::AuthError;
use crate::observability::metrics::get_metrics;
use crate::sources::oauth2::TokenAcquirer;

/// Read-or-retrieve access to client credentials tokens.
///
/// Concurrent callers that miss the cache each run their own acquisition; there is
/// no single-flight guard, so a cold cache under load can cause redundant grants.
/// No lock is held while the token endpoint is called.
#[derive(Debug, Clone, Default)]
pub struct TokenHelper {
    cache: TokenCache,
    acquirer: TokenAcquirer,
}

impl TokenHelper {
    pub fn new(cache: TokenCache, acquirer: TokenAcquirer) -> Self {
        Self { cache, acquirer }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Return the cached token for the service's client credentials, or fetch a new one.
    ///
    /// With `force_new_retrieval` the cache is skipped and the fresh token replaces the
    /// cached entry. A token whose `expires_in` is not an integer is returned but never cached.
    /// Acquisition errors are returned as they are.
    pub async fn read_or_retrieve_token(
        &self,
        settings: &ServiceSettings,
        force_new_retrieval: bool,
    ) -> Result<TokenReply, AuthError> {
        let metrics = get_metrics().await;
        let key = TokenCacheKey::from_settings(settings);

        if !force_new_retrieval {
            if let Some(reply) = self.cache.get(&key).await {
                debug!(client_id = %key.client_id(), "token served from cache");
                metrics.token_cache_hits.inc();
                return Ok(reply);
            }
        }
        metrics.token_cache_misses.inc();

        let reply = self
            .acquirer
            .acquire(key.client_id(), key.client_secret(), key.scope(), key.token_endpoint())
            .await?;

        match reply.ttl_seconds() {
            Some(ttl) => self.cache.set(key, reply.clone(), ttl).await,
            None => warn!(
                client_id = %key.client_id(),
                expires_in = ?reply.expires_in,
                "expires_in is not a positive integer, token not cached"
            ),
        }

        Ok(reply)
    }
}
