use crate::cache::token::TokenReply;

/// Cache entry: the token reply and the absolute time it goes stale.
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub reply: TokenReply,
    /// unix seconds
    pub stored_at: i64,
    /// unix seconds, `stored_at + ttl`
    pub expires_at: i64,
}

impl CachedToken {
    pub fn new(reply: TokenReply, stored_at: i64, ttl_seconds: u64) -> Self {
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        Self {
            reply,
            stored_at,
            expires_at: stored_at.saturating_add(ttl),
        }
    }

    /// Stale at and after `expires_at`.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_exactly_after_ttl() {
        let token = CachedToken::new(TokenReply::new("abc", "Bearer", None), 1_000, 60);
        assert_eq!(token.expires_at, 1_060);
        assert!(!token.is_expired(1_059));
        assert!(token.is_expired(1_060));
    }

    #[test]
    fn huge_ttl_does_not_overflow() {
        let token = CachedToken::new(TokenReply::new("abc", "Bearer", None), 1_000, u64::MAX);
        assert_eq!(token.expires_at, i64::MAX);
    }
}
