use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Token response of an OAuth2 token endpoint.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenReply {
    pub access_token: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<ExpiresIn>,
}

/// `expires_in` as sent by the authorization server: a JSON number, a numeric string,
/// or something else entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpiresIn {
    Seconds(i64),
    Text(String),
    Other(Value),
}

impl TokenReply {
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>, expires_in: Option<ExpiresIn>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in,
        }
    }

    /// TTL in seconds, when `expires_in` is a positive integer.
    /// `None` means the reply must not be cached.
    pub fn ttl_seconds(&self) -> Option<u64> {
        self.expires_in.as_ref().and_then(ExpiresIn::as_seconds)
    }
}

impl fmt::Debug for TokenReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenReply")
            .field("access_token", &"***")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// `token_type: null` reads as an empty token type.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ExpiresIn {
    pub fn as_seconds(&self) -> Option<u64> {
        let secs = match self {
            ExpiresIn::Seconds(secs) => Some(*secs),
            ExpiresIn::Text(text) => text.trim().parse::<i64>().ok(),
            ExpiresIn::Other(_) => None,
        }?;
        u64::try_from(secs).ok().filter(|secs| *secs > 0)
    }
}
