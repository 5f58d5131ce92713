use reqwest::Client;
use tracing::{debug, error, info};

use crate::cache::token::TokenReply;
use crate::error::{AuthError, TokenAcquisitionError};
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::GRANT_TYPE_CLIENT_CREDENTIALS;

static TRANSPORT_MSG: &str = "transport";
static STATUS_MSG: &str = "status";
static PARSE_MSG: &str = "parse";

/// Performs the OAuth2 `client_credentials` grant against a token endpoint.
#[derive(Debug, Clone)]
pub struct TokenAcquirer {
    client: Client,
}

impl Default for TokenAcquirer {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl TokenAcquirer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// POST `client_id`, `client_secret`, `grant_type` and `scope` form-encoded to
    /// `token_endpoint` and decode the JSON reply.
    pub async fn acquire(
        &self,
        client_id: &str,
        client_secret: &str,
        scope: &str,
        token_endpoint: &str,
    ) -> Result<TokenReply, AuthError> {
        let metrics = get_metrics().await;
        let start = get_instant();
        metrics.token_requests.inc();
        debug!(%client_id, %token_endpoint, "requesting client credentials token");

        let form = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", GRANT_TYPE_CLIENT_CREDENTIALS),
            ("scope", scope),
        ];

        let result = self.send(&form, token_endpoint).await;
        metrics.token_request_duration.observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(_) => info!(%client_id, %token_endpoint, "token acquired"),
            Err(err) => {
                metrics.token_failures.with_label_values(&[failure_reason(err)]).inc();
                error!(%token_endpoint, error = %err, "token acquisition failed");
            }
        }
        result
    }

    async fn send(&self, form: &[(&str, &str)], token_endpoint: &str) -> Result<TokenReply, AuthError> {
        let response = self
            .client
            .post(token_endpoint)
            .form(form)
            .send()
            .await
            .map_err(|source| TokenAcquisitionError::Transport {
                endpoint: token_endpoint.to_owned(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| TokenAcquisitionError::Transport {
            endpoint: token_endpoint.to_owned(),
            source,
        })?;

        if !status.is_success() {
            return Err(TokenAcquisitionError::Status {
                endpoint: token_endpoint.to_owned(),
                status,
                body,
            }
            .into());
        }

        parse_token_reply(token_endpoint, body)
    }
}

fn failure_reason(err: &AuthError) -> &'static str {
    match err {
        AuthError::TokenAcquisition(TokenAcquisitionError::Transport { .. }) => TRANSPORT_MSG,
        AuthError::TokenAcquisition(TokenAcquisitionError::Status { .. }) => STATUS_MSG,
        _ => PARSE_MSG,
    }
}

/// Decode a token endpoint body. A missing or empty `access_token` is a parse failure.
pub fn parse_token_reply(token_endpoint: &str, body: String) -> Result<TokenReply, AuthError> {
    match serde_json::from_str::<TokenReply>(&body) {
        Ok(reply) if reply.access_token.is_empty() => Err(AuthError::TokenParse {
            endpoint: token_endpoint.to_owned(),
            body,
            reason: "access_token is empty".to_owned(),
        }),
        Ok(reply) => Ok(reply),
        Err(err) => Err(AuthError::TokenParse {
            endpoint: token_endpoint.to_owned(),
            body,
            reason: err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failures_keep_the_raw_body() {
        let err = parse_token_reply("http://idp/token", "<html>oops</html>".to_owned()).unwrap_err();
        assert!(matches!(err, AuthError::TokenParse { ref body, .. } if body == "<html>oops</html>"));
        assert!(!err.is_retryable());

        let err = parse_token_reply("http://idp/token", r#"{"access_token":"","expires_in":60}"#.to_owned()).unwrap_err();
        assert!(matches!(err, AuthError::TokenParse { .. }));
    }

    #[test]
    fn parses_well_formed_reply() {
        let reply = parse_token_reply(
            "http://idp/token",
            r#"{"access_token":"abc","token_type":"Bearer","expires_in":"3600"}"#.to_owned(),
        )
        .unwrap();
        assert_eq!(reply.access_token, "abc");
        assert_eq!(reply.token_type, "Bearer");
        assert_eq!(reply.ttl_seconds(), Some(3600));
    }
}
