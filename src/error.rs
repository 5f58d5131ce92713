//! Error taxonomy.
//!
//! [`AuthError`] covers token acquisition and header construction, [`AgentError`] the
//! calls a [`ServiceAgent`](crate::agent::service_agent::ServiceAgent) makes on behalf of
//! the application. Nothing in this crate retries; callers decide.

use http::StatusCode;
use thiserror::Error;

use crate::agent::error_body::ErrorBody;

/// Failure to obtain a reply from the token endpoint.
#[derive(Debug, Error)]
pub enum TokenAcquisitionError {
    #[error("token request to '{endpoint}' failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("token endpoint '{endpoint}' responded with {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
}

impl TokenAcquisitionError {
    pub fn endpoint(&self) -> &str {
        match self {
            TokenAcquisitionError::Transport { endpoint, .. } => endpoint,
            TokenAcquisitionError::Status { endpoint, .. } => endpoint,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    TokenAcquisition(#[from] TokenAcquisitionError),

    #[error("unable to parse token response from '{endpoint}': {reason}")]
    TokenParse {
        endpoint: String,
        body: String,
        reason: String,
    },

    #[error("Failed to set Basic Authentication header on service agent for host: '{host}', the actual scheme is '{scheme}' and should be 'https'!")]
    InsecureScheme { host: String, scheme: String },

    #[error("no auth context available to read the user token from")]
    MissingAuthContext,

    #[error("api key for header '{header}' is not configured")]
    MissingApiKey { header: String },

    #[error("invalid value for header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
}

impl AuthError {
    /// Only token endpoint failures may succeed on a later attempt;
    /// everything else is a configuration problem.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::TokenAcquisition(_))
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Settings not found for service agent {0}")]
    SettingsNotFound(String),

    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unable to build http client for '{service}': {source}")]
    Client {
        service: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to '{url}' failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{}", .0.title)]
    NotFound(ErrorBody),

    #[error("{}", .0.title)]
    Validation(ErrorBody),

    #[error("{}", .0.title)]
    Unauthorized(ErrorBody),

    #[error("{}", .0.title)]
    Forbidden(ErrorBody),

    #[error("{}", .0.title)]
    BadGateway(ErrorBody),

    #[error("{}", .0.title)]
    GatewayTimeout(ErrorBody),

    #[error("service responded with {status}: {}", .body.title)]
    Status { status: StatusCode, body: ErrorBody },

    #[error("unable to deserialize response: {source}")]
    Deserialize {
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

impl AgentError {
    /// Error body returned by the remote service, for status errors.
    pub fn error_body(&self) -> Option<&ErrorBody> {
        match self {
            AgentError::NotFound(body)
            | AgentError::Validation(body)
            | AgentError::Unauthorized(body)
            | AgentError::Forbidden(body)
            | AgentError::BadGateway(body)
            | AgentError::GatewayTimeout(body)
            | AgentError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}
