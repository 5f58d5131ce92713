//! Decides which auth material goes on an outgoing request.
//!
//! The strategy only describes headers; it never touches an HTTP client. Basic and
//! api key headers do not change for the lifetime of a service agent, so
//! [`AuthHeaderStrategy::static_headers`] is meant to be evaluated once. Bearer and
//! OAuth client credentials tokens expire or change, and
//! [`AuthHeaderStrategy::request_headers`] must be evaluated for every request.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use http::header::{ACCEPT, AUTHORIZATION};
use http::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::config::services::{redacted, AuthScheme, HttpScheme, ServiceSettings};
use crate::config::settings::Environment;
use crate::error::AuthError;
use crate::headers::auth_context::AuthContext;
use crate::sources::token_helper::TokenHelper;
use crate::utils::constants::{BASIC_PREFIX, BEARER_PREFIX, JSON_MEDIA_TYPE};

#[derive(Clone)]
pub struct AuthHeaderStrategy {
    token_helper: TokenHelper,
    environment: Environment,
    auth_context: Option<Arc<dyn AuthContext>>,
    global_api_key: Option<String>,
}

impl fmt::Debug for AuthHeaderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeaderStrategy")
            .field("token_helper", &self.token_helper)
            .field("environment", &self.environment)
            .field("auth_context", &self.auth_context)
            .field("global_api_key", &redacted(&self.global_api_key))
            .finish()
    }
}

impl AuthHeaderStrategy {
    pub fn new(token_helper: TokenHelper, environment: Environment) -> Self {
        Self {
            token_helper,
            environment,
            auth_context: None,
            global_api_key: None,
        }
    }

    pub fn with_auth_context(mut self, auth_context: Arc<dyn AuthContext>) -> Self {
        self.auth_context = Some(auth_context);
        self
    }

    pub fn with_global_api_key(mut self, global_api_key: Option<String>) -> Self {
        self.global_api_key = global_api_key;
        self
    }

    pub fn token_helper(&self) -> &TokenHelper {
        &self.token_helper
    }

    /// Whether the scheme's credentials may change between requests.
    pub fn is_per_request(scheme: AuthScheme) -> bool {
        matches!(scheme, AuthScheme::Bearer | AuthScheme::OAuthClientCredentials)
    }

    /// Auth headers for `settings`, whatever the scheme.
    pub async fn compute_headers(&self, settings: &ServiceSettings) -> Result<HeaderMap, AuthError> {
        let mut headers = HeaderMap::new();
        match settings.auth_scheme {
            AuthScheme::None => {}
            AuthScheme::Basic => {
                headers.insert(AUTHORIZATION, self.basic_header(settings)?);
            }
            AuthScheme::Bearer => {
                headers.insert(AUTHORIZATION, self.bearer_header()?);
            }
            AuthScheme::OAuthClientCredentials => {
                headers.insert(AUTHORIZATION, self.oauth_header(settings).await?);
            }
            AuthScheme::ApiKey => {
                let (name, value) = self.api_key_header(settings)?;
                headers.insert(name, value);
            }
        }
        debug!(auth_scheme = %settings.auth_scheme, host = %settings.host, headers = headers.len(), "auth headers computed");
        Ok(headers)
    }

    /// Headers fixed for a client's lifetime: `Accept`, Basic / api key auth and the
    /// service's extra headers.
    pub fn static_headers(&self, settings: &ServiceSettings) -> Result<HeaderMap, AuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));

        match settings.auth_scheme {
            AuthScheme::Basic => {
                headers.insert(AUTHORIZATION, self.basic_header(settings)?);
            }
            AuthScheme::ApiKey => {
                let (name, value) = self.api_key_header(settings)?;
                headers.insert(name, value);
            }
            _ => {}
        }

        for (name, value) in &settings.headers {
            headers.append(header_name(name)?, header_value(name, value)?);
        }
        Ok(headers)
    }

    /// Headers re-evaluated on every request. Empty for schemes covered by
    /// [`Self::static_headers`].
    pub async fn request_headers(&self, settings: &ServiceSettings) -> Result<HeaderMap, AuthError> {
        if Self::is_per_request(settings.auth_scheme) {
            self.compute_headers(settings).await
        } else {
            Ok(HeaderMap::new())
        }
    }

    fn basic_header(&self, settings: &ServiceSettings) -> Result<HeaderValue, AuthError> {
        if !self.environment.is_development() && settings.scheme != HttpScheme::Https {
            return Err(AuthError::InsecureScheme {
                host: settings.host.clone(),
                scheme: settings.scheme.to_string(),
            });
        }

        let user_name = match settings.basic_auth_domain.as_deref().filter(|domain| !domain.is_empty()) {
            Some(domain) => format!("{}\\{}", domain, settings.basic_auth_user_name),
            None => settings.basic_auth_user_name.clone(),
        };
        let credentials = format!("{}:{}", user_name, settings.basic_auth_password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
        sensitive_value(AUTHORIZATION.as_str(), format!("{BASIC_PREFIX}{encoded}"))
    }

    fn bearer_header(&self) -> Result<HeaderValue, AuthError> {
        let token = self
            .auth_context
            .as_ref()
            .and_then(|context| context.user_token())
            .ok_or(AuthError::MissingAuthContext)?;
        sensitive_value(AUTHORIZATION.as_str(), format!("{BEARER_PREFIX}{token}"))
    }

    async fn oauth_header(&self, settings: &ServiceSettings) -> Result<HeaderValue, AuthError> {
        let reply = self.token_helper.read_or_retrieve_token(settings, false).await?;
        sensitive_value(AUTHORIZATION.as_str(), format!("{BEARER_PREFIX}{}", reply.access_token))
    }

    fn api_key_header(&self, settings: &ServiceSettings) -> Result<(HeaderName, HeaderValue), AuthError> {
        let source = if settings.use_global_api_key {
            self.global_api_key.as_deref()
        } else {
            settings.api_key.as_deref()
        };
        let key = source
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AuthError::MissingApiKey {
                header: settings.api_key_header_name.clone(),
            })?;

        let name = header_name(&settings.api_key_header_name)?;
        let value = sensitive_value(&settings.api_key_header_name, key.to_owned())?;
        Ok((name, value))
    }
}

fn header_name(name: &str) -> Result<HeaderName, AuthError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|err| AuthError::InvalidHeader {
        name: name.to_owned(),
        reason: err.to_string(),
    })
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value).map_err(|err| AuthError::InvalidHeader {
        name: name.to_owned(),
        reason: err.to_string(),
    })
}

fn sensitive_value(name: &str, value: String) -> Result<HeaderValue, AuthError> {
    let mut value = header_value(name, &value)?;
    value.set_sensitive(true);
    Ok(value)
}
