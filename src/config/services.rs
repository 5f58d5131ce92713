use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::settings::SettingsConfig;
use crate::error::AgentError;
use crate::utils::constants::DEFAULT_API_KEY_HEADER_NAME;

/// ================================
/// Multi-service settings
/// ================================
#[derive(Deserialize, Clone, Default)]
pub struct ServiceAgentSettings {
    #[serde(default)]
    pub settings: SettingsConfig,
    /// key shared by every service with `use_global_api_key`
    #[serde(default)]
    pub global_api_key: Option<String>,
    #[serde(default)]
    pub services: HashMap<String, ServiceSettings>,
}

impl ServiceAgentSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, name: impl Into<String>, settings: ServiceSettings) -> Self {
        self.services.insert(name.into(), settings);
        self
    }

    /// Search service settings by agent name.
    ///
    /// An exact (case-insensitive) key wins; otherwise the first key, in sorted order,
    /// contained in `name` is used (agent `DemoServiceAgent` picks settings `DemoService`).
    pub fn get_service_settings(&self, name: &str) -> Result<&ServiceSettings, AgentError> {
        let lowered = name.to_lowercase();

        if let Some(settings) = self
            .services
            .iter()
            .find(|(key, _)| key.to_lowercase() == lowered)
            .map(|(_, settings)| settings)
        {
            return Ok(settings);
        }

        let mut keys: Vec<&String> = self
            .services
            .keys()
            .filter(|key| lowered.contains(&key.to_lowercase()))
            .collect();
        keys.sort();

        keys.first()
            .and_then(|key| self.services.get(*key))
            .ok_or_else(|| AgentError::SettingsNotFound(name.to_owned()))
    }
}

impl fmt::Debug for ServiceAgentSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAgentSettings")
            .field("settings", &self.settings)
            .field("global_api_key", &redacted(&self.global_api_key))
            .field("services", &self.services)
            .finish()
    }
}

/// ================================
/// Per-service endpoint configuration
/// ================================
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceSettings {
    pub auth_scheme: AuthScheme,
    pub scheme: HttpScheme,
    pub host: String,
    pub port: Option<String>,
    pub path: String,

    // OAuth client credentials
    pub oauth_path_addition: String,
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub oauth_scope: String,

    // Basic
    /// optional Windows domain, sent as `domain\user`
    pub basic_auth_domain: Option<String>,
    pub basic_auth_user_name: String,
    pub basic_auth_password: String,

    // API key
    pub api_key: Option<String>,
    pub api_key_header_name: String,
    pub use_global_api_key: bool,

    /// extra headers added to every request
    pub headers: HashMap<String, String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            auth_scheme: AuthScheme::None,
            scheme: HttpScheme::Https,
            host: String::new(),
            port: None,
            path: String::new(),
            oauth_path_addition: String::new(),
            oauth_client_id: String::new(),
            oauth_client_secret: String::new(),
            oauth_scope: String::new(),
            basic_auth_domain: None,
            basic_auth_user_name: String::new(),
            basic_auth_password: String::new(),
            api_key: None,
            api_key_header_name: DEFAULT_API_KEY_HEADER_NAME.to_owned(),
            use_global_api_key: false,
            headers: HashMap::new(),
        }
    }
}

impl fmt::Debug for ServiceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceSettings")
            .field("auth_scheme", &self.auth_scheme)
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("oauth_path_addition", &self.oauth_path_addition)
            .field("oauth_client_id", &self.oauth_client_id)
            .field("oauth_client_secret", &"***")
            .field("oauth_scope", &self.oauth_scope)
            .field("basic_auth_domain", &self.basic_auth_domain)
            .field("basic_auth_user_name", &self.basic_auth_user_name)
            .field("basic_auth_password", &"***")
            .field("api_key", &redacted(&self.api_key))
            .field("api_key_header_name", &self.api_key_header_name)
            .field("use_global_api_key", &self.use_global_api_key)
            .field("headers", &self.headers)
            .finish()
    }
}

/// `Some("***")` for a configured secret.
pub(crate) fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "***")
}

impl ServiceSettings {
    /// `{scheme}://{host}[:{port}]/{path}[/]`
    pub fn url(&self) -> String {
        let port = self
            .port
            .as_deref()
            .map(str::trim)
            .filter(|port| !port.is_empty())
            .map(|port| format!(":{port}"))
            .unwrap_or_default();
        let trailing = if self.path.trim().is_empty() { "" } else { "/" };
        format!("{}://{}{}/{}{}", self.scheme, self.host, port, self.path, trailing)
    }

    pub fn oauth_token_endpoint(&self) -> String {
        format!("{}{}", self.url(), self.oauth_path_addition)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthScheme {
    #[default]
    None,
    Basic,
    Bearer,
    OAuthClientCredentials,
    ApiKey,
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthScheme::None => "None",
            AuthScheme::Basic => "Basic",
            AuthScheme::Bearer => "Bearer",
            AuthScheme::OAuthClientCredentials => "OAuthClientCredentials",
            AuthScheme::ApiKey => "ApiKey",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum HttpScheme {
    Http,
    #[default]
    Https,
}

impl fmt::Display for HttpScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpScheme::Http => f.write_str("http"),
            HttpScheme::Https => f.write_str("https"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oauth_settings() -> ServiceSettings {
        ServiceSettings {
            scheme: HttpScheme::Http,
            host: "localhost".into(),
            path: "api".into(),
            oauth_path_addition: "oauth/token".into(),
            ..Default::default()
        }
    }

    #[test]
    fn url_and_token_endpoint() {
        let settings = oauth_settings();
        assert_eq!(settings.url(), "http://localhost/api/");
        assert_eq!(settings.oauth_token_endpoint(), "http://localhost/api/oauth/token");

        let with_port = ServiceSettings { port: Some("5001".into()), path: String::new(), ..oauth_settings() };
        assert_eq!(with_port.url(), "http://localhost:5001/");
    }

    #[test]
    fn defaults_match_documented_values() {
        let settings = ServiceSettings::default();
        assert_eq!(settings.auth_scheme, AuthScheme::None);
        assert_eq!(settings.scheme, HttpScheme::Https);
        assert_eq!(settings.api_key_header_name, "ApiKey");
        assert!(!settings.use_global_api_key);
    }

    #[test]
    fn debug_output_hides_credentials() {
        let settings = ServiceSettings {
            oauth_client_id: "client".into(),
            oauth_client_secret: "s3cr3t-oauth".into(),
            basic_auth_password: "s3cr3t-basic".into(),
            api_key: Some("s3cr3t-key".into()),
            ..oauth_settings()
        };
        let mut all = ServiceAgentSettings::new().with_service("Demo", settings.clone());
        all.global_api_key = Some("s3cr3t-global".into());

        let printed = format!("{:?} {:?}", settings, all);
        assert!(!printed.contains("s3cr3t"));
        assert!(printed.contains("client"));
    }

    #[test]
    fn lookup_prefers_exact_key_then_substring() {
        let settings = ServiceAgentSettings::new()
            .with_service("TestAgent", ServiceSettings { host: "exact".into(), ..Default::default() })
            .with_service("Test", ServiceSettings { host: "partial".into(), ..Default::default() });

        assert_eq!(settings.get_service_settings("testagent").unwrap().host, "exact");
        assert_eq!(settings.get_service_settings("OtherTestService").unwrap().host, "partial");
        assert!(matches!(
            settings.get_service_settings("Unknown"),
            Err(AgentError::SettingsNotFound(name)) if name == "Unknown"
        ));
    }
}
