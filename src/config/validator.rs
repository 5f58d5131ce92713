//! Settings validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks that every service carries the fields its auth scheme needs

use crate::config::services::{AuthScheme, ServiceAgentSettings, ServiceSettings};

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_settings(settings: &ServiceAgentSettings) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    if let Some(logging) = &settings.settings.logging {
        let allowed = ["trace", "debug", "info", "warn", "error"];
        if !allowed.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' must be one of {:?}",
                logging.level, allowed
            ));
        }
    }

    if settings.settings.timeout_ms == Some(0) {
        errors.push("settings.timeout_ms must be greater than 0".to_string());
    }

    let mut names: Vec<&String> = settings.services.keys().collect();
    names.sort();
    for name in names {
        if let Some(service) = settings.services.get(name) {
            validate_service(name, service, settings.global_api_key.as_deref(), &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_service(name: &str, service: &ServiceSettings, global_api_key: Option<&str>, errors: &mut Vec<String>) {
    if service.host.trim().is_empty() {
        errors.push(format!("services['{}'].host must not be empty", name));
    }

    if let Some(port) = service.port.as_deref().map(str::trim).filter(|port| !port.is_empty()) {
        if port.parse::<u16>().is_err() {
            errors.push(format!("services['{}'].port '{}' is not a valid port", name, port));
        }
    }

    let require = |errors: &mut Vec<String>, field: &str, value: &str| {
        if value.trim().is_empty() {
            errors.push(format!(
                "services['{}'].{} is required for auth_scheme {}",
                name, field, service.auth_scheme
            ));
        }
    };

    match service.auth_scheme {
        AuthScheme::None | AuthScheme::Bearer => {}
        AuthScheme::OAuthClientCredentials => {
            require(errors, "oauth_client_id", &service.oauth_client_id);
            require(errors, "oauth_client_secret", &service.oauth_client_secret);
            require(errors, "oauth_path_addition", &service.oauth_path_addition);
        }
        AuthScheme::Basic => {
            require(errors, "basic_auth_user_name", &service.basic_auth_user_name);
        }
        AuthScheme::ApiKey => {
            require(errors, "api_key_header_name", &service.api_key_header_name);
            if service.use_global_api_key {
                if global_api_key.map(str::trim).unwrap_or_default().is_empty() {
                    errors.push(format!(
                        "services['{}'].use_global_api_key is set but global_api_key is empty",
                        name
                    ));
                }
            } else {
                require(errors, "api_key", service.api_key.as_deref().unwrap_or_default());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{LogFormat, LoggingConfig};

    fn service(auth_scheme: AuthScheme) -> ServiceSettings {
        ServiceSettings {
            auth_scheme,
            host: "localhost".into(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_settings_pass() {
        let settings = ServiceAgentSettings::new()
            .with_service("Open", service(AuthScheme::None))
            .with_service("User", service(AuthScheme::Bearer));
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn api_key_sources_are_checked() {
        let mut global = service(AuthScheme::ApiKey);
        global.use_global_api_key = true;
        let settings = ServiceAgentSettings::new()
            .with_service("Global", global)
            .with_service("Local", service(AuthScheme::ApiKey));

        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("Global"));
        assert!(errors[1].contains("services['Local'].api_key"));
    }

    #[test]
    fn bad_port_basic_user_and_log_level_are_reported() {
        let mut basic = service(AuthScheme::Basic);
        basic.port = Some("http".into());
        let mut settings = ServiceAgentSettings::new().with_service("Basic", basic);
        settings.settings.logging = Some(LoggingConfig::new("loud".into(), LogFormat::Json));

        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("logging.level")));
        assert!(errors.iter().any(|e| e.contains("port 'http'")));
        assert!(errors.iter().any(|e| e.contains("basic_auth_user_name")));
    }
}
