use std::path::Path;

use anyhow::{anyhow, Context, Result};
use regex::{Captures, Regex};
use tracing::{debug, error};

use crate::config::services::ServiceAgentSettings;
use crate::config::settings::{LogFormat, LoggingConfig};
use crate::config::validator;

/// Load and validate settings from a YAML (or JSON) file
pub async fn file_to_config(path: &Path) -> Result<ServiceAgentSettings> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("unable to read settings file {}", path.display()))?;

    let expanded = expand_env_vars(&content)?;
    parse_config(&expanded)
}

pub fn parse_config(content: &str) -> Result<ServiceAgentSettings> {
    let mut settings: ServiceAgentSettings = serde_yaml::from_str(content).inspect_err(|e| {
        error!("parse config error: {}", e);
    })?;

    // Apply defaults
    if settings.settings.logging.is_none() {
        settings.settings.logging = Some(LoggingConfig::new("info".to_owned(), LogFormat::Compact));
    }
    settings.global_api_key = settings.global_api_key.filter(|key| !key.is_empty());

    debug!("validating config ...");
    validator::validate_settings(&settings).map_err(|errors| {
        errors.iter().for_each(|e| error!("config: {}", e));
        anyhow!("invalid service agent settings:\n  - {}", errors.join("\n  - "))
    })?;

    Ok(settings)
}

/// Replace `${VAR}` and `${VAR:default}` with environment values.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]*))?\}")?;
    let expanded = re.replace_all(input, |caps: &Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    });
    Ok(expanded.into_owned())
}
