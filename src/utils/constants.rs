//! Shared constants and invariants

pub const DEFAULT_CONFIG_FILE: &str = "serviceagentconfig.yaml";
pub const DEFAULT_API_KEY_HEADER_NAME: &str = "ApiKey";

pub const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";

pub const JSON_MEDIA_TYPE: &str = "application/json";
pub const BASIC_PREFIX: &str = "Basic ";
pub const BEARER_PREFIX: &str = "Bearer ";
