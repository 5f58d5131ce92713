use anyhow::{anyhow, Result};
use std::path::Path;

use crate::config::loader::file_to_config;
use crate::config::services::ServiceAgentSettings;

pub async fn run(config_path: &str) -> Result<ServiceAgentSettings> {
    let path = Path::new(config_path);
    file_to_config(path)
        .await
        .map_err(|e| anyhow!("Invalid config format: {:#}", e))
}
