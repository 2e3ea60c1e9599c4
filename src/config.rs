use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Connection settings for the external backend service (identity + data).
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
    pub anon_key: String,
    pub bypass_state_path: PathBuf,
}

impl BackendConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let base_url = env::var("BACKEND_URL")
            .map_err(|_| AppError::Config("BACKEND_URL is not set".to_string()))?;
        let anon_key = env::var("BACKEND_ANON_KEY")
            .map_err(|_| AppError::Config("BACKEND_ANON_KEY is not set".to_string()))?;
        let bypass_state_path = env::var("BYPASS_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("tasktrack_local.json"));

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            bypass_state_path,
        })
    }
}
