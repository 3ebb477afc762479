use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::domain::Theme;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // AI Service
    pub ai_service_url: String,
    /// Missing keys are not fatal; every analysis then falls back.
    pub api_key: Option<String>,
    pub ai_service_timeout_seconds: u64,
    pub fast_model: String,
    pub deep_model: String,
    pub thinking_budget: u32,

    // Uploads
    pub max_upload_bytes: usize,

    // Preferences
    pub preferences_path: PathBuf,
    pub default_theme: Option<Theme>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // AI Service
        let ai_service_url = env::var("AI_SERVICE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
        url::Url::parse(&ai_service_url).context("AI_SERVICE_URL must be a valid URL")?;
        let api_key = env::var("API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let ai_service_timeout_seconds = env::var("AI_SERVICE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120); // 2 minutes default for LLM calls
        let fast_model =
            env::var("AI_FAST_MODEL").unwrap_or_else(|_| "gemini-3-flash-preview".to_string());
        let deep_model =
            env::var("AI_DEEP_MODEL").unwrap_or_else(|_| "gemini-3-pro-preview".to_string());
        let thinking_budget = env::var("AI_THINKING_BUDGET")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1024);

        // Uploads
        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(25 * 1024 * 1024);

        // Preferences
        let preferences_path = env::var("PREFERENCES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".pmis/preferences.json"));
        let default_theme = env::var("DEFAULT_THEME").ok().and_then(|s| s.parse().ok());

        Ok(Settings {
            env,
            server_addr,
            cors_allow_origins,
            ai_service_url,
            api_key,
            ai_service_timeout_seconds,
            fast_model,
            deep_model,
            thinking_budget,
            max_upload_bytes,
            preferences_path,
            default_theme,
        })
    }

    /// Settings for tests and local tooling: no key, temp-friendly paths.
    #[cfg(test)]
    pub fn for_tests(preferences_path: PathBuf) -> Self {
        Settings {
            env: Environment::Dev,
            server_addr: "127.0.0.1:0".to_string(),
            cors_allow_origins: vec!["http://localhost:3000".to_string()],
            ai_service_url: "http://127.0.0.1:9".to_string(),
            api_key: None,
            ai_service_timeout_seconds: 5,
            fast_model: "gemini-3-flash-preview".to_string(),
            deep_model: "gemini-3-pro-preview".to_string(),
            thinking_budget: 1024,
            max_upload_bytes: 1024 * 1024,
            preferences_path,
            default_theme: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_str() {
        assert_eq!(Environment::from_str("production"), Environment::Prod);
        assert_eq!(Environment::from_str("STAGING"), Environment::Staging);
        assert_eq!(Environment::from_str("anything"), Environment::Dev);
        assert!(Environment::Dev.is_dev());
    }
}
