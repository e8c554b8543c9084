use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, Result};
use crate::domain::table::LoaderSettings;

pub const CONFIG_FILE: &str = "tabclean.toml";
pub const ENV_PREFIX: &str = "TABCLEAN_";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Base URL used when building download links.
    pub public_url: String,
    pub work_dir: PathBuf,
    pub retention_hours: u64,
    pub sweep_interval_hours: u64,
    pub download_timeout_secs: u64,
    pub max_upload_mb: usize,
    pub header_scan_rows: usize,
    pub encoding_sample_bytes: usize,
    pub preview_rows: usize,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            public_url: "http://localhost:8000".to_string(),
            work_dir: std::env::temp_dir().join("excel_processor"),
            retention_hours: 24,
            sweep_interval_hours: 6,
            download_timeout_secs: 600,
            max_upload_mb: 512,
            header_scan_rows: 100,
            encoding_sample_bytes: 100_000,
            preview_rows: 20,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `tabclean.toml`, then `TABCLEAN_*` variables.
    ///
    /// The platform variables `PORT` and `RAILWAY_PUBLIC_DOMAIN` are
    /// honoured when no prefixed override is set.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        let mut defaults = Self::default();
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            defaults.port = port;
        }
        if let Ok(domain) = std::env::var("RAILWAY_PUBLIC_DOMAIN") {
            if !domain.trim().is_empty() {
                defaults.public_url = domain;
            }
        }

        Figment::from(Serialized::defaults(defaults))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let mut config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ValidationError(format!("Invalid configuration: {e}")))?;
        config.public_url = normalize_public_url(&config.public_url);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(AppError::ValidationError("host must not be empty".into()));
        }
        if self.retention_hours == 0 {
            return Err(AppError::ValidationError(
                "retention_hours must be at least 1".into(),
            ));
        }
        if self.sweep_interval_hours == 0 {
            return Err(AppError::ValidationError(
                "sweep_interval_hours must be at least 1".into(),
            ));
        }
        if self.download_timeout_secs == 0 {
            return Err(AppError::ValidationError(
                "download_timeout_secs must be at least 1".into(),
            ));
        }
        if self.max_upload_mb == 0 {
            return Err(AppError::ValidationError(
                "max_upload_mb must be at least 1".into(),
            ));
        }
        if self.preview_rows == 0 {
            return Err(AppError::ValidationError(
                "preview_rows must be at least 1".into(),
            ));
        }
        self.loader_settings()
            .validate()
            .map_err(AppError::ValidationError)
    }

    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            header_scan_rows: self.header_scan_rows,
            encoding_sample_bytes: self.encoding_sample_bytes,
        }
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours * 3600)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_hours * 3600)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Prefix `https://` when no scheme is given and drop trailing slashes.
pub fn normalize_public_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Result<AppConfig> {
        AppConfig::from_figment(
            Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string(toml)),
        )
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 8000);
        assert_eq!(config.retention(), Duration::from_secs(24 * 3600));
        assert_eq!(config.loader_settings(), LoaderSettings::default());
    }

    #[test]
    fn test_toml_overrides() {
        let config = from_toml("port = 9000\nretention_hours = 2\npreview_rows = 5").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.retention_hours, 2);
        assert_eq!(config.preview_rows, 5);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_zero_retention_rejected() {
        let err = from_toml("retention_hours = 0").unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn test_bad_type_rejected() {
        assert!(from_toml("port = \"eighty\"").is_err());
    }

    #[test]
    fn test_public_url_normalized() {
        assert_eq!(
            normalize_public_url("myapp.up.railway.app"),
            "https://myapp.up.railway.app"
        );
        assert_eq!(
            normalize_public_url("http://localhost:8000/"),
            "http://localhost:8000"
        );
        let config = from_toml("public_url = \"example.com\"").unwrap();
        assert_eq!(config.public_url, "https://example.com");
    }
}
