use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// `[api]` section of `hearth.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Bearer token of an existing login; when unset the caller logs in.
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ApiConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_empty() {
        let c = ApiConfig::from_toml_str("").unwrap();
        assert_eq!(c, ApiConfig::default());
    }

    #[test]
    fn reads_all_fields() {
        let c = ApiConfig::from_toml_str(
            r#"
            base_url = "https://budget.example.org/"
            token = "abc"
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(c.base_url, "https://budget.example.org/");
        assert_eq!(c.token.as_deref(), Some("abc"));
        assert_eq!(c.timeout_secs, 5);
    }

    #[test]
    fn rejects_non_http_url() {
        let err = ApiConfig::from_toml_str(r#"base_url = "ftp://nope""#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_url = \"http://127.0.0.1:9000\"").unwrap();
        let c = ApiConfig::load(file.path()).unwrap();
        assert_eq!(c.base_url, "http://127.0.0.1:9000");
        assert_eq!(c.timeout_secs, 30);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = ApiConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
