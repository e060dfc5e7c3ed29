use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

const ENV_CONFIG_PATH: &str = "METER_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const ENV_API_KEY: &str = "GEMINI_API_KEY";
const ENV_BASE_URL: &str = "GEMINI_BASE_URL";
const ENV_MODEL: &str = "GEMINI_MODEL";
const ENV_TIMEOUT_SECS: &str = "GEMINI_TIMEOUT_SECS";
const ENV_MAX_UPLOAD_BYTES: &str = "METER_MAX_UPLOAD_BYTES";
const ENV_MAX_FILES: &str = "METER_MAX_FILES";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024; // 10 MiB
const DEFAULT_MAX_FILES: usize = 5;

/// CORS policy configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Empty, or containing `*`, allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub cors: CorsConfig,
    /// Replaces the built-in inspection prompt when set
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Settings for the upstream generation service
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GeminiConfig {
    /// Parse and validate the configured base URL
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(self.base_url.trim_end_matches('/'))
    }
}

/// Upload limits applied by the report endpoint
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    /// Maximum size of a single image in bytes
    pub max_file_bytes: usize,
    /// Maximum number of images per request
    pub max_files: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

/// Application configuration
///
/// Built once at startup and handed to the request layer.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub gemini: GeminiConfig,
    pub limits: UploadLimits,
    pub cors: CorsConfig,
    pub prompt: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            gemini: GeminiConfig::default(),
            limits: UploadLimits::default(),
            cors: CorsConfig::default(),
            prompt: None,
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let port = env_parse("PORT").unwrap_or(8080);
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let gemini = GeminiConfig {
            api_key: std::env::var(ENV_API_KEY).ok().filter(|k| !k.trim().is_empty()),
            base_url: std::env::var(ENV_BASE_URL)
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: std::env::var(ENV_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(
                env_parse(ENV_TIMEOUT_SECS).unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        };

        let limits = UploadLimits {
            max_file_bytes: env_parse(ENV_MAX_UPLOAD_BYTES).unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            max_files: env_parse(ENV_MAX_FILES).unwrap_or(DEFAULT_MAX_FILES),
        };

        let config_path = std::env::var(ENV_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let file = Self::load_config_file(&config_path).unwrap_or_default();

        Self {
            port,
            host,
            gemini,
            limits,
            cors: file.cors,
            prompt: file.prompt.filter(|p| !p.trim().is_empty()),
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::parse_config_file(path, &contents),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read config file, using defaults"
                );
                None
            }
        }
    }

    fn parse_config_file(path: &Path, contents: &str) -> Option<ConfigFile> {
        let contents = contents.trim();
        if contents.is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Some(ConfigFile::default());
        }

        match serde_yaml::from_str(contents) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "Loaded configuration from file");
                Some(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config file, using defaults"
                );
                None
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_file_with_cors_and_prompt() {
        let yaml = r#"
cors:
  allowed_origins:
    - https://inspecciones.example.com
prompt: "Describe the meter"
"#;
        let file = Config::parse_config_file(Path::new("config.yaml"), yaml).unwrap();

        assert_eq!(
            file.cors.allowed_origins,
            vec!["https://inspecciones.example.com".to_string()]
        );
        assert!(!file.cors.allows_any_origin());
        assert_eq!(file.prompt.as_deref(), Some("Describe the meter"));
    }

    #[test]
    fn test_empty_config_file_uses_defaults() {
        let file = Config::parse_config_file(Path::new("config.yaml"), "   \n").unwrap();
        assert!(file.cors.allows_any_origin());
        assert!(file.prompt.is_none());
    }

    #[test]
    fn test_invalid_config_file_is_ignored() {
        let file = Config::parse_config_file(Path::new("config.yaml"), "cors: [not, a, map");
        assert!(file.is_none());
    }

    #[test]
    fn test_wildcard_origin_allows_any() {
        let cors = CorsConfig {
            allowed_origins: vec!["https://a.example.com".to_string(), "*".to_string()],
        };
        assert!(cors.allows_any_origin());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let gemini = GeminiConfig {
            base_url: "http://localhost:9000/v1beta/".to_string(),
            ..GeminiConfig::default()
        };
        assert_eq!(
            gemini.base_url().unwrap().as_str(),
            "http://localhost:9000/v1beta"
        );
        assert_eq!(Config::default().bind_addr(), "127.0.0.1:8080");
    }
}
