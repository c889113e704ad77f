//! Configuration loading for the Socratic service.
//!
//! Every field is optional: a missing file section falls back to the
//! provider defaults, and `SOCRATIC_*` environment variables override the
//! file. The file itself is optional too.

use crate::error::{ApiError, ErrorCode};
use serde::Deserialize;
use socratic_core::{ConfigError, GatewayConfig, ProviderKind, TemperatureProfile};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "SOCRATIC_CONFIG";
pub const PROVIDER_ENV: &str = "SOCRATIC_PROVIDER";
pub const BASE_URL_ENV: &str = "SOCRATIC_BASE_URL";
pub const MODELS_ENV: &str = "SOCRATIC_MODELS";
pub const REQUEST_TIMEOUT_ENV: &str = "SOCRATIC_REQUEST_TIMEOUT_SECS";
pub const API_KEY_ENV: &str = "SOCRATIC_API_KEY";
pub const LOG_FORMAT_ENV: &str = "SOCRATIC_LOG_FORMAT";

// ============================================================================
// FILE SHAPE
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub temperatures: TemperatureSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub models: Option<Vec<String>>,
    pub request_timeout_secs: Option<u64>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    pub max_retries: Option<u32>,
    pub base_backoff_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
    pub timeout_backoff_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemperatureSection {
    pub start: Option<f32>,
    pub continue_dialogue: Option<f32>,
    pub hint: Option<f32>,
    pub summary: Option<f32>,
    pub suggestions: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    pub format: Option<String>,
    pub filter: Option<String>,
}

// ============================================================================
// RESOLVED CONFIG
// ============================================================================

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                field: "logging.format".to_string(),
                value: other.to_string(),
                reason: "expected 'pretty' or 'json'".to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Missing configuration file path after --config")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

impl From<ConfigLoadError> for ApiError {
    fn from(err: ConfigLoadError) -> Self {
        ApiError::new(ErrorCode::ConfigurationError, err.to_string())
    }
}

/// Fully resolved service configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub temperatures: TemperatureProfile,
    pub log_format: LogFormat,
    /// Explicit `EnvFilter` directives; `None` defers to `RUST_LOG`.
    pub log_filter: Option<String>,
    pub api_key: Option<String>,
}

impl AppConfig {
    /// Load from `--config <path>` or `SOCRATIC_CONFIG` (if either is
    /// given) and the process environment.
    pub fn load() -> Result<Self, ConfigLoadError> {
        let path = match config_path_from_args(std::env::args().skip(1))? {
            Some(path) => Some(path),
            None => config_path_from_env(),
        };
        let file = match path {
            Some(path) => Self::read_file(&path)?,
            None => FileConfig::default(),
        };
        Self::from_sources(file, |var| std::env::var(var).ok())
    }

    /// Load from a file path, then apply the process environment.
    pub fn from_path(path: &Path) -> Result<Self, ConfigLoadError> {
        let file = Self::read_file(path)?;
        Self::from_sources(file, |var| std::env::var(var).ok())
    }

    pub fn read_file(path: &Path) -> Result<FileConfig, ConfigLoadError> {
        let contents = std::fs::read_to_string(path)?;
        let file: FileConfig = toml::from_str(&contents)?;
        Ok(file)
    }

    /// Merge a parsed file with environment overrides read via `lookup`.
    pub fn from_sources(
        file: FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigLoadError> {
        let env = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let provider = match env(PROVIDER_ENV).or(file.gateway.provider) {
            Some(name) => ProviderKind::parse(&name)?,
            None => ProviderKind::OpenAiCompatible,
        };
        let mut gateway = GatewayConfig::for_provider(provider);

        if let Some(base_url) = env(BASE_URL_ENV).or(file.gateway.base_url) {
            gateway.base_url = base_url.trim().to_string();
        }
        if let Some(models) = env(MODELS_ENV)
            .map(|list| parse_model_list(&list))
            .or(file.gateway.models)
        {
            gateway.models = models;
        }
        let timeout_secs = match env(REQUEST_TIMEOUT_ENV) {
            Some(raw) => Some(parse_number::<u64>(REQUEST_TIMEOUT_ENV, &raw)?),
            None => file.gateway.request_timeout_secs,
        };
        if let Some(secs) = timeout_secs {
            gateway.request_timeout = Duration::from_secs(secs);
        }
        if let Some(max_tokens) = file.gateway.max_tokens {
            gateway.max_tokens = max_tokens;
        }

        let retry = file.retry;
        if let Some(max_retries) = retry.max_retries {
            gateway.retry.max_retries = max_retries;
        }
        if let Some(ms) = retry.base_backoff_ms {
            gateway.retry.base_backoff = Duration::from_millis(ms);
        }
        if let Some(multiplier) = retry.backoff_multiplier {
            gateway.retry.backoff_multiplier = multiplier;
        }
        if let Some(ms) = retry.timeout_backoff_ms {
            gateway.retry.timeout_backoff = Duration::from_millis(ms);
        }
        gateway.validate()?;

        let temperatures = resolve_temperatures(file.temperatures)?;

        let log_format = match env(LOG_FORMAT_ENV).or(file.logging.format) {
            Some(format) => LogFormat::parse(&format)?,
            None => LogFormat::default(),
        };

        let api_key = env(API_KEY_ENV)
            .or_else(|| env(provider.credential_env_var()))
            .map(|key| key.trim().to_string());

        Ok(Self {
            gateway,
            temperatures,
            log_format,
            log_filter: file.logging.filter,
            api_key,
        })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("gateway", &self.gateway)
            .field("temperatures", &self.temperatures)
            .field("log_format", &self.log_format)
            .field("log_filter", &self.log_filter)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn resolve_temperatures(section: TemperatureSection) -> Result<TemperatureProfile, ConfigError> {
    let defaults = TemperatureProfile::default();
    let profile = TemperatureProfile {
        start: section.start.unwrap_or(defaults.start),
        continue_dialogue: section.continue_dialogue.unwrap_or(defaults.continue_dialogue),
        hint: section.hint.unwrap_or(defaults.hint),
        summary: section.summary.unwrap_or(defaults.summary),
        suggestions: section.suggestions.unwrap_or(defaults.suggestions),
    };
    for (field, value) in [
        ("temperatures.start", profile.start),
        ("temperatures.continue_dialogue", profile.continue_dialogue),
        ("temperatures.hint", profile.hint),
        ("temperatures.summary", profile.summary),
        ("temperatures.suggestions", profile.suggestions),
    ] {
        if !(0.0..=2.0).contains(&value) {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                reason: "must be between 0.0 and 2.0".to_string(),
            });
        }
    }
    Ok(profile)
}

fn parse_model_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
        reason: "expected a non-negative integer".to_string(),
    })
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

/// Value following `--config`, if the flag is present.
pub fn config_path_from_args(
    args: impl IntoIterator<Item = String>,
) -> Result<Option<PathBuf>, ConfigLoadError> {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args
                .next()
                .map(|path| Some(PathBuf::from(path)))
                .ok_or(ConfigLoadError::MissingConfigPath);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Ok(Some(PathBuf::from(path)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use socratic_core::GEMINI_BASE_URL;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = AppConfig::from_sources(FileConfig::default(), env_of(&[])).unwrap();
        assert_eq!(config.gateway, GatewayConfig::default());
        assert_eq!(config.temperatures, TemperatureProfile::default());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_file_values_apply() {
        let file: FileConfig = toml::from_str(
            r#"
            [gateway]
            models = ["a", "b"]
            request_timeout_secs = 10
            max_tokens = 512

            [retry]
            max_retries = 5
            base_backoff_ms = 100

            [temperatures]
            summary = 0.2

            [logging]
            format = "json"
            filter = "socratic_llm=debug"
            "#,
        )
        .unwrap();
        let config = AppConfig::from_sources(file, env_of(&[])).unwrap();
        assert_eq!(config.gateway.models, vec!["a", "b"]);
        assert_eq!(config.gateway.request_timeout, Duration::from_secs(10));
        assert_eq!(config.gateway.max_tokens, 512);
        assert_eq!(config.gateway.retry.max_retries, 5);
        assert_eq!(config.gateway.retry.base_backoff, Duration::from_millis(100));
        assert_eq!(config.temperatures.summary, 0.2);
        assert_eq!(config.temperatures.start, 0.7);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_filter.as_deref(), Some("socratic_llm=debug"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let parsed = toml::from_str::<FileConfig>("[gateway]\nmodel = \"typo\"\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let file: FileConfig = toml::from_str("[gateway]\nmodels = [\"from-file\"]\n").unwrap();
        let config = AppConfig::from_sources(
            file,
            env_of(&[
                (MODELS_ENV, " first , second ,, "),
                (REQUEST_TIMEOUT_ENV, "45"),
                (LOG_FORMAT_ENV, "JSON"),
            ]),
        )
        .unwrap();
        assert_eq!(config.gateway.models, vec!["first", "second"]);
        assert_eq!(config.gateway.request_timeout, Duration::from_secs(45));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_provider_switch_uses_its_defaults() {
        let config =
            AppConfig::from_sources(FileConfig::default(), env_of(&[(PROVIDER_ENV, "gemini")]))
                .unwrap();
        assert_eq!(config.gateway.provider, ProviderKind::Gemini);
        assert_eq!(config.gateway.base_url, GEMINI_BASE_URL);
        assert_eq!(config.gateway.models, ProviderKind::Gemini.default_models());
    }

    #[test]
    fn test_api_key_falls_back_to_provider_variable() {
        let config = AppConfig::from_sources(
            FileConfig::default(),
            env_of(&[("OPENROUTER_API_KEY", "sk-or-123")]),
        )
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-or-123"));

        let config = AppConfig::from_sources(
            FileConfig::default(),
            env_of(&[(API_KEY_ENV, "sk-main"), ("OPENROUTER_API_KEY", "sk-or-123")]),
        )
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-main"));

        let config = AppConfig::from_sources(
            FileConfig::default(),
            env_of(&[(PROVIDER_ENV, "gemini"), ("OPENROUTER_API_KEY", "sk-or-123")]),
        )
        .unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = AppConfig::from_sources(FileConfig::default(), env_of(&[(PROVIDER_ENV, "acme")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Invalid(ConfigError::ProviderNotSupported { .. })
        ));

        let err = AppConfig::from_sources(
            FileConfig::default(),
            env_of(&[(REQUEST_TIMEOUT_ENV, "soon")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Invalid(ConfigError::InvalidValue { .. })));

        let file: FileConfig = toml::from_str("[retry]\nmax_retries = 0\n").unwrap();
        assert!(AppConfig::from_sources(file, env_of(&[])).is_err());

        let file: FileConfig = toml::from_str("[temperatures]\nhint = 3.5\n").unwrap();
        assert!(AppConfig::from_sources(file, env_of(&[])).is_err());
    }

    #[test]
    fn test_config_path_from_args() {
        let args = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(
            config_path_from_args(args(&["--config", "socratic.toml"])).unwrap(),
            Some(PathBuf::from("socratic.toml"))
        );
        assert_eq!(
            config_path_from_args(args(&["--config=/etc/socratic.toml"])).unwrap(),
            Some(PathBuf::from("/etc/socratic.toml"))
        );
        assert_eq!(config_path_from_args(args(&["--verbose"])).unwrap(), None);
        assert!(matches!(
            config_path_from_args(args(&["--config"])),
            Err(ConfigLoadError::MissingConfigPath)
        ));
    }

    #[test]
    fn test_load_error_maps_to_api_error() {
        let err: ApiError = ConfigLoadError::MissingConfigPath.into();
        assert_eq!(err.code, ErrorCode::ConfigurationError);
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = AppConfig::from_sources(
            FileConfig::default(),
            env_of(&[(API_KEY_ENV, "sk-secret")]),
        )
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
