//! Provider configuration.
//!
//! Each setting is resolved by walking an ordered list of lazily evaluated
//! lookups and taking the first that yields a non-empty value. The winning
//! source is kept so `--debug` can report where a value came from.

pub mod repo;

use std::env;
use std::fmt;
use std::time::Duration;

use reqwest::Url;
use tracing::{debug, warn};

use crate::error::ConfigError;

pub use repo::{REPO_CONFIG_FILE, RepoConfig};

pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "qwen/qwen3-coder";

pub const API_KEY_ENV_VAR: &str = "GIT_COMMIT_AI_KEY";
pub const API_URL_ENV_VAR: &str = "GIT_COMMIT_AI_URL";
pub const MODEL_ENV_VAR: &str = "GIT_COMMIT_AI_MODEL";

/// Default HTTP request timeout (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Environment variable to override the request timeout.
pub const TIMEOUT_ENV_VAR: &str = "GIT_COMMIT_AI_TIMEOUT";

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Flag,
    Env(&'static str),
    RepoFile,
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Flag => write!(f, "command-line flag"),
            ConfigSource::Env(var) => write!(f, "${var}"),
            ConfigSource::RepoFile => write!(f, "{REPO_CONFIG_FILE}"),
            ConfigSource::Default => write!(f, "built-in default"),
        }
    }
}

/// One step of a lookup chain.
pub type Lookup<'a> = (ConfigSource, Box<dyn Fn() -> Option<String> + 'a>);

/// Evaluate lookups in order; the first non-empty value wins.
pub fn first_of(lookups: Vec<Lookup<'_>>) -> Option<(String, ConfigSource)> {
    lookups.into_iter().find_map(|(source, lookup)| {
        lookup()
            .filter(|v| !v.trim().is_empty())
            .map(|v| (v, source))
    })
}

/// Build a lookup step.
pub fn lookup<'a>(source: ConfigSource, f: impl Fn() -> Option<String> + 'a) -> Lookup<'a> {
    (source, Box::new(f))
}

fn from_env<'a>(var: &'static str) -> Lookup<'a> {
    lookup(ConfigSource::Env(var), move || env::var(var).ok())
}

fn from_flag(value: Option<&str>) -> Lookup<'_> {
    lookup(ConfigSource::Flag, move || value.map(str::to_string))
}

fn from_default<'a>(value: &'static str) -> Lookup<'a> {
    lookup(ConfigSource::Default, move || Some(value.to_string()))
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ProviderOverrides {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub model: Option<String>,
}

/// Resolved provider settings.
#[derive(Clone)]
pub struct ProviderConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub api_url_source: ConfigSource,
    pub api_key_source: ConfigSource,
    pub model_source: ConfigSource,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("api_url_source", &self.api_url_source)
            .field("api_key_source", &self.api_key_source)
            .field("model_source", &self.model_source)
            .finish()
    }
}

impl ProviderConfig {
    /// Resolve every setting: flag, then environment, then `.gitcommitai`
    /// (model only), then the built-in default.
    pub fn resolve(overrides: &ProviderOverrides, repo: &RepoConfig) -> Result<Self, ConfigError> {
        let (api_key, api_key_source) = first_of(vec![
            from_flag(overrides.api_key.as_deref()),
            from_env(API_KEY_ENV_VAR),
        ])
        .ok_or(ConfigError::MissingApiKey)?;

        let (api_url, api_url_source) = first_of(vec![
            from_flag(overrides.api_url.as_deref()),
            from_env(API_URL_ENV_VAR),
            from_default(DEFAULT_API_URL),
        ])
        .unwrap_or_else(|| (DEFAULT_API_URL.to_string(), ConfigSource::Default));
        validate_url(&api_url)?;

        let (model, model_source) = first_of(vec![
            from_flag(overrides.model.as_deref()),
            from_env(MODEL_ENV_VAR),
            lookup(ConfigSource::RepoFile, || repo.model.clone()),
            from_default(DEFAULT_MODEL),
        ])
        .unwrap_or_else(|| (DEFAULT_MODEL.to_string(), ConfigSource::Default));

        let config = Self {
            api_url: api_url.trim().to_string(),
            api_key,
            model: model.trim().to_string(),
            timeout: get_timeout(),
            api_url_source,
            api_key_source,
            model_source,
        };

        debug!(
            "Provider config: url {} (from {}), model {} (from {}), key from {}, timeout {}s",
            config.api_url,
            config.api_url_source,
            config.model,
            config.model_source,
            config.api_key_source,
            config.timeout.as_secs()
        );

        Ok(config)
    }
}

fn validate_url(url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url.trim()).map_err(|e| ConfigError::InvalidApiUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidApiUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// Get the configured request timeout.
///
/// Reads from GIT_COMMIT_AI_TIMEOUT if set, otherwise uses the default of
/// 300 seconds. Invalid values log a warning and fall back to the default.
pub fn get_timeout() -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                warn!(
                    "Invalid {} value '{}', using default {}s",
                    TIMEOUT_ENV_VAR, v, DEFAULT_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        },
        _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: [&str; 4] = [API_KEY_ENV_VAR, API_URL_ENV_VAR, MODEL_ENV_VAR, TIMEOUT_ENV_VAR];

    fn unset_all<F: FnOnce()>(f: F) {
        temp_env::with_vars_unset(ALL_VARS, f);
    }

    #[test]
    #[serial]
    fn test_missing_key_is_an_error() {
        unset_all(|| {
            let result = ProviderConfig::resolve(&ProviderOverrides::default(), &RepoConfig::default());
            assert!(matches!(result, Err(ConfigError::MissingApiKey)));
        });
    }

    #[test]
    #[serial]
    fn test_defaults_apply_when_only_key_is_set() {
        unset_all(|| {
            temp_env::with_var(API_KEY_ENV_VAR, Some("sk-test"), || {
                let config =
                    ProviderConfig::resolve(&ProviderOverrides::default(), &RepoConfig::default())
                        .unwrap();
                assert_eq!(config.api_url, DEFAULT_API_URL);
                assert_eq!(config.model, DEFAULT_MODEL);
                assert_eq!(config.api_key_source, ConfigSource::Env(API_KEY_ENV_VAR));
                assert_eq!(config.model_source, ConfigSource::Default);
                assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
            });
        });
    }

    #[test]
    #[serial]
    fn test_flag_beats_env_beats_repo_file() {
        unset_all(|| {
            temp_env::with_vars(
                [(API_KEY_ENV_VAR, Some("env-key")), (MODEL_ENV_VAR, Some("env-model"))],
                || {
                    let repo = RepoConfig {
                        model: Some("repo-model".into()),
                        prompt: None,
                    };

                    let config =
                        ProviderConfig::resolve(&ProviderOverrides::default(), &repo).unwrap();
                    assert_eq!(config.model, "env-model");

                    let overrides = ProviderOverrides {
                        api_key: Some("flag-key".into()),
                        model: Some("flag-model".into()),
                        ..Default::default()
                    };
                    let config = ProviderConfig::resolve(&overrides, &repo).unwrap();
                    assert_eq!(config.api_key, "flag-key");
                    assert_eq!(config.api_key_source, ConfigSource::Flag);
                    assert_eq!(config.model, "flag-model");
                },
            );
        });
    }

    #[test]
    #[serial]
    fn test_repo_file_model_beats_default() {
        unset_all(|| {
            temp_env::with_var(API_KEY_ENV_VAR, Some("placeholder"), || {
                let repo = RepoConfig {
                    model: Some("repo-model".into()),
                    prompt: None,
                };
                let config = ProviderConfig::resolve(&ProviderOverrides::default(), &repo).unwrap();
                assert_eq!(config.model, "repo-model");
                assert_eq!(config.model_source, ConfigSource::RepoFile);
            });
        });
    }

    #[test]
    #[serial]
    fn test_empty_env_value_is_skipped() {
        unset_all(|| {
            temp_env::with_vars(
                [(API_KEY_ENV_VAR, Some("k")), (API_URL_ENV_VAR, Some("  "))],
                || {
                    let config =
                        ProviderConfig::resolve(&ProviderOverrides::default(), &RepoConfig::default())
                            .unwrap();
                    assert_eq!(config.api_url, DEFAULT_API_URL);
                },
            );
        });
    }

    #[test]
    #[serial]
    fn test_invalid_url_is_rejected() {
        unset_all(|| {
            let overrides = ProviderOverrides {
                api_key: Some("k".into()),
                api_url: Some("not a url".into()),
                ..Default::default()
            };
            let result = ProviderConfig::resolve(&overrides, &RepoConfig::default());
            assert!(matches!(result, Err(ConfigError::InvalidApiUrl { .. })));

            let overrides = ProviderOverrides {
                api_key: Some("k".into()),
                api_url: Some("ftp://example.com/v1".into()),
                ..Default::default()
            };
            let result = ProviderConfig::resolve(&overrides, &RepoConfig::default());
            assert!(matches!(result, Err(ConfigError::InvalidApiUrl { .. })));
        });
    }

    #[test]
    fn test_debug_output_hides_key() {
        let config = ProviderConfig {
            api_url: DEFAULT_API_URL.into(),
            api_key: "sk-super-secret".into(),
            model: DEFAULT_MODEL.into(),
            timeout: Duration::from_secs(1),
            api_url_source: ConfigSource::Default,
            api_key_source: ConfigSource::Flag,
            model_source: ConfigSource::Default,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_first_of_is_lazy() {
        use std::cell::Cell;
        let called = Cell::new(false);
        let result = first_of(vec![
            lookup(ConfigSource::Flag, || Some("x".to_string())),
            lookup(ConfigSource::Default, || {
                called.set(true);
                Some("y".to_string())
            }),
        ]);
        assert_eq!(result, Some(("x".to_string(), ConfigSource::Flag)));
        assert!(!called.get());
    }

    #[test]
    #[serial]
    fn test_get_timeout_default() {
        temp_env::with_var_unset(TIMEOUT_ENV_VAR, || {
            assert_eq!(get_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }

    #[test]
    #[serial]
    fn test_get_timeout_from_env() {
        temp_env::with_var(TIMEOUT_ENV_VAR, Some("60"), || {
            assert_eq!(get_timeout(), Duration::from_secs(60));
        });
    }

    #[test]
    #[serial]
    fn test_get_timeout_invalid_env_uses_default() {
        temp_env::with_var(TIMEOUT_ENV_VAR, Some("not_a_number"), || {
            assert_eq!(get_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
        temp_env::with_var(TIMEOUT_ENV_VAR, Some("0"), || {
            assert_eq!(get_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        });
    }
}
