pub mod error;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anchorscan_core::beacon::Namespace;
use anchorscan_core::deadline::DeadlinePolicy;
use anchorscan_core::orchestrator::OrchestratorConfig;
use tracing::debug;
use url::Url;

use crate::models::sources::{EnvConfig, FileApiConfig, FileConfig};
use crate::models::{ApiConfig, Config, ConfigMetadata, RadioConfig};
use crate::util::{parse_duration, split_command};
use crate::validation::{self, ConfigGuardRailError, ConfigWarnings};
use error::ConfigLoadError;

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] =
    ["anchorscan.toml", "config/anchorscan.toml"];
const DEFAULT_IDENTITY_PATH: &str = "./anchor_id";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Loads `.env`, reads the process environment and resolves the config.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Resolves the config from an already gathered environment.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) =
            self.compose_config(file_config, env, config_path)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let mut source = ConfigPathSource::default();

        if let Some(explicit) = &self.options.config_path {
            source.explicit = Some(explicit.clone());
        } else if let Some(from_env) = &env.config_path {
            source.env = Some(from_env.clone());
        } else {
            source.default = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists());
        }

        let Some((path, provenance)) = source.resolved_path() else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance.is_explicit() {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents =
            fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
                path: path.clone(),
                source,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| {
                ConfigLoadError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;
        debug!(path = %path.display(), ?provenance, "loaded configuration file");

        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        if config_path.is_none() {
            warnings.push_with_hint(
                "No anchorscan.toml detected; falling back to environment variables",
                "Pass --config or set ANCHORSCAN_CONFIG to use a configuration file",
            );
        }

        let FileConfig {
            api: file_api,
            identity: file_identity,
            scan: file_scan,
            radio: file_radio,
            dev_mode: file_dev_mode,
        } = file_config.unwrap_or_default();

        let raw_base_url = env
            .api_base_url
            .clone()
            .or(file_api.base_url.clone())
            .ok_or(ConfigGuardRailError::MissingBaseUrl)?;
        let (token, token_from_file) = resolve_token(&env, &file_api)?;
        let api = ApiConfig {
            base_url: parse_base_url(&raw_base_url)?,
            token,
            request_timeout: duration_field(
                "request_timeout",
                env.request_timeout.as_deref().or(file_api.request_timeout.as_deref()),
            )?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        };

        let identity_path = env
            .identity_path
            .clone()
            .or(file_identity.path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_IDENTITY_PATH));

        let defaults = OrchestratorConfig::default();
        let namespace = match env.namespace.as_deref().or(file_scan.namespace.as_deref())
        {
            Some(raw) => parse_namespace(raw)?,
            None => Namespace::DEFAULT,
        };
        let poll_interval = duration_field(
            "poll_interval",
            env.poll_interval.as_deref().or(file_scan.poll_interval.as_deref()),
        )?;
        let debug_scan = duration_field(
            "debug_scan",
            env.debug_scan.as_deref().or(file_scan.debug_scan.as_deref()),
        )?;
        let default_policy = DeadlinePolicy::default();
        let orchestrator = OrchestratorConfig {
            poll_interval_ms: poll_interval
                .map(|d| d.as_millis() as u64)
                .unwrap_or(defaults.poll_interval_ms),
            debug_scan_secs: debug_scan
                .map(|d| d.as_secs())
                .unwrap_or(defaults.debug_scan_secs),
            allow_duplicates: file_scan
                .allow_duplicates
                .unwrap_or(defaults.allow_duplicates),
            namespace,
            deadline: DeadlinePolicy {
                fallback_secs: file_scan
                    .fallback_seconds
                    .unwrap_or(default_policy.fallback_secs),
                skew_margin_secs: file_scan
                    .skew_margin_seconds
                    .unwrap_or(default_policy.skew_margin_secs),
            },
            ..defaults
        };

        let radio = match env.radio_command.as_deref() {
            Some(line) => RadioConfig::from_command_line(split_command(line)),
            None => RadioConfig {
                program: file_radio.command.filter(|c| !c.trim().is_empty()),
                args: file_radio.args.unwrap_or_default(),
            },
        };

        let config = Config {
            api,
            identity_path,
            orchestrator,
            radio,
            dev_mode: env.dev_mode.or(file_dev_mode).unwrap_or(false),
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded: false,
                token_from_file,
            },
        };

        let guard_warnings = validation::apply_guard_rails(&config)?;
        warnings.extend(guard_warnings);

        Ok((config, warnings))
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigGuardRailError> {
    let url = Url::parse(raw.trim()).map_err(|source| {
        ConfigGuardRailError::InvalidBaseUrl {
            value: raw.to_string(),
            source,
        }
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigGuardRailError::UnsupportedScheme {
            scheme: other.to_string(),
        }),
    }
}

fn parse_namespace(raw: &str) -> Result<Namespace, ConfigGuardRailError> {
    let trimmed = raw.trim();
    if trimmed.len() != 20 {
        return Err(ConfigGuardRailError::InvalidNamespace {
            value: raw.to_string(),
        });
    }
    trimmed
        .parse()
        .map_err(|_| ConfigGuardRailError::InvalidNamespace {
            value: raw.to_string(),
        })
}

fn duration_field(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<Duration>, ConfigLoadError> {
    raw.map(|value| {
        parse_duration(value).map_err(|source| ConfigLoadError::InvalidDuration {
            field,
            value: value.to_string(),
            source,
        })
    })
    .transpose()
}

fn resolve_token(
    env: &EnvConfig,
    file_api: &FileApiConfig,
) -> Result<(Option<String>, bool), ConfigLoadError> {
    if let Some(token) = env.api_token.clone() {
        return Ok((Some(token), false));
    }
    if let Some(path) = env.api_token_file.as_ref()
        && let Some(token) = read_secret_file(path)?
    {
        return Ok((Some(token), true));
    }
    if let Some(token) = file_api
        .token
        .clone()
        .filter(|value| !value.trim().is_empty())
    {
        return Ok((Some(token), false));
    }
    if let Some(path) = file_api.token_file.as_ref()
        && let Some(token) = read_secret_file(path)?
    {
        return Ok((Some(token), true));
    }
    Ok((None, false))
}

fn read_secret_file(path: &Path) -> Result<Option<String>, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| {
        ConfigLoadError::SecretFileIo {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

#[derive(Debug, Default)]
struct ConfigPathSource {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    default: Option<PathBuf>,
}

impl ConfigPathSource {
    fn resolved_path(&self) -> Option<(PathBuf, ConfigPathProvenance)> {
        if let Some(path) = &self.explicit {
            return Some((path.clone(), ConfigPathProvenance::Explicit));
        }
        if let Some(path) = &self.env {
            return Some((path.clone(), ConfigPathProvenance::Env));
        }
        if let Some(path) = &self.default {
            return Some((path.clone(), ConfigPathProvenance::Default));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathProvenance {
    Explicit,
    Env,
    Default,
}

impl ConfigPathProvenance {
    fn is_explicit(self) -> bool {
        matches!(
            self,
            ConfigPathProvenance::Explicit | ConfigPathProvenance::Env
        )
    }
}
