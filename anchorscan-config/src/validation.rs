use thiserror::Error;

use crate::models::Config;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("ANCHORSCAN_API_BASE_URL is not set and the config file has no api.base_url")]
    MissingBaseUrl,
    #[error("API base URL '{value}' does not parse")]
    InvalidBaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("API base URL scheme '{scheme}' is not http or https")]
    UnsupportedScheme { scheme: String },
    #[error("namespace '{value}' must be exactly 20 hex characters")]
    InvalidNamespace { value: String },
    #[error("no API token configured and ANCHORSCAN_DEV_MODE is false")]
    MissingApiToken,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    if config.api.token.is_none() {
        if !config.dev_mode {
            return Err(ConfigGuardRailError::MissingApiToken);
        }
        warnings.push_with_hint(
            "No API token configured; requests are sent unauthenticated",
            "Set ANCHORSCAN_API_TOKEN or ANCHORSCAN_API_TOKEN_FILE before deploying",
        );
    }

    if config.api.is_plain_http() {
        warnings.push_with_hint(
            format!(
                "API base URL {} uses plain http; the bearer token travels unencrypted",
                config.api.base_url
            ),
            "Point ANCHORSCAN_API_BASE_URL at an https:// endpoint",
        );
    }

    if !config.radio.is_configured() {
        warnings.push_with_hint(
            "No radio bridge configured; the anchor will never be ready to scan",
            "Set ANCHORSCAN_RADIO_COMMAND or add a [radio] command to the config file",
        );
    }

    if config.orchestrator.debug_scan_secs == 0 {
        warnings.push("Debug scan length is zero; debug scans end immediately");
    }

    Ok(warnings)
}
