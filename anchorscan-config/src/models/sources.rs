use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util::{non_empty_var, parse_bool_var};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub api: FileApiConfig,
    #[serde(default)]
    pub identity: FileIdentityConfig,
    #[serde(default)]
    pub scan: FileScanConfig,
    #[serde(default)]
    pub radio: FileRadioConfig,
    pub dev_mode: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileApiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
    /// Humantime string, e.g. `"30s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileIdentityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileScanConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_scan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_duplicates: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skew_margin_seconds: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileRadioConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub api_token_file: Option<PathBuf>,
    pub request_timeout: Option<String>,
    pub identity_path: Option<PathBuf>,
    pub poll_interval: Option<String>,
    pub namespace: Option<String>,
    pub debug_scan: Option<String>,
    pub radio_command: Option<String>,
    pub dev_mode: Option<bool>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: non_empty_var("ANCHORSCAN_CONFIG").map(PathBuf::from),
            api_base_url: non_empty_var("ANCHORSCAN_API_BASE_URL"),
            api_token: non_empty_var("ANCHORSCAN_API_TOKEN"),
            api_token_file: non_empty_var("ANCHORSCAN_API_TOKEN_FILE")
                .map(PathBuf::from),
            request_timeout: non_empty_var("ANCHORSCAN_REQUEST_TIMEOUT"),
            identity_path: non_empty_var("ANCHORSCAN_IDENTITY_PATH")
                .map(PathBuf::from),
            poll_interval: non_empty_var("ANCHORSCAN_POLL_INTERVAL"),
            namespace: non_empty_var("ANCHORSCAN_NAMESPACE"),
            debug_scan: non_empty_var("ANCHORSCAN_DEBUG_SCAN"),
            radio_command: non_empty_var("ANCHORSCAN_RADIO_COMMAND"),
            dev_mode: parse_bool_var("ANCHORSCAN_DEV_MODE"),
        }
    }
}
