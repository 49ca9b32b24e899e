pub mod sources;

use std::path::PathBuf;
use std::time::Duration;

use anchorscan_core::orchestrator::OrchestratorConfig;
use url::Url;

/// Fully resolved agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    /// File holding the persisted anchor identifier.
    pub identity_path: PathBuf,
    pub orchestrator: OrchestratorConfig,
    pub radio: RadioConfig,
    pub dev_mode: bool,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub token: Option<String>,
    pub request_timeout: Duration,
}

impl ApiConfig {
    pub fn is_plain_http(&self) -> bool {
        self.base_url.scheme() == "http"
    }
}

/// External helper process that owns the radio.
#[derive(Debug, Clone, Default)]
pub struct RadioConfig {
    pub program: Option<String>,
    pub args: Vec<String>,
}

impl RadioConfig {
    pub fn from_command_line(words: Vec<String>) -> Self {
        let mut words = words.into_iter();
        Self {
            program: words.next(),
            args: words.collect(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.program.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
    /// Token was read from `ANCHORSCAN_API_TOKEN_FILE` or `token_file`.
    pub token_from_file: bool,
}
