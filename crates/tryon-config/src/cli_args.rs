use std::path::PathBuf;

/// CLI arguments that override configuration values
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file path; skips upward discovery
    pub config_path: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub provider_timeout_secs: Option<u64>,
}
