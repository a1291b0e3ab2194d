use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::transition::validation::DEFAULT_MIN_NOTES_LENGTH;

/// Main configuration structure for leadflow
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LeadflowConfig {
    /// Transition workflow settings
    pub workflow: WorkflowConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Minimum length of the justification notes
    pub min_notes_length: usize,
    /// How long the success state is shown before the form closes
    pub auto_close_delay_ms: u64,
    /// Upper bound on waiting for the mover, 0 waits forever
    pub submit_timeout_seconds: u64,
    /// Latency of the simulated mover used when no lead board is loaded
    pub simulated_latency_ms: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            min_notes_length: DEFAULT_MIN_NOTES_LENGTH,
            auto_close_delay_ms: 2000,
            submit_timeout_seconds: 30,
            simulated_latency_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
    /// Log transition counters on exit
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

impl LeadflowConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (leadflow.toml, .leadflow-rc)
    /// 3. Environment variables (LEADFLOW__WORKFLOW__MIN_NOTES_LENGTH, ...)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`load`](Self::load) with config files resolved against `dir`
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        let toml_path = dir.join("leadflow.toml");
        if toml_path.exists() {
            builder = builder.add_source(File::from(toml_path));
        }

        let rc_path = dir.join(".leadflow-rc");
        if rc_path.exists() {
            builder = builder.add_source(File::from(rc_path).format(config::FileFormat::Toml));
        }

        // Double underscore so field names may keep their single underscores
        builder = builder.add_source(
            Environment::with_prefix("LEADFLOW")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let leadflow_config: LeadflowConfig = config.try_deserialize()?;
        Ok(leadflow_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<LeadflowConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = LeadflowConfig::load_env_file();
        LeadflowConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static LeadflowConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}
