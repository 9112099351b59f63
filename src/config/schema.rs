use crate::infra::{write_atomically, ShutdownPolicy};
use crate::sessions::TransitionPolicy;
use anyhow::{Context, Result};
use directories::UserDirs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

const CONFIG_FILE_NAME: &str = "config.toml";
const SUPPORTED_STORAGE_BACKENDS: &[&str] = &["file", "memory"];
const SUPPORTED_ENGINE_MODES: &[&str] = &["log", "http"];

// ── Top-level config ──────────────────────────────────────────────

/// Top-level console configuration, loaded from `config.toml`.
///
/// Resolution order: `--config-dir` / `VRTA_CONFIG_DIR` env → `~/.vr-training-admin/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Directory holding `config.toml` - computed, not serialized
    #[serde(skip)]
    pub config_dir: PathBuf,
    /// Path to config.toml - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Display name of the console. Default: `"VR Training Admin"`.
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Session persistence (`[storage]`).
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session lifecycle rules (`[sessions]`).
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// External VR engine notifications (`[engine]`).
    #[serde(default)]
    pub engine: EngineConfig,

    /// Background job handling (`[dispatch]`).
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// HTTP API server (`[gateway]`).
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_application_name() -> String {
    "VR Training Admin".into()
}

// ── Storage ───────────────────────────────────────────────────────

/// Session persistence configuration (`[storage]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StorageConfig {
    /// `"file"` (JSON file on disk) or `"memory"` (lost on exit). Default: `"file"`.
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    /// Sessions file. Relative paths resolve against the config directory.
    #[serde(default = "default_sessions_file")]
    pub sessions_file: PathBuf,
}

fn default_storage_backend() -> String {
    "file".into()
}

fn default_sessions_file() -> PathBuf {
    PathBuf::from("data").join("sessions.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            sessions_file: default_sessions_file(),
        }
    }
}

// ── Sessions ──────────────────────────────────────────────────────

/// Session lifecycle configuration (`[sessions]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionsConfig {
    /// `"permissive"` accepts any status change; `"strict"` only lifecycle moves.
    #[serde(default)]
    pub transition_policy: TransitionPolicy,
    /// How many sessions the "recent sessions" views show. Default: `5`.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_recent_limit() -> usize {
    5
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            transition_policy: TransitionPolicy::default(),
            recent_limit: default_recent_limit(),
        }
    }
}

// ── Engine ────────────────────────────────────────────────────────

/// VR engine notification configuration (`[engine]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EngineConfig {
    /// `"log"` writes payloads to the log; `"http"` POSTs them to `endpoint`. Default: `"log"`.
    #[serde(default = "default_engine_mode")]
    pub mode: String,
    /// Engine endpoint receiving integration payloads.
    #[serde(default = "default_engine_endpoint")]
    pub endpoint: String,
    /// Per-delivery timeout in seconds. Default: `10`.
    #[serde(default = "default_engine_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_engine_mode() -> String {
    "log".into()
}

fn default_engine_endpoint() -> String {
    "http://localhost:8081/api/vr-session".into()
}

fn default_engine_timeout_secs() -> u64 {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: default_engine_mode(),
            endpoint: default_engine_endpoint(),
            timeout_secs: default_engine_timeout_secs(),
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────────

/// Background job configuration (`[dispatch]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DispatchConfig {
    /// `"drain"` finishes queued notifications on shutdown; `"drop"` discards them.
    #[serde(default)]
    pub shutdown_policy: ShutdownPolicy,
    /// Upper bound on a draining shutdown, in seconds. Default: `10`.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

fn default_drain_timeout_secs() -> u64 {
    10
}

impl DispatchConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            shutdown_policy: ShutdownPolicy::default(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

// ── Gateway ───────────────────────────────────────────────────────

/// Gateway server configuration (`[gateway]` section).
///
/// Controls the JSON HTTP API over sessions and the reference catalog.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GatewayConfig {
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Gateway port (default: 8080)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Maximum accepted request body size in bytes (default: 64 KiB).
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            max_body_bytes: default_max_body_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        let config_dir = default_config_dir().unwrap_or_else(|_| PathBuf::from(".vr-training-admin"));

        Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
            application_name: default_application_name(),
            storage: StorageConfig::default(),
            sessions: SessionsConfig::default(),
            engine: EngineConfig::default(),
            dispatch: DispatchConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

fn default_config_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(".vr-training-admin"))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ConfigResolutionSource {
    EnvConfigDir,
    DefaultConfigDir,
}

impl ConfigResolutionSource {
    const fn as_str(self) -> &'static str {
        match self {
            Self::EnvConfigDir => "VRTA_CONFIG_DIR",
            Self::DefaultConfigDir => "default",
        }
    }
}

fn resolve_config_dir() -> Result<(PathBuf, ConfigResolutionSource)> {
    if let Ok(custom_config_dir) = std::env::var("VRTA_CONFIG_DIR") {
        let custom_config_dir = custom_config_dir.trim();
        if !custom_config_dir.is_empty() {
            return Ok((
                PathBuf::from(custom_config_dir),
                ConfigResolutionSource::EnvConfigDir,
            ));
        }
    }

    Ok((default_config_dir()?, ConfigResolutionSource::DefaultConfigDir))
}

impl Config {
    /// Load `config.toml` from the resolved config directory, writing the
    /// defaults there first if it does not exist yet.
    pub async fn load_or_init() -> Result<Self> {
        let (config_dir, resolution_source) = resolve_config_dir()?;
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        fs::create_dir_all(&config_dir).await.with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let initialized = !config_path.exists();
        let mut config = if initialized {
            let mut config = Config {
                config_dir: config_dir.clone(),
                config_path: config_path.clone(),
                ..Config::default()
            };
            config.save().await?;

            #[cfg(unix)]
            {
                use std::{fs::Permissions, os::unix::fs::PermissionsExt};
                let _ = fs::set_permissions(&config_path, Permissions::from_mode(0o600)).await;
            }
            config
        } else {
            let contents = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_dir = config_dir;
            config.config_path = config_path;
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        tracing::info!(
            path = %config.config_path.display(),
            source = resolution_source.as_str(),
            initialized,
            "Config loaded"
        );
        Ok(config)
    }

    /// Sessions file with relative paths resolved against the config directory.
    pub fn sessions_file_path(&self) -> PathBuf {
        if self.storage.sessions_file.is_absolute() {
            self.storage.sessions_file.clone()
        } else {
            self.config_dir.join(&self.storage.sessions_file)
        }
    }

    /// Validate configuration values that would cause runtime failures.
    ///
    /// Called after TOML deserialization and env-override application.
    pub fn validate(&self) -> Result<()> {
        // Gateway
        if self.gateway.host.trim().is_empty() {
            anyhow::bail!("gateway.host must not be empty");
        }
        if self.gateway.max_body_bytes == 0 {
            anyhow::bail!("gateway.max_body_bytes must be greater than 0");
        }
        if self.gateway.request_timeout_secs == 0 {
            anyhow::bail!("gateway.request_timeout_secs must be greater than 0");
        }

        // Storage
        let backend = self.storage.backend.trim();
        if !SUPPORTED_STORAGE_BACKENDS.contains(&backend) {
            anyhow::bail!(
                "storage.backend '{backend}' is invalid; expected one of: {}",
                SUPPORTED_STORAGE_BACKENDS.join(", ")
            );
        }
        if backend == "file" && self.storage.sessions_file.as_os_str().is_empty() {
            anyhow::bail!("storage.sessions_file must not be empty when storage.backend = \"file\"");
        }

        // Sessions
        if self.sessions.recent_limit == 0 {
            anyhow::bail!("sessions.recent_limit must be greater than 0");
        }

        // Engine
        let mode = self.engine.mode.trim();
        if !SUPPORTED_ENGINE_MODES.contains(&mode) {
            anyhow::bail!(
                "engine.mode '{mode}' is invalid; expected one of: {}",
                SUPPORTED_ENGINE_MODES.join(", ")
            );
        }
        if self.engine.timeout_secs == 0 {
            anyhow::bail!("engine.timeout_secs must be greater than 0");
        }
        if mode == "http" {
            validate_engine_endpoint(&self.engine.endpoint)?;
        }

        Ok(())
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        // Sessions file: VRTA_SESSIONS_FILE
        if let Ok(path) = std::env::var("VRTA_SESSIONS_FILE") {
            if !path.trim().is_empty() {
                self.storage.sessions_file = PathBuf::from(path.trim());
            }
        }

        // Storage backend: VRTA_STORAGE_BACKEND
        if let Ok(backend) = std::env::var("VRTA_STORAGE_BACKEND") {
            if !backend.trim().is_empty() {
                self.storage.backend = backend.trim().to_ascii_lowercase();
            }
        }

        // Engine endpoint and mode
        if let Ok(endpoint) = std::env::var("VRTA_ENGINE_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.engine.endpoint = endpoint.trim().to_string();
            }
        }
        if let Ok(mode) = std::env::var("VRTA_ENGINE_MODE") {
            if !mode.trim().is_empty() {
                self.engine.mode = mode.trim().to_ascii_lowercase();
            }
        }

        // Gateway port: VRTA_GATEWAY_PORT or PORT
        if let Ok(port_str) = std::env::var("VRTA_GATEWAY_PORT").or_else(|_| std::env::var("PORT"))
        {
            if let Ok(port) = port_str.trim().parse::<u16>() {
                self.gateway.port = port;
            }
        }

        // Gateway host: VRTA_GATEWAY_HOST or HOST
        if let Ok(host) = std::env::var("VRTA_GATEWAY_HOST").or_else(|_| std::env::var("HOST")) {
            if !host.is_empty() {
                self.gateway.host = host;
            }
        }

        // Transition policy: VRTA_TRANSITION_POLICY
        if let Ok(raw) = std::env::var("VRTA_TRANSITION_POLICY") {
            if let Some(policy) = TransitionPolicy::parse(&raw) {
                self.sessions.transition_policy = policy;
            } else {
                tracing::warn!(
                    policy = %raw,
                    "Ignoring invalid VRTA_TRANSITION_POLICY (valid: permissive|strict)"
                );
            }
        }
    }

    /// Atomically write the config to `config_path`.
    pub async fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        write_atomically(&self.config_path, toml_str.as_bytes())
            .await
            .with_context(|| format!("Failed to save config: {}", self.config_path.display()))
    }
}

fn validate_engine_endpoint(endpoint: &str) -> Result<()> {
    let url = reqwest::Url::parse(endpoint.trim())
        .with_context(|| format!("engine.endpoint is not a valid URL: {endpoint}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => anyhow::bail!("engine.endpoint must use http or https, got '{other}'"),
    }
}
