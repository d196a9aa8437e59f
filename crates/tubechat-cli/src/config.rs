use config::{Config as ConfigLoader, ConfigBuilder, ConfigError, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::path::Path;
use tubechat_client::GatewayConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    // Secret (from ENV only)
    #[serde(skip)]
    pub cookie: Option<String>,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl From<&BackendConfig> for GatewayConfig {
    fn from(config: &BackendConfig) -> Self {
        let gateway = GatewayConfig::new(config.base_url.clone())
            .with_timeout_ms(config.timeout_ms)
            .with_connect_timeout_ms(config.connect_timeout_ms);
        match &config.cookie {
            Some(cookie) => gateway.with_cookie(cookie.clone()),
            None => gateway,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub show_timestamps: bool,
}

/// Environment variables and the keys they override
const ENV_OVERRIDES: [(&str, &str); 6] = [
    ("BACKEND_BASE_URL", "backend.base_url"),
    ("BACKEND_TIMEOUT_MS", "backend.timeout_ms"),
    ("BACKEND_CONNECT_TIMEOUT_MS", "backend.connect_timeout_ms"),
    ("LOG_LEVEL", "logging.level"),
    ("LOG_FORMAT", "logging.format"),
    ("UI_SHOW_TIMESTAMPS", "ui.show_timestamps"),
];

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. built-in defaults
    /// 2. config/default.toml
    /// 3. config/{ENV}.toml (ENV defaults to "dev")
    /// 4. Environment variables (BACKEND_*, LOG_*, UI_*)
    ///
    /// The session cookie is only read from `BACKEND_COOKIE`.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("config"), &env, |key| std::env::var(key).ok())
    }

    /// Load from `dir`, taking environment values from `lookup`
    pub fn load_from(
        dir: &Path,
        env: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut builder = with_defaults(ConfigLoader::builder())?
            .add_source(File::from(dir.join("default")).required(false))
            .add_source(File::from(dir.join(env)).required(false));

        for (var, key) in ENV_OVERRIDES {
            builder = builder.set_override_option(key, lookup(var))?;
        }

        let mut cfg: Config = builder.build()?.try_deserialize()?;
        cfg.backend.cookie = lookup("BACKEND_COOKIE").filter(|c| !c.trim().is_empty());

        Ok(cfg)
    }

    /// Load config from a specific file (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = with_defaults(ConfigLoader::builder())?.add_source(File::from(path.as_ref()));
        builder.build()?.try_deserialize()
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig::from(&self.backend)
    }
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .set_default("backend.base_url", "http://localhost:8000")?
        .set_default("backend.timeout_ms", 30_000)?
        .set_default("backend.connect_timeout_ms", 10_000)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "pretty")?
        .set_default("ui.show_timestamps", false)
}
