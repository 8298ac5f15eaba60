//! Configuration loading and resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: the site logs a warning and
//! starts on defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::images::{IMAGE_PROBE_TIMEOUT, PLACEHOLDER_IMAGE_URL};
use crate::{Error, Result};

pub const ENV_CONFIG_FILE: &str = "NZP_CONFIG";
pub const ENV_DATABASE: &str = "NZP_DATABASE";
pub const ENV_IDENTITY_API_KEY: &str = "NZP_IDENTITY_API_KEY";

pub const DEFAULT_PORT: u16 = 5780;
pub const DEFAULT_APP_ID: &str = "nzpacks";
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 12 * 60 * 60;
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_LOGIN_URL: &str = "https://scenepacks-652656771624.us-central1.run.app/login/discord";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub identity: IdentityConfig,
    pub login: LoginConfig,
    pub images: ImageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Sessions untouched for this long are dropped
    pub session_idle_secs: u64,
    /// Upper bound on open sessions; the least recently used goes first
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl ServerConfig {
    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_path: Option<PathBuf>,
    /// App id segment of the collection path
    pub app_id: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            app_id: DEFAULT_APP_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

impl IdentityConfig {
    /// API key from the environment, else the config file
    ///
    /// A missing key is an initialization failure: no sign-in is possible.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var(ENV_IDENTITY_API_KEY) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Init(format!(
                    "Identity provider API key not set ({} or [identity] api_key)",
                    ENV_IDENTITY_API_KEY
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Where the browser goes to start the Discord OAuth handshake
    pub redirect_url: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            redirect_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Probe card images before serving them; off trusts every URL
    pub probe: bool,
    pub timeout_secs: u64,
    pub placeholder_url: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            probe: true,
            timeout_secs: IMAGE_PROBE_TIMEOUT.as_secs(),
            placeholder_url: PLACEHOLDER_IMAGE_URL.to_string(),
        }
    }
}

impl ImageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive used when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "nzp_site=debug,nzp_common=info,tower_http=info".to_string(),
        }
    }
}

impl SiteConfig {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load the config file
    ///
    /// An explicit path (CLI or `NZP_CONFIG`) must exist. Without one the
    /// platform locations are searched and a miss falls back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(ENV_CONFIG_FILE).ok().map(PathBuf::from));

        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path
            }
            None => match find_config_file() {
                Some(path) => path,
                None => {
                    warn!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        info!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }
}

/// Platform config file locations, first hit wins
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("nzpacks").join("config.toml"));
    let system_config = PathBuf::from("/etc/nzpacks/config.toml");

    user_config
        .into_iter()
        .chain(std::iter::once(system_config))
        .find(|p| p.exists())
}

/// Resolve the SQLite database path
pub fn resolve_database_path(cli_arg: Option<&Path>, config: &SiteConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ENV_DATABASE) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.store.database_path {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_database_path()
}

/// `<local data dir>/nzpacks/nzpacks.db`
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("nzpacks"))
        .unwrap_or_else(|| PathBuf::from("./nzpacks_data"))
        .join("nzpacks.db")
}

/// Resolve the listen port; the CLI value already includes `NZP_PORT`
pub fn resolve_port(cli_arg: Option<u16>, config: &SiteConfig) -> u16 {
    cli_arg.unwrap_or(config.server.port)
}
