//! `~/.ninelives/config.toml` loading.
//!
//! ```toml
//! [app]
//! backend = "ledger"
//! actor = "0x..."
//!
//! [ledger]
//! path = "${HOME}/.ninelives/ledger.db"
//! treasury = "0x2F8d4A19796AEeF838CaEaCAc22e0dA5D952c3be"
//!
//! [local]
//! path = "${HOME}/.ninelives/local.json"
//! ```
//!
//! Every section and key is optional. Path strings go through
//! [`expand_env_vars`] before use.

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;
use thiserror::Error;

/// Treasury the deployed game pays restorations into.
pub const DEFAULT_TREASURY: &str = "0x2F8d4A19796AEeF838CaEaCAc22e0dA5D952c3be";

/// Overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "NINELIVES_CONFIG";

const DATA_DIR_NAME: &str = ".ninelives";
const LEDGER_FILE: &str = "ledger.db";
const LOCAL_FILE: &str = "local.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// Which backend answers commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Authoritative SQLite ledger.
    #[default]
    Ledger,
    /// Local snapshot store with a mock wallet.
    Local,
}

impl BackendKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BackendKind::Ledger => "ledger",
            BackendKind::Local => "local",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NineLivesConfig {
    pub app: Option<AppConfig>,
    pub ledger: Option<StoreConfig>,
    pub local: Option<StoreConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    pub backend: Option<BackendKind>,
    /// Default actor address when none is given on the command line.
    pub actor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreConfig {
    pub path: Option<String>,
    pub treasury: Option<String>,
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

impl NineLivesConfig {
    /// Load from [`config_path`]. A missing file is `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.app
            .as_ref()
            .and_then(|app| app.backend)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn actor(&self) -> Option<&str> {
        self.app
            .as_ref()
            .and_then(|app| app.actor.as_deref())
            .map(str::trim)
            .filter(|actor| !actor.is_empty())
    }

    fn store(&self, kind: BackendKind) -> Option<&StoreConfig> {
        match kind {
            BackendKind::Ledger => self.ledger.as_ref(),
            BackendKind::Local => self.local.as_ref(),
        }
    }

    /// Storage path for `kind`, env-expanded, falling back to the data directory.
    #[must_use]
    pub fn store_path(&self, kind: BackendKind) -> PathBuf {
        self.store(kind)
            .and_then(|store| store.path.as_deref())
            .map(expand_env_vars)
            .filter(|path| !path.trim().is_empty())
            .map_or_else(|| default_store_path(kind), PathBuf::from)
    }

    /// Treasury address for `kind`, unparsed.
    #[must_use]
    pub fn treasury(&self, kind: BackendKind) -> String {
        self.store(kind)
            .and_then(|store| store.treasury.as_deref())
            .map(expand_env_vars)
            .map(|treasury| treasury.trim().to_string())
            .filter(|treasury| !treasury.is_empty())
            .unwrap_or_else(|| DEFAULT_TREASURY.to_string())
    }
}

/// `$NINELIVES_CONFIG` if set, else `~/.ninelives/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV_VAR).filter(|path| !path.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(DATA_DIR_NAME).join("config.toml"))
}

/// `~/.ninelives`, or `./.ninelives` when there is no home directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    dirs::home_dir().map_or_else(|| PathBuf::from(DATA_DIR_NAME), |home| home.join(DATA_DIR_NAME))
}

#[must_use]
pub fn default_store_path(kind: BackendKind) -> PathBuf {
    let file = match kind {
        BackendKind::Ledger => LEDGER_FILE,
        BackendKind::Local => LOCAL_FILE,
    };
    data_dir().join(file)
}
