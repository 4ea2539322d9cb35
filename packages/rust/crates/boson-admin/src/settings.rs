//! Runtime settings loader for boson-admin.
//!
//! Loads and merges:
//! - System defaults: `<PRJ_ROOT>/packages/conf/boson-admin.yaml`
//! - User overrides:  `<PRJ_CONFIG_HOME>/boson-admin/settings.yaml`
//!
//! Merge precedence is user over system; `BOSON_API_URL` beats both for the
//! backend base URL.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use boson_admin_client::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use serde::Deserialize;
use thiserror::Error;

use crate::events::ConsoleEvent;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/boson-admin.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "boson-admin/settings.yaml";
const DEFAULT_TOKEN_RELATIVE_PATH: &str = "boson-admin/session.json";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";
const API_URL_ENV: &str = "BOSON_API_URL";
const PROJECT_ROOT_ENV: &str = "PRJ_ROOT";
const CONFIG_HOME_ENV: &str = "PRJ_CONFIG_HOME";
static CONFIG_HOME_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

/// Merged settings file contents. Every field is optional so files can be layered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSettings {
    /// Backend connection.
    #[serde(default)]
    pub api: ApiSettings,
    /// Session persistence.
    #[serde(default)]
    pub session: SessionSettings,
}

/// `api:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSettings {
    /// API root, e.g. `https://admin.example.com/api/v1`.
    pub base_url: Option<String>,
    /// Per-request timeout; `0` disables it.
    pub timeout_secs: Option<u64>,
}

/// `session:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionSettings {
    /// Token file; relative paths resolve against the project root.
    pub token_path: Option<String>,
}

impl RuntimeSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            api: self.api.merge(overlay.api),
            session: self.session.merge(overlay.session),
        }
    }

    /// Client config from these settings plus the `BOSON_API_URL` override.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let env_url = non_empty_env(API_URL_ENV);
        ClientConfig {
            base_url: env_url
                .or_else(|| self.api.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout_secs: self.api.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Where the session tokens are persisted.
    #[must_use]
    pub fn token_path(&self) -> PathBuf {
        let locations = Locations::discover();
        match self
            .session
            .token_path
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            Some(configured) => locations.under_root(configured),
            None => locations.config_home.join(DEFAULT_TOKEN_RELATIVE_PATH),
        }
    }
}

impl ApiSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            base_url: overlay.base_url.or(self.base_url),
            timeout_secs: overlay.timeout_secs.or(self.timeout_secs),
        }
    }
}

impl SessionSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            token_path: overlay.token_path.or(self.token_path),
        }
    }
}

/// Load merged runtime settings (user overrides system).
#[must_use]
pub fn load_runtime_settings() -> RuntimeSettings {
    let (system_path, user_path) = runtime_settings_paths();
    load_runtime_settings_from_paths(&system_path, &user_path)
}

#[doc(hidden)]
#[must_use]
pub fn runtime_settings_paths() -> (PathBuf, PathBuf) {
    let locations = Locations::discover();
    (
        locations.root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH),
        locations.config_home.join(DEFAULT_USER_SETTINGS_RELATIVE_PATH),
    )
}

#[doc(hidden)]
#[must_use]
pub fn load_runtime_settings_from_paths(system: &Path, user: &Path) -> RuntimeSettings {
    layer_or_default(system).merge(layer_or_default(user))
}

/// Why one settings file was skipped.
#[derive(Debug, Error)]
enum LayerError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

impl LayerError {
    const fn event(&self) -> ConsoleEvent {
        match self {
            Self::Read { .. } => ConsoleEvent::SettingsReadFailed,
            Self::Parse { .. } => ConsoleEvent::SettingsParseFailed,
        }
    }
}

/// One settings file; `None` when it is absent or empty.
fn read_layer(path: &Path) -> Result<Option<RuntimeSettings>, LayerError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LayerError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_yaml::from_str(&raw).map_err(|source| LayerError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn layer_or_default(path: &Path) -> RuntimeSettings {
    match read_layer(path) {
        Ok(layer) => layer.unwrap_or_default(),
        Err(error) => {
            tracing::warn!(
                event = error.event().as_str(),
                error = %error,
                "settings file skipped; its values do not apply"
            );
            RuntimeSettings::default()
        }
    }
}

/// Set config-home override (used by CLI `--conf`).
///
/// The path can be absolute, or relative to `PRJ_ROOT`/cwd. The first value wins.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    let kept = CONFIG_HOME_OVERRIDE.get_or_init(|| path.clone());
    if kept != &path {
        tracing::warn!(
            event = ConsoleEvent::ConfigHomeOverrideIgnored.as_str(),
            kept = %kept.display(),
            ignored = %path.display(),
            "config home already chosen"
        );
    }
}

/// Directories settings and the session file resolve against.
struct Locations {
    root: PathBuf,
    config_home: PathBuf,
}

impl Locations {
    /// `PRJ_ROOT` (else cwd), and `--conf`, `PRJ_CONFIG_HOME` or `.config` under it.
    fn discover() -> Self {
        let root = non_empty_env(PROJECT_ROOT_ENV).map_or_else(
            || std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            PathBuf::from,
        );
        let config_home = CONFIG_HOME_OVERRIDE
            .get()
            .cloned()
            .or_else(|| non_empty_env(CONFIG_HOME_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_HOME_RELATIVE_PATH));
        Self {
            config_home: join_relative(&root, config_home),
            root,
        }
    }

    fn under_root(&self, path: impl Into<PathBuf>) -> PathBuf {
        join_relative(&self.root, path.into())
    }
}

fn join_relative(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
