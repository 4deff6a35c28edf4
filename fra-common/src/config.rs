//! Configuration loading and root folder resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is never fatal: the service logs a warning and starts
//! with compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the TOML config file location
pub const CONFIG_ENV_VAR: &str = "FRA_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "FRA_ROOT_FOLDER";

/// Default upload size limit (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing level when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// How registry lookups are performed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortalMode {
    /// Built-in simulated registry (no network)
    #[default]
    Simulated,
    /// JSON POST to the configured state portal
    Http,
}

/// Portal section of the TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub mode: PortalMode,
    /// Replaces every state's portal URL (useful for a local registry mirror)
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            mode: PortalMode::Simulated,
            base_url: None,
            timeout_secs: 10,
        }
    }
}

/// OCR section of the TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// External OCR command (e.g. "tesseract"); plain-text reading when absent
    pub command: Option<String>,
}

/// Contents of `fra-pv.toml`
///
/// All keys are optional; anything missing falls back to [`CompiledDefaults`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub max_upload_bytes: Option<usize>,
    pub default_state: Option<String>,
    pub api_key: Option<String>,
    pub logging: LoggingConfig,
    pub ocr: OcrConfig,
    pub portal: PortalConfig,
}

/// Compiled fallback values for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind: String,
    pub max_upload_bytes: usize,
    pub default_state: String,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: get_default_root_folder(),
            bind: "127.0.0.1:5730".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            default_state: "Tamil Nadu".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Locate the TOML config file for a module
///
/// Order: `$FRA_CONFIG`, then `~/.config/fra/<module>.toml`, then
/// `/etc/fra/<module>.toml` (Linux only). Returns `None` when nothing exists.
pub fn config_file_path(module_name: &str) -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    let file_name = format!("{}.toml", module_name);
    if let Some(user_config) = dirs::config_dir().map(|d| d.join("fra").join(&file_name)) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/fra").join(&file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the module's TOML config, degrading to defaults on any problem
pub fn load_toml_config_or_default(module_name: &str) -> TomlConfig {
    let Some(path) = config_file_path(module_name) else {
        info!("No config file found for {}, using compiled defaults", module_name);
        return TomlConfig::default();
    };

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} - using compiled defaults", e);
            TomlConfig::default()
        }
    }
}

/// Resolves the root folder holding uploads and the result database
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_root: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        let default = CompiledDefaults::for_current_platform().root_folder;
        info!(
            module = %self.module_name,
            "Using default root folder {}",
            default.display()
        );
        default
    }
}

/// Creates the root folder layout
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create root and uploads folders if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.uploads_path())?;
        Ok(())
    }

    /// SQLite database holding the verification result log
    pub fn database_path(&self) -> PathBuf {
        self.root.join("fra.db")
    }

    /// Folder receiving uploaded Patta documents
    pub fn uploads_path(&self) -> PathBuf {
        self.root.join("uploads").join("patta_verification")
    }
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("fra"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/fra"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("fra"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/fra"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("fra"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\fra"))
    } else {
        PathBuf::from("./fra_data")
    }
}
