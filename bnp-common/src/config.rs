//! Configuration loading
//!
//! Two tiers:
//! 1. **Bootstrap** (`BootstrapConfig`): paths and bind address, resolved once at startup
//!    from command line > TOML config file > compiled defaults.
//! 2. **Station settings** (`Settings`): the BirdNET-Pi `birdnet.conf` (`KEY=value` lines),
//!    held in a `SettingsHandle` and re-read only through an explicit `reload()`.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Default HTTP bind address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Default location of the station settings file
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/birdnet/birdnet.conf";

/// Bootstrap configuration file contents
///
/// Every field is optional; anything missing falls back to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// BirdNET-Pi installation directory (contains `scripts/`)
    #[serde(default)]
    pub base_path: Option<PathBuf>,

    /// Station settings file (`birdnet.conf`)
    #[serde(default)]
    pub settings_path: Option<PathBuf>,

    /// Detection database
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Image cache database
    #[serde(default)]
    pub image_cache_path: Option<PathBuf>,

    /// HTTP bind address
    #[serde(default)]
    pub bind_addr: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log filter directive (trace, debug, info, warn, error or an EnvFilter string)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line (or their environment fallbacks)
#[derive(Debug, Clone, Default)]
pub struct BootstrapOverrides {
    pub config_file: Option<PathBuf>,
    pub base_path: Option<PathBuf>,
    pub settings_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub bind_addr: Option<String>,
}

/// Fully resolved bootstrap configuration
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub base_path: PathBuf,
    pub settings_path: PathBuf,
    pub database_path: PathBuf,
    pub image_cache_path: PathBuf,
    pub bind_addr: String,
    pub log_level: String,
}

impl BootstrapConfig {
    /// Resolve bootstrap configuration
    ///
    /// Priority per field: override > TOML file > compiled default.
    /// An explicitly named config file must exist; the implicit platform
    /// locations are optional.
    pub fn resolve(overrides: &BootstrapOverrides) -> Result<Self> {
        let toml_config = match &overrides.config_file {
            Some(path) => load_toml_config(path)?,
            None => match default_config_file() {
                Some(path) => load_toml_config(&path).unwrap_or_else(|e| {
                    warn!("Ignoring unreadable config file {}: {}", path.display(), e);
                    TomlConfig::default()
                }),
                None => {
                    debug!("No bootstrap config file found, using defaults");
                    TomlConfig::default()
                }
            },
        };

        Ok(Self::merge(overrides, toml_config))
    }

    /// Merge overrides onto an already loaded TOML config
    pub fn merge(overrides: &BootstrapOverrides, toml_config: TomlConfig) -> Self {
        let base_path = overrides
            .base_path
            .clone()
            .or(toml_config.base_path)
            .unwrap_or_else(default_base_path);

        let scripts_dir = base_path.join("scripts");

        let settings_path = overrides
            .settings_path
            .clone()
            .or(toml_config.settings_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));

        let database_path = overrides
            .database_path
            .clone()
            .or(toml_config.database_path)
            .unwrap_or_else(|| scripts_dir.join("birds.db"));

        let image_cache_path = toml_config
            .image_cache_path
            .unwrap_or_else(|| scripts_dir.join("image_cache.db"));

        let bind_addr = overrides
            .bind_addr
            .clone()
            .or(toml_config.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        Self {
            base_path,
            settings_path,
            database_path,
            image_cache_path,
            bind_addr,
            log_level: toml_config.logging.level,
        }
    }
}

/// Parse a bootstrap TOML file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
}

/// Platform config file location, if one exists
///
/// Tries `~/.config/bnp/config.toml` first, then `/etc/bnp/config.toml`.
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("bnp").join("config.toml"));
    let system_config = PathBuf::from("/etc/bnp/config.toml");

    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }
    if system_config.exists() {
        return Some(system_config);
    }
    None
}

/// Default BirdNET-Pi installation directory (`~/BirdNET-Pi`)
fn default_base_path() -> PathBuf {
    dirs::home_dir()
        .map(|d| d.join("BirdNET-Pi"))
        .unwrap_or_else(|| PathBuf::from("/home/pi/BirdNET-Pi"))
}

fn home_dir_string() -> String {
    dirs::home_dir()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "/home/pi".to_string())
}

/// Station settings from `birdnet.conf`
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub site_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub database_lang: String,
    pub color_scheme: String,
    pub model: String,
    pub confidence: f64,
    pub sensitivity: f64,
    pub overlap: f64,
    pub recs_dir: PathBuf,
    pub extracted_dir: PathBuf,
    pub birdweather_id: String,
    pub flickr_api_key: String,
    pub image_provider: String,
}

impl Default for Settings {
    fn default() -> Self {
        let recs_dir = PathBuf::from(home_dir_string()).join("BirdSongs");
        Self {
            site_name: "BirdNET-Pi".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            database_lang: "en".to_string(),
            color_scheme: "light".to_string(),
            model: "BirdNET_GLOBAL_6K_V2.4_Model_FP16".to_string(),
            confidence: 0.7,
            sensitivity: 1.0,
            overlap: 0.0,
            extracted_dir: recs_dir.join("Extracted"),
            recs_dir,
            birdweather_id: String::new(),
            flickr_api_key: String::new(),
            image_provider: "flickr".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a `birdnet.conf` file
    ///
    /// A missing file is not an error: defaults are used and a warning logged.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                info!("Loaded station settings from {}", path.display());
                Ok(Self::from_conf_str(&content))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Settings file {} not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(Error::Config(format!(
                "Cannot read settings file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Build settings from `KEY=value` text
    pub fn from_conf_str(content: &str) -> Self {
        let values = parse_conf(content);
        let defaults = Self::default();

        let text = |key: &str, default: &str| -> String {
            values
                .get(key)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };
        let number = |key: &str, default: f64| -> f64 {
            match values.get(key) {
                Some(raw) if !raw.is_empty() => raw.parse().unwrap_or_else(|_| {
                    warn!("Invalid numeric setting {}='{}', using {}", key, raw, default);
                    default
                }),
                _ => default,
            }
        };

        let recs_dir = values
            .get("RECS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.recs_dir);
        let extracted_dir = values
            .get("EXTRACTED")
            .map(PathBuf::from)
            .unwrap_or_else(|| recs_dir.join("Extracted"));

        Self {
            site_name: text("SITE_NAME", &defaults.site_name),
            latitude: number("LATITUDE", defaults.latitude),
            longitude: number("LONGITUDE", defaults.longitude),
            database_lang: text("DATABASE_LANG", &defaults.database_lang),
            color_scheme: text("COLOR_SCHEME", &defaults.color_scheme),
            model: text("MODEL", &defaults.model),
            confidence: number("CONFIDENCE", defaults.confidence),
            sensitivity: number("SENSITIVITY", defaults.sensitivity),
            overlap: number("OVERLAP", defaults.overlap),
            recs_dir,
            extracted_dir,
            birdweather_id: text("BIRDWEATHER_ID", ""),
            flickr_api_key: text("FLICKR_API_KEY", ""),
            image_provider: text("IMAGE_PROVIDER", &defaults.image_provider),
        }
    }

    /// Per-date artifact tree (`<extracted>/By_Date`)
    pub fn by_date_dir(&self) -> PathBuf {
        self.extracted_dir.join("By_Date")
    }

    /// Daily chart images (`<extracted>/Charts`)
    pub fn charts_dir(&self) -> PathBuf {
        self.extracted_dir.join("Charts")
    }
}

/// Parse shell-style `KEY=value` lines
///
/// Blank lines and `#` comments are skipped, surrounding quotes removed and
/// `$HOME` / `${KEY}` references to earlier keys expanded.
pub fn parse_conf(content: &str) -> HashMap<String, String> {
    let mut values: HashMap<String, String> = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let raw = raw.trim();
        let (value, expand) = if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
            (&raw[1..raw.len() - 1], false)
        } else if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            (&raw[1..raw.len() - 1], true)
        } else {
            (raw, true)
        };

        let value = if expand {
            expand_vars(value, &values)
        } else {
            value.to_string()
        };
        values.insert(key.to_string(), value);
    }

    values
}

fn expand_vars(value: &str, known: &HashMap<String, String>) -> String {
    let lookup = |name: &str| -> String {
        if let Some(v) = known.get(name) {
            v.clone()
        } else if name == "HOME" {
            home_dir_string()
        } else {
            String::new()
        }
    };

    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'{') {
            chars.next();
            let name: String = chars.by_ref().take_while(|&ch| ch != '}').collect();
            out.push_str(&lookup(&name));
        } else {
            let mut name = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_ascii_alphanumeric() || ch == '_' {
                    name.push(ch);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                out.push('$');
            } else {
                out.push_str(&lookup(&name));
            }
        }
    }
    out
}

/// Shared, explicitly reloadable station settings
///
/// Readers take a cheap `Arc` snapshot; `reload()` swaps the snapshot.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    path: Option<PathBuf>,
    current: Arc<RwLock<Arc<Settings>>>,
}

impl SettingsHandle {
    /// Load settings from `path` and keep the path for later reloads
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = Settings::load(&path)?;
        Ok(Self {
            path: Some(path),
            current: Arc::new(RwLock::new(Arc::new(settings))),
        })
    }

    /// Handle over fixed in-memory settings (reload is a no-op)
    pub fn fixed(settings: Settings) -> Self {
        Self {
            path: None,
            current: Arc::new(RwLock::new(Arc::new(settings))),
        }
    }

    /// Current settings snapshot
    pub fn current(&self) -> Arc<Settings> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Re-read the settings file and publish the new snapshot
    pub fn reload(&self) -> Result<Arc<Settings>> {
        let Some(path) = &self.path else {
            return Ok(self.current());
        };

        let settings = Arc::new(Settings::load(path)?);
        match self.current.write() {
            Ok(mut guard) => *guard = Arc::clone(&settings),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&settings),
        }
        info!("Station settings reloaded from {}", path.display());
        Ok(settings)
    }
}
