use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const SETTINGS_FILE: &str = "settings.json";

/// Durable, non-secret connection defaults plus viewer preferences.
/// The password is never part of this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(rename = "selectedProtocol", default = "AppSettings::default_protocol")]
    pub selected_protocol: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default = "AppSettings::default_database")]
    pub database: String,
    #[serde(default = "AppSettings::default_username")]
    pub username: String,
    #[serde(default = "AppSettings::default_port")]
    pub port: String,
    // Ingestion backend serving /sources_list
    #[serde(rename = "backendUrl", default = "AppSettings::default_backend_url")]
    pub backend_url: String,
    // If None, query logs go to the OS temp dir
    #[serde(rename = "queryLogOverride", default)]
    pub query_log_override: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            selected_protocol: Self::default_protocol(),
            hostname: String::new(),
            database: Self::default_database(),
            username: Self::default_username(),
            port: Self::default_port(),
            backend_url: Self::default_backend_url(),
            query_log_override: None,
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/KG-Viewer
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("KG-Viewer");
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\KG-Viewer
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join("KG-Viewer");
            }
            return PathBuf::from("KG-Viewer");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/KG-Viewer or ~/.config/KG-Viewer
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join("KG-Viewer");
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join("KG-Viewer");
        }
    }

    pub(crate) fn default_protocol() -> String { "neo4j+s".to_string() }
    pub(crate) fn default_database() -> String { "neo4j".to_string() }
    pub(crate) fn default_username() -> String { "neo4j".to_string() }
    pub(crate) fn default_port() -> String { "7687".to_string() }
    pub(crate) fn default_backend_url() -> String { "http://localhost:8000".to_string() }

    /// Missing file means defaults.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let path = dir.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let mut f = fs::File::open(path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let v: Self = serde_json::from_str(&s)?;
        Ok(v)
    }

    pub fn save_to(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(SETTINGS_FILE);
        let s = serde_json::to_string_pretty(self)?;
        let mut f = fs::File::create(&path)?;
        f.write_all(s.as_bytes())?;
        Ok(path)
    }

    /// Return the directory where the settings file (settings.json) is stored.
    /// This is OS-specific and resolves to a per-user configuration directory.
    pub fn settings_dir() -> PathBuf {
        Self::config_dir()
    }

    /// Default query log directory when no override is set: OS temporary directory.
    /// Example: {temp_dir}/KG-Viewer/query-logs
    pub fn query_log_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push("KG-Viewer");
        p.push("query-logs");
        p
    }

    /// Effective query log directory honoring user override or falling back to OS temp.
    pub fn query_log_dir(&self) -> PathBuf {
        if let Some(p) = &self.query_log_override { return p.clone(); }
        Self::query_log_default_dir()
    }
}

/// Where settings are read from and written to for this run.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    dir: PathBuf,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self { dir: AppSettings::settings_dir() }
    }
}

impl SettingsStore {
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn load(&self) -> AppSettings {
        match AppSettings::load_from(&self.dir) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("settings in {} unreadable, using defaults: {}", self.dir.display(), e);
                AppSettings::default()
            }
        }
    }

    pub fn save(&self, settings: &AppSettings) -> anyhow::Result<PathBuf> {
        settings.save_to(&self.dir)
    }
}
