use crate::model::Settings;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "streamly";
const SETTINGS_FILE: &str = "settings.json";
const PLAYLISTS_FILE: &str = "playlists.json";
const SERVER_PLAYLISTS_DIR: &str = "server-playlists";

pub const CONFIG_DIR_ENV: &str = "STREAMLY_CONFIG_DIR";
pub const BACKEND_URL_ENV: &str = "STREAMLY_BACKEND_URL";

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

#[derive(Debug, Clone)]
pub struct Paths {
    pub root: PathBuf,
}

impl Paths {
    pub fn resolve(explicit_root: Option<&Path>) -> Result<Self> {
        let root = match explicit_root {
            Some(root) => root.to_path_buf(),
            None => config_root()?,
        };
        Ok(Self { root })
    }

    pub fn settings(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn playlists(&self) -> PathBuf {
        self.root.join(PLAYLISTS_FILE)
    }

    pub fn server_playlists(&self) -> PathBuf {
        self.root.join(SERVER_PLAYLISTS_DIR)
    }

    pub fn ensure(&self) -> Result<&Path> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        Ok(&self.root)
    }
}

pub fn load_settings(paths: &Paths) -> Result<Settings> {
    let mut settings = load_settings_from(&paths.settings())?;
    if let Ok(url) = env::var(BACKEND_URL_ENV)
        && !url.trim().is_empty()
    {
        settings.backend_url = url.trim().to_string();
    }
    Ok(settings)
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    Ok(settings)
}

pub fn save_settings(paths: &Paths, settings: &Settings) -> Result<()> {
    paths.ensure()?;
    let path = paths.settings();
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
