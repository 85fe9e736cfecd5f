use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Domain prefix for generated short links
  pub short_domain: String,
  /// Artificial delay before a shortened link is produced
  pub shorten_delay_ms: u64,
  /// Database location (defaults to $XDG_DATA_HOME/linkmaster/linkmaster.db)
  pub database: Option<PathBuf>,
  pub worker: WorkerConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      short_domain: "https://lnkmstr.com".to_string(),
      shorten_delay_ms: 2000,
      database: None,
      worker: WorkerConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
  /// Origin the worker is registered for; manifest paths resolve against it
  pub origin: String,
  /// Current cache generation name. Bumping it invalidates every older bucket.
  pub cache_name: String,
  /// Cached document served to HTML requests when the network is down
  pub offline_document: String,
  /// Static assets pre-warmed at install time
  pub assets: Vec<String>,
  pub sync_item_delay_ms: u64,
}

impl Default for WorkerConfig {
  fn default() -> Self {
    Self {
      origin: "http://localhost:8080".to_string(),
      cache_name: "linkmaster-cache-v1".to_string(),
      offline_document: "/index.html".to_string(),
      assets: [
        "/",
        "/index.html",
        "/style.css",
        "/script.js",
        "/manifest.json",
        "/tools/url-shortener.html",
        "/tools/qr-generator.html",
        "/tools/bio-links.html",
        "/tools/link-tracking.html",
      ]
      .iter()
      .map(|s| s.to_string())
      .collect(),
      sync_item_delay_ms: 1000,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./linkmaster.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/linkmaster/config.yaml
  ///
  /// Falls back to built-in defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("linkmaster.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("linkmaster").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty document deserializes to unit, not to a defaulted struct
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }
}
