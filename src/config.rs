//! Configuration management for search service credentials, batch sizes, and
//! paths.

use std::{
   fs,
   path::{Path, PathBuf},
   sync::OnceLock,
   time::Duration,
};

use directories::BaseDirs;
use figment::{
   Figment,
   providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Largest number of records pushed in one batch.
pub const MAX_BATCH_SIZE_CAP: usize = 2000;
/// Batch size used from inside a host request.
pub const ONLINE_BATCH_SIZE: usize = 5;
/// Soft wrap width applied to every body chunk.
pub const WRAP_WIDTH: usize = 250;

/// Application configuration loaded from config file and environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
   pub app_id:          String,
   pub admin_key:       String,
   pub search_only_key: String,
   pub index:           String,
   pub host:            Option<String>,

   pub request_timeout_ms: u64,
   pub max_batch_size:     usize,
   pub online_batch_size:  usize,
   pub wrap_width:         usize,

   pub catalog: Option<PathBuf>,
}

impl Default for Config {
   fn default() -> Self {
      Self {
         app_id:             String::new(),
         admin_key:          String::new(),
         search_only_key:    String::new(),
         index:              String::new(),
         host:               None,
         request_timeout_ms: 30_000,
         max_batch_size:     MAX_BATCH_SIZE_CAP,
         online_batch_size:  ONLINE_BATCH_SIZE,
         wrap_width:         WRAP_WIDTH,
         catalog:            None,
      }
   }
}

/// Validated connection settings for the remote index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterSettings {
   pub app_id:    String,
   pub api_key:   String,
   pub index:     String,
   pub base_url:  String,
   pub timeout:   Duration,
   pub max_batch: usize,
}

impl Config {
   pub fn load() -> Self {
      Self::load_with_file(None)
   }

   /// Layers defaults, the global config file, `extra` (if any) and
   /// `PUBSYNC_*` environment variables.
   pub fn load_with_file(extra: Option<&Path>) -> Self {
      let config_path = ensure_global_config();
      Self::figment(&config_path, extra)
         .extract()
         .inspect_err(|e| tracing::warn!("failed to parse config: {e}"))
         .unwrap_or_default()
   }

   fn figment(global: &Path, extra: Option<&Path>) -> Figment {
      let mut figment =
         Figment::from(Serialized::defaults(Self::default())).merge(Toml::file(global));
      if let Some(path) = extra {
         figment = figment.merge(Toml::file(path));
      }
      figment.merge(Env::prefixed("PUBSYNC_").lowercase(true))
   }

   /// Reads exactly one TOML file on top of the defaults.
   pub fn from_file(path: &Path) -> Result<Self> {
      Ok(
         Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .extract()?,
      )
   }

   pub fn save_to(&self, path: &Path) -> Result<()> {
      if let Some(parent) = path.parent() {
         fs::create_dir_all(parent)?;
      }
      fs::write(path, toml::to_string_pretty(self)?)?;
      Ok(())
   }

   fn create_default_config(path: &Path) {
      if let Some(parent) = path.parent() {
         let _ = fs::create_dir_all(parent);
      }
      if let Ok(toml) = toml::to_string_pretty(&Self::default()) {
         let _ = fs::write(path, toml);
      }
   }

   /// Returns the configured batch size, capped at maximum
   pub fn effective_max_batch_size(&self) -> usize {
      self.max_batch_size.clamp(1, MAX_BATCH_SIZE_CAP)
   }

   pub fn effective_online_batch_size(&self) -> usize {
      self
         .online_batch_size
         .clamp(1, self.effective_max_batch_size())
   }

   pub fn effective_wrap_width(&self) -> usize {
      self.wrap_width.max(1)
   }

   pub fn catalog_path(&self) -> PathBuf {
      self
         .catalog
         .clone()
         .unwrap_or_else(|| data_dir().join("catalog.json"))
   }

   /// Validates credentials and builds adapter settings.
   pub fn adapter_settings(&self) -> Result<AdapterSettings, ConfigError> {
      let app_id = required(&self.app_id, "app_id")?;
      let api_key = required(&self.admin_key, "admin_key")?;
      let index = required(&self.index, "index")?;

      let base_url = match self.host.as_deref().map(str::trim) {
         Some(host) if !host.is_empty() => {
            if !(host.starts_with("http://") || host.starts_with("https://")) {
               return Err(ConfigError::InvalidSetting(format!(
                  "host must be an http(s) URL, got {host}"
               )));
            }
            host.trim_end_matches('/').to_string()
         },
         _ => format!("https://{app_id}.algolia.net"),
      };

      Ok(AdapterSettings {
         app_id,
         api_key,
         index,
         base_url,
         timeout: Duration::from_millis(self.request_timeout_ms.max(1)),
         max_batch: self.effective_max_batch_size(),
      })
   }
}

fn required(value: &str, name: &'static str) -> Result<String, ConfigError> {
   let trimmed = value.trim();
   if trimmed.is_empty() {
      return Err(ConfigError::MissingSetting(name));
   }
   Ok(trimmed.to_string())
}

/// Returns the global configuration instance
pub fn get() -> &'static Config {
   CONFIG.get_or_init(Config::load)
}

/// Initializes config with an extra TOML file layered over the global one.
pub fn init_with_file(path: Option<&Path>) -> &'static Config {
   CONFIG.get_or_init(|| Config::load_with_file(path))
}

/// Returns the base directory for pubsync data and configuration
pub fn base_dir() -> &'static PathBuf {
   static ONCE: OnceLock<PathBuf> = OnceLock::new();
   ONCE.get_or_init(|| resolve_base_dir(".pubsync"))
}

fn ensure_global_config() -> PathBuf {
   let config_path = config_file_path();
   if !config_path.exists() {
      Config::create_default_config(config_path);
   }
   config_path.to_path_buf()
}

fn resolve_base_dir(dir_name: &str) -> PathBuf {
   BaseDirs::new()
      .map(|d| d.home_dir().join(dir_name))
      .or_else(|| {
         std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(dir_name))
      })
      .unwrap_or_else(|| {
         std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(dir_name)
      })
}

macro_rules! define_paths {
   ($($fn_name:ident: $path:literal),* $(,)?) => {
      $(
         pub fn $fn_name() -> &'static PathBuf {
            static ONCE: OnceLock<PathBuf> = OnceLock::new();
            ONCE.get_or_init(|| base_dir().join($path))
         }
      )*
   };
}

define_paths! {
   config_file_path: "config.toml",
   data_dir: "data",
}

#[cfg(test)]
mod tests {
   use super::*;

   fn configured() -> Config {
      Config {
         app_id: "APP123".into(),
         admin_key: " secret ".into(),
         index: "articles".into(),
         ..Config::default()
      }
   }

   #[test]
   fn missing_credentials_are_reported_by_name() {
      let cfg = Config { admin_key: String::new(), ..configured() };
      assert!(matches!(cfg.adapter_settings(), Err(ConfigError::MissingSetting("admin_key"))));

      let cfg = Config { index: "  ".into(), ..configured() };
      assert!(matches!(cfg.adapter_settings(), Err(ConfigError::MissingSetting("index"))));
   }

   #[test]
   fn default_host_is_derived_from_app_id() {
      let settings = configured().adapter_settings().unwrap();
      assert_eq!(settings.base_url, "https://APP123.algolia.net");
      assert_eq!(settings.api_key, "secret");
      assert_eq!(settings.max_batch, MAX_BATCH_SIZE_CAP);
   }

   #[test]
   fn host_override_must_be_http() {
      let cfg = Config { host: Some("ftp://example.org".into()), ..configured() };
      assert!(matches!(cfg.adapter_settings(), Err(ConfigError::InvalidSetting(_))));

      let cfg = Config { host: Some("http://127.0.0.1:9000/".into()), ..configured() };
      assert_eq!(cfg.adapter_settings().unwrap().base_url, "http://127.0.0.1:9000");
   }

   #[test]
   fn batch_sizes_are_clamped() {
      let cfg = Config { max_batch_size: 50_000, online_batch_size: 0, ..Config::default() };
      assert_eq!(cfg.effective_max_batch_size(), MAX_BATCH_SIZE_CAP);
      assert_eq!(cfg.effective_online_batch_size(), 1);
   }

   #[test]
   fn saved_settings_round_trip_through_toml() {
      let dir = tempfile::TempDir::new().unwrap();
      let path = dir.path().join("nested").join("settings.toml");
      let cfg = Config { wrap_width: 80, ..configured() };
      cfg.save_to(&path).unwrap();

      let loaded = Config::from_file(&path).unwrap();
      assert_eq!(loaded.app_id, "APP123");
      assert_eq!(loaded.wrap_width, 80);
      assert_eq!(loaded.online_batch_size, ONLINE_BATCH_SIZE);
   }
}
