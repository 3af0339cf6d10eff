//! # VoxWave Configuration
//!
//! Configuration management for the VoxWave relay:
//! - Loading configuration from YAML files
//! - Merging with the embedded default configuration
//! - Environment variable overrides
//! - Typed getters and setters, including catalog token persistence
//!
//! There is no global singleton: `Config::load()` returns an `Arc<Config>`
//! that callers pass to whoever needs it.
//!
//! ## Usage
//!
//! ```no_run
//! use voxconfig::Config;
//!
//! let config = Config::load("")?;
//! let station = config.station()?;
//! config.set_catalog_token("fresh-token")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{info, warn};

/// Embedded default configuration
const DEFAULT_CONFIG: &str = include_str!("voxwave.yaml");

const ENV_CONFIG_DIR: &str = "VOXWAVE_CONFIG";
const ENV_PREFIX: &str = "VOXWAVE_CONFIG__";
const CONFIG_DIR_NAME: &str = ".voxwave";

const DEFAULT_STATION: &str = "user:onyourwave";
const DEFAULT_OUTPUT_FILE: &str = "input.raw";
const DEFAULT_FFMPEG: &str = "ffmpeg";
const DEFAULT_VOLUME: u16 = 100;
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 60;
const DEFAULT_TRANSCODE_TIMEOUT_SECS: u64 = 120;

/// Configuration manager for VoxWave
///
/// Holds the merged YAML tree behind a mutex; setters write the file back
/// immediately so restarts pick up persisted values (notably the catalog
/// token).
#[derive(Debug)]
pub struct Config {
    config_dir: PathBuf,
    path: PathBuf,
    data: Mutex<Value>,
}

impl Config {
    /// Pick the config directory: explicit parameter, then the
    /// `VOXWAVE_CONFIG` environment variable, then an existing `.voxwave`
    /// in the current or home directory, defaulting to a local `.voxwave`
    fn find_config_dir(directory: &str) -> PathBuf {
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }
        if let Ok(from_env) = env::var(ENV_CONFIG_DIR) {
            info!(path = %from_env, "Config directory taken from the environment");
            return PathBuf::from(from_env);
        }

        let local = PathBuf::from(CONFIG_DIR_NAME);
        if local.is_dir() {
            return local;
        }
        match home_dir().map(|home| home.join(CONFIG_DIR_NAME)) {
            Some(in_home) if in_home.is_dir() => in_home,
            _ => local,
        }
    }

    fn ensure_config_dir(path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        if !path.is_dir() {
            return Err(anyhow!("config path {} is not a directory", path.display()));
        }
        Ok(())
    }

    /// Loads the configuration from the specified directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `VOXWAVE_CONFIG` environment variable
    /// 3. `.voxwave` in the current directory
    /// 4. `.voxwave` in the user's home directory
    ///
    /// The embedded defaults are merged with `config.yaml` if present,
    /// environment overrides (`VOXWAVE_CONFIG__section__key`) applied, and
    /// the merged result written back.
    pub fn load(directory: &str) -> Result<Arc<Self>> {
        let config_dir = Self::find_config_dir(directory);
        Self::ensure_config_dir(&config_dir)?;
        info!(config_dir = %config_dir.display(), "Using config directory");

        let path = config_dir.join("config.yaml");

        // Embedded defaults are the base; the external file wins per key.
        let mut data: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        match fs::read(&path) {
            Ok(bytes) => {
                let external: Value = serde_yaml::from_slice(&bytes)?;
                merge_external(&mut data, external);
                info!(config_file = %path.display(), "Loaded config file");
            }
            Err(_) => {
                info!(config_file = %path.display(), "Config file not found, using embedded defaults");
            }
        }

        Self::apply_env_overrides(&mut data);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(data),
        };

        config.save()?;
        Ok(Arc::new(config))
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let data = self.data.lock().unwrap();
        let yaml = serde_yaml::to_string(&*data)?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// The directory this configuration lives in
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Sets a configuration value at the specified path and saves it
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        Self::set_value_internal(&mut data, path, value)?;
        drop(data);
        self.save()?;
        Ok(())
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        let Some((head, rest)) = path.split_first() else {
            *data = value;
            return Ok(());
        };
        let map = data
            .as_mapping_mut()
            .ok_or_else(|| anyhow!("cannot set {} inside a scalar", path.join(".")))?;
        let key = Value::String(head.to_lowercase());
        if rest.is_empty() {
            map.insert(key, value);
        } else {
            let slot = map
                .entry(key)
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            Self::set_value_internal(slot, rest, value)?;
        }
        Ok(())
    }

    /// Gets a configuration value at the specified path
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock().unwrap();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut node = data;
        for (depth, segment) in path.iter().enumerate() {
            let map = node
                .as_mapping()
                .ok_or_else(|| anyhow!("{} is not a section", path[..depth].join(".")))?;
            node = map
                .get(&Value::String(segment.to_lowercase()))
                .ok_or_else(|| anyhow!("no value at {}", path[..=depth].join(".")))?;
        }
        Ok(node.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (name, raw) in env::vars() {
            let Some(spec) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let path: Vec<&str> = spec.split("__").collect();
            // Values parse as YAML where possible (numbers, booleans),
            // falling back to a plain string.
            let value =
                serde_yaml::from_str(&raw).unwrap_or_else(|_| Value::String(raw.clone()));
            if let Err(e) = Self::set_value_internal(config, &path, value) {
                warn!(variable = %name, error = %e, "Ignoring malformed override");
            }
        }
    }

    fn get_string(&self, path: &[&str]) -> Option<String> {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Resolve a possibly relative path against the config directory and
    /// create it as a directory if missing
    fn resolve_and_create_dir(&self, dir_path: &str) -> Result<PathBuf> {
        let path = Path::new(dir_path);
        let absolute_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        };

        if !absolute_path.exists() {
            fs::create_dir_all(&absolute_path)?;
            info!(directory = %absolute_path.display(), "Created working directory");
        }

        Ok(absolute_path)
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Stored OAuth token, if any
    pub fn catalog_token(&self) -> Option<String> {
        self.get_string(&["catalog", "token"])
    }

    /// Persist the OAuth token for the next start
    pub fn set_catalog_token(&self, token: &str) -> Result<()> {
        self.set_value(&["catalog", "token"], Value::String(token.to_string()))
    }

    /// Configured catalog username, if any
    pub fn catalog_username(&self) -> Option<String> {
        self.get_string(&["catalog", "username"])
    }

    /// Configured catalog password, if any
    pub fn catalog_password(&self) -> Option<String> {
        self.get_string(&["catalog", "password"])
    }

    /// Station spec (`kind:tag`) for the bare play command
    pub fn station(&self) -> Result<String> {
        Ok(self
            .get_string(&["catalog", "station"])
            .unwrap_or_else(|| DEFAULT_STATION.to_string()))
    }

    // ========================================================================
    // Audio
    // ========================================================================

    /// Staging directory for downloads, created if missing
    pub fn work_dir(&self) -> Result<PathBuf> {
        let configured = self
            .get_string(&["audio", "work_dir"])
            .unwrap_or_else(|| "staging".to_string());
        self.resolve_and_create_dir(&configured)
    }

    /// Path of the PCM file the sink reads, inside the config directory
    pub fn output_path(&self) -> Result<PathBuf> {
        let file = self
            .get_string(&["audio", "output_file"])
            .unwrap_or_else(|| DEFAULT_OUTPUT_FILE.to_string());
        let path = Path::new(&file);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.config_dir.join(path))
        }
    }

    /// ffmpeg executable to invoke
    pub fn ffmpeg_path(&self) -> String {
        self.get_string(&["audio", "ffmpeg_path"])
            .unwrap_or_else(|| DEFAULT_FFMPEG.to_string())
    }

    /// Initial playout volume in percent
    pub fn volume(&self) -> u16 {
        match self.get_value(&["audio", "volume"]) {
            Ok(Value::Number(n)) => n.as_u64().map(|v| v as u16).unwrap_or(DEFAULT_VOLUME),
            _ => DEFAULT_VOLUME,
        }
    }

    /// Persist the playout volume
    pub fn set_volume(&self, volume: u16) -> Result<()> {
        self.set_value(&["audio", "volume"], Value::Number(volume.into()))
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Download timeout in seconds
    pub fn download_timeout_secs(&self) -> u64 {
        self.get_u64(
            &["pipeline", "download_timeout_secs"],
            DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        )
    }

    /// Transcode timeout in seconds
    pub fn transcode_timeout_secs(&self) -> u64 {
        self.get_u64(
            &["pipeline", "transcode_timeout_secs"],
            DEFAULT_TRANSCODE_TIMEOUT_SECS,
        )
    }

    fn get_u64(&self, path: &[&str], default: u64) -> u64 {
        match self.get_value(path) {
            Ok(Value::Number(n)) => n.as_u64().unwrap_or(default),
            _ => default,
        }
    }
}

/// Merge `external` into `default`, lowercasing external keys on the way
/// in; external values win, nested maps merge per key. The embedded
/// defaults are already lowercase.
fn merge_external(default: &mut Value, external: Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                let k = match k {
                    Value::String(s) => Value::String(s.to_lowercase()),
                    other => other,
                };
                match dmap.get_mut(&k) {
                    Some(slot) => merge_external(slot, v),
                    None => {
                        let mut fresh = Value::Mapping(Mapping::new());
                        merge_external(&mut fresh, v);
                        dmap.insert(k, fresh);
                    }
                }
            }
        }
        // Scalars and sequences are replaced wholesale.
        (slot, v) => *slot = v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_writes_merged_defaults_to_disk() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path().to_str().unwrap()).unwrap();

        assert!(dir.path().join("config.yaml").exists());
        assert_eq!(config.station().unwrap(), "user:onyourwave");
        assert_eq!(config.volume(), 100);
        assert_eq!(config.download_timeout_secs(), 60);
        assert_eq!(config.transcode_timeout_secs(), 120);
    }

    #[test]
    fn empty_token_reads_as_none() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path().to_str().unwrap()).unwrap();
        assert!(config.catalog_token().is_none());
        assert!(config.catalog_username().is_none());
    }

    #[test]
    fn token_survives_a_reload() {
        let dir = tempdir().unwrap();
        let dir_str = dir.path().to_str().unwrap();

        let config = Config::load(dir_str).unwrap();
        config.set_catalog_token("persisted-token").unwrap();

        let reloaded = Config::load(dir_str).unwrap();
        assert_eq!(reloaded.catalog_token().as_deref(), Some("persisted-token"));
    }

    #[test]
    fn external_values_override_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "catalog:\n  station: \"genre:jazz\"\naudio:\n  volume: 80\n",
        )
        .unwrap();

        let config = Config::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.station().unwrap(), "genre:jazz");
        assert_eq!(config.volume(), 80);
        // Untouched sections keep their defaults.
        assert_eq!(config.ffmpeg_path(), "ffmpeg");
    }

    #[test]
    fn work_dir_is_created_under_the_config_dir() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path().to_str().unwrap()).unwrap();

        let work_dir = config.work_dir().unwrap();
        assert!(work_dir.is_dir());
        assert!(work_dir.starts_with(dir.path()));
    }

    #[test]
    fn keys_are_case_insensitive() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "CATALOG:\n  TOKEN: \"abc\"\n",
        )
        .unwrap();

        let config = Config::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.catalog_token().as_deref(), Some("abc"));
    }

    #[test]
    fn sections_new_to_the_defaults_are_kept() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "Extra:\n  Nested:\n    Flag: true\n",
        )
        .unwrap();

        let config = Config::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(
            config.get_value(&["extra", "nested", "flag"]).unwrap(),
            Value::Bool(true)
        );
    }
}
