use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Rotate headers and pace page fetches
    #[serde(default = "default_shaping")]
    pub shaping: bool,
    /// Downloads smaller than this are treated as error pages
    #[serde(default = "default_min_file_size")]
    pub min_file_size: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_max_file_age")]
    pub max_file_age_hours: u64,
    /// Honour HTTP_PROXY / HTTPS_PROXY / NO_PROXY from the environment
    #[serde(default = "default_system_proxy")]
    pub system_proxy: bool,
}

fn default_output_dir() -> String {
    dirs::download_dir()
        .map(|p| p.join("pinget").to_string_lossy().to_string())
        .unwrap_or_else(|| "downloads".to_string())
}

fn default_max_connections() -> usize {
    30
}

fn default_request_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_min_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    3000
}

fn default_shaping() -> bool {
    true
}

fn default_min_file_size() -> u64 {
    1024
}

fn default_chunk_size() -> usize {
    8192
}

fn default_max_file_age() -> u64 {
    2
}

fn default_system_proxy() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_connections: default_max_connections(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
            shaping: default_shaping(),
            min_file_size: default_min_file_size(),
            chunk_size: default_chunk_size(),
            max_file_age_hours: default_max_file_age(),
            system_proxy: default_system_proxy(),
        }
    }
}

impl Config {
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn config_dir() -> PathBuf {
    // ~/.config/pinget/ on every platform
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("pinget")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.yml")
}

pub fn get_config() -> Result<Config, Box<dyn std::error::Error>> {
    load_config(&config_path())
}

pub fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

pub fn save_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    store_config(config, &config_path())
}

pub fn store_config(config: &Config, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("nope.yml")).unwrap();
        assert_eq!(config.max_connections, 30);
        assert_eq!(config.min_file_size, 1024);
        assert!(config.shaping);
        assert!(config.system_proxy);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "output_dir: /srv/pins\nshaping: false\nsystem_proxy: false\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.output_dir, "/srv/pins");
        assert!(!config.shaping);
        assert!(!config.system_proxy);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.max_file_age_hours, 2);
    }

    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yml");
        let config = Config {
            min_delay_ms: 0,
            max_delay_ms: 250,
            ..Config::default()
        };

        store_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.max_delay_ms, 250);
        assert_eq!(loaded.min_delay_ms, 0);
    }
}
