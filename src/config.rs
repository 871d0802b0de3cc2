use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::jobs::{JsonQueueStore, LogNotifier, ProcessingQueue};
use crate::library::{JsonLibraryStore, SongLibrary};
use crate::player::PlayerOptions;
use crate::transport::EngineOptions;

/// Base directory for config, library and logs (~/.stemoxide/)
pub fn data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".stemoxide")
}

pub fn default_config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// User configuration; every field falls back to its default
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Transport poll period
    pub tick_interval_ms: u64,
    /// Lead between computing a start deadline and the deadline
    pub start_lead_ms: u64,
    /// Fader value for freshly loaded stems
    pub default_volume: f32,
    pub library_path: PathBuf,
    pub queue_path: PathBuf,
    pub log_path: PathBuf,
    pub theme: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let dir = data_dir();
        Self {
            tick_interval_ms: 100,
            start_lead_ms: 10,
            default_volume: 1.0,
            library_path: dir.join("library.json"),
            queue_path: dir.join("queue.json"),
            log_path: dir.join("stemoxide.log"),
            theme: "default".to_string(),
        }
    }
}

impl PlayerConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: PlayerConfig = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config.sanitized())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        self.tick_interval_ms = self.tick_interval_ms.clamp(10, 1000);
        self.start_lead_ms = self.start_lead_ms.clamp(1, 250);
        self.default_volume = self.default_volume.clamp(0.0, 1.0);
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            start_lead: Duration::from_millis(self.start_lead_ms),
            default_volume: self.default_volume,
        }
    }

    pub fn open_library(&self) -> Result<SongLibrary<JsonLibraryStore>> {
        SongLibrary::open(JsonLibraryStore::new(&self.library_path))
            .with_context(|| format!("Failed to open library {}", self.library_path.display()))
    }

    /// Processing queue at `queue_path`, announcing finished songs to the log
    pub fn open_queue(&self) -> Result<ProcessingQueue<JsonQueueStore, LogNotifier>> {
        ProcessingQueue::open(JsonQueueStore::new(&self.queue_path), LogNotifier)
            .with_context(|| format!("Failed to open queue {}", self.queue_path.display()))
    }

    pub fn player_options(&self) -> PlayerOptions {
        PlayerOptions {
            engine: self.engine_options(),
            tick_interval: Some(self.tick_interval()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let config = PlayerConfig::load(Path::new("/no/such/config.json")).unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.engine_options().start_lead, Duration::from_millis(10));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "start_lead_ms": 0, "default_volume": 0.5 }"#).unwrap();
        let config = PlayerConfig::load(&path).unwrap();
        assert_eq!(config.start_lead_ms, 1);
        assert_eq!(config.default_volume, 0.5);
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.theme, "default");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = PlayerConfig {
            theme: "tape".into(),
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(PlayerConfig::load(&path).unwrap().theme, "tape");
    }

    #[test]
    fn stores_follow_configured_paths() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlayerConfig {
            library_path: dir.path().join("songs.json"),
            queue_path: dir.path().join("jobs").join("pending.json"),
            ..Default::default()
        };

        let mut queue = config.open_queue().unwrap();
        assert!(queue.items().is_empty());
        queue.enqueue("s1", "https://example.com/track").unwrap();
        drop(queue);
        assert!(config.queue_path.is_file());
        assert_eq!(config.open_queue().unwrap().items()[0].session_id, "s1");

        assert!(config.open_library().unwrap().is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(PlayerConfig::load(&path).is_err());
    }
}
