use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    autosave: AutosaveConfig,
    #[serde(default)]
    sync: SyncConfig,
}

#[derive(Deserialize, Default)]
struct AutosaveConfig {
    enabled: Option<bool>,
    interval_seconds: Option<u64>,
    initial_delay_seconds: Option<u64>,
}

#[derive(Deserialize, Default)]
struct SyncConfig {
    hub: Option<String>,
}

pub struct Config {
    autosave: AutosaveConfig,
    sync: SyncConfig,
}

impl Config {
    pub fn load() -> Self {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => {
                            merge_autosave(&mut base.autosave, user.autosave);
                            merge_sync(&mut base.sync, user.sync);
                        }
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Config {
            autosave: base.autosave,
            sync: base.sync,
        }
    }

    /// Whether periodic autosave is enabled.
    pub fn autosave_enabled(&self) -> bool {
        self.autosave.enabled.unwrap_or(true)
    }

    /// Autosave interval (seconds clamped to 5..86400).
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave.interval_seconds.unwrap_or(60).clamp(5, 86_400))
    }

    /// Delay before the first autosave tick after a composition becomes
    /// active (seconds clamped to 0..3600).
    pub fn autosave_initial_delay(&self) -> Duration {
        Duration::from_secs(
            self.autosave
                .initial_delay_seconds
                .unwrap_or(10)
                .clamp(0, 3_600),
        )
    }

    /// Default sync hub address.
    pub fn hub_addr(&self) -> &str {
        self.sync.hub.as_deref().unwrap_or("127.0.0.1:7420")
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("beltane").join("config.toml"))
}

fn merge_autosave(base: &mut AutosaveConfig, user: AutosaveConfig) {
    if user.enabled.is_some() {
        base.enabled = user.enabled;
    }
    if user.interval_seconds.is_some() {
        base.interval_seconds = user.interval_seconds;
    }
    if user.initial_delay_seconds.is_some() {
        base.initial_delay_seconds = user.initial_delay_seconds;
    }
}

fn merge_sync(base: &mut SyncConfig, user: SyncConfig) {
    if user.hub.is_some() {
        base.hub = user.hub;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults() {
        let base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap();
        let config = Config {
            autosave: base.autosave,
            sync: base.sync,
        };
        assert!(config.autosave_enabled());
        assert_eq!(config.autosave_interval(), Duration::from_secs(60));
        assert_eq!(config.autosave_initial_delay(), Duration::from_secs(10));
        assert_eq!(config.hub_addr(), "127.0.0.1:7420");
    }

    #[test]
    fn user_values_override() {
        let base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap();
        let user: ConfigFile = toml::from_str(
            "[autosave]\nenabled = false\ninterval_seconds = 15\n",
        )
        .unwrap();

        let mut autosave = base.autosave;
        merge_autosave(&mut autosave, user.autosave);
        let config = Config {
            autosave,
            sync: base.sync,
        };

        assert!(!config.autosave_enabled());
        assert_eq!(config.autosave_interval(), Duration::from_secs(15));
        // Keys the user did not set keep the embedded default.
        assert_eq!(config.autosave_initial_delay(), Duration::from_secs(10));
    }

    #[test]
    fn interval_is_clamped() {
        let config = Config {
            autosave: AutosaveConfig {
                enabled: None,
                interval_seconds: Some(1),
                initial_delay_seconds: Some(100_000),
            },
            sync: SyncConfig::default(),
        };
        assert_eq!(config.autosave_interval(), Duration::from_secs(5));
        assert_eq!(config.autosave_initial_delay(), Duration::from_secs(3_600));
    }
}
