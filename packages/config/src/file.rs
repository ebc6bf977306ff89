use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use youtube_player_models::{PlayerOptions, PlayerVars};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] json5::Error),
    #[error("Config directory not found")]
    ConfigDirNotFound,
}

/// Contents of `config.json5` in the config directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    /// Defaults applied to every `initialize` call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<PlayerDefaults>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// Player options used when the caller leaves them unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy_enhanced: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_vars: Option<PlayerVars>,
}

impl PlayerDefaults {
    /// Fills the options the caller did not set.
    pub fn apply(&self, options: &mut PlayerOptions) {
        if options.privacy_enhanced.is_none() {
            options.privacy_enhanced = self.privacy_enhanced;
        }
        if options.debug.is_none() {
            options.debug = self.debug;
        }
        if let Some(defaults) = &self.player_vars {
            options
                .player_vars
                .get_or_insert_with(PlayerVars::default)
                .fill_from(defaults);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Env filter directives, e.g. `youtube_player=debug`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Log file name inside the logs directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Get the path to a config file, preferring .json5 but also checking .json
fn get_config_file_path(dir: &Path, filename: &str) -> Option<PathBuf> {
    let json5_path = dir.join(format!("{filename}.json5"));
    if json5_path.exists() {
        return Some(json5_path);
    }

    let json_path = dir.join(format!("{filename}.json"));
    if json_path.exists() {
        return Some(json_path);
    }

    None
}

fn load_config_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = json5::from_str(&content)?;
    Ok(config)
}

/// Load the plugin configuration from `dir`
///
/// # Errors
///
/// * If the config file cannot be read
/// * If the config file is malformed
pub fn load_config_from(dir: &Path) -> Result<PluginConfig, ConfigError> {
    get_config_file_path(dir, "config").map_or_else(
        || {
            log::debug!("load_config_from: no config file in {}", dir.display());
            Ok(PluginConfig::default())
        },
        |path| {
            log::debug!("load_config_from: loading {}", path.display());
            load_config_file(&path)
        },
    )
}

/// Load the plugin configuration from the config directory
///
/// # Errors
///
/// * If the config directory cannot be found
/// * If the config file cannot be read
/// * If the config file is malformed
pub fn load_config() -> Result<PluginConfig, ConfigError> {
    let config_dir = crate::get_config_dir_path().ok_or(ConfigError::ConfigDirNotFound)?;

    load_config_from(&config_dir)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use youtube_player_models::PlayerSize;

    use super::*;

    #[test_log::test]
    fn parses_json5_config() {
        let json5_content = r#"{
            // applied to every player
            defaults: {
                privacyEnhanced: true,
                playerVars: {
                    rel: 0,
                    playsinline: 1,
                },
            },
            logging: {
                level: "youtube_player=trace",
            },
        }"#;

        let config: PluginConfig = json5::from_str(json5_content).unwrap();
        let defaults = config.defaults.unwrap();

        assert_eq!(defaults.privacy_enhanced, Some(true));
        assert_eq!(defaults.player_vars.unwrap().playsinline, Some(1));
        assert_eq!(
            config.logging.unwrap().level.as_deref(),
            Some("youtube_player=trace")
        );
    }

    #[test_log::test]
    fn defaults_only_fill_unset_options() {
        let defaults = PlayerDefaults {
            privacy_enhanced: Some(true),
            debug: Some(true),
            player_vars: Some(PlayerVars {
                rel: Some(0),
                autoplay: Some(1),
                ..PlayerVars::default()
            }),
        };
        let mut options = PlayerOptions::new("p1", "v", PlayerSize::default());
        options.debug = Some(false);
        options.player_vars = Some(PlayerVars {
            autoplay: Some(0),
            ..PlayerVars::default()
        });

        defaults.apply(&mut options);

        assert_eq!(options.privacy_enhanced, Some(true));
        assert_eq!(options.debug, Some(false));
        let vars = options.player_vars.unwrap();
        assert_eq!(vars.autoplay, Some(0));
        assert_eq!(vars.rel, Some(0));
    }

    #[test_log::test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(load_config_from(dir.path()).unwrap(), PluginConfig::default());
    }

    #[test_log::test]
    fn json5_file_wins_over_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), r#"{"defaults": {"debug": false}}"#).unwrap();
        fs::write(dir.path().join("config.json5"), "{defaults: {debug: true}}").unwrap();

        let config = load_config_from(dir.path()).unwrap();

        assert_eq!(config.defaults.unwrap().debug, Some(true));
    }

    #[test_log::test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json5"), "{defaults: ").unwrap();

        assert!(matches!(
            load_config_from(dir.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test_log::test]
    #[serial]
    fn load_config_reads_from_the_root_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"logging": {"file": "player.log"}}"#,
        )
        .unwrap();
        crate::set_root_dir(dir.path().to_path_buf());

        let config = load_config().unwrap();

        assert_eq!(config.logging.unwrap().file.as_deref(), Some("player.log"));
    }
}
