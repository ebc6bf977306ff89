#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

#[cfg(feature = "macros")]
mod macros;
#[cfg(feature = "macros")]
pub use macros::*;

#[cfg(feature = "free_log")]
pub use free_log::*;

pub const LOG_ENV_VAR: &str = "YOUTUBE_PLAYER_LOG";

#[cfg(debug_assertions)]
pub const DEFAULT_LOG_LEVEL: &str = "youtube_player=debug,app_tauri_plugin_youtube_player=debug";
#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_LEVEL: &str = "youtube_player=info,app_tauri_plugin_youtube_player=info";

/// Picks the env filter: the plugin variable, then `RUST_LOG`, then `fallback`.
#[must_use]
pub fn resolve_env_filter(
    plugin_filter: Option<String>,
    rust_log: Option<String>,
    fallback: &str,
) -> String {
    plugin_filter
        .filter(|x| !x.trim().is_empty())
        .or_else(|| rust_log.filter(|x| !x.trim().is_empty()))
        .unwrap_or_else(|| fallback.to_string())
}

/// Reads [`LOG_ENV_VAR`] and `RUST_LOG` from the process environment.
#[must_use]
pub fn env_filter(fallback: &str) -> String {
    resolve_env_filter(
        std::env::var(LOG_ENV_VAR).ok(),
        std::env::var("RUST_LOG").ok(),
        fallback,
    )
}

#[cfg(feature = "free_log")]
mod free_log {
    use free_log_client::FreeLogLayer;
    use thiserror::Error;
    use youtube_player_config::make_logs_dir_path;

    pub use free_log_client;

    #[derive(Debug, Error)]
    pub enum InitError {
        #[error(transparent)]
        Logs(#[from] free_log_client::LogsInitError),
        #[error(transparent)]
        BuildLogsConfig(#[from] free_log_client::BuildLogsConfigError),
        #[error(transparent)]
        BuildFileWriterConfig(#[from] free_log_client::BuildFileWriterConfigError),
    }

    /// Installs the global logger.
    ///
    /// With a `filename`, debug-level logs are also written to
    /// `<config dir>/logs/<filename>`. `default_filter` is used when neither
    /// `YOUTUBE_PLAYER_LOG` nor `RUST_LOG` is set.
    ///
    /// # Errors
    ///
    /// * If the file writer could not be configured
    /// * If a global logger was already installed
    pub fn init(
        filename: Option<&str>,
        default_filter: Option<&str>,
    ) -> Result<FreeLogLayer, InitError> {
        let mut logs_config = free_log_client::LogsConfig::builder();

        if let Some(filename) = filename {
            if let Some(log_dir) = make_logs_dir_path() {
                logs_config = logs_config.with_file_writer(
                    free_log_client::FileWriterConfig::builder()
                        .file_path(log_dir.join(filename))
                        .log_level(free_log_client::Level::Debug),
                )?;
            } else {
                log::warn!("Could not get config dir to put the logs into");
            }
        }

        let filter = super::env_filter(default_filter.unwrap_or(super::DEFAULT_LOG_LEVEL));
        let layer = free_log_client::init(logs_config.env_filter(filter))?;

        Ok(layer)
    }
}
