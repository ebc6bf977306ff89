#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex, PoisonError},
};

#[cfg(feature = "file")]
pub mod file;

static ROOT_DIR: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

/// Sets the root directory for the player plugin configuration.
///
/// By default, the root directory is `~/.local/youtube-player`.
pub fn set_root_dir(path: PathBuf) {
    *ROOT_DIR.lock().unwrap_or_else(PoisonError::into_inner) = Some(path);
}

#[must_use]
fn get_root_dir() -> Option<PathBuf> {
    let mut root_dir = ROOT_DIR.lock().unwrap_or_else(PoisonError::into_inner);

    if root_dir.is_some() {
        return root_dir.clone();
    }

    *root_dir = home::home_dir().map(|home| home.join(".local").join("youtube-player"));

    root_dir.clone()
}

/// Returns the path to the configuration directory.
///
/// Defaults to `~/.local/youtube-player` unless overridden with [`set_root_dir`].
#[must_use]
pub fn get_config_dir_path() -> Option<PathBuf> {
    get_root_dir()
}

/// Returns the path to the log file directory, `<config dir>/logs`.
#[must_use]
pub fn get_logs_dir_path() -> Option<PathBuf> {
    get_config_dir_path().map(|config| config.join("logs"))
}

/// Returns the path to the configuration directory, creating it if it doesn't exist.
///
/// Returns `None` if the directory cannot be created or the path cannot be determined.
#[must_use]
pub fn make_config_dir_path() -> Option<PathBuf> {
    if let Some(path) = get_config_dir_path()
        && (path.is_dir() || std::fs::create_dir_all(&path).is_ok())
    {
        return Some(path);
    }

    None
}

/// Returns the path to the log file directory, creating it if it doesn't exist.
#[must_use]
pub fn make_logs_dir_path() -> Option<PathBuf> {
    if let Some(path) = get_logs_dir_path()
        && (path.is_dir() || std::fs::create_dir_all(&path).is_ok())
    {
        return Some(path);
    }

    log::debug!("make_logs_dir_path: unable to create logs directory");
    None
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    use super::*;

    #[test_log::test]
    #[serial]
    fn paths_follow_the_root_dir() {
        let dir = tempfile::tempdir().unwrap();
        set_root_dir(dir.path().join("root"));

        assert_eq!(get_config_dir_path(), Some(dir.path().join("root")));
        assert_eq!(get_logs_dir_path(), Some(dir.path().join("root").join("logs")));
    }

    #[test_log::test]
    #[serial]
    fn make_paths_create_the_directories() {
        let dir = tempfile::tempdir().unwrap();
        set_root_dir(dir.path().join("root"));

        let logs = make_logs_dir_path().unwrap();

        assert!(logs.is_dir());
        assert!(make_config_dir_path().unwrap().is_dir());
    }
}
