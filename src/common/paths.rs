//! Configuration file discovery
//!
//! Lookup order: `stepwise.toml` in the current directory, then the
//! per-user configuration directory.

use std::path::PathBuf;

/// Name used for the project directories
const APP_NAME: &str = "stepwise";

/// Name of the configuration file
pub const CONFIG_FILE: &str = "stepwise.toml";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/stepwise/`
/// - macOS: `~/Library/Application Support/stepwise/`
/// - Windows: `%APPDATA%\stepwise\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the per-user configuration file
pub fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Find the configuration file to use when none is given explicitly
pub fn discover_config() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    user_config_path().filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_config_path_names_file() {
        if let Some(path) = user_config_path() {
            assert!(path.ends_with(CONFIG_FILE));
        }
    }
}
