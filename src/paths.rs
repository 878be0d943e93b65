//! Path resolution for vhostctl
//!
//! # Environment Variables
//!
//! - `VHOSTCTL_CONFIG_DIR` - Override config directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `VHOSTCTL_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/vhostctl` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\vhostctl`
//!    - macOS/Linux: `~/.config/vhostctl`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "VHOSTCTL_CONFIG_DIR";

/// Config file name inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Template file name inside the config directory
pub const TEMPLATE_FILE: &str = "template.txt";

/// Get the vhostctl config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("vhostctl");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join("vhostctl");
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("vhostctl");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Default config file location
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// Resolve a configured path: expand it, then anchor relative results at `base`.
pub fn resolve(path: &str, base: &Path) -> PathBuf {
    let expanded = expand(path);
    if expanded.is_relative() {
        base.join(expanded)
    } else {
        expanded
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // The process environment is shared between test threads
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let saved: Vec<_> = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();
        for (key, value) in vars {
            // SAFETY: serialized by ENV_LOCK
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }
        let result = f();
        for (key, value) in saved {
            // SAFETY: serialized by ENV_LOCK
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env(&[(ENV_CONFIG_DIR, Some("/custom/config/path"))], || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/custom/config/path"));
        });
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        with_env(&[(ENV_CONFIG_DIR, Some("~/dotfiles/vhostctl"))], || {
            assert_eq!(config_dir().unwrap(), home.join("dotfiles").join("vhostctl"));
        });
    }

    #[cfg(unix)]
    #[test]
    fn test_xdg_config_home() {
        with_env(
            &[
                (ENV_CONFIG_DIR, None),
                ("XDG_CONFIG_HOME", Some("/tmp/xdg-config-test")),
            ],
            || {
                assert_eq!(
                    config_file().unwrap(),
                    PathBuf::from("/tmp/xdg-config-test/vhostctl/config.toml")
                );
            },
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_default_config_dir_unix() {
        with_env(&[(ENV_CONFIG_DIR, None), ("XDG_CONFIG_HOME", None)], || {
            let home = dirs::home_dir().unwrap();
            assert_eq!(config_dir().unwrap(), home.join(".config").join("vhostctl"));
        });
    }

    #[test]
    fn test_expand_with_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/test/path"), home.join("test").join("path"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }

    #[test]
    fn test_resolve_relative_to_base() {
        let base = Path::new("/etc/vhostctl");
        assert_eq!(resolve("template.txt", base), base.join("template.txt"));
        assert_eq!(resolve("/srv/t.txt", base), PathBuf::from("/srv/t.txt"));
    }
}
