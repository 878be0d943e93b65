//! vhostctl configuration (`config.toml`)
//!
//! Every key is optional; a missing file means all defaults, which target a
//! Debian-style Apache install.

use crate::paths;
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vhostkit::backend::process::CommandLine;
use vhostkit::backend::service::ServiceCommands;
use vhostkit::{Adapters, DisableFailure, Layout, Lifecycle, Policy};

/// Commented config written by `vhostctl init`.
pub const DEFAULT_CONFIG: &str = r#"# vhostctl configuration

[paths]
sites_available = "/etc/apache2/sites-available"
sites_enabled = "/etc/apache2/sites-enabled"
web_root = "/var/www"
# Relative paths are resolved against this file's directory
template = "template.txt"
# Octal permission bits for new document roots
document_root_mode = "755"

[resolution]
hosts_file = "/etc/hosts"
address = "127.0.0.1"

[service]
enable = ["a2ensite"]
disable = ["a2dissite"]
reload = ["/etc/init.d/apache2", "restart"]
timeout_secs = 60

[policy]
# "warn" keeps destroying when the site cannot be disabled, "abort" stops
disable_failure = "warn"
# Undo completed steps when create or destroy fails part way
rollback = false

[http]
bind = "127.0.0.1:8080"
"#;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: PathsConfig,
    pub resolution: ResolutionConfig,
    pub service: ServiceConfig,
    pub policy: PolicyConfig,
    pub http: HttpConfig,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub sites_available: String,
    pub sites_enabled: String,
    pub web_root: String,
    pub template: String,
    pub document_root_mode: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sites_available: "/etc/apache2/sites-available".to_string(),
            sites_enabled: "/etc/apache2/sites-enabled".to_string(),
            web_root: "/var/www".to_string(),
            template: paths::TEMPLATE_FILE.to_string(),
            document_root_mode: "755".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolutionConfig {
    pub hosts_file: String,
    pub address: String,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            hosts_file: "/etc/hosts".to_string(),
            address: vhostkit::types::DEFAULT_LOOPBACK.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub enable: Vec<String>,
    pub disable: Vec<String>,
    pub reload: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enable: vec!["a2ensite".to_string()],
            disable: vec!["a2dissite".to_string()],
            reload: vec!["/etc/init.d/apache2".to_string(), "restart".to_string()],
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    pub disable_failure: DisableFailure,
    pub rollback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub bind: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => paths::config_file()?,
        };
        Self::load_from(&path)
    }

    /// Load a config file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut config = match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Could not read {}", path.display()));
            }
        };
        config.base_dir = base_dir;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn layout(&self) -> Result<Layout> {
        let mode = &self.paths.document_root_mode;
        let document_root_mode = u32::from_str_radix(mode.trim_start_matches("0o"), 8)
            .with_context(|| format!("paths.document_root_mode '{mode}' is not an octal mode"))?;

        Ok(Layout {
            sites_available: self.resolve(&self.paths.sites_available),
            sites_enabled: self.resolve(&self.paths.sites_enabled),
            web_root: self.resolve(&self.paths.web_root),
            loopback: self.resolution.address.clone(),
            document_root_mode,
        })
    }

    pub fn template_path(&self) -> PathBuf {
        self.resolve(&self.paths.template)
    }

    pub fn hosts_file(&self) -> PathBuf {
        self.resolve(&self.resolution.hosts_file)
    }

    pub fn service_commands(&self) -> Result<ServiceCommands> {
        let command = |key: &str, parts: &[String]| {
            CommandLine::from_parts(parts)
                .ok_or_else(|| anyhow!("service.{key} must name a program"))
        };
        Ok(ServiceCommands {
            enable: command("enable", &self.service.enable)?,
            disable: command("disable", &self.service.disable)?,
            reload: command("reload", &self.service.reload)?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    pub fn policy(&self) -> Policy {
        Policy {
            disable_failure: self.policy.disable_failure,
            rollback: self.policy.rollback,
        }
    }

    /// Wire the real adapters described by this config.
    pub fn lifecycle(&self) -> Result<Lifecycle> {
        let layout = self.layout()?;
        let adapters = Adapters::system(
            &layout,
            &self.hosts_file(),
            self.service_commands()?,
            self.timeout(),
        )
        .context("Could not open the hosts file")?;

        log::debug!(
            "Sites in {}, document roots in {}",
            layout.sites_available.display(),
            layout.web_root.display()
        );
        Ok(Lifecycle::new(layout, self.template_path(), adapters).with_policy(self.policy()))
    }

    fn resolve(&self, path: &str) -> PathBuf {
        paths::resolve(path, &self.base_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_defaults() {
        let parsed = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_empty_config_is_all_defaults() {
        let config = Config::parse("").unwrap();
        let layout = config.layout().unwrap();
        assert_eq!(layout, Layout::default());
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.policy(), Policy::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [paths]
            web_root = "/srv/www"
            document_root_mode = "0o750"

            [policy]
            disable_failure = "abort"
            rollback = true
            "#,
        )
        .unwrap();

        let layout = config.layout().unwrap();
        assert_eq!(layout.web_root, PathBuf::from("/srv/www"));
        assert_eq!(layout.document_root_mode, 0o750);
        assert_eq!(
            layout.sites_available,
            PathBuf::from("/etc/apache2/sites-available")
        );
        assert_eq!(config.policy().disable_failure, DisableFailure::Abort);
        assert!(config.policy().rollback);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Config::parse("[paths]\nwebroot = \"/srv\"\n").is_err());
    }

    #[test]
    fn test_bad_mode_is_reported() {
        let config = Config::parse("[paths]\ndocument_root_mode = \"rwx\"\n").unwrap();
        let err = config.layout().unwrap_err();
        assert!(err.to_string().contains("document_root_mode"));
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let config = Config::parse("[service]\nreload = []\n").unwrap();
        let err = config.service_commands().unwrap_err();
        assert!(err.to_string().contains("service.reload"));
    }

    #[test]
    fn test_service_commands() {
        let config = Config::parse("[service]\nreload = [\"systemctl\", \"reload\", \"apache2\"]\n")
            .unwrap();
        let commands = config.service_commands().unwrap();
        assert_eq!(commands.reload.display_with(&[]), "systemctl reload apache2");
        assert_eq!(commands.enable.display_with(&["a"]), "a2ensite a");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.template_path(), dir.path().join("template.txt"));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[paths]\ntemplate = \"templates/site.conf\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(
            config.template_path(),
            dir.path().join("templates").join("site.conf")
        );
        assert_eq!(config.hosts_file(), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn test_load_reports_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[paths\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }
}
