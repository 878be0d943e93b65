//! Web server control through its command-line tools.
//!
//! Defaults target Debian-style Apache: `a2ensite`, `a2dissite` and the
//! init script restart.

use crate::backend::process::{CommandLine, run_combined};
use crate::backend::{ServiceAction, ServiceControl};
use crate::error::Result;
use crate::types::{CONFIG_EXTENSION, CommandOutput};
use std::path::PathBuf;
use std::time::Duration;

/// Default limit for a single service command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Commands used for each [`ServiceAction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCommands {
    pub enable: CommandLine,
    pub disable: CommandLine,
    pub reload: CommandLine,
}

impl Default for ServiceCommands {
    fn default() -> Self {
        Self {
            enable: CommandLine::new("a2ensite", &[]),
            disable: CommandLine::new("a2dissite", &[]),
            reload: CommandLine::new("/etc/init.d/apache2", &["restart"]),
        }
    }
}

/// Service adapter that shells out to the configured commands.
#[derive(Debug, Clone)]
pub struct SystemService {
    commands: ServiceCommands,
    sites_enabled: PathBuf,
    timeout: Duration,
}

impl SystemService {
    pub fn new(commands: ServiceCommands, sites_enabled: impl Into<PathBuf>) -> Self {
        Self {
            commands,
            sites_enabled: sites_enabled.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, action: ServiceAction) -> &CommandLine {
        match action {
            ServiceAction::EnableSite => &self.commands.enable,
            ServiceAction::DisableSite => &self.commands.disable,
            ServiceAction::Reload => &self.commands.reload,
        }
    }
}

impl ServiceControl for SystemService {
    fn run(&self, action: ServiceAction, args: &[&str]) -> Result<CommandOutput> {
        let command = self.command(action);
        log::info!("Running {} command: {}", action, command.display_with(args));
        let output = run_combined(command, args, self.timeout)?;
        log::debug!("{} exited with {:?}", command.program, output.status);
        Ok(output)
    }

    fn is_enabled(&self, name: &str) -> Option<bool> {
        if !self.sites_enabled.is_dir() {
            return None;
        }
        let link = self.sites_enabled.join(format!("{name}.{CONFIG_EXTENSION}"));
        Some(link.exists() || link.is_symlink())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn echo_service(enabled_dir: &std::path::Path) -> SystemService {
        let commands = ServiceCommands {
            enable: CommandLine::new("echo", &["Enabling site"]),
            disable: CommandLine::new("sh", &["-c", "echo 'Site not enabled' >&2; exit 1", "sh"]),
            reload: CommandLine::new("echo", &["Restarting apache2"]),
        };
        SystemService::new(commands, enabled_dir).with_timeout(Duration::from_secs(10))
    }

    #[test]
    fn test_run_passes_site_name() {
        let dir = tempfile::tempdir().unwrap();
        let service = echo_service(dir.path());

        let out = service.run(ServiceAction::EnableSite, &["a.test"]).unwrap();
        assert!(out.success());
        assert_eq!(out.output, "Enabling site a.test\n");
    }

    #[test]
    fn test_non_zero_exit_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = echo_service(dir.path());

        let out = service.run(ServiceAction::DisableSite, &["a.test"]).unwrap();
        assert_eq!(out.status, Some(1));
        assert_eq!(out.output, "Site not enabled\n");
    }

    #[test]
    fn test_is_enabled_reads_sites_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let service = echo_service(dir.path());
        assert_eq!(service.is_enabled("a.test"), Some(false));

        std::fs::write(dir.path().join("a.test.conf"), "").unwrap();
        assert_eq!(service.is_enabled("a.test"), Some(true));

        let missing = echo_service(&dir.path().join("missing"));
        assert_eq!(missing.is_enabled("a.test"), None);
    }

    #[test]
    fn test_default_commands() {
        let commands = ServiceCommands::default();
        assert_eq!(commands.enable.display_with(&["a"]), "a2ensite a");
        assert_eq!(commands.disable.display_with(&["a"]), "a2dissite a");
        assert_eq!(commands.reload.display_with(&[]), "/etc/init.d/apache2 restart");
    }
}
