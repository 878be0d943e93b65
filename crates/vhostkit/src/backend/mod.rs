//! Adapters over the external systems a host spans.
//!
//! Each trait wraps exactly one system and exposes only what the
//! orchestrator needs, so the lifecycle can run against the real machine
//! or against in-memory fakes. Adapters never retry.

pub mod fs;
pub mod hosts;
pub mod process;
pub mod service;

use crate::error::Result;
use crate::types::CommandOutput;
use std::fmt;
use std::path::{Path, PathBuf};

/// The sites-available store of config files.
pub trait ConfigStore: Send + Sync {
    /// Create a new config file. Fails if the path already exists.
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Delete a config file.
    fn remove(&self, path: &Path) -> Result<()>;

    /// Read a config file back.
    fn read(&self, path: &Path) -> Result<String>;

    /// Every regular file directly inside the store, sorted by name.
    fn entries(&self) -> Result<Vec<PathBuf>>;
}

/// The tree of document root directories.
pub trait DocumentRoots: Send + Sync {
    /// Create a single directory. The parent must exist and the directory must not.
    fn create(&self, path: &Path, mode: u32) -> Result<()>;

    /// Remove an empty directory.
    fn remove(&self, path: &Path) -> Result<()>;
}

/// An address-to-name mapping store such as `/etc/hosts`.
///
/// Edits apply to an in-memory copy and reach the backing store only on
/// [`flush`](ResolutionStore::flush).
pub trait ResolutionStore: Send {
    /// Discard the in-memory copy and reload it from the backing store.
    fn refresh(&mut self) -> Result<()>;

    fn has(&self, address: &str, name: &str) -> bool;

    fn add(&mut self, address: &str, name: &str) -> Result<()>;

    /// Remove a mapping. Removing an absent mapping is not an error.
    fn remove(&mut self, address: &str, name: &str) -> Result<()>;

    /// Persist the in-memory copy.
    fn flush(&mut self) -> Result<()>;
}

/// Service operations the lifecycle triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceAction {
    /// Add a site to the active configuration set
    EnableSite,
    /// Remove a site from the active configuration set
    DisableSite,
    /// Make the active set take effect
    Reload,
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EnableSite => "enable",
            Self::DisableSite => "disable",
            Self::Reload => "reload",
        })
    }
}

/// The web server's process-managed configuration state.
pub trait ServiceControl: Send + Sync {
    /// Run the command behind `action`.
    ///
    /// A non-zero exit is reported through [`CommandOutput::status`], not as
    /// an error; errors mean the command could not run or timed out.
    fn run(&self, action: ServiceAction, args: &[&str]) -> Result<CommandOutput>;

    /// Whether a site is in the active set, if the service can tell.
    fn is_enabled(&self, _name: &str) -> Option<bool> {
        None
    }
}
