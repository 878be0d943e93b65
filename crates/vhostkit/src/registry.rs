//! Host registry: which hosts exist, read from the sites store.

use crate::backend::{ConfigStore, ServiceControl};
use crate::error::Result;
use crate::types::{Host, HostName, Layout};
use std::path::Path;

/// Read-only view of registered hosts.
///
/// A host is registered iff its config file is in the sites store and is
/// not one of the reserved defaults. Listing never mutates anything.
pub struct Registry<'a> {
    layout: &'a Layout,
    configs: &'a dyn ConfigStore,
    service: Option<&'a dyn ServiceControl>,
}

impl<'a> Registry<'a> {
    pub fn new(layout: &'a Layout, configs: &'a dyn ConfigStore) -> Self {
        Self {
            layout,
            configs,
            service: None,
        }
    }

    /// Also report whether each host is enabled in the service.
    pub fn with_service(mut self, service: &'a dyn ServiceControl) -> Self {
        self.service = Some(service);
        self
    }

    /// All registered hosts, sorted by name.
    ///
    /// Every non-reserved file counts, even one whose stem `create` would
    /// refuse as a name.
    pub fn list(&self) -> Result<Vec<Host>> {
        let mut hosts: Vec<Host> = self
            .configs
            .entries()?
            .iter()
            .filter(|path| !Layout::is_reserved(path))
            .filter_map(|path| self.host_for(path))
            .collect();
        hosts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(hosts)
    }

    /// Whether a host named `name` is registered.
    ///
    /// Fails with `InvalidInput` for an empty or malformed name.
    pub fn exists(&self, name: &str) -> Result<bool> {
        let name = HostName::parse(name)?;
        self.contains(&name)
    }

    /// Look up a single registered host.
    pub fn get(&self, name: &str) -> Result<Option<Host>> {
        let name = HostName::parse(name)?;
        if !self.contains(&name)? {
            return Ok(None);
        }
        let mut host = self.layout.host(&name);
        host.enabled = self.service.and_then(|s| s.is_enabled(name.as_str()));
        Ok(Some(host))
    }

    pub(crate) fn contains(&self, name: &HostName) -> Result<bool> {
        let config_path = self.layout.config_path(name);
        Ok(self
            .configs
            .entries()?
            .iter()
            .filter(|path| !Layout::is_reserved(path))
            .any(|path| *path == config_path))
    }

    fn host_for(&self, path: &Path) -> Option<Host> {
        let stem = path.file_stem()?.to_string_lossy();
        let name = HostName::parse(&stem).unwrap_or_else(|e| {
            log::debug!("Listing {} as stored: {}", path.display(), e);
            HostName::from_stored(&stem)
        });
        let mut host = self.layout.host(&name);
        // Listing keys hosts by file name; keep the real path
        host.config_path = path.to_path_buf();
        host.enabled = self.service.and_then(|s| s.is_enabled(name.as_str()));
        Some(host)
    }
}
