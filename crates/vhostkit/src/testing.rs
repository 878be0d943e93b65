//! In-memory adapters for exercising the lifecycle without touching the
//! machine.
//!
//! Every fake is a cheap handle over shared state: clone it, hand one copy to
//! the [`Lifecycle`](crate::Lifecycle) and keep the other to inspect or to
//! inject failures.

use crate::backend::{ConfigStore, DocumentRoots, ResolutionStore, ServiceAction, ServiceControl};
use crate::error::{Error, Result};
use crate::locks::lock;
use crate::types::CommandOutput;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ============================================================================
// Config store
// ============================================================================

#[derive(Debug, Default)]
struct ConfigState {
    files: BTreeMap<PathBuf, String>,
    fail_write: bool,
    writes: usize,
}

/// Config files kept in a map keyed by full path.
#[derive(Debug, Clone)]
pub struct MemoryConfigStore {
    root: PathBuf,
    state: Arc<Mutex<ConfigState>>,
}

impl MemoryConfigStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            state: Arc::default(),
        }
    }

    /// Seed a file directly inside the store.
    pub fn insert(&self, file_name: &str, contents: &str) {
        lock(&self.state)
            .files
            .insert(self.root.join(file_name), contents.to_string());
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        lock(&self.state).files.get(path).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        lock(&self.state).files.keys().cloned().collect()
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        lock(&self.state).writes
    }

    /// Make every later write fail with a permission error.
    pub fn fail_writes(&self) {
        lock(&self.state).fail_write = true;
    }
}

impl ConfigStore for MemoryConfigStore {
    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail_write {
            return Err(Error::io(
                "create",
                path,
                io::Error::from(io::ErrorKind::PermissionDenied),
            ));
        }
        if state.files.contains_key(path) {
            return Err(Error::io(
                "create",
                path,
                io::Error::from(io::ErrorKind::AlreadyExists),
            ));
        }
        state.files.insert(path.to_path_buf(), contents.to_string());
        state.writes += 1;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match lock(&self.state).files.remove(path) {
            Some(_) => Ok(()),
            None => Err(Error::io(
                "remove",
                path,
                io::Error::from(io::ErrorKind::NotFound),
            )),
        }
    }

    fn read(&self, path: &Path) -> Result<String> {
        self.contents(path).ok_or_else(|| {
            Error::io("read", path, io::Error::from(io::ErrorKind::NotFound))
        })
    }

    fn entries(&self) -> Result<Vec<PathBuf>> {
        Ok(lock(&self.state)
            .files
            .keys()
            .filter(|p| p.parent() == Some(self.root.as_path()))
            .cloned()
            .collect())
    }
}

// ============================================================================
// Document roots
// ============================================================================

#[derive(Debug, Default)]
struct DirState {
    dirs: BTreeSet<PathBuf>,
    non_empty: BTreeSet<PathBuf>,
    fail_create: bool,
}

/// Directories tracked as a set of paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentRoots {
    state: Arc<Mutex<DirState>>,
}

impl MemoryDocumentRoots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        lock(&self.state).dirs.contains(path)
    }

    pub fn insert(&self, path: impl AsRef<Path>) {
        lock(&self.state).dirs.insert(path.as_ref().to_path_buf());
    }

    /// Pretend the directory has files in it, so removal fails.
    pub fn fill(&self, path: impl AsRef<Path>) {
        lock(&self.state)
            .non_empty
            .insert(path.as_ref().to_path_buf());
    }

    pub fn fail_creates(&self) {
        lock(&self.state).fail_create = true;
    }
}

impl DocumentRoots for MemoryDocumentRoots {
    fn create(&self, path: &Path, _mode: u32) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail_create {
            return Err(Error::io(
                "create directory",
                path,
                io::Error::from(io::ErrorKind::PermissionDenied),
            ));
        }
        if !state.dirs.insert(path.to_path_buf()) {
            return Err(Error::io(
                "create directory",
                path,
                io::Error::from(io::ErrorKind::AlreadyExists),
            ));
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let mut state = lock(&self.state);
        if state.non_empty.contains(path) {
            return Err(Error::io(
                "remove directory",
                path,
                io::Error::from(io::ErrorKind::DirectoryNotEmpty),
            ));
        }
        if !state.dirs.remove(path) {
            return Err(Error::io(
                "remove directory",
                path,
                io::Error::from(io::ErrorKind::NotFound),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Resolution store
// ============================================================================

#[derive(Debug, Default)]
struct HostsState {
    /// What a flush last wrote
    persisted: BTreeSet<(String, String)>,
    /// Working copy
    working: BTreeSet<(String, String)>,
    flushes: usize,
    fail_flush: bool,
}

/// Hosts table with an explicit persisted/working split.
#[derive(Debug, Clone, Default)]
pub struct MemoryHosts {
    state: Arc<Mutex<HostsState>>,
}

impl MemoryHosts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a persisted entry.
    pub fn seed(&self, address: &str, name: &str) {
        let mut state = lock(&self.state);
        let entry = (address.to_string(), name.to_string());
        state.persisted.insert(entry.clone());
        state.working.insert(entry);
    }

    /// Whether the persisted copy contains a mapping.
    pub fn persisted(&self, address: &str, name: &str) -> bool {
        lock(&self.state)
            .persisted
            .contains(&(address.to_string(), name.to_string()))
    }

    pub fn flushes(&self) -> usize {
        lock(&self.state).flushes
    }

    pub fn fail_flushes(&self) {
        lock(&self.state).fail_flush = true;
    }
}

impl ResolutionStore for MemoryHosts {
    fn refresh(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.working = state.persisted.clone();
        Ok(())
    }

    fn has(&self, address: &str, name: &str) -> bool {
        lock(&self.state)
            .working
            .contains(&(address.to_string(), name.to_string()))
    }

    fn add(&mut self, address: &str, name: &str) -> Result<()> {
        lock(&self.state)
            .working
            .insert((address.to_string(), name.to_string()));
        Ok(())
    }

    fn remove(&mut self, address: &str, name: &str) -> Result<()> {
        lock(&self.state)
            .working
            .remove(&(address.to_string(), name.to_string()));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail_flush {
            return Err(Error::ResolutionStore {
                path: PathBuf::from("/etc/hosts"),
                message: "write failed: read-only file system".to_string(),
            });
        }
        state.persisted = state.working.clone();
        state.flushes += 1;
        Ok(())
    }
}

// ============================================================================
// Service
// ============================================================================

#[derive(Debug, Default)]
struct ServiceState {
    calls: Vec<(ServiceAction, Vec<String>)>,
    failures: HashMap<ServiceAction, CommandOutput>,
    enabled: HashMap<String, bool>,
}

/// Service that records calls and answers from a script.
///
/// Enable/disable calls toggle the reported enabled state on success.
#[derive(Debug, Clone, Default)]
pub struct ScriptedService {
    state: Arc<Mutex<ServiceState>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `action` exit non-zero with the given output.
    pub fn fail(&self, action: ServiceAction, status: i32, output: &str) {
        lock(&self.state).failures.insert(
            action,
            CommandOutput {
                output: output.to_string(),
                status: Some(status),
            },
        );
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) {
        lock(&self.state).enabled.insert(name.to_string(), enabled);
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<(ServiceAction, Vec<String>)> {
        lock(&self.state).calls.clone()
    }

    pub fn actions(&self) -> Vec<ServiceAction> {
        lock(&self.state).calls.iter().map(|(a, _)| *a).collect()
    }
}

impl ServiceControl for ScriptedService {
    fn run(&self, action: ServiceAction, args: &[&str]) -> Result<CommandOutput> {
        let mut state = lock(&self.state);
        state
            .calls
            .push((action, args.iter().map(|a| (*a).to_string()).collect()));

        if let Some(failure) = state.failures.get(&action) {
            return Ok(failure.clone());
        }

        let subject = args.first().copied().unwrap_or_default();
        let output = match action {
            ServiceAction::EnableSite => {
                state.enabled.insert(subject.to_string(), true);
                format!("Enabling site {subject}.\n")
            }
            ServiceAction::DisableSite => {
                state.enabled.insert(subject.to_string(), false);
                format!("Site {subject} disabled.\n")
            }
            ServiceAction::Reload => "Restarting apache2 (via systemctl): apache2.service.\n".to_string(),
        };

        Ok(CommandOutput {
            output,
            status: Some(0),
        })
    }

    fn is_enabled(&self, name: &str) -> Option<bool> {
        lock(&self.state).enabled.get(name).copied()
    }
}
