//! Create and destroy hosts across every resource they span.
//!
//! None of the four systems a host touches is transactional, so each
//! operation walks a fixed [plan](crate::step) and stops at the first failing
//! step. The error names that step. With rollback enabled, the steps that
//! already completed are undone in reverse order before the error is
//! returned.

use crate::backend::fs::{FsConfigStore, FsDocumentRoots};
use crate::backend::hosts::HostsFile;
use crate::backend::service::{ServiceCommands, SystemService};
use crate::backend::{ConfigStore, DocumentRoots, ResolutionStore, ServiceAction, ServiceControl};
use crate::error::{Error, Result};
use crate::locks::{HostLocks, lock};
use crate::registry::Registry;
use crate::step::{CREATE_PLAN, Compensation, DESTROY_PLAN, Step};
use crate::template::Template;
use crate::types::{Host, HostName, Layout, Outcome};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Confirmation appended to every successful destroy.
pub const DESTROYED_MESSAGE: &str = "Host is destroyed";

/// What destroy does when disabling the site fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisableFailure {
    /// Record a warning and keep going
    #[default]
    Warn,
    /// Stop and report the failure
    Abort,
}

/// Failure handling knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    pub disable_failure: DisableFailure,
    /// Undo completed steps when a later non-terminal step fails
    pub rollback: bool,
}

/// The concrete systems a [`Lifecycle`] drives.
pub struct Adapters {
    pub configs: Box<dyn ConfigStore>,
    pub document_roots: Box<dyn DocumentRoots>,
    pub resolution: Box<dyn ResolutionStore>,
    pub service: Box<dyn ServiceControl>,
}

impl Adapters {
    /// Adapters for this machine: the filesystem, a hosts file and the
    /// service's command-line tools.
    pub fn system(
        layout: &Layout,
        hosts_path: &Path,
        commands: ServiceCommands,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            configs: Box::new(FsConfigStore::new(&layout.sites_available)),
            document_roots: Box::new(FsDocumentRoots),
            resolution: Box::new(HostsFile::open(hosts_path)?),
            service: Box::new(
                SystemService::new(commands, &layout.sites_enabled).with_timeout(timeout),
            ),
        })
    }
}

/// Orchestrates create and destroy over a set of [`Adapters`].
///
/// Safe to share between threads. Operations on the same host name are
/// serialized; different names run concurrently.
pub struct Lifecycle {
    layout: Layout,
    template_path: PathBuf,
    configs: Box<dyn ConfigStore>,
    document_roots: Box<dyn DocumentRoots>,
    resolution: Mutex<Box<dyn ResolutionStore>>,
    service: Box<dyn ServiceControl>,
    policy: Policy,
    locks: HostLocks,
}

impl Lifecycle {
    pub fn new(layout: Layout, template_path: impl Into<PathBuf>, adapters: Adapters) -> Self {
        Self {
            layout,
            template_path: template_path.into(),
            configs: adapters.configs,
            document_roots: adapters.document_roots,
            resolution: Mutex::new(adapters.resolution),
            service: adapters.service,
            policy: Policy::default(),
            locks: HostLocks::new(),
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub fn registry(&self) -> Registry<'_> {
        Registry::new(&self.layout, self.configs.as_ref()).with_service(self.service.as_ref())
    }

    pub fn list(&self) -> Result<Vec<Host>> {
        self.registry().list()
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        self.registry().exists(name)
    }

    pub fn get(&self, name: &str) -> Result<Option<Host>> {
        self.registry().get(name)
    }

    /// Register a new host and bring it online.
    ///
    /// Fails with `AlreadyExists` before touching anything if the name is
    /// taken. The template is rendered up front, so a missing or malformed
    /// template also leaves the machine unchanged.
    pub fn create(&self, name: &str) -> Result<Outcome> {
        self.create_with(name, &mut |_| {})
    }

    /// [`create`](Self::create), handing each step's service output to
    /// `on_output` as soon as the step completes.
    pub fn create_with(&self, name: &str, on_output: &mut dyn FnMut(&str)) -> Result<Outcome> {
        let name = managed_name(name)?;
        let _guard = self.locks.acquire(name.as_str());

        if self.registry().contains(&name)? {
            return Err(Error::AlreadyExists {
                name: name.to_string(),
            });
        }

        let host = self.layout.host(&name);
        let config = Template::load(&self.template_path)?.render(&host);

        log::info!("Creating host {name}");
        let mut run = Run::new(self, &host);
        run.config = Some(config);
        run.walk(CREATE_PLAN, on_output)?;
        Ok(run.finish(None))
    }

    /// Take a host offline and delete everything it owns.
    ///
    /// There is no existence check: each step reports what it could not find.
    pub fn destroy(&self, name: &str) -> Result<Outcome> {
        self.destroy_with(name, &mut |_| {})
    }

    /// [`destroy`](Self::destroy), streaming service output like
    /// [`create_with`](Self::create_with).
    pub fn destroy_with(&self, name: &str, on_output: &mut dyn FnMut(&str)) -> Result<Outcome> {
        let name = managed_name(name)?;
        let _guard = self.locks.acquire(name.as_str());

        let host = self.layout.host(&name);

        log::info!("Destroying host {name}");
        let mut run = Run::new(self, &host);
        run.walk(DESTROY_PLAN, on_output)?;
        Ok(run.finish(Some(DESTROYED_MESSAGE)))
    }
}

/// Parse a name create or destroy may act on. The reserved defaults belong
/// to the service and are never managed here.
fn managed_name(name: &str) -> Result<HostName> {
    let name = HostName::parse(name)?;
    if name.is_reserved() {
        return Err(Error::InvalidName {
            name: name.into(),
            reason: "name is reserved for the service's default site",
        });
    }
    Ok(name)
}

/// State of one create or destroy in progress.
struct Run<'a> {
    lifecycle: &'a Lifecycle,
    host: &'a Host,
    /// Rendered config, for `WriteConfig`
    config: Option<String>,
    output: String,
    warnings: Vec<String>,
    undo: Vec<Compensation>,
    /// Held from a hosts edit until its flush
    hosts: Option<MutexGuard<'a, Box<dyn ResolutionStore>>>,
}

impl<'a> Run<'a> {
    fn new(lifecycle: &'a Lifecycle, host: &'a Host) -> Self {
        Self {
            lifecycle,
            host,
            config: None,
            output: String::new(),
            warnings: Vec::new(),
            undo: Vec::new(),
            hosts: None,
        }
    }

    /// Run `plan` in order, stopping at the first failing step.
    fn walk(&mut self, plan: &[Step], on_output: &mut dyn FnMut(&str)) -> Result<()> {
        for step in plan {
            let start = self.output.len();
            let result = self.step(*step);
            if self.output.len() > start {
                on_output(&self.output[start..]);
            }
            result?;
        }
        Ok(())
    }

    fn step(&mut self, step: Step) -> Result<()> {
        log::debug!("{}: {}", self.host.name, step);
        match self.apply(step) {
            Ok(()) => Ok(()),
            Err(e) => {
                let mut err = e.at(step);
                log::error!("{}: {}", self.host.name, err);
                if self.lifecycle.policy.rollback && !step.is_terminal() {
                    let failures = self.compensate();
                    if !failures.is_empty() {
                        err = Error::RollbackIncomplete {
                            source: Box::new(err),
                            failures,
                        };
                    }
                }
                self.hosts = None;
                Err(err)
            }
        }
    }

    fn apply(&mut self, step: Step) -> Result<()> {
        let lifecycle = self.lifecycle;
        let host = self.host;
        match step {
            Step::WriteConfig => {
                let config = self.config.take().unwrap_or_default();
                lifecycle.configs.write(&host.config_path, &config)?;
                self.undo.push(Compensation::RemoveConfig);
            }
            Step::CreateDocumentRoot => {
                lifecycle
                    .document_roots
                    .create(&host.document_root, lifecycle.layout.document_root_mode)?;
                self.undo.push(Compensation::RemoveDocumentRoot);
            }
            Step::EnableSite => {
                self.service(ServiceAction::EnableSite)?;
                self.undo.push(Compensation::DisableSite);
            }
            Step::AddResolution => {
                let (address, name) = (host.address.as_str(), host.name.as_str());
                let hosts = self.hosts()?;
                if hosts.has(address, name) {
                    log::debug!("Hosts entry {address} {name} already present");
                } else {
                    hosts.add(address, name)?;
                    hosts.flush()?;
                    self.undo.push(Compensation::RemoveResolution);
                }
                self.hosts = None;
            }
            Step::DisableSite => match self.service(ServiceAction::DisableSite) {
                Ok(()) => self.undo.push(Compensation::EnableSite),
                Err(e) if lifecycle.policy.disable_failure == DisableFailure::Warn => {
                    log::warn!("{}: {step} failed, continuing: {e}", host.name);
                    self.warnings.push(format!("{step} failed: {e}"));
                }
                Err(e) => return Err(e),
            },
            Step::RemoveConfig => {
                let saved = if lifecycle.policy.rollback {
                    lifecycle.configs.read(&host.config_path).ok()
                } else {
                    None
                };
                lifecycle.configs.remove(&host.config_path)?;
                if let Some(contents) = saved {
                    self.undo.push(Compensation::RestoreConfig(contents));
                }
            }
            Step::RemoveDocumentRoot => {
                lifecycle.document_roots.remove(&host.document_root)?;
                self.undo.push(Compensation::RestoreDocumentRoot);
            }
            Step::RemoveResolution => {
                let (address, name) = (host.address.as_str(), host.name.as_str());
                let hosts = self.hosts()?;
                if hosts.has(address, name) {
                    hosts.remove(address, name)?;
                    self.undo.push(Compensation::RestoreResolution);
                } else {
                    log::debug!("Hosts entry {address} {name} not present");
                }
            }
            Step::FlushResolution => {
                self.hosts()?.flush()?;
                self.hosts = None;
            }
            Step::Reload => self.service(ServiceAction::Reload)?,
        }
        Ok(())
    }

    /// Run a service action and fold its output into the transcript.
    fn service(&mut self, action: ServiceAction) -> Result<()> {
        let host = self.host;
        let name = host.name.as_str();
        let args: &[&str] = match action {
            ServiceAction::Reload => &[],
            ServiceAction::EnableSite | ServiceAction::DisableSite => &[name],
        };
        let out = self.lifecycle.service.run(action, args)?;
        if !out.success() {
            return Err(Error::ServiceCommand {
                command: format!("{action} {}", args.join(" ")).trim_end().to_string(),
                status: out.status,
                output: out.output,
            });
        }
        self.output.push_str(&out.output);
        Ok(())
    }

    /// The shared hosts table, locked and freshly loaded on first use.
    fn hosts(&mut self) -> Result<&mut dyn ResolutionStore> {
        let guard = match self.hosts.take() {
            Some(guard) => guard,
            None => {
                let mut guard = lock(&self.lifecycle.resolution);
                guard.refresh()?;
                guard
            }
        };
        Ok(&mut ***self.hosts.insert(guard))
    }

    /// Undo completed steps, newest first, returning what could not be undone.
    fn compensate(&mut self) -> Vec<String> {
        let mut failures = Vec::new();
        while let Some(action) = self.undo.pop() {
            log::warn!("{}: rolling back, {}", self.host.name, action.label());
            if let Err(e) = self.undo_one(&action) {
                log::error!("{}: could not {}: {e}", self.host.name, action.label());
                failures.push(format!("could not {}: {e}", action.label()));
            }
        }
        failures
    }

    fn undo_one(&mut self, action: &Compensation) -> Result<()> {
        let lifecycle = self.lifecycle;
        let host = self.host;
        let (address, name) = (host.address.as_str(), host.name.as_str());
        match action {
            Compensation::RemoveConfig => lifecycle.configs.remove(&host.config_path),
            Compensation::RestoreConfig(contents) => {
                lifecycle.configs.write(&host.config_path, contents)
            }
            Compensation::RemoveDocumentRoot => {
                lifecycle.document_roots.remove(&host.document_root)
            }
            Compensation::RestoreDocumentRoot => lifecycle
                .document_roots
                .create(&host.document_root, lifecycle.layout.document_root_mode),
            Compensation::DisableSite => self.service(ServiceAction::DisableSite),
            Compensation::EnableSite => self.service(ServiceAction::EnableSite),
            Compensation::RemoveResolution => {
                let hosts = self.hosts()?;
                hosts.remove(address, name)?;
                hosts.flush()
            }
            Compensation::RestoreResolution => {
                let hosts = self.hosts()?;
                hosts.add(address, name)?;
                hosts.flush()
            }
        }
    }

    fn finish(self, message: Option<&str>) -> Outcome {
        Outcome {
            host: self.host.clone(),
            output: self.output,
            warnings: self.warnings,
            message: message.map(str::to_string),
        }
    }
}
