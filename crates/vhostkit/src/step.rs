//! Ordered step plans for create and destroy.
//!
//! A plan is the fixed sequence of side effects an operation performs. The
//! orchestrator walks it front to back and stops at the first failure.

use std::fmt;

/// One side-effecting operation in a lifecycle plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Write the rendered config into the sites store
    WriteConfig,
    /// Create the document root directory
    CreateDocumentRoot,
    /// Add the site to the service's active set
    EnableSite,
    /// Add the loopback entry to the hosts file and persist it
    AddResolution,
    /// Remove the site from the service's active set
    DisableSite,
    /// Delete the config file
    RemoveConfig,
    /// Delete the document root directory
    RemoveDocumentRoot,
    /// Drop the loopback entry from the in-memory hosts table
    RemoveResolution,
    /// Persist the hosts table
    FlushResolution,
    /// Reload or restart the service
    Reload,
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Self::WriteConfig => "write config",
            Self::CreateDocumentRoot => "create document root",
            Self::EnableSite => "enable site",
            Self::AddResolution => "add hosts entry",
            Self::DisableSite => "disable site",
            Self::RemoveConfig => "remove config",
            Self::RemoveDocumentRoot => "remove document root",
            Self::RemoveResolution => "remove hosts entry",
            Self::FlushResolution => "save hosts file",
            Self::Reload => "reload service",
        }
    }

    /// The last step of every plan. Its failure cannot be repaired by a
    /// later step, so it is reported as fatal and never compensated.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Reload)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Steps of `Create`, in execution order.
pub const CREATE_PLAN: &[Step] = &[
    Step::WriteConfig,
    Step::CreateDocumentRoot,
    Step::EnableSite,
    Step::AddResolution,
    Step::Reload,
];

/// Steps of `Destroy`, in execution order.
pub const DESTROY_PLAN: &[Step] = &[
    Step::DisableSite,
    Step::RemoveConfig,
    Step::RemoveDocumentRoot,
    Step::RemoveResolution,
    Step::FlushResolution,
    Step::Reload,
];

/// Action that reverses a completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    RemoveConfig,
    RestoreConfig(String),
    RemoveDocumentRoot,
    RestoreDocumentRoot,
    DisableSite,
    EnableSite,
    RemoveResolution,
    RestoreResolution,
}

impl Compensation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RemoveConfig => "remove written config",
            Self::RestoreConfig(_) => "restore removed config",
            Self::RemoveDocumentRoot => "remove created document root",
            Self::RestoreDocumentRoot => "recreate removed document root",
            Self::DisableSite => "disable enabled site",
            Self::EnableSite => "re-enable disabled site",
            Self::RemoveResolution => "remove added hosts entry",
            Self::RestoreResolution => "restore removed hosts entry",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plans_end_with_reload() {
        assert_eq!(CREATE_PLAN.last(), Some(&Step::Reload));
        assert_eq!(DESTROY_PLAN.last(), Some(&Step::Reload));
        assert_eq!(
            CREATE_PLAN.iter().filter(|s| s.is_terminal()).count(),
            1,
            "only the reload is terminal"
        );
    }

    #[test]
    fn test_destroy_reverses_create() {
        assert_eq!(DESTROY_PLAN[0], Step::DisableSite);
        assert_eq!(CREATE_PLAN[0], Step::WriteConfig);
        assert_eq!(Step::RemoveDocumentRoot.to_string(), "remove document root");
    }
}
