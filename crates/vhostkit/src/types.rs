//! Core types: host names, filesystem layout and derived hosts.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Config files in the sites store that are never treated as hosts.
pub const RESERVED_CONFIGS: [&str; 2] = ["000-default.conf", "default-ssl.conf"];

/// Extension of every host config file.
pub const CONFIG_EXTENSION: &str = "conf";

/// Address the resolution entry points at.
pub const DEFAULT_LOOPBACK: &str = "127.0.0.1";

/// Longest name accepted, the DNS limit for a full hostname.
const MAX_NAME_LEN: usize = 253;

static LABELS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_](?:[A-Za-z0-9_-]{0,61}[A-Za-z0-9_])?(?:\.[A-Za-z0-9_](?:[A-Za-z0-9_-]{0,61}[A-Za-z0-9_])?)*$")
        .expect("host name pattern is valid")
});

/// A validated virtual host name.
///
/// The name is used verbatim as the `ServerName`, as the config file stem
/// and, with dots removed, as the document root directory name. Validation
/// guarantees all three derivations are non-empty and stay inside their
/// parent directories.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostName(String);

impl HostName {
    /// Validate a host name.
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidName {
            name: name.to_string(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(invalid("name is longer than 253 characters"));
        }
        if !LABELS.is_match(name) {
            return Err(invalid(
                "expected dot-separated labels of letters, digits, underscores and inner hyphens",
            ));
        }

        Ok(Self(name.to_string()))
    }

    /// Wrap the stem of a config file already in the sites store.
    ///
    /// Listing reports every stored config, including ones written by hand
    /// under names `parse` would refuse. A file name never contains a path
    /// separator, so the derived paths still stay inside their directories.
    pub(crate) fn from_stored(stem: &str) -> Self {
        Self(stem.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the name maps onto one of [`RESERVED_CONFIGS`].
    pub fn is_reserved(&self) -> bool {
        RESERVED_CONFIGS.contains(&self.config_file_name().as_str())
    }

    /// Directory name for the document root: the name with every `.` removed.
    pub fn directory_name(&self) -> String {
        self.0.replace('.', "")
    }

    /// File name of the host config: `<name>.conf`.
    pub fn config_file_name(&self) -> String {
        format!("{}.{CONFIG_EXTENSION}", self.0)
    }
}

impl fmt::Display for HostName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HostName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HostName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<HostName> for String {
    fn from(name: HostName) -> Self {
        name.0
    }
}

/// Where a host's resources live on this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Directory holding one config file per host (sites-available)
    pub sites_available: PathBuf,
    /// Directory the service uses for its active set (sites-enabled)
    pub sites_enabled: PathBuf,
    /// Parent of every document root
    pub web_root: PathBuf,
    /// Address written to the resolution store
    pub loopback: String,
    /// Permission bits for new document roots (subject to umask)
    pub document_root_mode: u32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            sites_available: PathBuf::from("/etc/apache2/sites-available"),
            sites_enabled: PathBuf::from("/etc/apache2/sites-enabled"),
            web_root: PathBuf::from("/var/www"),
            loopback: DEFAULT_LOOPBACK.to_string(),
            document_root_mode: 0o755,
        }
    }
}

impl Layout {
    /// Derive the full host record for a name.
    pub fn host(&self, name: &HostName) -> Host {
        Host {
            config_path: self.config_path(name),
            document_root: self.document_root(name),
            address: self.loopback.clone(),
            name: name.clone(),
            enabled: None,
        }
    }

    pub fn config_path(&self, name: &HostName) -> PathBuf {
        self.sites_available.join(name.config_file_name())
    }

    pub fn document_root(&self, name: &HostName) -> PathBuf {
        self.web_root.join(name.directory_name())
    }

    /// Whether a file in the sites store is one of the reserved defaults.
    pub fn is_reserved(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| RESERVED_CONFIGS.contains(&n))
    }
}

/// A virtual host and the resources derived from its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub name: HostName,
    pub config_path: PathBuf,
    pub document_root: PathBuf,
    /// Address of the resolution entry `(address, name)`
    pub address: String,
    /// Whether the service currently serves this host, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl Host {
    pub fn url(&self) -> String {
        format!("http://{}", self.name)
    }
}

/// Captured result of a service command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Combined stdout and stderr, in the order the child wrote them
    pub output: String,
    /// Exit code, `None` when the child was killed by a signal
    pub status: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Aggregated result of a successful create or destroy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub host: Host,
    /// Service command output, concatenated in step order
    pub output: String,
    /// Problems that did not abort the operation
    pub warnings: Vec<String>,
    /// Closing confirmation, if the operation has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Outcome {
    /// Render the outcome as the text a terminal user sees.
    pub fn transcript(&self) -> String {
        let mut text = self.output.clone();
        for warning in &self.warnings {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str("warning: ");
            text.push_str(warning);
            text.push('\n');
        }
        if let Some(message) = &self.message {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(message);
            text.push('\n');
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_valid_names() {
        for name in [
            "example.test",
            "a",
            "my-site.local",
            "A1.b2.c3",
            "localhost",
            "my_site",
            "_dmarc.example.test",
        ] {
            assert!(HostName::parse(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        for name in [
            "",
            ".",
            "..",
            "a..b",
            ".example",
            "example.",
            "-a.test",
            "a-.test",
            "../etc",
            "a/b",
            "with space",
            "a_.-b",
        ] {
            let err = HostName::parse(name).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{name:?}");
        }
        let long = format!("{}.test", "a".repeat(250));
        assert!(HostName::parse(&long).is_err());
    }

    #[test]
    fn test_derivations_are_consistent() {
        let layout = Layout {
            sites_available: PathBuf::from("/sites"),
            sites_enabled: PathBuf::from("/enabled"),
            web_root: PathBuf::from("/www"),
            ..Default::default()
        };
        let name = HostName::parse("example.test").unwrap();
        let host = layout.host(&name);

        assert_eq!(host.config_path, PathBuf::from("/sites/example.test.conf"));
        assert_eq!(host.document_root, PathBuf::from("/www/exampletest"));
        assert_eq!(host.address, "127.0.0.1");
        assert_eq!(layout.host(&name), host, "derivation is stable");
        assert!(!host.document_root.to_string_lossy().contains("example.test"));
    }

    #[test]
    fn test_reserved_configs() {
        assert!(Layout::is_reserved(Path::new("/sites/000-default.conf")));
        assert!(Layout::is_reserved(Path::new("default-ssl.conf")));
        assert!(!Layout::is_reserved(Path::new("/sites/example.test.conf")));
    }

    #[test]
    fn test_reserved_names() {
        for name in ["000-default", "default-ssl"] {
            assert!(HostName::parse(name).unwrap().is_reserved(), "{name}");
        }
        assert!(!HostName::parse("default").unwrap().is_reserved());
        assert!(!HostName::parse("000-default.test").unwrap().is_reserved());
    }

    #[test]
    fn test_transcript_appends_warnings_and_message() {
        let name = HostName::parse("a.test").unwrap();
        let outcome = Outcome {
            host: Layout::default().host(&name),
            output: "Site a.test disabled.".into(),
            warnings: vec!["disable site failed".into()],
            message: Some("Host is destroyed".into()),
        };
        assert_eq!(
            outcome.transcript(),
            "Site a.test disabled.\nwarning: disable site failed\nHost is destroyed\n"
        );
    }
}
