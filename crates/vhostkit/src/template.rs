//! Host config template rendering.

use crate::error::{Error, Result};
use crate::types::Host;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Placeholder replaced with the host name.
pub const SERVER_NAME: &str = "{{servername}}";

/// Placeholder replaced with the document root path.
pub const SERVER_PATH: &str = "{{serverpath}}";

/// Template written by `vhostctl init`.
pub const DEFAULT_TEMPLATE: &str = "<VirtualHost *:80>
    ServerName {{servername}}
    ServerAdmin webmaster@localhost
    DocumentRoot {{serverpath}}

    <Directory {{serverpath}}>
        Options Indexes FollowSymLinks
        AllowOverride All
        Require all granted
    </Directory>

    ErrorLog ${APACHE_LOG_DIR}/{{servername}}-error.log
    CustomLog ${APACHE_LOG_DIR}/{{servername}}-access.log combined
</VirtualHost>
";

/// A config template loaded from disk.
#[derive(Debug, Clone)]
pub struct Template {
    path: PathBuf,
    source: String,
}

impl Template {
    /// Read and check a template file.
    ///
    /// Fails with `TemplateMissing` when the file does not exist and with
    /// `TemplateMalformed` when either placeholder is absent.
    pub fn load(path: &Path) -> Result<Self> {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::TemplateMissing {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(Error::io("read template", path, e)),
        };
        Self::from_source(path, source)
    }

    /// Build a template from text already in memory.
    pub fn from_source(path: impl Into<PathBuf>, source: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let source = source.into();

        for placeholder in [SERVER_NAME, SERVER_PATH] {
            if !source.contains(placeholder) {
                return Err(Error::TemplateMalformed { path, placeholder });
            }
        }

        Ok(Self { path, source })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Substitute every placeholder occurrence for this host.
    pub fn render(&self, host: &Host) -> String {
        self.source
            .replace(SERVER_NAME, host.name.as_str())
            .replace(SERVER_PATH, &host.document_root.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::{HostName, Layout};

    fn host(name: &str) -> Host {
        let layout = Layout {
            web_root: PathBuf::from("/var/www"),
            ..Default::default()
        };
        layout.host(&HostName::parse(name).unwrap())
    }

    #[test]
    fn test_render_replaces_all_occurrences() {
        let template = Template::from_source("t", DEFAULT_TEMPLATE).unwrap();
        let rendered = template.render(&host("example.test"));

        assert!(rendered.contains("ServerName example.test\n"));
        assert!(rendered.contains("DocumentRoot /var/www/exampletest\n"));
        assert!(rendered.contains("<Directory /var/www/exampletest>"));
        assert!(rendered.contains("example.test-error.log"));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn test_missing_placeholder_is_malformed() {
        let err = Template::from_source("t", "ServerName {{servername}}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TemplateMalformed);
        assert!(err.to_string().contains(SERVER_PATH));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Template::load(&dir.path().join("template.txt")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TemplateMissing);
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.txt");
        fs::write(&path, "{{servername}} {{serverpath}}").unwrap();

        let template = Template::load(&path).unwrap();
        assert_eq!(template.path(), path);
        assert_eq!(template.render(&host("a.b")), "a.b /var/www/ab");
    }
}
