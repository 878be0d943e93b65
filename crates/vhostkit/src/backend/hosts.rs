//! `/etc/hosts` resolution store.
//!
//! Every line keeps its original text so that comments, blank lines and
//! unrelated entries survive a flush byte for byte. Only lines we edit are
//! re-rendered.

use crate::backend::ResolutionStore;
use crate::error::{Error, Result};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    /// Comment, blank or unparseable line, written back verbatim
    Raw(String),
    Entry {
        address: String,
        names: Vec<String>,
        comment: Option<String>,
        /// Original text, dropped once the entry is edited
        original: Option<String>,
    },
}

impl Line {
    fn parse(raw: &str) -> Self {
        let (body, comment) = match raw.find('#') {
            Some(idx) => (&raw[..idx], Some(raw[idx..].to_string())),
            None => (raw, None),
        };

        let mut fields = body.split_whitespace();
        let Some(address) = fields.next() else {
            return Line::Raw(raw.to_string());
        };
        let names: Vec<String> = fields.map(str::to_string).collect();
        if names.is_empty() {
            return Line::Raw(raw.to_string());
        }

        Line::Entry {
            address: address.to_string(),
            names,
            comment,
            original: Some(raw.to_string()),
        }
    }

    fn render(&self, out: &mut String) {
        match self {
            Line::Raw(raw)
            | Line::Entry {
                original: Some(raw),
                ..
            } => out.push_str(raw),
            Line::Entry {
                address,
                names,
                comment,
                original: None,
            } => {
                let _ = write!(out, "{address}\t{}", names.join(" "));
                if let Some(comment) = comment {
                    out.push(' ');
                    out.push_str(comment);
                }
            }
        }
        out.push('\n');
    }
}

/// In-memory table parsed from a hosts file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostsTable {
    lines: Vec<Line>,
}

impl HostsTable {
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.lines().map(Line::parse).collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            line.render(&mut out);
        }
        out
    }

    pub fn has(&self, address: &str, name: &str) -> bool {
        self.lines.iter().any(|line| match line {
            Line::Entry {
                address: a, names, ..
            } => a == address && names.iter().any(|n| n == name),
            Line::Raw(_) => false,
        })
    }

    /// Add a mapping, joining an existing line for the same address.
    pub fn add(&mut self, address: &str, name: &str) {
        if self.has(address, name) {
            return;
        }

        let existing = self.lines.iter_mut().find(|line| {
            matches!(line, Line::Entry { address: a, .. } if a == address)
        });

        match existing {
            Some(Line::Entry {
                names, original, ..
            }) => {
                names.push(name.to_string());
                *original = None;
            }
            _ => self.lines.push(Line::Entry {
                address: address.to_string(),
                names: vec![name.to_string()],
                comment: None,
                original: None,
            }),
        }
    }

    /// Remove a mapping, dropping lines left without names.
    pub fn remove(&mut self, address: &str, name: &str) {
        for line in &mut self.lines {
            if let Line::Entry {
                address: a,
                names,
                original,
                ..
            } = line
                && a == address
                && names.iter().any(|n| n == name)
            {
                names.retain(|n| n != name);
                *original = None;
            }
        }
        self.lines
            .retain(|line| !matches!(line, Line::Entry { names, .. } if names.is_empty()));
    }
}

/// A hosts file on disk plus its parsed in-memory copy.
#[derive(Debug)]
pub struct HostsFile {
    path: PathBuf,
    table: HostsTable,
    dirty: bool,
}

impl HostsFile {
    /// Open and parse a hosts file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table = Self::load(&path)?;
        Ok(Self {
            path,
            table,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &HostsTable {
        &self.table
    }

    fn load(path: &Path) -> Result<HostsTable> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(HostsTable::parse(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!("Hosts file {} not found, starting empty", path.display());
                Ok(HostsTable::default())
            }
            Err(e) => Err(Error::ResolutionStore {
                path: path.to_path_buf(),
                message: format!("read failed: {e}"),
            }),
        }
    }
}

impl ResolutionStore for HostsFile {
    fn refresh(&mut self) -> Result<()> {
        self.table = Self::load(&self.path)?;
        self.dirty = false;
        Ok(())
    }

    fn has(&self, address: &str, name: &str) -> bool {
        self.table.has(address, name)
    }

    fn add(&mut self, address: &str, name: &str) -> Result<()> {
        if !self.table.has(address, name) {
            self.table.add(address, name);
            self.dirty = true;
        }
        Ok(())
    }

    fn remove(&mut self, address: &str, name: &str) -> Result<()> {
        if self.table.has(address, name) {
            self.table.remove(address, name);
            self.dirty = true;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            log::debug!("Hosts file {} unchanged, skipping write", self.path.display());
            return Ok(());
        }
        fs::write(&self.path, self.table.render()).map_err(|e| Error::ResolutionStore {
            path: self.path.clone(),
            message: format!("write failed: {e}"),
        })?;
        self.dirty = false;
        log::debug!("Saved hosts file {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# static table lookup\n127.0.0.1\tlocalhost\n\n::1 ip6-localhost ip6-loopback # v6\n";

    #[test]
    fn test_round_trip_is_exact() {
        let table = HostsTable::parse(SAMPLE);
        assert_eq!(table.render(), SAMPLE);
    }

    #[test]
    fn test_edit_keeps_trailing_comment() {
        let mut table = HostsTable::parse("127.0.0.1   localhost # loopback\n");
        table.add("127.0.0.1", "a.test");
        assert_eq!(table.render(), "127.0.0.1\tlocalhost a.test # loopback\n");
    }

    #[test]
    fn test_add_joins_existing_address_line() {
        let mut table = HostsTable::parse(SAMPLE);
        table.add("127.0.0.1", "example.test");

        assert!(table.has("127.0.0.1", "example.test"));
        assert!(table.render().contains("127.0.0.1\tlocalhost example.test\n"));

        table.add("127.0.0.1", "example.test");
        assert_eq!(table.render().matches("example.test").count(), 1);
    }

    #[test]
    fn test_add_new_address_appends_line() {
        let mut table = HostsTable::parse("# empty\n");
        table.add("127.0.0.1", "a.test");
        assert_eq!(table.render(), "# empty\n127.0.0.1\ta.test\n");
    }

    #[test]
    fn test_remove_drops_empty_lines_only() {
        let mut table = HostsTable::parse("127.0.0.1 localhost a.test\n127.0.0.1 b.test\n");
        table.remove("127.0.0.1", "a.test");
        table.remove("127.0.0.1", "b.test");
        table.remove("127.0.0.1", "missing.test");

        assert_eq!(table.render(), "127.0.0.1\tlocalhost\n");
        assert!(!table.has("127.0.0.1", "a.test"));
    }

    #[test]
    fn test_has_is_address_specific() {
        let table = HostsTable::parse("10.0.0.1 a.test\n");
        assert!(table.has("10.0.0.1", "a.test"));
        assert!(!table.has("127.0.0.1", "a.test"));
    }

    #[test]
    fn test_edits_reach_disk_only_on_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts");
        fs::write(&path, SAMPLE).unwrap();

        let mut hosts = HostsFile::open(&path).unwrap();
        hosts.add("127.0.0.1", "example.test").unwrap();
        assert!(!fs::read_to_string(&path).unwrap().contains("example.test"));

        hosts.flush().unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("example.test"));

        hosts.remove("127.0.0.1", "example.test").unwrap();
        hosts.flush().unwrap();
        hosts.refresh().unwrap();
        assert!(!hosts.has("127.0.0.1", "example.test"));
        assert!(hosts.has("127.0.0.1", "localhost"));
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut hosts = HostsFile::open(dir.path().join("hosts")).unwrap();
        assert!(hosts.table().render().is_empty());

        hosts.add("127.0.0.1", "a.test").unwrap();
        hosts.flush().unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("hosts")).unwrap(),
            "127.0.0.1\ta.test\n"
        );
    }
}
