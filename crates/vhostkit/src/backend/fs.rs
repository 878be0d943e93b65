//! Real filesystem adapters for config files and document roots.

use crate::backend::{ConfigStore, DocumentRoots};
use crate::error::{Error, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Config files stored as plain files in one directory.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    root: PathBuf,
}

impl FsConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ConfigStore for FsConfigStore {
    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| Error::io("create", path, e))?;
        file.write_all(contents.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| Error::io("write", path, e))?;
        log::debug!("Wrote {} bytes to {}", contents.len(), path.display());
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| Error::io("remove", path, e))
    }

    fn read(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| Error::io("read", path, e))
    }

    fn entries(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            log::debug!("Sites store {} does not exist", self.root.display());
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("filesystem loop"));
                Error::io("scan", path, source)
            })?;

            if entry.file_type().is_dir() {
                continue;
            }
            entries.push(entry.into_path());
        }
        Ok(entries)
    }
}

/// Document roots created directly on the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDocumentRoots;

impl DocumentRoots for FsDocumentRoots {
    fn create(&self, path: &Path, mode: u32) -> Result<()> {
        let mut builder = fs::DirBuilder::new();

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        builder
            .create(path)
            .map_err(|e| Error::io("create directory", path, e))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_dir(path).map_err(|e| Error::io("remove directory", path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_write_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::new(dir.path());
        let path = dir.path().join("a.test.conf");

        store.write(&path, "first").unwrap();
        let err = store.write(&path, "second").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(store.read(&path).unwrap(), "first");
    }

    #[test]
    fn test_entries_skip_directories_and_sort() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.conf"), "").unwrap();
        fs::write(dir.path().join("a.conf"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.conf"), "").unwrap();

        let store = FsConfigStore::new(dir.path());
        let names: Vec<_> = store
            .entries()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, ["a.conf", "b.conf"]);
    }

    #[test]
    fn test_entries_of_missing_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::new(dir.path().join("missing"));
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn test_remove_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::new(dir.path());
        let err = store.remove(&dir.path().join("nope.conf")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_document_root_is_not_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let roots = FsDocumentRoots;

        let nested = dir.path().join("missing").join("site");
        assert!(roots.create(&nested, 0o755).is_err());

        let site = dir.path().join("site");
        roots.create(&site, 0o755).unwrap();
        assert!(site.is_dir());
        assert!(roots.create(&site, 0o755).is_err(), "existing directory");

        fs::write(site.join("index.html"), "hi").unwrap();
        assert_eq!(roots.remove(&site).unwrap_err().kind(), ErrorKind::Io);

        fs::remove_file(site.join("index.html")).unwrap();
        roots.remove(&site).unwrap();
        assert!(!site.exists());
    }
}
