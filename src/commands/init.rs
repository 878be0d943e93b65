//! Init command - write a starter config and template

use anyhow::{Context as _, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_CONFIG;
use crate::{Context, paths, ui};

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Written {
    Created(PathBuf),
    Kept(PathBuf),
}

pub fn run(ctx: &Context, force: bool) -> Result<()> {
    let config_path = match &ctx.config_path {
        Some(path) => path.clone(),
        None => paths::config_file()?,
    };

    for result in write_defaults(&config_path, force)? {
        match result {
            Written::Created(path) => ui::success(&format!("Wrote {}", path.display())),
            Written::Kept(path) => ui::dim(&format!(
                "{} exists, kept (use --force to overwrite)",
                path.display()
            )),
        }
    }
    Ok(())
}

/// Write the default config at `config_path` and the default template next to it.
pub fn write_defaults(config_path: &Path, force: bool) -> Result<Vec<Written>> {
    let dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("Could not create {}", dir.display()))?;

    let template_path = dir.join(paths::TEMPLATE_FILE);
    Ok(vec![
        write_file(config_path, DEFAULT_CONFIG, force)?,
        write_file(&template_path, vhostkit::DEFAULT_TEMPLATE, force)?,
    ])
}

fn write_file(path: &Path, contents: &str, force: bool) -> Result<Written> {
    if path.exists() && !force {
        return Ok(Written::Kept(path.to_path_buf()));
    }
    fs::write(path, contents).with_context(|| format!("Could not write {}", path.display()))?;
    log::debug!("Wrote {}", path.display());
    Ok(Written::Created(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use vhostkit::Template;

    #[test]
    fn test_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("vhostctl").join("config.toml");

        let written = write_defaults(&config_path, false).unwrap();
        assert!(matches!(written[0], Written::Created(_)));
        assert!(matches!(written[1], Written::Created(_)));

        let config = Config::load_from(&config_path).unwrap();
        assert!(Template::load(&config.template_path()).is_ok());
    }

    #[test]
    fn test_keeps_existing_files_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[http]\nbind = \"0.0.0.0:80\"\n").unwrap();

        let written = write_defaults(&config_path, false).unwrap();
        assert_eq!(written[0], Written::Kept(config_path.clone()));
        assert!(fs::read_to_string(&config_path).unwrap().contains("0.0.0.0:80"));

        write_defaults(&config_path, true).unwrap();
        assert_eq!(fs::read_to_string(&config_path).unwrap(), DEFAULT_CONFIG);
    }
}
