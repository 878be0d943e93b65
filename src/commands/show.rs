//! Show command - everything derived from a host name

use anyhow::{Result, bail};
use colored::Colorize;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context, name: &str) -> Result<()> {
    let lifecycle = ctx.config()?.lifecycle()?;
    let Some(host) = lifecycle.get(name)? else {
        bail!("No host named '{name}' (see `vhostctl list`)");
    };

    ui::header(host.name.as_str());
    ui::kv("URL", &host.url());
    ui::kv("Config", &host.config_path.display().to_string());

    let docroot = host.document_root.display().to_string();
    if host.document_root.is_dir() {
        ui::kv("Document root", &docroot);
    } else {
        ui::kv("Document root", &format!("{docroot} {}", "(missing)".red()));
    }

    ui::kv("Hosts entry", &format!("{} {}", host.address, host.name));
    let enabled = match host.enabled {
        Some(true) => "yes".green(),
        Some(false) => "no".yellow(),
        None => "unknown".dimmed(),
    };
    ui::kv("Enabled", &enabled.to_string());

    Ok(())
}
