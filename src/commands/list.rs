//! List command - show registered hosts

use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let lifecycle = ctx.config()?.lifecycle()?;
    let hosts = lifecycle.list()?;

    if ctx.quiet {
        for host in &hosts {
            println!("{}", host.name);
        }
        return Ok(());
    }

    ui::header("Hosts");

    if hosts.is_empty() {
        println!("{}", "No hosts registered.".dimmed());
        println!();
        println!("Create one with: vhostctl create <name>");
        return Ok(());
    }

    for host in &hosts {
        let icon = match host.enabled {
            Some(true) => "●".green(),
            Some(false) => "○".yellow(),
            None => "·".dimmed(),
        };
        println!("  {} {}", icon, ui::host_line(host));
    }
    println!();
    println!("{}", format!("{} host(s)", hosts.len()).dimmed());

    Ok(())
}
