//! Destroy command - take a host offline and delete what it owns

use anyhow::{Context as _, Result};

use crate::Context;
use crate::{progress, ui};

pub fn run(ctx: &Context, name: &str, yes: bool) -> Result<()> {
    let lifecycle = ctx.config()?.lifecycle()?;

    if !yes {
        let host = lifecycle.layout().host(&vhostkit::HostName::parse(name)?);
        ui::info(&format!("This removes {}", host.config_path.display()));
        ui::info(&format!(
            "and the document root {} (it must be empty)",
            host.document_root.display()
        ));

        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Destroy {name}?"))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;

        if !confirmed {
            ui::info("Cancelled");
            return Ok(());
        }
    }

    let pb = progress::spinner(&format!("Destroying {name}..."), ctx.quiet);
    let mut streamed = String::new();
    let result = lifecycle.destroy_with(name, &mut |piece| streamed.push_str(piece));
    progress::finish_clear(&pb);

    // Completed steps are shown even when a later one failed
    if !ctx.quiet {
        ui::output(&streamed);
    }
    let outcome = result?;

    for warning in &outcome.warnings {
        ui::warn(warning);
    }
    ui::success(outcome.message.as_deref().unwrap_or("Done"));

    Ok(())
}
