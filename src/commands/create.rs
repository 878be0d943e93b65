//! Create command - bring a new host online

use anyhow::Result;

use crate::Context;
use crate::{progress, ui};

pub fn run(ctx: &Context, name: &str) -> Result<()> {
    let lifecycle = ctx.config()?.lifecycle()?;

    let pb = progress::spinner(&format!("Creating {name}..."), ctx.quiet);
    let mut streamed = String::new();
    let result = lifecycle.create_with(name, &mut |piece| streamed.push_str(piece));
    progress::finish_clear(&pb);

    // Completed steps are shown even when a later one failed
    if !ctx.quiet {
        ui::output(&streamed);
    }
    let outcome = result?;

    for warning in &outcome.warnings {
        ui::warn(warning);
    }
    ui::success(&format!("Created {}", outcome.host.url()));
    if !ctx.quiet {
        ui::kv("Config", &outcome.host.config_path.display().to_string());
        ui::kv(
            "Document root",
            &outcome.host.document_root.display().to_string(),
        );
    }

    Ok(())
}
