//! Command implementations shared by the CLI, the prompt and the HTTP API

pub mod create;
pub mod destroy;
pub mod init;
pub mod list;
pub mod prompt;
pub mod serve;
pub mod show;

use crate::ui;
use vhostkit::Lifecycle;

/// A lifecycle operation, however it was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    List,
    Create(String),
    Destroy(String),
}

impl Request {
    /// Run against `lifecycle`, handing the text a caller sees to `out`
    /// piece by piece. Output of completed steps is emitted even when a
    /// later step fails.
    pub fn run(&self, lifecycle: &Lifecycle, out: &mut dyn FnMut(&str)) -> vhostkit::Result<()> {
        let outcome = match self {
            Request::List => {
                for host in lifecycle.list()? {
                    out(&(ui::host_line(&host) + "\n"));
                }
                return Ok(());
            }
            Request::Create(name) => lifecycle.create_with(name, &mut *out)?,
            Request::Destroy(name) => {
                out(&format!("Destroy host... {name}\n"));
                lifecycle.destroy_with(name, &mut *out)?
            }
        };
        // The transcript starts with the output already streamed
        let transcript = outcome.transcript();
        out(&transcript[outcome.output.len()..]);
        Ok(())
    }

    /// Run and collect the whole text. On failure, what was produced before
    /// the error is logged.
    pub fn execute(&self, lifecycle: &Lifecycle) -> vhostkit::Result<String> {
        let mut text = String::new();
        let result = self.run(lifecycle, &mut |piece| text.push_str(piece));
        match result {
            Ok(()) => Ok(text),
            Err(e) => {
                if !text.is_empty() {
                    log::info!("Output before the failure:\n{}", text.trim_end());
                }
                Err(e)
            }
        }
    }
}
