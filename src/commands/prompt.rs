//! Prompt command - line-oriented loop over stdin
//!
//! Each line is one command: `list`, `create <name>`, `delete <name>` (or
//! `destroy <name>`), `help` or `quit`. The loop stops at the first failed
//! lifecycle operation and returns its error.

use anyhow::Result;
use std::io::{self, BufRead, Write};
use vhostkit::Lifecycle;

use super::Request;
use crate::Context;

pub const BANNER: &str = "If you want to create a virtual host, write create and the name\n\
If you want to delete a virtual host, write delete and the name\n\
If you want to list virtual hosts, write list";

const HELP: &str = "Commands:\n  \
list              list registered hosts\n  \
create <name>     create a host\n  \
delete <name>     destroy a host (alias: destroy)\n  \
help              show this help\n  \
quit              leave the prompt";

/// One parsed prompt line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Run(Request),
    Help,
    Quit,
}

/// Parse a prompt line. Blank lines parse to `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Line>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let argument = words.next();
    if let Some(extra) = words.next() {
        return Err(format!("unexpected argument '{extra}'"));
    }

    let needs_name = |verb: &str| {
        argument
            .map(str::to_string)
            .ok_or_else(|| format!("usage: {verb} <name>"))
    };

    let parsed = match command.to_ascii_lowercase().as_str() {
        "list" | "ls" => Line::Run(Request::List),
        "create" => Line::Run(Request::Create(needs_name("create")?)),
        "delete" | "destroy" => Line::Run(Request::Destroy(needs_name(command)?)),
        "help" | "?" => Line::Help,
        "quit" | "exit" => Line::Quit,
        other => return Err(format!("unknown command '{other}', try 'help'")),
    };
    if argument.is_some() && matches!(parsed, Line::Run(Request::List) | Line::Help | Line::Quit) {
        return Err(format!("'{command}' takes no argument"));
    }
    Ok(Some(parsed))
}

pub fn run(ctx: &Context) -> Result<()> {
    let lifecycle = ctx.config()?.lifecycle()?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_loop(&lifecycle, stdin.lock(), &mut stdout, !ctx.quiet)
}

/// Drive the prompt until end of input, `quit`, or the first lifecycle error.
///
/// Malformed lines print a hint and keep the loop going.
pub fn run_loop<R: BufRead, W: Write>(
    lifecycle: &Lifecycle,
    input: R,
    out: &mut W,
    banner: bool,
) -> Result<()> {
    if banner {
        writeln!(out, "{BANNER}")?;
        out.flush()?;
    }

    for line in input.lines() {
        let line = line?;
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(Line::Quit)) => break,
            Ok(Some(Line::Help)) => writeln!(out, "{HELP}")?,
            Ok(Some(Line::Run(request))) => {
                log::debug!("Prompt request: {request:?}");
                let mut written = Ok(());
                let result = request.run(lifecycle, &mut |piece| {
                    if written.is_ok() {
                        written = out.write_all(piece.as_bytes()).and_then(|()| out.flush());
                    }
                });
                result?;
                written?;
            }
            Err(hint) => writeln!(out, "{hint}")?,
        }
        out.flush()?;
    }

    Ok(())
}
