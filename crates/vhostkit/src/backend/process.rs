//! Subprocess execution with combined output and a deadline.

use crate::error::{Error, Result};
use crate::locks::lock;
use crate::types::CommandOutput;
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to keep reading output after the child exits. Daemons forked by
/// an init script can inherit the pipe and keep it open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// A program plus its leading arguments, e.g. `["/etc/init.d/apache2", "restart"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    /// Build from a config array; the first element is the program.
    pub fn from_parts(parts: &[String]) -> Option<Self> {
        let (program, args) = parts.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Render with extra arguments, for logs and error messages.
    pub fn display_with(&self, extra: &[&str]) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .chain(extra.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Run a command, capturing stdout and stderr into one buffer.
///
/// The child is killed once `timeout` elapses.
pub fn run_combined(command: &CommandLine, extra: &[&str], timeout: Duration) -> Result<CommandOutput> {
    let display = command.display_with(extra);
    let spawn_error = |e: io::Error| Error::ServiceCommand {
        command: display.clone(),
        status: None,
        output: format!("failed to execute: {e}"),
    };

    let (mut reader, writer) = io::pipe().map_err(spawn_error)?;
    let mut child = {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .args(extra)
            .stdin(Stdio::null())
            .stdout(writer.try_clone().map_err(spawn_error)?)
            .stderr(writer);
        cmd.spawn().map_err(spawn_error)?
        // `cmd` drops here, closing our copies of the write end
    };
    log::debug!("Spawned `{}` (pid {})", display, child.id());

    // Read in chunks so output survives a pipe that never closes
    let captured = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = mpsc::channel();
    {
        let captured = Arc::clone(&captured);
        thread::spawn(move || {
            let mut chunk = [0u8; 4096];
            loop {
                match reader.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => lock(&captured).extend_from_slice(&chunk[..n]),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(_) => break,
                }
            }
            let _ = tx.send(());
        });
    }

    let status = match wait_with_deadline(&mut child, timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            log::warn!("`{}` exceeded {}s, killing it", display, timeout.as_secs());
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Timeout {
                command: display,
                timeout,
            });
        }
        Err(e) => return Err(spawn_error(e)),
    };

    if rx.recv_timeout(DRAIN_GRACE).is_err() {
        log::debug!("Output of `{}` still open after exit, keeping what was read", display);
    }
    let output = std::mem::take(&mut *lock(&captured));

    Ok(CommandOutput {
        output: String::from_utf8_lossy(&output).into_owned(),
        status: status.code(),
    })
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
) -> io::Result<Option<std::process::ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sh(script: &str) -> CommandLine {
        CommandLine::new("sh", &["-c", script])
    }

    #[test]
    fn test_combines_stdout_and_stderr() {
        let out = run_combined(&sh("echo out; echo err 1>&2"), &[], Duration::from_secs(10)).unwrap();
        assert!(out.success());
        assert!(out.output.contains("out\n"));
        assert!(out.output.contains("err\n"));
    }

    #[test]
    fn test_reports_exit_code() {
        let out = run_combined(&sh("echo nope; exit 3"), &[], Duration::from_secs(10)).unwrap();
        assert_eq!(out.status, Some(3));
        assert!(!out.success());
        assert_eq!(out.output, "nope\n");
    }

    #[test]
    fn test_extra_args_are_appended() {
        let cmd = CommandLine::new("echo", &["Enabling"]);
        let out = run_combined(&cmd, &["example.test"], Duration::from_secs(10)).unwrap();
        assert_eq!(out.output, "Enabling example.test\n");
        assert_eq!(cmd.display_with(&["example.test"]), "echo Enabling example.test");
    }

    #[test]
    fn test_timeout_kills_child() {
        let start = Instant::now();
        let err = run_combined(&sh("sleep 30"), &[], Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert_eq!(err.kind(), ErrorKind::ServiceCommand);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_output_survives_a_pipe_held_open() {
        // The background sleep inherits stdout, like a forked daemon
        let start = Instant::now();
        let out = run_combined(&sh("echo started; sleep 6 & exit 0"), &[], Duration::from_secs(10))
            .unwrap();
        assert!(out.success());
        assert_eq!(out.output, "started\n");
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_missing_program() {
        let cmd = CommandLine::new("/nonexistent/a2ensite", &[]);
        let err = run_combined(&cmd, &["a"], Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceCommand);
    }

    #[test]
    fn test_from_parts() {
        let parts = vec!["/etc/init.d/apache2".to_string(), "restart".to_string()];
        let cmd = CommandLine::from_parts(&parts).unwrap();
        assert_eq!(cmd.program, "/etc/init.d/apache2");
        assert_eq!(cmd.args, ["restart"]);
        assert!(CommandLine::from_parts(&[]).is_none());
    }
}
