//! External tool invocation.
//!
//! Package download, extraction, and image packing are delegated to
//! system tools. [`ToolCommand`] runs them either with their output
//! forwarded line by line to the log ([`ToolCommand::stream`]) or with
//! stdout captured for parsing ([`ToolCommand::capture`]).

use std::ffi::{OsStr, OsString};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::JoinHandle;

use crate::error::{DebimgError, Result};

/// Builder for a single external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
}

impl ToolCommand {
    /// Creates a command for the given program name or path.
    #[must_use]
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: PathBuf::from(program.as_ref()),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Appends a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Runs the tool from `dir` instead of the current directory.
    #[must_use]
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Runs the tool and forwards its stdout and stderr to the log.
    ///
    /// Both output streams are drained on their own threads, and those
    /// threads are joined before this returns, so trailing diagnostics
    /// are never lost.
    ///
    /// # Errors
    ///
    /// Returns `DebimgError::Command` if the tool cannot be started or
    /// exits unsuccessfully.
    pub fn stream(self) -> Result<()> {
        let program = self.program_name();
        tracing::info!(tool = %program, args = ?self.args, "running external tool");

        let mut child = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DebimgError::Command {
                program: program.clone(),
                message: format!("could not start: {e}"),
            })?;

        let forwarders = [
            child
                .stdout
                .take()
                .map(|out| forward_lines(program.clone(), "stdout", out)),
            child
                .stderr
                .take()
                .map(|err| forward_lines(program.clone(), "stderr", err)),
        ];

        let status = child.wait();
        for handle in forwarders.into_iter().flatten() {
            if handle.join().is_err() {
                tracing::warn!(tool = %program, "output forwarder panicked");
            }
        }

        let status = status.map_err(|e| DebimgError::Command {
            program: program.clone(),
            message: format!("could not wait for exit: {e}"),
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(DebimgError::Command {
                program,
                message: format!("exited with {status}"),
            })
        }
    }

    /// Runs the tool and returns its trimmed stdout.
    ///
    /// # Errors
    ///
    /// Returns `DebimgError::Command` if the tool cannot be started or
    /// exits unsuccessfully; the message includes its stderr.
    pub fn capture(self) -> Result<String> {
        let program = self.program_name();
        tracing::debug!(tool = %program, args = ?self.args, "capturing tool output");

        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| DebimgError::Command {
                program: program.clone(),
                message: format!("could not start: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                format!("exited with {}: {stderr}", output.status)
            };
            return Err(DebimgError::Command { program, message });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        let _ = cmd.args(&self.args);
        if let Some(ref dir) = self.current_dir {
            let _ = cmd.current_dir(dir);
        }
        cmd
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

fn forward_lines<R>(program: String, stream: &'static str, reader: R) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    let dispatch = tracing::dispatcher::get_default(Clone::clone);
    std::thread::spawn(move || {
        tracing::dispatcher::with_default(&dispatch, || drain_lines(&program, stream, reader));
    })
}

fn drain_lines<R: Read>(program: &str, stream: &'static str, reader: R) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                tracing::info!(tool = %program, stream, "{}", line.trim_end());
            }
            Err(e) => {
                tracing::debug!(tool = %program, stream, error = %e, "stopped reading tool output");
                break;
            }
        }
    }
}

/// Locates a required tool on `PATH` (or checks an explicit path).
///
/// # Errors
///
/// Returns `DebimgError::Config` if the tool cannot be found.
pub fn require_tool(program: &Path) -> Result<PathBuf> {
    which::which(program).map_err(|e| DebimgError::Config {
        message: format!("required tool `{}` not found: {e}", program.display()),
    })
}
