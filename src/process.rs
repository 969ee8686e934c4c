//! External process invocation
//!
//! Tools are run as black boxes: the pipeline only sees the command it asked
//! for and the exit status it got back.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{PatchError, Result};

/// A program plus its ordered arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Exit status of a finished tool. `code` is `None` when the process was
/// killed by a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandStatus {
    pub code: Option<i32>,
}

impl CommandStatus {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// Runs external commands to completion.
///
/// Implementations must block until the command terminates and return its
/// status. A command that cannot be started is an error; a non-zero status
/// is not.
pub trait CommandExecutor {
    fn execute(&mut self, command: &ToolCommand) -> Result<CommandStatus>;
}

/// Spawns real subprocesses and echoes their stdout line by line.
#[derive(Debug, Default)]
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn execute(&mut self, command: &ToolCommand) -> Result<CommandStatus> {
        debug!(%command, "spawning");
        let launch_error = |source| PatchError::ToolLaunch {
            program: command.program.to_string_lossy().into_owned(),
            source,
        };

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(launch_error)?;

        if let Some(stdout) = child.stdout.take() {
            // Blocks on each read until the tool emits a line or closes stdout.
            let mut reader = BufReader::new(stdout);
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) => break,
                    Ok(_) => println!("{}", String::from_utf8_lossy(&line).trim_end()),
                    Err(err) => {
                        debug!("stopped reading tool output: {err}");
                        break;
                    }
                }
            }
        }

        let status = child.wait().map_err(launch_error)?;
        debug!(%command, code = ?status.code(), "finished");
        Ok(CommandStatus {
            code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display_joins_args() {
        let cmd = ToolCommand::new("java")
            .arg("-jar")
            .arg("deps/apktool.jar")
            .arg("-f")
            .arg("d");
        assert_eq!(cmd.to_string(), "java -jar deps/apktool.jar -f d");
        assert!(cmd.has_arg("-f"));
        assert!(!cmd.has_arg("b"));
    }

    #[test]
    fn test_status_success() {
        assert!(CommandStatus::from_code(0).success());
        assert!(!CommandStatus::from_code(1).success());
        assert!(!CommandStatus { code: None }.success());
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let cmd = ToolCommand::new("definitely-not-a-real-tool-7f3a9c");
        let err = SystemExecutor.execute(&cmd).unwrap_err();
        assert!(matches!(err, PatchError::ToolLaunch { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_command_and_reports_status() -> anyhow::Result<()> {
        let ok = SystemExecutor.execute(&ToolCommand::new("sh").arg("-c").arg("echo hello"))?;
        assert!(ok.success());

        let failed = SystemExecutor.execute(&ToolCommand::new("sh").arg("-c").arg("exit 3"))?;
        assert_eq!(failed.code, Some(3));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_waits_for_silent_process() -> anyhow::Result<()> {
        let status = SystemExecutor.execute(
            &ToolCommand::new("sh")
                .arg("-c")
                .arg("sleep 1; echo late; exit 5"),
        )?;
        assert_eq!(status.code, Some(5));
        Ok(())
    }
}
