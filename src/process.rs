use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::ToolError;

/// Program paths for the three external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    pub analyzer: PathBuf,
    pub tag_editor: PathBuf,
    pub inspector: PathBuf,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            analyzer: PathBuf::from("bs1770gain"),
            tag_editor: PathBuf::from("mkvpropedit"),
            inspector: PathBuf::from("mkvinfo"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// stdout followed by stderr, the way a terminal would interleave them
    /// for tools that print their stream info on stderr.
    pub fn merged(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        text
    }
}

pub trait ToolRunner: Send + Sync {
    /// Run the command to completion and capture its output.
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError>;
}

/// Runs commands as child processes. Blocks until the child exits; there is
/// no timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError> {
        tracing::debug!("Running: {} {:?}", command.program.display(), command.args);

        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ToolError::Launch {
                program: command.program_name(),
                source,
            })?;

        Ok(ToolOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Resolve a program the way a shell would: names containing a path
/// separator must exist as files, bare names are looked up on `PATH`.
pub fn find_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_output_joins_streams() {
        let output = ToolOutput {
            success: true,
            stdout: "one".to_string(),
            stderr: "two\n".to_string(),
        };
        assert_eq!(output.merged(), "one\ntwo\n");

        let stdout_only = ToolOutput {
            success: true,
            stdout: "only\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(stdout_only.merged(), "only\n");
    }

    #[test]
    fn test_find_program_with_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("tool");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();

        assert_eq!(find_program(&tool), Some(tool.clone()));
        assert_eq!(find_program(&dir.path().join("missing")), None);
    }

    #[test]
    fn test_launch_failure_is_an_error() {
        let command = ToolCommand::new("/nonexistent/mkvrg-test-tool").arg("--help");
        let err = SystemRunner.run(&command).unwrap_err();
        assert!(err.to_string().contains("mkvrg-test-tool"));
    }
}
