use std::path::Path;
use std::sync::Arc;

use crate::models::PeakMode;
use crate::process::{ToolCommand, ToolRunner};

/// Client for the external loudness analyzer.
///
/// Invocation failures are never surfaced as errors: a tool that cannot be
/// launched or exits non-zero yields an empty string, and callers treat
/// empty output as "could not analyze".
#[derive(Clone)]
pub struct AnalyzerClient {
    program: std::path::PathBuf,
    runner: Arc<dyn ToolRunner>,
}

impl AnalyzerClient {
    pub fn new(program: impl Into<std::path::PathBuf>, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    /// Help text, captured whatever the exit status (some builds exit
    /// non-zero after printing usage).
    pub fn help_text(&self) -> String {
        let command = ToolCommand::new(&self.program).arg("--help");
        match self.runner.run(&command) {
            Ok(output) => output.merged(),
            Err(e) => {
                tracing::debug!("{}", e);
                String::new()
            }
        }
    }

    /// Stream listing for a container, stdout and stderr merged.
    pub fn list_tracks(&self, path: &Path) -> String {
        let command = ToolCommand::new(&self.program).arg("--list").arg(path);
        self.capture(&command, true)
    }

    /// Loudness statistics for one stream of a container.
    pub fn analyze_track(&self, track_id: u32, path: &Path, peak_mode: PeakMode) -> String {
        let peak_flag = match peak_mode {
            PeakMode::True => "--truepeak",
            PeakMode::Sample => "--samplepeak",
        };
        let command = ToolCommand::new(&self.program)
            .arg("--audio")
            .arg(track_id.to_string())
            .arg("--replaygain")
            .arg("--range")
            .arg(peak_flag)
            .arg(path);
        self.capture(&command, false)
    }

    fn capture(&self, command: &ToolCommand, merge_stderr: bool) -> String {
        match self.runner.run(command) {
            Ok(output) if output.success => {
                if merge_stderr {
                    output.merged()
                } else {
                    output.stdout
                }
            }
            Ok(output) => {
                tracing::debug!(
                    "{} exited unsuccessfully: {}",
                    command.program_name(),
                    output.stderr.trim()
                );
                String::new()
            }
            Err(e) => {
                tracing::debug!("{}", e);
                String::new()
            }
        }
    }
}
