//! Checks for existing ReplayGain tags before and after tagging.
//!
//! The same inspection means different things at the two checkpoints: a tag
//! found before tagging skips the file, a tag missing after tagging is an
//! error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::process::{ToolCommand, ToolRunner};
use crate::tags::ALGORITHM;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreCheck {
    Proceed,
    AlreadyTagged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostCheck {
    Passed,
    /// The inspector reported nothing at all for the file.
    NoTags,
    /// Tags exist but none carry the algorithm marker.
    MissingAlgorithm,
}

pub struct VerificationChecker {
    program: PathBuf,
    runner: Arc<dyn ToolRunner>,
    verify: bool,
    force: bool,
}

impl VerificationChecker {
    pub fn new(
        program: impl Into<PathBuf>,
        runner: Arc<dyn ToolRunner>,
        verify: bool,
        force: bool,
    ) -> Self {
        Self {
            program: program.into(),
            runner,
            verify,
            force,
        }
    }

    fn inspect(&self, path: &Path) -> String {
        let command = ToolCommand::new(&self.program).arg(path);
        match self.runner.run(&command) {
            Ok(output) if output.success => output.stdout,
            Ok(output) => {
                tracing::debug!(
                    "{} exited unsuccessfully for {}: {}",
                    command.program_name(),
                    path.display(),
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

    /// Checkpoint before any tag is written.
    pub fn pre(&self, path: &Path) -> PreCheck {
        if !self.verify {
            return PreCheck::Proceed;
        }
        if self.force {
            tracing::info!("Skipping replaygain tag check, --force is on");
            return PreCheck::Proceed;
        }
        if self.inspect(path).contains(ALGORITHM) {
            tracing::info!("Replaygain tags found in {}", path.display());
            PreCheck::AlreadyTagged
        } else {
            tracing::info!("No replaygain tags found in {}", path.display());
            PreCheck::Proceed
        }
    }

    /// Checkpoint after every track of the file has been processed.
    pub fn post(&self, path: &Path) -> PostCheck {
        if !self.verify {
            return PostCheck::Passed;
        }
        let info = self.inspect(path);
        if info.trim().is_empty() {
            tracing::error!("No tags at all found in {}", path.display());
            PostCheck::NoTags
        } else if info.contains(ALGORITHM) {
            tracing::debug!("Replaygain tags verified in {}", path.display());
            PostCheck::Passed
        } else {
            tracing::error!("No replaygain tags found in {} after tagging", path.display());
            PostCheck::MissingAlgorithm
        }
    }
}
