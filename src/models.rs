use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// A file picked up by the scanner, already filtered by extension and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub size: u64,
}

/// One audio stream of a candidate, as reported by the analyzer's track listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// 1-based position among all audio streams of the file.
    pub index: usize,
    /// Stream id used by the analyzer; the tag editor addresses it as `external_id + 1`.
    pub external_id: u32,
    pub is_default: bool,
}

/// Loudness statistics for a single track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainMeasurement {
    /// Track gain in LU relative to the reference loudness.
    pub integrated_loudness: f64,
    /// Loudness range in LUFS.
    pub loudness_range: f64,
    /// Sample or true peak, depending on the selected [`PeakMode`].
    pub peak: f64,
}

/// Reference loudness the analyzer normalizes against, in LUFS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLoudness(pub f64);

impl fmt::Display for ReferenceLoudness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} LUFS", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeakMode {
    /// Oversampled true-peak estimation
    #[default]
    True,
    /// Plain sample peak
    Sample,
}

/// Run-wide settings, fixed before the first worker starts.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub default_track_only: bool,
    pub min_size_bytes: u64,
    pub verify: bool,
    pub force: bool,
    pub peak_mode: PeakMode,
    pub threads: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum TrackOutcome {
    Tagged(GainMeasurement),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackReport {
    pub track: Track,
    pub outcome: TrackOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum FileStatus {
    Tagged,
    AlreadyTagged,
    Skipped(String),
    Failed(String),
}

/// Result of running one candidate through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    #[serde(default)]
    pub tracks: Vec<TrackReport>,
}

impl FileReport {
    pub fn tagged_tracks(&self) -> usize {
        self.tracks
            .iter()
            .filter(|t| matches!(t.outcome, TrackOutcome::Tagged(_)))
            .count()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub reference_loudness: Option<ReferenceLoudness>,
    pub files: Vec<FileReport>,
}

impl RunSummary {
    pub fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.status)).count()
    }

    pub fn tagged(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Tagged))
    }

    pub fn already_tagged(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::AlreadyTagged))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed(_)))
    }
}
