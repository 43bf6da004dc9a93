use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::analyzer::AnalyzerClient;
use crate::discovery::parse_track_listing;
use crate::error::{GainParseError, Rejection, TagError};
use crate::gain::parse_gain;
use crate::models::{
    Candidate, FileReport, FileStatus, GainMeasurement, ReferenceLoudness, RunConfig, RunSummary,
    Track, TrackOutcome, TrackReport,
};
use crate::pool;
use crate::process::{ToolRunner, Tools};
use crate::scan::expects_audio;
use crate::tags::{ScratchFile, TagApplier, TagDocument};
use crate::verify::{PostCheck, PreCheck, VerificationChecker};

/// EBML header magic every Matroska file starts with.
const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// Outcome of checking whether a candidate can enter the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid { candidate: Candidate, tracks: Vec<Track> },
    Rejected { candidate: Candidate, reason: Rejection },
}

/// Why a single track could not be tagged.
#[derive(Debug)]
enum TrackFailure {
    Analysis(GainParseError),
    Scratch(TagError),
    Apply,
}

impl fmt::Display for TrackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackFailure::Analysis(e) => write!(f, "analysis failed: {}", e),
            TrackFailure::Scratch(e) => write!(f, "could not write tags: {}", e),
            TrackFailure::Apply => f.write_str("tag editor failed"),
        }
    }
}

fn is_matroska(path: &Path) -> std::io::Result<bool> {
    let mut magic = [0u8; 4];
    let mut file = File::open(path)?;
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == EBML_MAGIC),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Shared, read-only state for every worker.
pub struct Pipeline {
    config: RunConfig,
    reference: ReferenceLoudness,
    analyzer: AnalyzerClient,
    applier: TagApplier,
    checker: VerificationChecker,
}

impl Pipeline {
    pub fn new(
        config: RunConfig,
        reference: ReferenceLoudness,
        tools: &Tools,
        runner: Arc<dyn ToolRunner>,
    ) -> Self {
        Self {
            analyzer: AnalyzerClient::new(&tools.analyzer, Arc::clone(&runner)),
            applier: TagApplier::new(&tools.tag_editor, Arc::clone(&runner)),
            checker: VerificationChecker::new(
                &tools.inspector,
                runner,
                config.verify,
                config.force,
            ),
            config,
            reference,
        }
    }

    /// Decide whether a candidate carries audio tracks worth tagging.
    pub fn validate(&self, candidate: Candidate) -> Validation {
        let reject = |candidate, reason| Validation::Rejected { candidate, reason };

        match is_matroska(&candidate.path) {
            Ok(true) => {}
            Ok(false) => return reject(candidate, Rejection::NotMatroska),
            Err(e) => return reject(candidate, Rejection::Unreadable(e.to_string())),
        }

        let text = self.analyzer.list_tracks(&candidate.path);
        if text.trim().is_empty() {
            return reject(candidate, Rejection::ListingFailed);
        }

        let listing = parse_track_listing(&text, self.config.default_track_only);
        if listing.audio_streams == 0 {
            let reason = if expects_audio(&candidate.path) {
                Rejection::MissingAudio
            } else {
                Rejection::NoAudio
            };
            return reject(candidate, reason);
        }
        if listing.is_empty() {
            let reason = if self.config.default_track_only {
                Rejection::NoDefaultTrack
            } else {
                Rejection::UnreadableStreamIds
            };
            return reject(candidate, reason);
        }

        tracing::debug!(
            "{} has {} audio tracks, {} selected",
            candidate.path.display(),
            listing.audio_streams,
            listing.tracks.len()
        );
        Validation::Valid {
            candidate,
            tracks: listing.tracks,
        }
    }

    /// Create a worker with its own scratch file.
    pub fn worker(&self) -> Result<Worker<'_>, TagError> {
        Ok(Worker {
            pipeline: self,
            scratch: ScratchFile::new()?,
        })
    }
}

/// Runs candidates through the pipeline one at a time.
pub struct Worker<'a> {
    pipeline: &'a Pipeline,
    scratch: ScratchFile,
}

impl Worker<'_> {
    pub fn process(&mut self, candidate: Candidate) -> FileReport {
        tracing::info!("Processing file: {}", candidate.path.display());

        let (candidate, tracks) = match self.pipeline.validate(candidate) {
            Validation::Valid { candidate, tracks } => (candidate, tracks),
            Validation::Rejected { candidate, reason } => {
                let status = if reason.is_error() {
                    tracing::error!("{}: {}", candidate.path.display(), reason);
                    FileStatus::Failed(reason.to_string())
                } else {
                    if matches!(
                        reason,
                        Rejection::ListingFailed | Rejection::UnreadableStreamIds
                    ) {
                        tracing::warn!("{}: {}", candidate.path.display(), reason);
                    } else {
                        tracing::info!("Skipping {}: {}", candidate.path.display(), reason);
                    }
                    FileStatus::Skipped(reason.to_string())
                };
                return FileReport {
                    path: candidate.path,
                    status,
                    tracks: Vec::new(),
                };
            }
        };
        let path = candidate.path;

        if self.pipeline.checker.pre(&path) == PreCheck::AlreadyTagged {
            return FileReport {
                path,
                status: FileStatus::AlreadyTagged,
                tracks: Vec::new(),
            };
        }

        let mut reports = Vec::with_capacity(tracks.len());
        let mut apply_failures = 0;
        for track in tracks {
            let outcome = match self.process_track(&path, &track) {
                Ok(gain) => TrackOutcome::Tagged(gain),
                Err(failure) => {
                    if matches!(failure, TrackFailure::Apply) {
                        apply_failures += 1;
                    } else {
                        tracing::error!(
                            "Skipping track {} of {}: {}",
                            track.index,
                            path.display(),
                            failure
                        );
                    }
                    TrackOutcome::Failed(failure.to_string())
                }
            };
            reports.push(TrackReport { track, outcome });
        }

        let tagged = reports
            .iter()
            .filter(|r| matches!(r.outcome, TrackOutcome::Tagged(_)))
            .count();

        let status = if tagged == 0 {
            tracing::error!("No track of {} could be tagged", path.display());
            FileStatus::Failed("no track could be tagged".to_string())
        } else {
            match self.pipeline.checker.post(&path) {
                PostCheck::Passed if apply_failures == 0 => FileStatus::Tagged,
                PostCheck::Passed => FileStatus::Failed(format!(
                    "tag editor failed for {} track(s)",
                    apply_failures
                )),
                PostCheck::NoTags => FileStatus::Failed("no tags found after tagging".to_string()),
                PostCheck::MissingAlgorithm => {
                    FileStatus::Failed("replaygain tags missing after tagging".to_string())
                }
            }
        };

        if status == FileStatus::Tagged {
            tracing::info!("Tagged {} track(s) in {}", tagged, path.display());
        }

        FileReport {
            path,
            status,
            tracks: reports,
        }
    }

    fn process_track(
        &mut self,
        path: &Path,
        track: &Track,
    ) -> Result<GainMeasurement, TrackFailure> {
        let pipeline = self.pipeline;
        tracing::debug!("Analyzing track {} (stream {})", track.index, track.external_id);

        let output = pipeline
            .analyzer
            .analyze_track(track.external_id, path, pipeline.config.peak_mode);
        let gain = parse_gain(&output).map_err(TrackFailure::Analysis)?;

        let document = TagDocument::new(pipeline.reference, &gain);
        self.scratch
            .write_document(&document)
            .map_err(TrackFailure::Scratch)?;

        if !pipeline
            .applier
            .apply(track.external_id, self.scratch.path(), path)
        {
            return Err(TrackFailure::Apply);
        }
        Ok(gain)
    }
}

/// Feed every candidate through a pool of workers and collect the reports,
/// sorted by path.
pub fn run<I>(pipeline: &Pipeline, candidates: I) -> Result<RunSummary>
where
    I: IntoIterator<Item = Candidate>,
{
    let workers = pool::resolve_workers(pipeline.config.threads);
    tracing::debug!("Starting {} workers", workers);

    let mut files = pool::run(
        workers,
        candidates,
        |id| {
            pipeline
                .worker()
                .with_context(|| format!("Failed to create scratch file for worker {}", id))
        },
        |worker, candidate| worker.process(candidate),
    )?;
    files.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(RunSummary {
        reference_loudness: Some(pipeline.reference),
        files,
    })
}
