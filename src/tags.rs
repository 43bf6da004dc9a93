use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::error::TagError;
use crate::models::{GainMeasurement, ReferenceLoudness};
use crate::process::{ToolCommand, ToolRunner};

pub const ALGORITHM: &str = "ITU-R BS.1770";

pub const TAG_ALGORITHM: &str = "REPLAYGAIN_ALGORITHM";
pub const TAG_REFERENCE_LOUDNESS: &str = "REPLAYGAIN_REFERENCE_LOUDNESS";
pub const TAG_TRACK_GAIN: &str = "REPLAYGAIN_TRACK_GAIN";
pub const TAG_TRACK_RANGE: &str = "REPLAYGAIN_TRACK_RANGE";
pub const TAG_TRACK_PEAK: &str = "REPLAYGAIN_TRACK_PEAK";

/// Ordered list of simple tags for one track.
#[derive(Debug, Clone, PartialEq)]
pub struct TagDocument {
    entries: Vec<(&'static str, String)>,
}

impl TagDocument {
    pub fn new(reference: ReferenceLoudness, gain: &GainMeasurement) -> Self {
        Self {
            entries: vec![
                (TAG_ALGORITHM, ALGORITHM.to_string()),
                (TAG_REFERENCE_LOUDNESS, reference.to_string()),
                (TAG_TRACK_GAIN, format!("{:.2} LU", gain.integrated_loudness)),
                (TAG_TRACK_RANGE, format!("{:.2} LUFS", gain.loudness_range)),
                (TAG_TRACK_PEAK, format!("{:.6}", gain.peak)),
            ],
        }
    }

    pub fn entries(&self) -> &[(&'static str, String)] {
        &self.entries
    }

    /// Matroska tag XML as accepted by `mkvpropedit --tags`.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <!DOCTYPE Tags SYSTEM \"matroskatags.dtd\">\n\
             <Tags>\n  <Tag>\n    <Targets />\n",
        );
        for (name, value) in &self.entries {
            xml.push_str(&format!(
                "    <Simple>\n      <Name>{}</Name>\n      <String>{}</String>\n    </Simple>\n",
                escape_xml(name),
                escape_xml(value)
            ));
        }
        xml.push_str("  </Tag>\n</Tags>\n");
        xml
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// A worker's private scratch file, reused for every track it tags.
///
/// The file is truncated in place before each write rather than recreated,
/// and removed when the worker drops it.
pub struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    pub fn new() -> Result<Self, TagError> {
        let file = tempfile::Builder::new()
            .prefix("mkvrg-")
            .suffix(".xml")
            .tempfile()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Replace the file contents with `document`, returning the written size.
    pub fn write_document(&mut self, document: &TagDocument) -> Result<u64, TagError> {
        let handle = self.file.as_file_mut();
        handle.set_len(0)?;
        handle.seek(SeekFrom::Start(0))?;
        handle.write_all(document.to_xml().as_bytes())?;
        handle.flush()?;

        let len = handle.metadata()?.len();
        if len == 0 {
            return Err(TagError::EmptyDocument(self.file.path().to_path_buf()));
        }
        Ok(len)
    }
}

/// Applies a scratch tag file to one track of a container via the tag editor.
#[derive(Clone)]
pub struct TagApplier {
    program: PathBuf,
    runner: Arc<dyn ToolRunner>,
}

impl TagApplier {
    pub fn new(program: impl Into<PathBuf>, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    /// `track_id` is the analyzer's stream id; the tag editor numbers
    /// tracks from one, so it is addressed as `track_id + 1`.
    pub fn apply(&self, track_id: u32, scratch: &Path, container: &Path) -> bool {
        let Some(track_number) = track_id.checked_add(1) else {
            tracing::error!(
                "Stream id {} of {} cannot be addressed by the tag editor",
                track_id,
                container.display()
            );
            return false;
        };
        let mut selector = std::ffi::OsString::from(format!("track:{}:", track_number));
        selector.push(scratch);
        let command = ToolCommand::new(&self.program)
            .arg(container)
            .arg("--tags")
            .arg(selector);

        match self.runner.run(&command) {
            Ok(output) if output.success && !output.stdout.trim().is_empty() => true,
            Ok(output) => {
                tracing::error!(
                    "{} failed for track {} of {}: {}",
                    command.program_name(),
                    track_number,
                    container.display(),
                    output.merged().trim()
                );
                false
            }
            Err(e) => {
                tracing::error!("{}", e);
                false
            }
        }
    }
}
