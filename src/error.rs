use std::path::PathBuf;

use thiserror::Error;

/// Failure to run an external program at all.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Which field of a gain measurement a parse error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainField {
    Integrated,
    Range,
    Peak,
}

impl std::fmt::Display for GainField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            GainField::Integrated => "integrated loudness",
            GainField::Range => "loudness range",
            GainField::Peak => "peak",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GainParseError {
    #[error("analyzer returned no output")]
    Empty,

    #[error("could not read {field} from line: {line:?}")]
    Malformed { field: GainField, line: String },

    #[error("{0} missing from analyzer output")]
    Missing(GainField),
}

#[derive(Error, Debug)]
pub enum TagError {
    #[error("scratch file is empty after writing {0}")]
    EmptyDocument(PathBuf),

    #[error("scratch file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a candidate did not make it into the tagging pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("not a matroska file")]
    NotMatroska,

    #[error("could not read file: {0}")]
    Unreadable(String),

    #[error("analyzer could not list tracks")]
    ListingFailed,

    #[error("no audio tracks found")]
    NoAudio,

    #[error("no audio tracks found in an audio-only container")]
    MissingAudio,

    #[error("no default audio track")]
    NoDefaultTrack,

    #[error("could not read audio stream ids")]
    UnreadableStreamIds,
}

impl Rejection {
    /// Rejections that mean something is wrong with the file rather than
    /// the file simply not being a tagging target.
    pub fn is_error(&self) -> bool {
        matches!(self, Rejection::MissingAudio | Rejection::Unreadable(_))
    }
}
