use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Track;

const STREAM_MARKER: &str = "Stream #";
const AUDIO_MARKER: &str = "Audio";
const DEFAULT_MARKER: &str = "(default)";

static STREAM_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Stream #\d+:(\d+).*Audio").expect("valid stream regex"));

/// Tracks found in one listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackListing {
    /// Number of audio stream lines seen, whether or not they were kept.
    pub audio_streams: usize,
    /// Kept tracks in discovery order; `index` values are 1-based.
    pub tracks: Vec<Track>,
}

impl TrackListing {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Parse a stream listing into audio tracks.
///
/// Every audio line advances the 1-based counter, including lines dropped
/// by `default_only`, so indices stay tied to the stream's position in the
/// file.
pub fn parse_track_listing(text: &str, default_only: bool) -> TrackListing {
    let mut listing = TrackListing::default();

    for line in text.lines() {
        if !(line.contains(STREAM_MARKER) && line.contains(AUDIO_MARKER)) {
            continue;
        }
        listing.audio_streams += 1;
        let index = listing.audio_streams;
        let is_default = line.contains(DEFAULT_MARKER);

        if default_only && !is_default {
            tracing::info!("Skipping audio track {}, only default tracks are processed", index);
            continue;
        }

        let Some(external_id) = STREAM_ID
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
        else {
            tracing::warn!("Could not read a stream id from line: {}", line.trim());
            continue;
        };

        tracing::debug!("Audio track {} has stream id {}", index, external_id);
        listing.tracks.push(Track {
            index,
            external_id,
            is_default,
        });
    }

    listing
}
