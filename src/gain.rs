use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{GainField, GainParseError};
use crate::models::{GainMeasurement, ReferenceLoudness};

const ALBUM_MARKER: &str = "[ALBUM]";

static INTEGRATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)\s*LU\s*$").expect("valid regex"));
static RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)\s*LUFS\s*$").expect("valid regex"));
static PEAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)\s*$").expect("valid regex"));
static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)\s*LUFS").expect("valid regex"));

fn trailing_number(re: &Regex, line: &str, field: GainField) -> Result<f64, GainParseError> {
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| GainParseError::Malformed {
            field,
            line: line.trim().to_string(),
        })
}

/// The `label:` prefix of a measurement line, e.g. `true peak` in
/// `true peak:  -0.41 TPFS / 0.953846`. File header lines start with a
/// `[n/m]` counter and quoted path, so they never yield a label.
fn line_label(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if line.starts_with('[') {
        return None;
    }
    line.split_once(':').map(|(label, _)| label.trim())
}

/// Parse the per-track section of an analysis run.
///
/// Scanning stops at the album summary. The first line labelled with each
/// field wins; a labelled line that does not end in the expected value
/// aborts the parse. All three fields are required.
pub fn parse_gain(text: &str) -> Result<GainMeasurement, GainParseError> {
    if text.trim().is_empty() {
        return Err(GainParseError::Empty);
    }

    let mut integrated = None;
    let mut range = None;
    let mut peak = None;

    for line in text.lines() {
        if line.trim_start().starts_with(ALBUM_MARKER) {
            break;
        }
        let Some(label) = line_label(line) else {
            continue;
        };
        if integrated.is_none() && label == "integrated" {
            integrated = Some(trailing_number(&INTEGRATED, line, GainField::Integrated)?);
        } else if range.is_none() && label == "range" {
            range = Some(trailing_number(&RANGE, line, GainField::Range)?);
        } else if peak.is_none() && label.ends_with("peak") {
            peak = Some(trailing_number(&PEAK, line, GainField::Peak)?);
        }
    }

    Ok(GainMeasurement {
        integrated_loudness: integrated.ok_or(GainParseError::Missing(GainField::Integrated))?,
        loudness_range: range.ok_or(GainParseError::Missing(GainField::Range))?,
        peak: peak.ok_or(GainParseError::Missing(GainField::Peak))?,
    })
}

/// Find the ReplayGain reference loudness advertised in the analyzer's help.
pub fn parse_reference_loudness(help: &str) -> Option<ReferenceLoudness> {
    help.lines()
        .filter(|line| line.to_lowercase().contains("replaygain"))
        .find_map(|line| {
            REFERENCE
                .captures(line)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
        .map(ReferenceLoudness)
}
