use crate::models::{FileReport, FileStatus, RunSummary, TrackOutcome};

fn status_label(status: &FileStatus) -> String {
    match status {
        FileStatus::Tagged => "tagged".to_string(),
        FileStatus::AlreadyTagged => "already tagged".to_string(),
        FileStatus::Skipped(reason) => format!("skipped ({})", reason),
        FileStatus::Failed(reason) => format!("FAILED ({})", reason),
    }
}

/// One line per tagged track: index, gain, range, peak.
fn format_tracks(report: &FileReport, output: &mut String) {
    for track in &report.tracks {
        match &track.outcome {
            TrackOutcome::Tagged(gain) => output.push_str(&format!(
                "    #{:<3} {:>8.2} LU {:>8.2} LUFS {:>10.6}\n",
                track.track.index, gain.integrated_loudness, gain.loudness_range, gain.peak,
            )),
            TrackOutcome::Failed(reason) => output.push_str(&format!(
                "    #{:<3} {}\n",
                track.track.index, reason
            )),
        }
    }
}

/// Format a run summary as a plain-text report.
pub fn format_table(summary: &RunSummary) -> String {
    let separator = "\u{2500}".repeat(58);
    let mut output = String::new();

    if let Some(reference) = summary.reference_loudness {
        output.push_str(&format!("Reference loudness: {}\n", reference));
    }
    output.push_str(&separator);
    output.push('\n');

    for report in &summary.files {
        output.push_str(&format!(
            "{}  {}\n",
            report.path.display(),
            status_label(&report.status)
        ));
        format_tracks(report, &mut output);
    }

    output.push_str(&separator);
    output.push('\n');

    output.push_str(&format!(
        "Done: {} tagged, {} already tagged, {} skipped, {} failed (out of {} total)",
        summary.tagged(),
        summary.already_tagged(),
        summary.skipped(),
        summary.failed(),
        summary.files.len(),
    ));

    output
}

/// Format a run summary as pretty-printed JSON.
pub fn format_json(summary: &RunSummary) -> String {
    serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
}
