#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use mkvrg::models::{FileStatus, RunSummary};
use predicates::prelude::*;

const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

const ANALYZER: &str = r#"#!/bin/sh
case "$1" in
  --help)
    echo "Usage: bs1770gain [options] <file/dir> ..."
    echo " --replaygain:  calculate according to ReplayGain 2.0 (-18.0 LUFS, default)"
    exit 1
    ;;
  --list)
    echo "Input #0, matroska,webm, from '$2':"
    echo "    Stream #0:0: Video: h264 (High), yuv420p (default)" >&2
    echo "    Stream #0:1(eng): Audio: flac, 44100 Hz, stereo, s16 (default)" >&2
    ;;
  --audio)
    echo "  [1/1] \"$6\":"
    echo "      integrated:  -20.00 LUFS / 2.00 LU"
    echo "      range:  5.00 LUFS"
    echo "      true peak:  -1.00 TPFS / 0.891251"
    echo "  [ALBUM]:"
    ;;
esac
"#;

const ANALYZER_WITHOUT_REFERENCE: &str = "#!/bin/sh\necho \"Usage: analyzer [options]\"\n";

/// Records its arguments next to the script and marks the container tagged.
const TAG_EDITOR: &str = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/editor.log"
touch "$1.tagged"
echo "Done."
"#;

const FAILING_TAG_EDITOR: &str = "#!/bin/sh\necho \"Error: no such track\" >&2\nexit 2\n";

const INSPECTOR: &str = r#"#!/bin/sh
if [ -e "$1.tagged" ]; then
  echo "|   + String: ITU-R BS.1770"
else
  echo "|+ Tags"
fi
"#;

struct Fixture {
    _tools: tempfile::TempDir,
    media: tempfile::TempDir,
    analyzer: PathBuf,
    tag_editor: PathBuf,
    inspector: PathBuf,
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn fixture_with(analyzer: &str, tag_editor: &str) -> Fixture {
    let tools = tempfile::tempdir().unwrap();
    let media = tempfile::tempdir().unwrap();
    Fixture {
        analyzer: write_script(tools.path(), "bs1770gain", analyzer),
        tag_editor: write_script(tools.path(), "mkvpropedit", tag_editor),
        inspector: write_script(tools.path(), "mkvinfo", INSPECTOR),
        _tools: tools,
        media,
    }
}

fn fixture() -> Fixture {
    fixture_with(ANALYZER, TAG_EDITOR)
}

impl Fixture {
    fn matroska(&self, name: &str) -> PathBuf {
        let path = self.media.path().join(name);
        std::fs::write(&path, [&EBML_MAGIC[..], &[0u8; 60][..]].concat()).unwrap();
        path
    }

    fn editor_log(&self) -> String {
        let log = self.tag_editor.parent().unwrap().join("editor.log");
        std::fs::read_to_string(log).unwrap_or_default()
    }

    fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("mkvrg");
        cmd.env_remove("RUST_LOG")
            .arg("--analyzer")
            .arg(&self.analyzer)
            .arg("--tag-editor")
            .arg(&self.tag_editor)
            .arg("--inspector")
            .arg(&self.inspector)
            .arg(self.media.path());
        cmd
    }
}

#[test]
fn test_missing_tool_is_fatal() {
    let fx = fixture();
    cargo_bin_cmd!("mkvrg")
        .args(["--analyzer", "/nonexistent/bs1770gain"])
        .arg(fx.media.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains(
            "The program '/nonexistent/bs1770gain' is required.",
        ));
}

#[test]
fn test_inspector_only_required_with_verify() {
    let fx = fixture();
    fx.matroska("a.mkv");

    fx.cmd()
        .args(["--inspector", "/nonexistent/mkvinfo"])
        .assert()
        .success();

    fx.cmd()
        .args(["--inspector", "/nonexistent/mkvinfo", "--verify"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("'/nonexistent/mkvinfo' is required"));
}

#[test]
fn test_missing_reference_loudness_is_fatal() {
    let fx = fixture_with(ANALYZER_WITHOUT_REFERENCE, TAG_EDITOR);
    fx.matroska("a.mkv");

    fx.cmd()
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("reference loudness"));
    assert!(fx.editor_log().is_empty());
}

#[test]
fn test_tags_matroska_files() {
    let fx = fixture();
    fx.matroska("a.mkv");
    let nested = fx.media.path().join("disc 2");
    std::fs::create_dir(&nested).unwrap();
    std::fs::write(nested.join("b.MKA"), [&EBML_MAGIC[..], &[0u8; 8][..]].concat()).unwrap();
    std::fs::write(fx.media.path().join("notes.txt"), "not media").unwrap();

    fx.cmd()
        .assert()
        .success()
        .stdout(predicates::str::contains("Reference loudness: -18.00 LUFS"))
        .stdout(predicates::str::contains(
            "Done: 2 tagged, 0 already tagged, 0 skipped, 0 failed (out of 2 total)",
        ));

    let log = fx.editor_log();
    assert_eq!(log.lines().count(), 2);
    assert!(log.lines().all(|line| line.contains("--tags track:2:")));
}

#[test]
fn test_not_matroska_is_skipped() {
    let fx = fixture();
    std::fs::write(fx.media.path().join("fake.mkv"), b"RIFF....WAVEfmt ").unwrap();

    fx.cmd()
        .assert()
        .success()
        .stdout(predicates::str::contains("skipped (not a matroska file)"));
    assert!(fx.editor_log().is_empty());
}

#[test]
fn test_verify_skips_tagged_files_unless_forced() {
    let fx = fixture();
    let path = fx.matroska("a.mkv");
    std::fs::write(format!("{}.tagged", path.display()), "").unwrap();

    fx.cmd()
        .arg("--verify")
        .assert()
        .success()
        .stdout(predicates::str::contains("1 already tagged"));
    assert!(fx.editor_log().is_empty());

    fx.cmd()
        .args(["--verify", "--force"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Done: 1 tagged"));
    assert_eq!(fx.editor_log().lines().count(), 1);
}

#[test]
fn test_verify_passes_after_tagging() {
    let fx = fixture();
    fx.matroska("a.mkv");

    fx.cmd()
        .arg("-c")
        .assert()
        .success()
        .stdout(predicates::str::contains("Done: 1 tagged"));
}

#[test]
fn test_tag_failure_continues_without_exit_flag() {
    let fx = fixture_with(ANALYZER, FAILING_TAG_EDITOR);
    fx.matroska("a.mkv");
    fx.matroska("b.mkv");

    fx.cmd()
        .assert()
        .success()
        .stdout(predicates::str::contains("2 failed (out of 2 total)"));
}

#[test]
fn test_exit_flag_stops_on_first_error() {
    let fx = fixture_with(ANALYZER, FAILING_TAG_EDITOR);
    fx.matroska("a.mkv");

    fx.cmd()
        .args(["--exit", "-j", "1"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicates::str::contains("Done:").not())
        .stderr(predicates::str::contains("The --exit option is enabled"));
}

#[test]
fn test_exit_flag_works_when_silent() {
    let fx = fixture_with(ANALYZER, FAILING_TAG_EDITOR);
    fx.matroska("a.mkv");

    fx.cmd()
        .args(["--exit", "-v", "-1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicates::str::contains("no such track").not());
}

#[test]
fn test_minsize_filters_small_files() {
    let fx = fixture();
    fx.matroska("small.mkv");

    fx.cmd()
        .args(["--minsize", "1"])
        .assert()
        .success()
        .stdout(predicates::str::contains("(out of 0 total)"));
    assert!(fx.editor_log().is_empty());
}

#[test]
fn test_json_summary() {
    let fx = fixture();
    fx.matroska("a.mkv");
    std::fs::write(fx.media.path().join("b.mkv"), b"garbage").unwrap();

    let output = fx.cmd().args(["--json", "--jobs", "2"]).output().unwrap();
    assert!(output.status.success());

    let summary: RunSummary = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary.files.len(), 2);
    assert_eq!(summary.files[0].status, FileStatus::Tagged);
    assert_eq!(summary.files[0].tagged_tracks(), 1);
    assert_eq!(
        summary.files[1].status,
        FileStatus::Skipped("not a matroska file".to_string())
    );
}

#[test]
fn test_silent_verbosity() {
    let fx = fixture();
    fx.matroska("a.mkv");

    fx.cmd()
        .args(["-v", "-1"])
        .assert()
        .success()
        .stderr(predicates::str::contains("Processing file").not());

    fx.cmd()
        .args(["-v", "1"])
        .assert()
        .success()
        .stderr(predicates::str::contains("Processing file"));
}

#[test]
fn test_rejects_out_of_range_verbosity() {
    cargo_bin_cmd!("mkvrg").args(["-v", "2"]).assert().failure();
}
