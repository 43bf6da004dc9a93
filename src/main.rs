use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use mkvrg::analyzer::AnalyzerClient;
use mkvrg::format;
use mkvrg::gain;
use mkvrg::logging;
use mkvrg::models::{PeakMode, RunConfig, RunSummary};
use mkvrg::pipeline::{self, Pipeline};
use mkvrg::process::{find_program, SystemRunner, ToolRunner, Tools};
use mkvrg::scan;

const MIB: u64 = 1024 * 1024;

#[derive(Parser)]
#[command(
    name = "mkvrg",
    about = "Analyze Matroska audio tracks and write ReplayGain tags",
    args_override_self = true
)]
struct Cli {
    /// Folder(s) or file(s) to scan for matroska files (default: current directory)
    paths: Vec<PathBuf>,

    /// Only process the default audio track
    #[arg(short = 'd', long = "default")]
    default_track: bool,

    /// Minimum size of matroska files in MiB
    #[arg(short = 'm', long, default_value_t = 0)]
    minsize: u64,

    /// Check for replaygain tags before and after tagging
    #[arg(short = 'c', long)]
    verify: bool,

    /// Tag files even if they already have replaygain tags
    #[arg(short = 'f', long)]
    force: bool,

    /// Stop and exit on the first error
    #[arg(short = 'e', long = "exit")]
    stop_on_error: bool,

    /// Number of parallel workers (default: number of CPU cores)
    #[arg(short = 'j', long, visible_alias = "threads", default_value_t = 0)]
    jobs: usize,

    /// Peak algorithm used by the analyzer
    #[arg(short = 'p', long, value_enum, default_value_t = PeakMode::True)]
    peak: PeakMode,

    /// Level of verbosity (-1 = silent, 0 = normal, 1 = debug)
    #[arg(
        short = 'v',
        long,
        default_value_t = 0,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i8).range(-1..=1)
    )]
    verbosity: i8,

    /// Print the run summary as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Loudness analyzer program
    #[arg(long, env = "MKVRG_ANALYZER", default_value = "bs1770gain")]
    analyzer: PathBuf,

    /// Matroska tag editor program
    #[arg(long, env = "MKVRG_TAG_EDITOR", default_value = "mkvpropedit")]
    tag_editor: PathBuf,

    /// Matroska metadata inspector program (used with --verify)
    #[arg(long, env = "MKVRG_INSPECTOR", default_value = "mkvinfo")]
    inspector: PathBuf,
}

/// Fail unless every external program the run needs can be found.
fn check_binaries(tools: &Tools, verify: bool) -> Result<()> {
    let mut required = vec![&tools.analyzer, &tools.tag_editor];
    if verify {
        required.push(&tools.inspector);
    }
    for program in required {
        if find_program(program).is_none() {
            anyhow::bail!("The program '{}' is required.", program.display());
        }
    }
    Ok(())
}

fn print_benchmark(summary: &RunSummary, elapsed: std::time::Duration) {
    let tracks: usize = summary.files.iter().map(|f| f.tagged_tracks()).sum();
    eprintln!(
        "Processed {} files ({} tracks tagged) in {:.2}s",
        summary.files.len(),
        tracks,
        elapsed.as_secs_f64(),
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbosity, cli.stop_on_error);

    let tools = Tools {
        analyzer: cli.analyzer,
        tag_editor: cli.tag_editor,
        inspector: cli.inspector,
    };
    check_binaries(&tools, cli.verify)?;

    let runner: Arc<dyn ToolRunner> = Arc::new(SystemRunner);
    let help = AnalyzerClient::new(&tools.analyzer, Arc::clone(&runner)).help_text();
    let reference = gain::parse_reference_loudness(&help).with_context(|| {
        format!(
            "Could not find the reference loudness in the output of '{} --help'",
            tools.analyzer.display()
        )
    })?;
    tracing::info!("Reference loudness: {}", reference);

    let config = RunConfig {
        default_track_only: cli.default_track,
        min_size_bytes: cli.minsize.saturating_mul(MIB),
        verify: cli.verify,
        force: cli.force,
        peak_mode: cli.peak,
        threads: cli.jobs,
    };

    let roots = if cli.paths.is_empty() {
        tracing::info!("No path(s) given, processing current working directory recursively.");
        vec![PathBuf::from(".")]
    } else {
        cli.paths
    };

    let min_size = config.min_size_bytes;
    let pipeline = Pipeline::new(config, reference, &tools, runner);

    let start = Instant::now();
    let summary = pipeline::run(&pipeline, scan::candidates(&roots, min_size))?;
    let elapsed = start.elapsed();

    if cli.json {
        println!("{}", format::format_json(&summary));
    } else {
        println!("{}", format::format_table(&summary));
    }

    print_benchmark(&summary, elapsed);

    Ok(())
}
