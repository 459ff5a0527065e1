//! Sequential Segment Report CLI
//!
//! # Usage
//!
//! ```bash
//! # Segments of a JSON loop fixture, text output
//! cargo run --bin segment-report -- report --fixture loop.json
//!
//! # JSON output with a YAML configuration and DOT dumps
//! cargo run --bin segment-report -- report --fixture loop.json \
//!     --config loopsync.yaml --format json --dump-dir target/sccdag
//!
//! # Print a preset configuration
//! cargo run --bin segment-report -- config --preset balanced
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use loopsync_core::config::{LoopSyncConfig, Preset};
use loopsync_core::features::sequential_segments::{
    LoopFixture, SequentialSegmentSynthesizer, SynthesisReport,
};
use loopsync_core::shared::models::Function;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "segment-report")]
#[command(about = "Sequential segments of a parallelized loop", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify the sequential segments of a loop fixture
    Report {
        /// JSON loop fixture
        #[arg(short, long)]
        fixture: PathBuf,

        /// YAML configuration (overrides --preset)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Configuration preset (fine, balanced, coarse)
        #[arg(long, default_value = "fine")]
        preset: String,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: Format,

        /// Directory receiving sccdag-*.dot dumps
        #[arg(long)]
        dump_dir: Option<PathBuf>,
    },

    /// Print a preset configuration as YAML
    Config {
        #[arg(long, default_value = "fine")]
        preset: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            fixture,
            config,
            preset,
            format,
            dump_dir,
        } => {
            let mut config = match config {
                Some(path) => LoopSyncConfig::from_yaml(&path)?,
                None => LoopSyncConfig::preset(Preset::from_str(&preset)?),
            };
            if let Some(dir) = dump_dir {
                config = config.segments(|s| s.dump_dir(dir));
            }
            run_report(fixture, config, format)?;
        }
        Commands::Config { preset } => {
            let config = LoopSyncConfig::preset(Preset::from_str(&preset)?);
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}

fn run_report(
    fixture: PathBuf,
    config: LoopSyncConfig,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let built = LoopFixture::from_path(&fixture)?.build()?;
    let synthesizer = SequentialSegmentSynthesizer::new(config)?;
    let report = synthesizer.identify(
        built.original.view(),
        built.cloned.view(),
        &built.correlation,
        &built.facts,
    )?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => print_text(&report, &built.cloned.function),
    }
    Ok(())
}

fn print_text(report: &SynthesisReport, task: &Function) {
    println!(
        "{}: {} partition set(s), {} sequential segment(s), iv-governed: {}",
        report.loop_id,
        report.partition.len(),
        report.segments.len(),
        report.iv_governed
    );
    if let Some(preamble) = report.preamble {
        println!("  preamble: {}", preamble);
    }
    for (original, tag) in report.classification.iter() {
        let task_scc = report
            .scc_map
            .get(original.index())
            .map(|scc| scc.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {} -> {}: {}", original, task_scc, tag.kind().as_str());
    }
    for segment in &report.segments {
        println!("\n{} (set {})", segment.id, segment.partition_index);
        for &inst in &segment.instructions {
            let label = task
                .inst(inst)
                .map(|i| i.label())
                .unwrap_or_else(|| inst.to_string());
            let mut marks = Vec::new();
            if segment.entries.contains(&inst) {
                marks.push("entry");
            }
            if segment.exits.contains(&inst) {
                marks.push("exit");
            }
            if marks.is_empty() {
                println!("    {}", label);
            } else {
                println!("    {}  [{}]", label, marks.join(", "));
            }
        }
    }
}
