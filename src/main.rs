use anyhow::Result;
use clap::Parser;
use o2c_otif::config::{
    AnalysisConfig, SequenceConfig, DEFAULT_LABEL_COUNT, DEFAULT_MIN_CASES,
    DEFAULT_REL_ERR_THRESHOLD, DEFAULT_TOP_N,
};
use o2c_otif::pipeline::{run_otif, run_sequence_check};
use o2c_otif::report;
use std::path::PathBuf;
use tracing::info;

/// Order-to-cash OTIF root-cause analysis and core sequence check
#[derive(Parser, Debug)]
#[command(name = "o2c_otif")]
#[command(about = "Run the OTIF root-cause tables and the core sequence check")]
struct Args {
    /// Case table CSV
    #[arg(long, default_value = "data/case_table.csv")]
    cases: PathBuf,

    /// Event log CSV
    #[arg(long, default_value = "data/activity_table.csv")]
    events: PathBuf,

    /// Output root for OTIF tables and flags
    #[arg(long, default_value = "assets/woodcorp-otif-rootcause")]
    output_dir: PathBuf,

    /// Output directory for the sequence check
    #[arg(long, default_value = "data_checkup")]
    sequence_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,

    /// Minimum cases for a group to be presented
    #[arg(long, default_value_t = DEFAULT_MIN_CASES)]
    min_cases: usize,

    #[arg(long, default_value_t = DEFAULT_REL_ERR_THRESHOLD)]
    rel_err_threshold: f64,

    /// Skip the sequence check
    #[arg(long)]
    skip_sequence: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let args = Args::parse();

    let config = AnalysisConfig {
        case_csv: args.cases,
        output_dir: args.output_dir,
        top_n: args.top_n,
        min_cases: args.min_cases,
        rel_err_threshold: args.rel_err_threshold,
        label_count: DEFAULT_LABEL_COUNT,
        dimensions: None,
    };
    let outcome = run_otif(&config)?;
    print!("{}", outcome.console_report(&config));

    if args.skip_sequence {
        info!("Sequence check skipped");
        return Ok(());
    }

    let sequence = SequenceConfig {
        event_csv: args.events,
        output_dir: args.sequence_dir,
        ..SequenceConfig::default()
    };
    let checked = run_sequence_check(&sequence)?;
    print!("{}", report::sequence_summary(&checked.summary, sequence.top_n));

    info!(
        "Done: {} OTIF files, {} sequence files",
        outcome.summary.files.len(),
        checked.files.len()
    );
    Ok(())
}
