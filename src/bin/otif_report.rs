use anyhow::Result;
use clap::Parser;
use o2c_otif::config::{
    AnalysisConfig, DEFAULT_LABEL_COUNT, DEFAULT_MIN_CASES, DEFAULT_REL_ERR_THRESHOLD,
    DEFAULT_TOP_N,
};
use o2c_otif::pipeline::run_otif;
use o2c_otif::report::{section_header, subsection};
use std::path::PathBuf;
use tracing::info;

/// OTIF root-cause tables per business dimension
#[derive(Parser, Debug)]
#[command(name = "otif_report")]
#[command(about = "Engineer OTIF KPIs, aggregate per dimension, rank and flag anomalies")]
struct Args {
    /// Case table CSV (`,` `;` or tab delimited)
    #[arg(long, default_value = "data/case_table.csv")]
    input: PathBuf,

    #[arg(long, default_value = "assets/woodcorp-otif-rootcause")]
    output_dir: PathBuf,

    /// Rows per presentation table
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,

    /// Minimum cases for a group to be presented
    #[arg(long, default_value_t = DEFAULT_MIN_CASES)]
    min_cases: usize,

    /// Relative error above which order value and price disagree
    #[arg(long, default_value_t = DEFAULT_REL_ERR_THRESHOLD)]
    rel_err_threshold: f64,

    /// Groups labelled in the problem-class tables
    #[arg(long, default_value_t = DEFAULT_LABEL_COUNT)]
    label_count: usize,

    /// Comma-separated grouping columns, overrides the known candidates
    #[arg(long, value_delimiter = ',')]
    dimensions: Option<Vec<String>>,

    /// Rows of the global ranking to print
    #[arg(long, default_value = "10")]
    show: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let args = Args::parse();
    let config = AnalysisConfig {
        case_csv: args.input,
        output_dir: args.output_dir,
        top_n: args.top_n,
        min_cases: args.min_cases,
        rel_err_threshold: args.rel_err_threshold,
        label_count: args.label_count,
        dimensions: args.dimensions,
    };

    let outcome = run_otif(&config)?;
    print!("{}", outcome.console_report(&config));

    if !outcome.ranking.is_empty() {
        print!("{}", section_header("GLOBAL RANKING (all dimensions)"));
        print!("{}", subsection("Highest OTIF fail rate"));
        println!(
            "  {:20} {:36} {:>8} {:>10}",
            "Dimension", "Member", "Cases", "OTIF fail"
        );
        for row in outcome.ranking.iter().take(args.show) {
            println!(
                "  {:20} {:36} {:>8} {:>9.1}%",
                row.dimension,
                row.member,
                row.cases,
                row.otif_fail_rate_cases * 100.0
            );
        }
    }

    info!("Run summary written with {} files", outcome.summary.files.len());
    Ok(())
}
