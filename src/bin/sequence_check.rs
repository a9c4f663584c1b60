use anyhow::Result;
use clap::Parser;
use o2c_otif::config::SequenceConfig;
use o2c_otif::pipeline::run_sequence_check;
use o2c_otif::report;
use std::path::PathBuf;
use tracing::info;

/// First violation of the core order-to-cash chain per case
#[derive(Parser, Debug)]
#[command(name = "sequence_check")]
#[command(about = "Check event timestamps against the core activity order")]
struct Args {
    /// Event log CSV with CASE_KEY, ACTIVITY_EN and EVENTTIME
    #[arg(long, default_value = "data/activity_table.csv")]
    input: PathBuf,

    #[arg(long, default_value = "data_checkup")]
    output_dir: PathBuf,

    /// Transitions shown in the console summary
    #[arg(long, default_value = "10")]
    top_n: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let args = Args::parse();
    let config = SequenceConfig {
        event_csv: args.input,
        output_dir: args.output_dir,
        top_n: args.top_n,
    };

    let outcome = run_sequence_check(&config)?;
    print!("{}", report::sequence_summary(&outcome.summary, config.top_n));

    if outcome.dropped_rows > 0 {
        println!("\n  Event rows without usable timestamp: {}", outcome.dropped_rows);
    }
    for path in &outcome.files {
        info!("Saved: {}", path.display());
    }
    Ok(())
}
