use anyhow::Result;
use clap::Parser;
use o2c_otif::pipeline::distinct_activities;
use std::path::PathBuf;
use tracing::info;

/// Distinct activity names of an event log
#[derive(Parser, Debug)]
#[command(name = "list_activities")]
#[command(about = "Print the activity vocabulary of an event log")]
struct Args {
    #[arg(long, default_value = "data/activity_table.csv")]
    input: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let args = Args::parse();
    let activities = distinct_activities(&args.input)?;
    info!("{} distinct activities in {:?}", activities.len(), args.input);

    for (i, activity) in activities.iter().enumerate() {
        println!("{}\t{}", i, activity);
    }
    Ok(())
}
