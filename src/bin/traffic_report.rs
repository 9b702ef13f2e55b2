//! traffic_report - summarize a recorded traffic log

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use traffic_timing::{read_jsonl, write_csv, TrafficReport, DEFAULT_YELLOW_SECS};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSONL traffic log written by intersectiond or demo.
    #[arg(long, env = "TRAFFIC_LOG_PATH")]
    log: PathBuf,
    /// Also write the status records as CSV.
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Yellow interval subtracted from the mean phase time.
    #[arg(long, default_value_t = DEFAULT_YELLOW_SECS)]
    yellow_secs: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let records = read_jsonl(&args.log)?;
    log::info!("loaded {} status records from {}", records.len(), args.log.display());

    if let Some(path) = &args.csv {
        write_csv(path, &records)?;
    }

    let report = TrafficReport::from_records(&records, args.yellow_secs)
        .ok_or_else(|| anyhow!("no status records in {}", args.log.display()))?;
    print!("{}", report);
    Ok(())
}
