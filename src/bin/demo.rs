//! demo - accelerated, deterministic run of the signal timing loop

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use traffic_timing::record::epoch_secs;
use traffic_timing::ui::{Ui, UiMode};
use traffic_timing::{
    write_csv, Clock, DetectorRegistry, Direction, FilteredDetector, FrameSource,
    JsonlTrafficLog, ManualClock, PhaseLayout, SharedAnalyzer, StatusRecord, SyntheticBackend,
    SyntheticConfig, SyntheticLoad, SyntheticSource, TimingAnalyzer, TimingConfig, TrafficLog,
    TrafficReport, VehicleFilter,
};

const LOG_FILE: &str = "traffic_log.jsonl";
const STATS_FILE: &str = "traffic_statistics.csv";
const RECOMMENDATION_EVERY_SECS: u64 = 10;
/// Mean vehicles per frame, by position in the layout.
const DEMO_LOADS: [f64; 6] = [4.0, 3.0, 1.0, 1.5, 2.0, 0.5];
const WAVE_PERIOD_SECS: u64 = 90;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Phase layout preset: four_way, two_road or single_road.
    #[arg(long, default_value = "four_way")]
    layout: String,
    /// Simulated duration in seconds.
    #[arg(long, default_value_t = 300)]
    seconds: u64,
    /// Simulated frames per second per camera.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Seed for the synthetic detectors.
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Output directory for the traffic log and statistics.
    #[arg(long, default_value = "demo_out")]
    out: PathBuf,
    /// Adopt suggested greens whenever recommendations are generated.
    #[arg(long)]
    apply: bool,
    /// Console output: auto, plain or pretty.
    #[arg(long, default_value = "auto")]
    ui: UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if args.fps == 0 {
        return Err(anyhow!("fps must be >= 1"));
    }
    let ui = Ui::for_stderr(args.ui);
    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;

    let layout = PhaseLayout::preset(&args.layout)?;
    let config = TimingConfig::default();
    let clock = ManualClock::default();
    let analyzer = SharedAnalyzer::new(TimingAnalyzer::new(
        config.clone(),
        layout.clone(),
        clock.now(),
    )?);

    let (registry, mut sources) = {
        let _stage = ui.stage("set up cameras + detectors");
        build_cameras(&layout, &args)?
    };

    let log_path = args.out.join(LOG_FILE);
    if log_path.exists() {
        fs::remove_file(&log_path)?;
    }
    let mut traffic_log = JsonlTrafficLog::open(&log_path)?;
    let started_at = epoch_secs()?;
    let frame_step = Duration::from_secs_f64(1.0 / f64::from(args.fps));

    {
        let _stage = ui.stage("simulate traffic");
        let progress = ui.progress(args.seconds);
        for second in 1..=args.seconds {
            for _ in 0..args.fps {
                for source in sources.iter_mut() {
                    let Some(frame) = source.next_frame()? else {
                        continue;
                    };
                    let detections = registry.detect(frame.direction, &frame)?;
                    analyzer.ingest_frame(
                        frame.direction,
                        &detections,
                        frame.width,
                        frame.height,
                    )?;
                }
                clock.advance(frame_step);
                analyzer.tick(clock.now())?;
            }

            let timestamp = started_at + second as f64;
            let status = analyzer.status(clock.now())?;
            traffic_log.record_status(&StatusRecord::from_status(&status, timestamp))?;

            if second % RECOMMENDATION_EVERY_SECS == 0 {
                let recommendations = analyzer.recommendations()?;
                traffic_log.record_recommendations(timestamp, &recommendations)?;
                traffic_log.record_timing(timestamp, &analyzer.with(|a| a.signal_plan())?)?;
                if args.apply {
                    let changed = analyzer.with(|a| a.apply_suggested_timing())?;
                    log::debug!("applied suggested greens to {} directions", changed);
                }
            }
            progress.set_message(status.current_phase.to_string());
            progress.inc(1);
        }
        progress.finish_and_clear();
    }

    let records = traffic_log.records()?;
    {
        let _stage = ui.stage("save statistics");
        write_csv(&args.out.join(STATS_FILE), &records)?;
    }

    let (status, recommendations) = analyzer.snapshot(clock.now())?;
    println!("Signal plan after {}s:", args.seconds);
    for direction in &status.directions {
        let suggested = direction
            .suggested_green_secs
            .map(|s| format!("{}s", s))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<8} {}  density={:.3}  green={}s  suggested={}",
            direction.direction.to_string(),
            direction.phase,
            direction.density,
            direction.current_green_secs,
            suggested
        );
    }
    println!("Recommendations:");
    for recommendation in &recommendations {
        println!("  - {}", recommendation);
    }
    println!();
    match TrafficReport::from_records(&records, config.yellow_secs) {
        Some(report) => print!("{}", report),
        None => println!("no statistics recorded"),
    }
    println!("\nlog: {}", traffic_log.path().display());
    Ok(())
}

fn build_cameras(
    layout: &PhaseLayout,
    args: &Args,
) -> Result<(DetectorRegistry, Vec<SyntheticSource>)> {
    let mut registry = DetectorRegistry::new();
    let mut sources = Vec::new();
    let directions: Vec<Direction> = layout.directions().collect();
    for (index, direction) in directions.into_iter().enumerate() {
        let load = SyntheticLoad {
            mean_vehicles: DEMO_LOADS[index % DEMO_LOADS.len()],
            wave_period_frames: WAVE_PERIOD_SECS * u64::from(args.fps),
        };
        let backend = SyntheticBackend::new(args.seed.wrapping_add(index as u64), load)?;
        registry.register(
            direction,
            FilteredDetector::new(backend, VehicleFilter::default()),
        );
        sources.push(SyntheticSource::new(SyntheticConfig::new(direction))?);
    }
    registry.warm_up_all()?;
    Ok((registry, sources))
}
