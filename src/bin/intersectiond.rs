//! intersectiond - adaptive signal timing daemon
//!
//! This daemon:
//! 1. Captures frames from one source per approach
//! 2. Runs the approach's detector and feeds densities to the analyzer
//! 3. Advances the phase clock
//! 4. Periodically logs status and timing recommendations
//! 5. Saves statistics and prints a summary on Ctrl-C

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use traffic_timing::{
    build_backend, record::epoch_secs, Clock, DetectorRegistry, FilteredDetector, FrameSource,
    SharedAnalyzer, StatusRecord, SyntheticConfig, SyntheticSource, SystemClock, TimingAnalyzer,
    TrafficConfig, TrafficRecorder, TrafficReport,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = TrafficConfig::load()?;
    let clock = Arc::new(SystemClock);
    let analyzer = SharedAnalyzer::new(TimingAnalyzer::new(
        cfg.timing.clone(),
        cfg.layout.clone(),
        clock.now(),
    )?);

    let mut registry = DetectorRegistry::new();
    let mut sources = Vec::new();
    for direction in cfg.layout.directions() {
        let backend = build_backend(
            &cfg.detector.backend,
            cfg.detector.seed_for(direction),
            cfg.detector.load_for(direction),
        )?;
        registry.register(direction, FilteredDetector::new(backend, cfg.detector.filter));
        sources.push(SyntheticSource::new(SyntheticConfig {
            direction,
            width: cfg.capture.width,
            height: cfg.capture.height,
            frame_limit: cfg.capture.frame_limit,
        })?);
    }
    registry.warm_up_all()?;

    let mut recorder = TrafficRecorder::open(&cfg.logging)?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    log::info!(
        "intersectiond running: {} phases, {} directions, {} fps",
        cfg.layout.phase_count(),
        registry.directions().len(),
        cfg.capture.target_fps
    );

    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(cfg.capture.target_fps));
    let capture = {
        let analyzer = analyzer.clone();
        let clock = clock.clone();
        let running = running.clone();
        thread::spawn(move || -> Result<u64> {
            let result = capture_loop(
                &analyzer,
                &registry,
                &mut sources,
                clock.as_ref(),
                &running,
                frame_interval,
            );
            running.store(false, Ordering::SeqCst);
            result
        })
    };

    let status_interval = cfg.status_interval();
    while running.load(Ordering::SeqCst) {
        thread::sleep(status_interval);
        let (status, recommendations) = analyzer.snapshot(clock.now())?;
        let plan = analyzer.with(|a| a.signal_plan())?;
        let record = StatusRecord::from_status(&status, epoch_secs()?);
        println!(
            "{} ({}) {:.0}s left",
            status.current_phase, record.current_directions, status.remaining_secs
        );
        for direction in &status.directions {
            println!(
                "  {:<8} density={:.3} vehicles={:<3} green={}s{}",
                direction.direction.to_string(),
                direction.density,
                direction.vehicle_count,
                direction.current_green_secs,
                if direction.congested { " CONGESTED" } else { "" }
            );
        }
        recorder.record(record, &recommendations, &plan)?;
    }

    let frames = capture
        .join()
        .map_err(|_| anyhow!("capture thread panicked"))??;
    log::info!("shutdown: {} frames processed", frames);

    recorder.save_statistics(&cfg.logging)?;
    match TrafficReport::from_records(recorder.statistics(), cfg.timing.yellow_secs) {
        Some(report) => println!("\n{}", report),
        None => println!("no statistics recorded"),
    }
    Ok(())
}

fn capture_loop(
    analyzer: &SharedAnalyzer,
    registry: &DetectorRegistry,
    sources: &mut [SyntheticSource],
    clock: &dyn Clock,
    running: &AtomicBool,
    frame_interval: Duration,
) -> Result<u64> {
    let mut processed = 0u64;
    while running.load(Ordering::SeqCst) {
        let mut any_frame = false;
        for source in sources.iter_mut() {
            let Some(frame) = source.next_frame()? else {
                continue;
            };
            any_frame = true;
            let detections = registry.detect(frame.direction, &frame)?;
            analyzer.ingest_frame(frame.direction, &detections, frame.width, frame.height)?;
            processed += 1;
        }
        if !any_frame {
            log::info!("all sources ended");
            break;
        }
        analyzer.tick(clock.now())?;
        thread::sleep(frame_interval);
    }
    Ok(processed)
}
