use crate::Arguments;
use anyhow::{Context, Result};
use loopsonic::{
    LoopPoints, LoopSonicEngine, LoopSonicEngineDesc, LoopSonicEvent, LoopStreamProvider,
    PlayState,
};
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(arguments: Arguments) -> Result<()> {
    let mut points = LoopPoints::new().loops(arguments.loops);
    points.track_start = arguments.track_start;
    points.loop_start = arguments.loop_start;
    points.loop_end = arguments.loop_end;
    points.track_end = arguments.track_end;

    let provider = LoopStreamProvider::new(&arguments.file).with_points(points);
    let stream = Arc::new(
        provider
            .create_stream()
            .with_context(|| format!("Failed to open {}", arguments.file.display()))?,
    );

    let region = stream.region();
    log::info!(
        "Track frames {}..{}, loop frames {}..{}, {} loops",
        region.track_start_frame(),
        region.track_end_frame(),
        region.loop_start_frame(),
        region.loop_end_frame(),
        region.repeats()
    );

    let desc = LoopSonicEngineDesc::new().volume(arguments.volume);
    let mut engine = LoopSonicEngine::new(desc)?;
    engine.play(stream)?;

    let started = Instant::now();
    let deadline = arguments.max_seconds.map(Duration::from_secs);

    loop {
        for event in engine.poll_events() {
            match event {
                LoopSonicEvent::Looped => {
                    if let Some(Ok(info)) = engine.playback_info() {
                        log::info!("Looped ({} loops remaining)", info.remaining_loops);
                    }
                }
                LoopSonicEvent::EngineError { error } => log::error!("Playback error: {}", error),
                other => log::debug!("{:?}", other),
            }
        }

        if engine.play_state() == PlayState::Stopped {
            log::info!("Track finished");
            break;
        }
        if deadline.is_some_and(|limit| started.elapsed() >= limit) {
            log::info!("Time limit reached");
            break;
        }

        sleep(POLL_INTERVAL);
    }

    engine.stop()?;
    log::info!(
        "Played {} frames in {:.1}s",
        engine.frames_processed(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
