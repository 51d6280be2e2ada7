use std::{fs::OpenOptions, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::sync::{Mutex, mpsc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wake_stop_lib::session::TrackingSession;

use crate::alert::ConsoleAlertSink;

mod alert;
mod geocoder;
mod replay;

/// Recorded inter-fix gaps are compressed by this factor during replay:
/// one recorded minute passes per wall-clock second.
const TIME_SCALE: f64 = 60.0;

/// Reported speed above which a fix counts as "moving" for the advisory
/// motion flag. A phone build feeds this from the accelerometer
/// classifier in wake_stop_lib::motion instead.
const MOTION_SPEED_MPS: f64 = 0.3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::fs::create_dir_all("app/log")?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("app/log/app.log")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=trace", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <track.gpx> <alert-minutes> <destination query...>", args[0]);
        std::process::exit(1);
    }
    let gpx_path = &args[1];
    let alert_minutes: u32 = args[2].parse().context("alert-minutes must be an integer")?;
    let query = args[3..].join(" ");

    let samples = replay::read_gpx(gpx_path)?;
    anyhow::ensure!(!samples.is_empty(), "No timestamped points in {gpx_path}");
    tracing::info!("Replaying {} fixes from {}", samples.len(), gpx_path);

    let destination = geocoder::geocode(&query).await?;
    tracing::info!("Destination: {}", destination.name);

    let mut session = TrackingSession::new(ConsoleAlertSink::new());
    session
        .set_destination(destination.position.y(), destination.position.x(), destination.name)
        .map_err(|err| anyhow::anyhow!("Failed to set destination: {err:?}"))?;
    session
        .feed_position(samples[0])
        .map_err(|err| anyhow::anyhow!("Rejected first fix: {err:?}"))?;
    session
        .start(alert_minutes)
        .map_err(|err| anyhow::anyhow!("Failed to start tracking: {err:?}"))?;
    tracing::info!("Tracking started, alerting {alert_minutes} minutes before arrival");

    let session = Arc::new(Mutex::new(session));

    let (tx, mut rx) = mpsc::channel(100);
    tokio::spawn(replay::replay(samples, TIME_SCALE, tx));

    // The display countdown. Position samples and ticks take the same
    // mutex, so the session only ever sees one event at a time.
    let tick_session = session.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            let mut session = tick_session.lock().await;
            session.tick();
            match serde_json::to_string(&session.snapshot()) {
                Ok(json) => tracing::debug!("{json}"),
                Err(err) => tracing::error!("Failed to serialize snapshot: {err}"),
            }
        }
    });

    while let Some(sample) = rx.recv().await {
        let mut session = session.lock().await;
        session.feed_motion(sample.speed_mps.unwrap_or(0.0) > MOTION_SPEED_MPS);
        if let Err(err) = session.feed_position(sample) {
            tracing::error!("Rejected fix: {err:?}");
        }
    }

    let session = session.lock().await;
    let snapshot = session.snapshot();
    tracing::info!(
        "Replay finished: {:.3} km from destination, eta {:.1} min, alerted: {}",
        snapshot.distance_km,
        snapshot.eta_minutes,
        snapshot.has_alerted
    );
    Ok(())
}
