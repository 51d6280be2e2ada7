use std::io::BufRead;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use wake_stop_lib::session::PositionSample;

/// Read a GPX track into position samples, skipping points without a
/// timestamp. Waypoint speed is carried through when the file has it.
pub fn read_gpx(path: &str) -> anyhow::Result<Vec<PositionSample>> {
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {path}"))?;
    parse_gpx(std::io::BufReader::new(file))
}

pub fn parse_gpx(reader: impl BufRead) -> anyhow::Result<Vec<PositionSample>> {
    let gpx = gpx::read(reader)?;

    let mut samples = Vec::new();
    for track in gpx.tracks {
        for segment in track.segments {
            for point in segment.points {
                let Some(time) = point.time else {
                    continue;
                };
                let timestamp = DateTime::from_str(&time.format()?)?;
                samples.push(PositionSample::new(point.point(), point.speed, timestamp));
            }
        }
    }
    Ok(samples)
}

/// Push the samples over the channel with the recorded inter-fix gaps
/// compressed by `time_scale` (60.0 = one recorded minute per second).
/// Stops when the receiver goes away.
pub async fn replay(
    samples: Vec<PositionSample>,
    time_scale: f64,
    tx: mpsc::Sender<PositionSample>,
) {
    let mut previous: Option<DateTime<Utc>> = None;
    for sample in samples {
        if let Some(prev) = previous {
            let gap_ms = (sample.timestamp - prev).num_milliseconds().max(0) as f64;
            let wait = gap_ms / time_scale.max(1e-6);
            tokio::time::sleep(Duration::from_millis(wait as u64)).await;
        }
        previous = Some(sample.timestamp);

        if tx.send(sample).await.is_err() {
            break;
        }
    }
}
