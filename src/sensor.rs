//! Accelerometer sample sources.
//!
//! A source streams [`Sample`]s to one listener between `begin` and `cease`.
//! Two sources are provided: [`PushSource`], where the embedding host hands
//! samples over on its own thread, and [`ReplaySource`], which reads recorded
//! samples (one JSON object per line) on a dedicated `sensor` thread.

use serde::Deserialize;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::clock::ManualClock;
use crate::error::SensorError;

// ── Public types ────────────────────────────────────────────────────────────

/// One 3-axis acceleration reading, timestamped in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp: u64,
}

impl Sample {
    pub fn new(x: f64, y: f64, z: f64, timestamp: u64) -> Self {
        Self { x, y, z, timestamp }
    }
}

pub type Listener = Box<dyn FnMut(Sample) + Send>;

pub trait SensorSource {
    /// Start delivering samples to `listener`, nominally every `period`.
    fn begin(&mut self, period: Duration, listener: Listener) -> Result<(), SensorError>;

    /// Stop delivering and drop the listener. Calling it again is a no-op.
    fn cease(&mut self);
}

// ── Push delivery ───────────────────────────────────────────────────────────

/// Source fed by the host's own event dispatch.
///
/// Clones share the same listener slot: hand one clone to the detector and
/// keep another to call [`PushSource::deliver`].
#[derive(Clone, Default)]
pub struct PushSource {
    listener: Arc<Mutex<Option<Listener>>>,
}

impl PushSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand one sample to the listener. Dropped when not streaming.
    pub fn deliver(&self, sample: Sample) {
        let mut slot = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(listener) = slot.as_mut() {
            listener(sample);
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl SensorSource for PushSource {
    fn begin(&mut self, period: Duration, listener: Listener) -> Result<(), SensorError> {
        let mut slot = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(SensorError::AlreadyStreaming);
        }
        *slot = Some(listener);
        debug!(period_ms = period.as_millis() as u64, "push source streaming");
        Ok(())
    }

    fn cease(&mut self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if listener.is_some() {
            debug!("push source ceased");
        }
    }
}

// ── Replay ──────────────────────────────────────────────────────────────────

/// Wire form of a recorded sample. `timestamp` (or `t`) may be omitted.
#[derive(Debug, Deserialize)]
struct SampleRecord {
    x: f64,
    y: f64,
    z: f64,
    #[serde(default, alias = "t")]
    timestamp: Option<u64>,
}

/// Parse one JSON line, using `fallback_timestamp` when none is recorded.
pub fn parse_sample(line: &str, fallback_timestamp: u64) -> Result<Sample, serde_json::Error> {
    let record: SampleRecord = serde_json::from_str(line)?;
    Ok(Sample::new(
        record.x,
        record.y,
        record.z,
        record.timestamp.unwrap_or(fallback_timestamp),
    ))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub delivered: u64,
    pub skipped: u64,
}

/// Streams newline-delimited JSON samples from a reader.
///
/// Blank lines and `#` comments are ignored; malformed lines are logged and
/// skipped. With `realtime` set, delivery is paced at the sampling period;
/// otherwise the input is replayed as fast as it can be read.
pub struct ReplaySource {
    input: Option<Box<dyn BufRead + Send>>,
    realtime: bool,
    clock: ManualClock,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<ReplayStats>>,
}

impl ReplaySource {
    pub fn new(input: impl BufRead + Send + 'static, realtime: bool) -> Self {
        Self {
            input: Some(Box::new(input)),
            realtime,
            clock: ManualClock::default(),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Clock that reads the timestamp of the most recently delivered sample.
    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    /// Block until the input is exhausted (or the source ceased).
    pub fn join(&mut self) -> Option<ReplayStats> {
        let worker = self.worker.take()?;
        match worker.join() {
            Ok(stats) => Some(stats),
            Err(_) => {
                warn!("sensor thread panicked");
                None
            }
        }
    }
}

impl SensorSource for ReplaySource {
    fn begin(&mut self, period: Duration, listener: Listener) -> Result<(), SensorError> {
        if self.worker.is_some() {
            return Err(SensorError::AlreadyStreaming);
        }
        let input = self.input.take().ok_or(SensorError::InputConsumed)?;

        self.stop.store(false, Ordering::SeqCst);
        let stop = Arc::clone(&self.stop);
        let clock = self.clock.clone();
        let realtime = self.realtime;

        let worker = thread::Builder::new()
            .name("sensor".into())
            .spawn(move || run_replay(input, period, realtime, clock, stop, listener))
            .map_err(SensorError::Spawn)?;
        self.worker = Some(worker);

        info!(
            period_ms = period.as_millis() as u64,
            realtime, "replay source streaming"
        );
        Ok(())
    }

    fn cease(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(stats) = self.join() {
            debug!(
                delivered = stats.delivered,
                skipped = stats.skipped,
                "replay source ceased"
            );
        }
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.cease();
    }
}

fn run_replay(
    input: Box<dyn BufRead + Send>,
    period: Duration,
    realtime: bool,
    clock: ManualClock,
    stop: Arc<AtomicBool>,
    mut listener: Listener,
) -> ReplayStats {
    let period_ms = period.as_millis() as u64;
    let mut stats = ReplayStats::default();
    let mut last_timestamp: Option<u64> = None;

    for (index, line) in input.lines().enumerate() {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let tick_start = Instant::now();

        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "replay input read failed");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fallback = last_timestamp.map_or(0, |t| t + period_ms);
        let sample = match parse_sample(line, fallback) {
            Ok(sample) => sample,
            Err(err) => {
                warn!(line = index + 1, error = %err, "skipping malformed sample");
                stats.skipped += 1;
                continue;
            }
        };

        clock.set(sample.timestamp);
        last_timestamp = Some(sample.timestamp);
        listener(sample);
        stats.delivered += 1;

        if realtime {
            let elapsed = tick_start.elapsed();
            if elapsed < period {
                thread::sleep(period - elapsed);
            }
        }
    }

    info!(
        delivered = stats.delivered,
        skipped = stats.skipped,
        "replay input exhausted"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::mpsc;

    fn collecting_listener() -> (Listener, mpsc::Receiver<Sample>) {
        let (tx, rx) = mpsc::channel();
        let listener: Listener = Box::new(move |sample: Sample| {
            let _ = tx.send(sample);
        });
        (listener, rx)
    }

    #[test]
    fn push_source_delivers_only_while_streaming() {
        let mut source = PushSource::new();
        let host = source.clone();
        let (listener, rx) = collecting_listener();

        host.deliver(Sample::new(1.0, 0.0, 0.0, 0));
        source
            .begin(Duration::from_millis(100), listener)
            .expect("begin");
        assert!(host.is_streaming());
        host.deliver(Sample::new(2.0, 0.0, 0.0, 100));
        source.cease();
        source.cease();
        host.deliver(Sample::new(3.0, 0.0, 0.0, 200));

        let got: Vec<Sample> = rx.try_iter().collect();
        assert_eq!(got, vec![Sample::new(2.0, 0.0, 0.0, 100)]);
        assert!(!host.is_streaming());
    }

    #[test]
    fn push_source_rejects_second_begin() {
        let mut source = PushSource::new();
        let (first, _rx1) = collecting_listener();
        let (second, _rx2) = collecting_listener();
        source.begin(Duration::from_millis(100), first).expect("begin");
        let err = source
            .begin(Duration::from_millis(100), second)
            .unwrap_err();
        assert!(matches!(err, SensorError::AlreadyStreaming));
    }

    #[test]
    fn parse_sample_accepts_t_alias_and_fallback() {
        let sample = parse_sample(r#"{"x":1.5,"y":-2,"z":9.8,"t":42}"#, 0).expect("parse");
        assert_eq!(sample, Sample::new(1.5, -2.0, 9.8, 42));

        let sample = parse_sample(r#"{"x":0,"y":0,"z":1}"#, 700).expect("parse");
        assert_eq!(sample.timestamp, 700);

        assert!(parse_sample(r#"{"x":0,"y":0}"#, 0).is_err());
    }

    #[test]
    fn replay_fills_timestamps_and_skips_bad_lines() {
        let input = "\
# recorded on a desk
{\"x\":0,\"y\":0,\"z\":1,\"timestamp\":1000}
{\"x\":0,\"y\":0,\"z\":1}
not json

{\"x\":0,\"y\":0,\"z\":1}
";
        let mut source = ReplaySource::new(Cursor::new(input), false);
        let clock = source.clock();
        let (listener, rx) = collecting_listener();

        source
            .begin(Duration::from_millis(100), listener)
            .expect("begin");
        let stats = source.join().expect("stats");

        assert_eq!(stats, ReplayStats { delivered: 3, skipped: 1 });
        let stamps: Vec<u64> = rx.try_iter().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![1000, 1100, 1200]);
        assert_eq!(crate::clock::Clock::now_ms(&clock), 1200);
    }

    #[test]
    fn replay_is_one_shot() {
        let mut source = ReplaySource::new(Cursor::new(""), false);
        let (first, _rx1) = collecting_listener();
        source.begin(Duration::from_millis(100), first).expect("begin");
        source.join();

        let (second, _rx2) = collecting_listener();
        let err = source
            .begin(Duration::from_millis(100), second)
            .unwrap_err();
        assert!(matches!(err, SensorError::InputConsumed));
    }

    #[test]
    fn replay_cease_stops_delivery() {
        let lines: String = (0..200)
            .map(|i| format!("{{\"x\":0,\"y\":0,\"z\":1,\"t\":{}}}\n", i * 100))
            .collect();
        let mut source = ReplaySource::new(Cursor::new(lines), true);
        let (listener, rx) = collecting_listener();

        source
            .begin(Duration::from_millis(10), listener)
            .expect("begin");
        thread::sleep(Duration::from_millis(50));
        source.cease();

        let delivered = rx.try_iter().count();
        assert!(delivered < 200, "delivered {delivered}");
        source.cease();
    }
}
