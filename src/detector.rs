//! Shake gesture detector.
//!
//! Turns a stream of accelerometer samples into discrete, rate-limited shake
//! events. Samples closer than the minimum interval are throttled, a motion
//! intensity is computed against the previous processed sample, and a shake
//! fires when the intensity crosses the threshold outside the cooldown.

use std::time::Duration;
use tracing::{debug, trace};

use crate::config::DetectorConfig;
use crate::error::SensorError;
use crate::sensor::{Sample, SensorSource};

/// Scales the per-millisecond change into the threshold's range.
const INTENSITY_SCALE: f64 = 10_000.0;

/// Mutable state of one detector run. Created on start, discarded on stop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DetectorState {
    last_sample_time: u64,
    /// `None` until the first qualifying sample; treated as far in the past.
    last_shake_time: Option<u64>,
    last_x: f64,
    last_y: f64,
    last_z: f64,
}

pub struct ShakeDetector {
    config: DetectorConfig,
    state: DetectorState,
}

impl ShakeDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            state: DetectorState::default(),
        }
    }

    /// Process one sample. Returns `true` when a shake event fires.
    pub fn process(&mut self, sample: &Sample) -> bool {
        let now = sample.timestamp;
        let elapsed = now.saturating_sub(self.state.last_sample_time);
        if elapsed <= self.config.min_sample_interval_ms {
            return false;
        }
        self.state.last_sample_time = now;

        let speed = intensity(sample, &self.state, elapsed);
        let mut fired = false;

        if speed > self.config.shake_threshold {
            let since_shake = self
                .state
                .last_shake_time
                .map_or(u64::MAX, |t| now.saturating_sub(t));

            // Qualifying samples inside the spacing window belong to the same
            // gesture and leave the shake time alone.
            if since_shake > self.config.time_threshold_ms {
                if since_shake > self.config.cooldown_ms {
                    debug!(timestamp = now, speed, "shake detected");
                    fired = true;
                } else {
                    trace!(timestamp = now, speed, "shake within cooldown");
                }
                self.state.last_shake_time = Some(now);
            }
        }

        self.state.last_x = sample.x;
        self.state.last_y = sample.y;
        self.state.last_z = sample.z;
        fired
    }
}

/// Motion intensity relative to the previous processed sample.
///
/// Axes are summed before differencing, so opposing changes on two axes
/// cancel out. This is an approximation of jerk, not a vector magnitude.
fn intensity(sample: &Sample, state: &DetectorState, elapsed_ms: u64) -> f64 {
    (sample.x + sample.y + sample.z - state.last_x - state.last_y - state.last_z).abs()
        / elapsed_ms as f64
        * INTENSITY_SCALE
}

/// Live detection bound to a sensor source. Stopping ceases the source,
/// which drops the detector state along with its listener.
pub struct Subscription<S: SensorSource> {
    source: S,
    active: bool,
}

impl<S: SensorSource> Subscription<S> {
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.source.cease();
        debug!("shake detection stopped");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: SensorSource> Drop for Subscription<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Begin shake detection on `source`, calling `on_shake` for every event.
pub fn start<S, F>(
    mut source: S,
    config: DetectorConfig,
    mut on_shake: F,
) -> Result<Subscription<S>, SensorError>
where
    S: SensorSource,
    F: FnMut() + Send + 'static,
{
    let period = Duration::from_millis(config.sample_period_ms);
    let mut detector = ShakeDetector::new(config);

    source.begin(
        period,
        Box::new(move |sample: Sample| {
            if detector.process(&sample) {
                on_shake();
            }
        }),
    )?;
    debug!(period_ms = period.as_millis() as u64, "shake detection started");

    Ok(Subscription {
        source,
        active: true,
    })
}
