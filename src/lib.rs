//! Shake-triggered emergency alerts.
//!
//! [`detector`] turns an accelerometer stream into rate-limited shake events;
//! [`notifier`] answers each event by texting the stored emergency number.

pub mod clock;
pub mod config;
pub mod detector;
pub mod error;
pub mod messenger;
pub mod notifier;
pub mod phone;
pub mod sensor;
pub mod store;

pub use detector::{start, ShakeDetector, Subscription};
pub use error::{Error, Result, SensorError};
pub use sensor::{PushSource, ReplaySource, Sample, SensorSource};
