//! Emergency notifier: turns shake signals into a text message to the
//! stored emergency number.
//!
//! It keeps its own debounce, independent of the detector's cooldown, so a
//! change in detector tuning cannot cause duplicate messages.

use serde::Serialize;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::NotifierConfig;
use crate::messenger::{DeliveryStatus, Messenger};
use crate::phone::load_emergency_number;
use crate::store::FileStore;

/// Drops signals arriving within `window_ms` of the last admitted one.
#[derive(Debug, Clone)]
pub struct Debounce {
    window_ms: u64,
    last_admitted: Option<u64>,
}

impl Debounce {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_admitted: None,
        }
    }

    pub fn admit(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_admitted {
            if now_ms.saturating_sub(last) < self.window_ms {
                return false;
            }
        }
        self.last_admitted = Some(now_ms);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyOutcome {
    Debounced,
    NoDestination,
    Unavailable,
    Sent,
    Failed,
}

/// Message shown to the user for an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: &'static str,
    pub body: &'static str,
}

impl NotifyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyOutcome::Debounced => "debounced",
            NotifyOutcome::NoDestination => "no_destination",
            NotifyOutcome::Unavailable => "unavailable",
            NotifyOutcome::Sent => "sent",
            NotifyOutcome::Failed => "failed",
        }
    }

    pub fn notice(&self) -> Option<Notice> {
        let (title, body) = match self {
            NotifyOutcome::Debounced => return None,
            NotifyOutcome::NoDestination => (
                "No emergency number",
                "Set an emergency number first.",
            ),
            NotifyOutcome::Unavailable => (
                "Messaging unavailable",
                "This device cannot send text messages.",
            ),
            NotifyOutcome::Sent => (
                "Message sent",
                "A text message was sent to your emergency number.",
            ),
            NotifyOutcome::Failed => (
                "Message failed",
                "The text message to your emergency number could not be sent.",
            ),
        };
        Some(Notice { title, body })
    }
}

pub struct EmergencyNotifier {
    store: FileStore,
    messenger: Box<dyn Messenger>,
    clock: Box<dyn Clock>,
    debounce: Debounce,
    message: String,
}

impl EmergencyNotifier {
    pub fn new(
        config: &NotifierConfig,
        store: FileStore,
        messenger: Box<dyn Messenger>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            store,
            messenger,
            clock,
            debounce: Debounce::new(config.debounce_ms),
            message: config.message.clone(),
        }
    }

    /// Handle one shake signal.
    pub fn on_shake(&mut self) -> NotifyOutcome {
        let now = self.clock.now_ms();
        if !self.debounce.admit(now) {
            info!(timestamp = now, "shake ignored by notifier debounce");
            return NotifyOutcome::Debounced;
        }

        let outcome = self.notify();
        info!(timestamp = now, outcome = outcome.as_str(), "emergency notification");
        outcome
    }

    fn notify(&mut self) -> NotifyOutcome {
        let number = match load_emergency_number(&self.store) {
            Ok(Some(number)) => number,
            Ok(None) => return NotifyOutcome::NoDestination,
            Err(err) => {
                warn!(error = %err, "failed to read emergency number");
                return NotifyOutcome::NoDestination;
            }
        };

        if !self.messenger.is_available() {
            return NotifyOutcome::Unavailable;
        }

        match self.messenger.send(&number, &self.message) {
            Ok(DeliveryStatus::Sent) => NotifyOutcome::Sent,
            Ok(DeliveryStatus::NotSent) => NotifyOutcome::Failed,
            Err(err) => {
                warn!(error = %err, "emergency message send failed");
                NotifyOutcome::Failed
            }
        }
    }
}
