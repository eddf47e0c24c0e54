//! Error types shared by the shakealert modules.

use std::path::PathBuf;

/// Failures raised by a sensor source.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("sensor is already streaming")]
    AlreadyStreaming,

    #[error("replay input was already consumed")]
    InputConsumed,

    #[error("failed to spawn sensor thread: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file unreadable: {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("No default location for {0}; pass an explicit path")]
    NoDefaultPath(&'static str),

    // ─────────────────────────────────────────────────────────────────────
    // Storage
    // ─────────────────────────────────────────────────────────────────────
    #[error("Storage read failed: {path}: {source}")]
    StoreRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage file malformed: {path}: {details}")]
    StoreMalformed { path: PathBuf, details: String },

    #[error("Storage write failed: {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid phone number: {0:?}")]
    InvalidPhoneNumber(String),

    // ─────────────────────────────────────────────────────────────────────
    // Sensor / messaging
    // ─────────────────────────────────────────────────────────────────────
    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error("Messenger command {program:?} failed to run: {source}")]
    MessengerSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
