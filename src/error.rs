//! error.rs
//! Error types for the mission controller.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CubebotError {
    /// A hardware collaborator failed to initialize. Fatal at startup;
    /// the mission never starts.
    #[error("sensor unavailable: {0}")]
    SensorUnavailable(String),

    /// APPROACH exceeded its time bound. Aborts the whole run.
    #[error("approach timed out after {0:.1}s on encounter {1}")]
    ApproachTimeout(f64, u8),

    #[error("color threshold file error: {0}")]
    ColorConfig(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CubebotError {
    fn from(e: serde_json::Error) -> Self {
        CubebotError::ColorConfig(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CubebotError>;
