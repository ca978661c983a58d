use hamlet_simulation::SimulationSnapshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SAVE_FORMAT: &str = "hamlet";
const SAVE_VERSION: u32 = 1;

/// Versioned envelope around an exported simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct SaveFile {
    format: String,
    version: u32,
    snapshot: SimulationSnapshot,
}

/// Errors that can occur while reading a save file.
#[derive(Debug, Error)]
pub(crate) enum SaveFileError {
    /// The payload was empty or contained only whitespace.
    #[error("save file is empty")]
    Empty,
    /// The payload was written by another program.
    #[error("save format '{0}' is not supported")]
    UnknownFormat(String),
    /// The payload was written by an incompatible version.
    #[error("save version {0} is not supported")]
    UnsupportedVersion(u32),
    /// The payload is not valid JSON for a save file.
    #[error("could not parse save file")]
    InvalidPayload(#[from] serde_json::Error),
}

impl SaveFile {
    /// Wraps a snapshot in the current envelope.
    pub(crate) fn new(snapshot: SimulationSnapshot) -> Self {
        Self {
            format: SAVE_FORMAT.to_owned(),
            version: SAVE_VERSION,
            snapshot,
        }
    }

    /// Snapshot carried by the envelope.
    pub(crate) fn into_snapshot(self) -> SimulationSnapshot {
        self.snapshot
    }

    /// Encodes the envelope as pretty-printed JSON.
    pub(crate) fn encode(&self) -> Result<String, SaveFileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes and validates an envelope.
    pub(crate) fn decode(value: &str) -> Result<Self, SaveFileError> {
        if value.trim().is_empty() {
            return Err(SaveFileError::Empty);
        }
        let decoded: Self = serde_json::from_str(value)?;
        if decoded.format != SAVE_FORMAT {
            return Err(SaveFileError::UnknownFormat(decoded.format));
        }
        if decoded.version != SAVE_VERSION {
            return Err(SaveFileError::UnsupportedVersion(decoded.version));
        }
        Ok(decoded)
    }
}
