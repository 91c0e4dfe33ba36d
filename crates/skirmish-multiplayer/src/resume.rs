//! Session resumption record.
//!
//! A follower that joins a room writes `{ room_id }` to local durable
//! storage so an unintentional process reload can offer a rejoin. The
//! record's presence guarantees nothing — the host may be long gone, and
//! rejoin then fails through the normal peer-unavailable path. Cleared on
//! explicit quit only.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File name inside the data directory.
const RESUME_FILE: &str = "resume.ron";

/// The durable rejoin hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRecord {
    /// Room code of the last joined session.
    pub room_id: String,
}

/// Errors that can occur reading or writing the resume record.
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// Failed to read or write the record file.
    #[error("resume record I/O: {0}")]
    Io(#[from] std::io::Error),

    /// The record file exists but does not parse.
    #[error("resume record malformed: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Serialization failed.
    #[error("resume record serialization: {0}")]
    Serialize(#[from] ron::Error),
}

impl ResumeRecord {
    /// Default record location under the platform data dir.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|d| d.join("skirmish"))
    }

    /// Persist the record, overwriting any previous one.
    pub fn store(&self, dir: &Path) -> Result<(), ResumeError> {
        std::fs::create_dir_all(dir)?;
        let serialized = ron::to_string(self)?;
        std::fs::write(dir.join(RESUME_FILE), serialized)?;
        Ok(())
    }

    /// Load the record, if one exists. A malformed file is an error so the
    /// caller can decide to clear it.
    pub fn load(dir: &Path) -> Result<Option<Self>, ResumeError> {
        let path = dir.join(RESUME_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(Some(ron::from_str(&contents)?))
    }

    /// Remove the record (explicit quit). Missing file is fine.
    pub fn clear(dir: &Path) -> Result<(), ResumeError> {
        match std::fs::remove_file(dir.join(RESUME_FILE)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
