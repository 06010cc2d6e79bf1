//! Persistence for the similarity matrix.
//!
//! Building the matrix is the expensive step, so it is saved once after a
//! fresh build and loaded on later starts instead of rebuilt.

use crate::error::{Result, SimilarityError};
use crate::matrix::SimilarityMatrix;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};

/// Read/write access to a persisted similarity matrix
///
/// `load` fails with [`SimilarityError::MissingArtifact`] when nothing was
/// saved yet, so the caller can decide to rebuild.
pub trait SimilarityArtifact: Send + Sync {
    /// Human-readable location, for logs
    fn location(&self) -> String;

    fn load(&self) -> Result<SimilarityMatrix>;

    fn save(&self, matrix: &SimilarityMatrix) -> Result<()>;
}

/// Stores the matrix as JSON on disk
#[derive(Debug, Clone)]
pub struct JsonFileArtifact {
    path: PathBuf,
}

impl JsonFileArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sibling file the matrix is written to before it replaces `path`
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SimilarityArtifact for JsonFileArtifact {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<SimilarityMatrix> {
        if !self.path.exists() {
            return Err(SimilarityError::MissingArtifact {
                location: self.location(),
            });
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let matrix: SimilarityMatrix = serde_json::from_reader(reader)?;
        info!(
            "Loaded similarity matrix ({} entries) from {:?}",
            matrix.len(),
            self.path
        );
        Ok(matrix)
    }

    fn save(&self, matrix: &SimilarityMatrix) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        // A crash mid-write leaves the previous artifact intact
        let staging = self.staging_path();
        let mut writer = BufWriter::new(File::create(&staging)?);
        serde_json::to_writer(&mut writer, matrix)?;
        writer.flush()?;
        drop(writer);
        fs::rename(&staging, &self.path)?;
        info!(
            "Saved similarity matrix ({} entries) to {:?}",
            matrix.len(),
            self.path
        );
        Ok(())
    }
}

/// Keeps the matrix in memory; for tests and throwaway runs
#[derive(Debug, Default)]
pub struct InMemoryArtifact {
    slot: Mutex<Option<SimilarityMatrix>>,
}

impl InMemoryArtifact {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start out with a matrix already "on disk"
    pub fn with_matrix(matrix: SimilarityMatrix) -> Self {
        Self {
            slot: Mutex::new(Some(matrix)),
        }
    }

    pub fn is_saved(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or_else(|poisoned| poisoned.into_inner().is_some())
    }
}

impl SimilarityArtifact for InMemoryArtifact {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn load(&self) -> Result<SimilarityMatrix> {
        let slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.clone().ok_or_else(|| SimilarityError::MissingArtifact {
            location: self.location(),
        })
    }

    fn save(&self, matrix: &SimilarityMatrix) -> Result<()> {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(matrix.clone());
        debug!("Stored similarity matrix ({} entries) in memory", matrix.len());
        Ok(())
    }
}
