use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OdysseyError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Resolution error: {0}")]
    ResolutionError(String),

    #[error("IO error on {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Chain integrity error: {0}")]
    ChainIntegrityError(String),

    #[error("Migration directory {} is locked by another build", path.display())]
    Locked { path: PathBuf },
}

/// Coarse error classes reported to the event sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Resolution,
    Io,
    ChainIntegrity,
}

impl OdysseyError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            OdysseyError::ConfigError(_) => ErrorCategory::Config,
            OdysseyError::ResolutionError(_) => ErrorCategory::Resolution,
            OdysseyError::IoError { .. } | OdysseyError::Locked { .. } => ErrorCategory::Io,
            OdysseyError::ChainIntegrityError(_) => ErrorCategory::ChainIntegrity,
        }
    }
}

pub type Result<T> = std::result::Result<T, OdysseyError>;

/// Reads a file to a string, attaching the path to any IO failure.
pub fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| OdysseyError::io(path, e))
}

/// Hex-encoded SHA-256 digest of a file's bytes, read in 8 KiB chunks.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| OdysseyError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|e| OdysseyError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
