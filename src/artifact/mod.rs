//! Migration artifact persistence.

use crate::chain::artifact_file_name;
use crate::compile::WrappedCommand;
use crate::config::ToolVersion;
use crate::manifest::Direction;
use crate::util::{hash_file, OdysseyError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Footer values, fixed once per run before anything is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub built_at: DateTime<Utc>,
    pub version: String,
    pub release: String,
}

impl Provenance {
    pub fn new(tool: &ToolVersion, built_at: DateTime<Utc>) -> Self {
        Self {
            built_at,
            version: tool.version.clone(),
            release: tool.release.clone(),
        }
    }

    pub fn footer(&self, tag: &str) -> String {
        format!(
            "-- {tag} - Build Time UTC: {} - VERSION: {} - RELEASE: {}\n",
            self.built_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.version,
            self.release
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSummary {
    pub path: PathBuf,
    pub commands: usize,
    pub digest: String,
}

pub fn artifact_path(dir: &Path, version: &str, direction: Direction) -> PathBuf {
    dir.join(artifact_file_name(version, direction))
}

/// Writes `commands` and the provenance footer to a new file at `path`.
///
/// The file is created exclusively; an existing artifact is never replaced.
/// Each command is flushed as soon as it is written.
pub fn write_artifact(
    path: &Path,
    commands: &[WrappedCommand],
    provenance: &Provenance,
    tag: &str,
) -> Result<ArtifactSummary> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| OdysseyError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    for command in commands {
        writer
            .write_all(command.render(tag).as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| OdysseyError::io(path, e))?;
    }

    writer
        .write_all(provenance.footer(tag).as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| OdysseyError::io(path, e))?;

    writer
        .get_ref()
        .sync_all()
        .map_err(|e| OdysseyError::io(path, e))?;

    Ok(ArtifactSummary {
        path: path.to_path_buf(),
        commands: commands.len(),
        digest: hash_file(path)?,
    })
}
