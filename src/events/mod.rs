//! Build events and the sinks that receive them.
//!
//! The pipeline never logs directly; it reports [`BuildEvent`]s to the sink it
//! was handed. [`TracingSink`] forwards them to `tracing`, [`RecordingSink`]
//! keeps them in memory.

use crate::util::{ErrorCategory, OdysseyError};
use std::cell::RefCell;
use std::path::PathBuf;
use tracing::Level;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    NoObjectHeader {
        file: PathBuf,
    },
    DuplicateObject {
        object_type: String,
        name: String,
        kept: PathBuf,
        ignored: PathBuf,
    },
    SourcesIndexed {
        files: usize,
        objects: usize,
    },
    ManifestLoaded {
        path: PathBuf,
        versions: usize,
    },
    TargetsSelected {
        versions: Vec<String>,
    },
    NothingToBuild,
    CommandCompiled {
        version: String,
        direction: String,
        name: String,
        object_type: String,
    },
    RollbackResolved {
        name: String,
        object_type: String,
        source: PathBuf,
    },
    ArtifactExists {
        path: PathBuf,
    },
    ArtifactWritten {
        path: PathBuf,
        commands: usize,
        digest: String,
    },
    Failed {
        category: ErrorCategory,
        message: String,
    },
}

impl BuildEvent {
    pub fn failed(error: &OdysseyError) -> Self {
        BuildEvent::Failed {
            category: error.category(),
            message: error.to_string(),
        }
    }

    pub fn level(&self) -> Level {
        match self {
            BuildEvent::NoObjectHeader { .. }
            | BuildEvent::CommandCompiled { .. }
            | BuildEvent::RollbackResolved { .. } => Level::DEBUG,
            BuildEvent::SourcesIndexed { .. }
            | BuildEvent::ManifestLoaded { .. }
            | BuildEvent::TargetsSelected { .. }
            | BuildEvent::NothingToBuild
            | BuildEvent::ArtifactWritten { .. } => Level::INFO,
            BuildEvent::DuplicateObject { .. } | BuildEvent::ArtifactExists { .. } => Level::WARN,
            BuildEvent::Failed { .. } => Level::ERROR,
        }
    }
}

pub trait EventSink {
    fn emit(&self, event: BuildEvent);
}

/// Forwards events to the global `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: BuildEvent) {
        match event {
            BuildEvent::NoObjectHeader { file } => {
                tracing::debug!(file = %file.display(), "no object header found, skipping")
            }
            BuildEvent::DuplicateObject {
                object_type,
                name,
                kept,
                ignored,
            } => tracing::warn!(
                %object_type,
                %name,
                kept = %kept.display(),
                ignored = %ignored.display(),
                "duplicate object definition, keeping first"
            ),
            BuildEvent::SourcesIndexed { files, objects } => {
                tracing::info!(files, objects, "indexed SQL sources")
            }
            BuildEvent::ManifestLoaded { path, versions } => {
                tracing::info!(path = %path.display(), versions, "loaded manifest")
            }
            BuildEvent::TargetsSelected { versions } => {
                tracing::info!(targets = %versions.join(", "), "selected build targets")
            }
            BuildEvent::NothingToBuild => tracing::info!("all manifest versions are built"),
            BuildEvent::CommandCompiled {
                version,
                direction,
                name,
                object_type,
            } => tracing::debug!(%version, %direction, %name, %object_type, "compiled command"),
            BuildEvent::RollbackResolved {
                name,
                object_type,
                source,
            } => tracing::debug!(
                %name,
                %object_type,
                source = %source.display(),
                "resolved previous definition"
            ),
            BuildEvent::ArtifactExists { path } => {
                tracing::warn!(path = %path.display(), "artifact already exists")
            }
            BuildEvent::ArtifactWritten {
                path,
                commands,
                digest,
            } => tracing::info!(path = %path.display(), commands, %digest, "wrote artifact"),
            BuildEvent::Failed { category, message } => {
                tracing::error!(category = ?category, "{message}")
            }
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<BuildEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.borrow().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: BuildEvent) {
        self.events.borrow_mut().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_levels_follow_taxonomy() {
        let error = OdysseyError::ChainIntegrityError("gap".into());
        let event = BuildEvent::failed(&error);

        assert_eq!(event.level(), Level::ERROR);
        assert!(matches!(
            event,
            BuildEvent::Failed {
                category: ErrorCategory::ChainIntegrity,
                ..
            }
        ));
    }

    #[test]
    fn warnings_for_recoverable_conditions() {
        let event = BuildEvent::ArtifactExists {
            path: PathBuf::from("migrations/0001_up.sql"),
        };
        assert_eq!(event.level(), Level::WARN);
    }

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.emit(BuildEvent::NothingToBuild);
        sink.emit(BuildEvent::TargetsSelected {
            versions: vec!["0001".into()],
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], BuildEvent::NothingToBuild);
    }
}
