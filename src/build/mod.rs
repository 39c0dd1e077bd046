//! The build pipeline: manifest + sources + existing chain -> new artifacts.
//!
//! ```no_run
//! use odyssey_db::prelude::*;
//!
//! let settings = Settings::load(None).unwrap();
//! let result = build(&settings, &BuildOptions::default(), &TracingSink).unwrap();
//! for version in &result.generated {
//!     println!("{} -> {}", version.version, version.up.path.display());
//! }
//! ```

mod lock;

use crate::artifact::{artifact_path, write_artifact, ArtifactSummary, Provenance};
use crate::chain::{prior_up_artifacts, scan_artifacts, select_targets};
use crate::compile::{compile_actions, CompileContext, WrappedCommand};
use crate::config::{Settings, ToolVersion};
use crate::dialect::create_engine;
use crate::events::{BuildEvent, EventSink};
use crate::index::{index_sources, ObjectIndex};
use crate::manifest::{load_manifest, require_complete, BuildSpec, Direction, Manifest};
use crate::util::{OdysseyError, Result};
use chrono::Utc;
use std::path::Path;

pub use lock::BuildLock;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Last version to generate (inclusive); defaults to the newest.
    pub target: Option<String>,
}

impl BuildOptions {
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedVersion {
    pub version: String,
    pub up: ArtifactSummary,
    pub down: ArtifactSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResult {
    pub generated: Vec<GeneratedVersion>,
}

impl BuildResult {
    pub fn is_empty(&self) -> bool {
        self.generated.is_empty()
    }
}

/// Runs a build and reports any failure to `sink` before returning it.
pub fn build(
    settings: &Settings,
    options: &BuildOptions,
    sink: &dyn EventSink,
) -> Result<BuildResult> {
    let provenance = ToolVersion::current().map(|tool| Provenance::new(&tool, Utc::now()));
    let result = provenance.and_then(|p| build_with_provenance(settings, options, &p, sink));

    if let Err(error) = &result {
        sink.emit(BuildEvent::failed(error));
    }
    result
}

/// Same as [`build`] with explicit footer values and no failure event.
pub fn build_with_provenance(
    settings: &Settings,
    options: &BuildOptions,
    provenance: &Provenance,
    sink: &dyn EventSink,
) -> Result<BuildResult> {
    let engine = create_engine(settings.dialect)?;

    std::fs::create_dir_all(&settings.migration_dir)
        .map_err(|e| OdysseyError::io(&settings.migration_dir, e))?;
    let _lock = BuildLock::acquire(&settings.migration_dir)?;

    let manifest = load_manifest(&settings.manifest)?;
    sink.emit(BuildEvent::ManifestLoaded {
        path: settings.manifest.clone(),
        versions: manifest.len(),
    });

    let state = scan_artifacts(&settings.migration_dir)?;
    let targets = select_targets(&manifest, &state, options.target.as_deref())?;
    if targets.is_empty() {
        sink.emit(BuildEvent::NothingToBuild);
        return Ok(BuildResult::default());
    }
    sink.emit(BuildEvent::TargetsSelected {
        versions: targets.clone(),
    });

    for version in &targets {
        require_complete(version, build_spec(&manifest, version)?)?;
    }

    let index = index_sources(&settings.sql_src, engine.as_ref(), sink)?;

    let mut result = BuildResult::default();
    for version in &targets {
        let generated = build_version(settings, &manifest, &index, version, provenance, sink)?;
        result.generated.push(generated);
    }

    Ok(result)
}

fn build_spec<'m>(manifest: &'m Manifest, version: &str) -> Result<&'m BuildSpec> {
    manifest.get(version).ok_or_else(|| {
        OdysseyError::ConfigError(format!("Version {version} is not in the manifest"))
    })
}

/// Compiles and writes one version. Both artifacts are on disk before this
/// returns, so the next version's rollbacks can see this version's up file.
fn build_version(
    settings: &Settings,
    manifest: &Manifest,
    index: &ObjectIndex,
    version: &str,
    provenance: &Provenance,
    sink: &dyn EventSink,
) -> Result<GeneratedVersion> {
    let spec = build_spec(manifest, version)?;
    let up_path = artifact_path(&settings.migration_dir, version, Direction::Up);
    let down_path = artifact_path(&settings.migration_dir, version, Direction::Down);

    for path in [&up_path, &down_path] {
        if path.exists() {
            sink.emit(BuildEvent::ArtifactExists { path: path.clone() });
            return Err(OdysseyError::ChainIntegrityError(format!(
                "Artifact {} already exists; delete it to regenerate version {version}",
                path.display()
            )));
        }
    }

    let prior = prior_up_artifacts(&settings.migration_dir, version)?;
    let ctx = CompileContext {
        index,
        base_dir: &settings.base_dir,
        prior_up_artifacts: &prior,
        tag: &settings.marker_tag,
        sink,
    };

    let up = compile_actions(version, Direction::Up, &spec.up, &ctx)?;
    let down = compile_actions(version, Direction::Down, &spec.down, &ctx)?;

    let up = write(&up_path, &up, provenance, settings, sink)?;
    let down = match write(&down_path, &down, provenance, settings, sink) {
        Ok(down) => down,
        Err(e) => return Err(discard_lone_up(&up_path, e)),
    };

    Ok(GeneratedVersion {
        version: version.to_string(),
        up,
        down,
    })
}

/// Removes an up artifact whose down could not be written. If that fails too,
/// the chain is left with a lone up file and the error says so.
fn discard_lone_up(up_path: &Path, error: OdysseyError) -> OdysseyError {
    match std::fs::remove_file(up_path) {
        Ok(()) => error,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => error,
        Err(e) => OdysseyError::ChainIntegrityError(format!(
            "{error}; {} could not be removed ({e}), delete it before rebuilding",
            up_path.display()
        )),
    }
}

fn write(
    path: &Path,
    commands: &[WrappedCommand],
    provenance: &Provenance,
    settings: &Settings,
    sink: &dyn EventSink,
) -> Result<ArtifactSummary> {
    let summary = write_artifact(path, commands, provenance, &settings.marker_tag)?;
    sink.emit(BuildEvent::ArtifactWritten {
        path: summary.path.clone(),
        commands: summary.commands,
        digest: summary.digest.clone(),
    });
    Ok(summary)
}
