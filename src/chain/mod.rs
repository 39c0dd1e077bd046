//! Build chain validation over the generated artifact directory.

use crate::manifest::{Direction, Manifest};
use crate::util::{OdysseyError, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Versions that already have artifacts on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainState {
    pub up: BTreeSet<String>,
    pub down: BTreeSet<String>,
}

impl ChainState {
    pub fn from_versions<I, S>(up: I, down: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            up: up.into_iter().map(Into::into).collect(),
            down: down.into_iter().map(Into::into).collect(),
        }
    }

    /// A version counts as materialized once its up artifact exists.
    pub fn is_materialized(&self, version: &str) -> bool {
        self.up.contains(version)
    }
}

pub fn artifact_file_name(version: &str, direction: Direction) -> String {
    format!("{version}_{direction}.sql")
}

fn artifact_pattern() -> Regex {
    Regex::new(r"^(.+)_(up|down)\.sql$").unwrap()
}

/// Scans `dir` for `<version>_up.sql` / `<version>_down.sql`.
/// A missing directory is an empty chain.
pub fn scan_artifacts(dir: &Path) -> Result<ChainState> {
    let mut state = ChainState::default();
    if !dir.exists() {
        return Ok(state);
    }

    let pattern = artifact_pattern();
    let entries = std::fs::read_dir(dir).map_err(|e| OdysseyError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| OdysseyError::io(dir, e))?;
        if !entry.path().is_file() {
            continue;
        }

        let filename = entry.file_name();
        let filename_str = filename.to_string_lossy();
        if let Some(captures) = pattern.captures(&filename_str) {
            let version = captures[1].to_string();
            match &captures[2] {
                "up" => state.up.insert(version),
                _ => state.down.insert(version),
            };
        }
    }

    Ok(state)
}

/// Picks the versions this run must generate, in ascending order.
///
/// The materialized set must be a gapless prefix of the manifest versions,
/// every artifact must belong to a manifest version, and up/down artifacts
/// must come in pairs. `target` bounds the run (inclusive).
pub fn select_targets(
    manifest: &Manifest,
    state: &ChainState,
    target: Option<&str>,
) -> Result<Vec<String>> {
    if let Some(target) = target {
        if !manifest.contains_key(target) {
            return Err(OdysseyError::ConfigError(format!(
                "Target version {target} is not in the manifest"
            )));
        }
    }

    let next_target = manifest.keys().find(|v| !state.is_materialized(v));

    if let Some(next) = next_target {
        if let Some(later) = state.up.iter().find(|v| v.as_str() > next.as_str()) {
            return Err(OdysseyError::ChainIntegrityError(format!(
                "Artifact {} exists but earlier version {next} has not been built; \
                 delete the later artifacts or restore the missing ones",
                artifact_file_name(later, Direction::Up)
            )));
        }
    }

    if let Some(orphan) = state
        .up
        .iter()
        .chain(state.down.iter())
        .find(|v| !manifest.contains_key(v.as_str()))
    {
        return Err(OdysseyError::ChainIntegrityError(format!(
            "Artifacts exist for version {orphan}, which is not in the manifest"
        )));
    }

    if let Some(unpaired) = state.up.symmetric_difference(&state.down).next() {
        return Err(OdysseyError::ChainIntegrityError(format!(
            "Version {unpaired} has only one of {} / {}",
            artifact_file_name(unpaired, Direction::Up),
            artifact_file_name(unpaired, Direction::Down)
        )));
    }

    let Some(next) = next_target else {
        return Ok(Vec::new());
    };

    Ok(manifest
        .keys()
        .filter(|v| v.as_str() >= next.as_str())
        .filter(|v| target.map_or(true, |t| v.as_str() <= t))
        .cloned()
        .collect())
}

/// Up artifacts of versions strictly before `version`, most recent first.
pub fn prior_up_artifacts(dir: &Path, version: &str) -> Result<Vec<PathBuf>> {
    let state = scan_artifacts(dir)?;
    Ok(state
        .up
        .iter()
        .rev()
        .filter(|v| v.as_str() < version)
        .map(|v| dir.join(artifact_file_name(v, Direction::Up)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::BuildSpec;
    use std::fs;
    use tempfile::TempDir;

    fn manifest(versions: &[&str]) -> Manifest {
        versions
            .iter()
            .map(|v| (v.to_string(), BuildSpec::default()))
            .collect()
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "").unwrap();
    }

    #[test]
    fn scans_artifact_names() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "0001_up.sql");
        touch(dir.path(), "0001_down.sql");
        touch(dir.path(), "0002_up.sql");
        touch(dir.path(), "manifest.toml");
        touch(dir.path(), "notes_up.txt");
        fs::create_dir(dir.path().join("0003_up.sql")).unwrap();

        let state = scan_artifacts(dir.path()).unwrap();
        assert_eq!(state.up, BTreeSet::from(["0001".to_string(), "0002".to_string()]));
        assert_eq!(state.down, BTreeSet::from(["0001".to_string()]));
    }

    #[test]
    fn missing_directory_is_empty_chain() {
        let dir = TempDir::new().unwrap();
        let state = scan_artifacts(&dir.path().join("migrations")).unwrap();
        assert_eq!(state, ChainState::default());
    }

    #[test]
    fn fresh_chain_targets_everything() {
        let manifest = manifest(&["0001", "0002", "0003"]);
        let targets = select_targets(&manifest, &ChainState::default(), None).unwrap();
        assert_eq!(targets, vec!["0001", "0002", "0003"]);
    }

    #[test]
    fn continues_after_built_prefix() {
        let manifest = manifest(&["0001", "0002", "0003"]);
        let state = ChainState::from_versions(["0001"], ["0001"]);
        let targets = select_targets(&manifest, &state, None).unwrap();
        assert_eq!(targets, vec!["0002", "0003"]);
    }

    #[test]
    fn gap_is_chain_integrity_error() {
        let manifest = manifest(&["0001", "0002", "0003"]);
        let state = ChainState::from_versions(["0003"], ["0003"]);
        let err = select_targets(&manifest, &state, None).unwrap_err();
        assert!(matches!(err, OdysseyError::ChainIntegrityError(_)));
        assert!(err.to_string().contains("0003_up.sql"));
    }

    #[test]
    fn lone_later_up_artifact_is_rejected() {
        let manifest = manifest(&["0001", "0002", "0003"]);
        let state = ChainState::from_versions(vec!["0003"], vec![]);
        let err = select_targets(&manifest, &state, None).unwrap_err();
        assert!(matches!(err, OdysseyError::ChainIntegrityError(_)));
    }

    #[test]
    fn unpaired_artifact_is_rejected() {
        let manifest = manifest(&["0001", "0002"]);
        let state = ChainState::from_versions(vec!["0001"], vec![]);
        let err = select_targets(&manifest, &state, None).unwrap_err();
        assert!(err.to_string().contains("0001_down.sql"));
    }

    #[test]
    fn artifact_outside_manifest_is_rejected() {
        let manifest = manifest(&["0002", "0003"]);
        let state = ChainState::from_versions(["0001"], ["0001"]);
        let err = select_targets(&manifest, &state, None).unwrap_err();
        assert!(err.to_string().contains("not in the manifest"));
    }

    #[test]
    fn fully_built_chain_has_no_targets() {
        let manifest = manifest(&["0001", "0002"]);
        let state = ChainState::from_versions(["0001", "0002"], ["0001", "0002"]);
        assert!(select_targets(&manifest, &state, None).unwrap().is_empty());
    }

    #[test]
    fn target_bounds_the_run() {
        let manifest = manifest(&["0001", "0002", "0003", "0004"]);
        let state = ChainState::from_versions(["0001"], ["0001"]);
        let targets = select_targets(&manifest, &state, Some("0003")).unwrap();
        assert_eq!(targets, vec!["0002", "0003"]);

        let targets = select_targets(&manifest, &state, Some("0001")).unwrap();
        assert!(targets.is_empty());
    }

    #[test]
    fn unknown_target_is_config_error() {
        let manifest = manifest(&["0001"]);
        let err = select_targets(&manifest, &ChainState::default(), Some("0009")).unwrap_err();
        assert!(matches!(err, OdysseyError::ConfigError(_)));
    }

    #[test]
    fn prior_artifacts_are_most_recent_first() {
        let dir = TempDir::new().unwrap();
        for version in ["0001", "0002", "0003", "0004"] {
            touch(dir.path(), &artifact_file_name(version, Direction::Up));
            touch(dir.path(), &artifact_file_name(version, Direction::Down));
        }

        let prior = prior_up_artifacts(dir.path(), "0003").unwrap();
        assert_eq!(
            prior,
            vec![dir.path().join("0002_up.sql"), dir.path().join("0001_up.sql")]
        );
        assert!(prior_up_artifacts(dir.path(), "0001").unwrap().is_empty());
    }
}
