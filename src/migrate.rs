use crate::artifact::artifact_path;
use crate::chain::{scan_artifacts, select_targets};
use crate::config::Settings;
use crate::manifest::{load_manifest, Direction};
use crate::util::Result;
use std::path::PathBuf;

/// Ordered artifacts a `migrate` run would apply. Nothing is executed.
///
/// Up walks built versions in ascending order through `target` (or all of
/// them). Down walks built versions above `target` in descending order; with
/// no target only the newest version is rolled back.
pub fn plan_migration_files(
    settings: &Settings,
    direction: Direction,
    target: Option<&str>,
) -> Result<Vec<PathBuf>> {
    let manifest = load_manifest(&settings.manifest)?;
    let state = scan_artifacts(&settings.migration_dir)?;
    // Refuse to plan over a broken chain.
    select_targets(&manifest, &state, None)?;

    let built: Vec<&String> = state.up.iter().collect();
    let versions: Vec<&String> = match (direction, target) {
        (Direction::Up, None) => built,
        (Direction::Up, Some(t)) => built.into_iter().filter(|v| v.as_str() <= t).collect(),
        (Direction::Down, None) => built.into_iter().rev().take(1).collect(),
        (Direction::Down, Some(t)) => built.into_iter().rev().filter(|v| v.as_str() > t).collect(),
    };

    Ok(versions
        .into_iter()
        .map(|v| artifact_path(&settings.migration_dir, v, direction))
        .collect())
}
