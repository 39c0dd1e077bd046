//! Build manifest: an ordered mapping of version id to up/down action lists.
//!
//! ```toml
//! ["0001"]
//! up = [
//!     {name = "util", type = "schema", action = "create"},
//!     {name = "data fix", type = "dml", action = "execute", location = "migrations/0001/up/data_fix.sql"},
//! ]
//! down = [
//!     {name = "util", type = "schema", action = "drop"},
//! ]
//! ```

use crate::util::{OdysseyError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create,
    Drop,
    Execute { location: PathBuf },
    Rollback,
}

impl Action {
    pub fn keyword(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Drop => "drop",
            Action::Execute { .. } => "execute",
            Action::Rollback => "rollback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEntry {
    /// Object name as written, or a free-text label such as "data fix".
    pub name: String,
    pub object_type: String,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildSpec {
    pub up: Vec<ActionEntry>,
    pub down: Vec<ActionEntry>,
}

impl BuildSpec {
    pub fn actions(&self, direction: Direction) -> &[ActionEntry] {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }
}

/// Versions are ordered lexically; callers keep them fixed-width.
pub type Manifest = BTreeMap<String, BuildSpec>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuild {
    #[serde(default)]
    up: Vec<RawAction>,
    #[serde(default)]
    down: Vec<RawAction>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAction {
    name: String,
    #[serde(rename = "type")]
    object_type: String,
    action: String,
    location: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    Create,
    Drop,
    Execute,
    Rollback,
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(ActionKind::Create),
            "drop" => Ok(ActionKind::Drop),
            "execute" => Ok(ActionKind::Execute),
            "rollback" => Ok(ActionKind::Rollback),
            _ => Err(format!(
                "Invalid action '{s}'. Valid actions: create, drop, execute, rollback"
            )),
        }
    }
}

impl RawAction {
    fn decode(self, version: &str, direction: Direction, position: usize) -> Result<ActionEntry> {
        let context = |message: String| {
            OdysseyError::ConfigError(format!(
                "Manifest version {version} {direction}[{position}] ('{}'): {message}",
                self.name
            ))
        };

        let kind: ActionKind = self.action.parse().map_err(context)?;
        let action = match (kind, self.location.clone()) {
            (ActionKind::Execute, Some(location)) => Action::Execute { location },
            (ActionKind::Execute, None) => {
                return Err(context("execute actions require a location".to_string()))
            }
            (_, Some(_)) => {
                return Err(context(format!(
                    "location is only valid for execute actions, not {}",
                    self.action
                )))
            }
            (ActionKind::Create, None) => Action::Create,
            (ActionKind::Drop, None) => Action::Drop,
            (ActionKind::Rollback, None) => Action::Rollback,
        };

        Ok(ActionEntry {
            name: self.name,
            object_type: self.object_type,
            action,
        })
    }
}

pub fn parse_manifest(content: &str) -> Result<Manifest> {
    let raw: BTreeMap<String, RawBuild> = toml::from_str(content)
        .map_err(|e| OdysseyError::ConfigError(format!("Invalid manifest: {e}")))?;

    let mut manifest = Manifest::new();
    for (version, build) in raw {
        let up = decode_actions(&version, Direction::Up, build.up)?;
        let down = decode_actions(&version, Direction::Down, build.down)?;
        manifest.insert(version, BuildSpec { up, down });
    }

    Ok(manifest)
}

fn decode_actions(
    version: &str,
    direction: Direction,
    actions: Vec<RawAction>,
) -> Result<Vec<ActionEntry>> {
    actions
        .into_iter()
        .enumerate()
        .map(|(position, raw)| raw.decode(version, direction, position))
        .collect()
}

pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        OdysseyError::ConfigError(format!("Cannot read manifest {}: {e}", path.display()))
    })?;

    parse_manifest(&content).map_err(|e| match e {
        OdysseyError::ConfigError(message) => {
            OdysseyError::ConfigError(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

/// Fails unless both action lists of `version` are non-empty.
pub fn require_complete(version: &str, build: &BuildSpec) -> Result<()> {
    for direction in [Direction::Up, Direction::Down] {
        if build.actions(direction).is_empty() {
            return Err(OdysseyError::ConfigError(format!(
                "Manifest version {version} has no {direction} actions"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
###########################
# Migration Configuration
###########################

["0001"]
up = [
    {name = "util.table1", type = "table", action = "drop"},
    {name = "util.table2", type = "table", action = "create"},
    {name = "util.table3", type = "table", action = "create"},
    {name = "util.table4", type = "ddl", action = "execute", location = "migrations/0001/up/meh.sql"},
    {name = "data fix", type = "dml", action = "execute", location = "migrations/0001/up/data_fix.sql"},
]
down = [
    {name = "data fix", type = "dml", action = "execute", location = "migrations/0001/down/data_fix.sql"},
    {name = "util.table4", type = "ddl", action = "execute", location = "migrations/0001/down/meh.sql"},
    {name = "util.table3", type = "table", action = "drop"},
    {name = "util.table2", type = "table", action = "drop"},
    {name = "util.table1", type = "table", action = "DROP"},
]
"#;

    #[test]
    fn parses_up_and_down_lists() {
        let manifest = parse_manifest(MANIFEST).unwrap();
        let build = &manifest["0001"];

        assert_eq!(build.up.len(), 5);
        assert_eq!(build.down.len(), 5);
        assert_eq!(build.up[0].action, Action::Drop);
        assert_eq!(build.up[1].object_type, "table");
        assert_eq!(
            build.up[4].action,
            Action::Execute {
                location: PathBuf::from("migrations/0001/up/data_fix.sql")
            }
        );
        assert_eq!(build.down[4].action, Action::Drop);
    }

    #[test]
    fn versions_are_ordered_lexically() {
        let manifest = parse_manifest(
            r#"
["0010"]
up = [{name = "c", type = "schema", action = "create"}]
["0002"]
up = [{name = "b", type = "schema", action = "create"}]
["0001"]
up = [{name = "a", type = "schema", action = "create"}]
"#,
        )
        .unwrap();

        let versions: Vec<&str> = manifest.keys().map(String::as_str).collect();
        assert_eq!(versions, vec!["0001", "0002", "0010"]);
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = parse_manifest(
            r#"
["0001"]
up = [{name = "util.t", type = "table", action = "truncate"}]
"#,
        )
        .unwrap_err();

        assert!(matches!(err, OdysseyError::ConfigError(_)));
        assert!(err.to_string().contains("Invalid action 'truncate'"));
    }

    #[test]
    fn execute_requires_location() {
        let err = parse_manifest(
            r#"
["0001"]
up = [{name = "data fix", type = "dml", action = "execute"}]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("require a location"));
    }

    #[test]
    fn location_rejected_for_other_actions() {
        let err = parse_manifest(
            r#"
["0001"]
up = [{name = "util.t", type = "table", action = "create", location = "x.sql"}]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("only valid for execute"));
    }

    #[test]
    fn missing_name_fails_to_parse() {
        let result = parse_manifest(
            r#"
["0001"]
up = [{type = "table", action = "create"}]
"#,
        );
        assert!(matches!(result, Err(OdysseyError::ConfigError(_))));
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = load_manifest(&dir.path().join("manifest.toml")).unwrap_err();
        assert!(matches!(err, OdysseyError::ConfigError(_)));
        assert!(err.to_string().contains("manifest.toml"));
    }

    #[test]
    fn load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.toml");
        fs::write(&path, MANIFEST).unwrap();

        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn empty_lists_fail_completeness_check() {
        let manifest = parse_manifest(
            r#"
["0001"]
up = [{name = "a", type = "schema", action = "create"}]
"#,
        )
        .unwrap();

        let err = require_complete("0001", &manifest["0001"]).unwrap_err();
        assert!(err.to_string().contains("no down actions"));
    }
}
