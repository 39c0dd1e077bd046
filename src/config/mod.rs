//! Project settings and tool version.
//!
//! Settings come from an optional `odyssey.toml`; relative paths in it are
//! resolved against the directory holding the file. The CLI layers its own
//! overrides on top before handing the settings to the build.

use crate::dialect::Dialect;
use crate::util::{OdysseyError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "odyssey.toml";
pub const DEFAULT_MARKER_TAG: &str = "ODESSEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Project root; relative manifest `location`s resolve against it.
    pub base_dir: PathBuf,
    pub sql_src: PathBuf,
    pub migration_dir: PathBuf,
    pub manifest: PathBuf,
    pub dialect: Dialect,
    pub marker_tag: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    sql_src: Option<PathBuf>,
    migration_dir: Option<PathBuf>,
    manifest: Option<PathBuf>,
    dialect: Option<String>,
    marker_tag: Option<String>,
}

impl Settings {
    /// Defaults rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            sql_src: base_dir.join("src"),
            migration_dir: base_dir.join("migrations"),
            manifest: base_dir.join("migrations").join("manifest.toml"),
            dialect: Dialect::default(),
            marker_tag: DEFAULT_MARKER_TAG.to_string(),
            base_dir,
        }
    }

    /// Loads settings from `path`, or from `./odyssey.toml` when it exists.
    /// Without a file, defaults are rooted at the current directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::new(current_dir()?));
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|e| {
            OdysseyError::ConfigError(format!("Cannot read settings {}: {e}", path.display()))
        })?;

        let base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => current_dir()?,
        };

        Self::from_toml(&content, base_dir).map_err(|e| match e {
            OdysseyError::ConfigError(message) => {
                OdysseyError::ConfigError(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let raw: RawSettings = toml::from_str(content)
            .map_err(|e| OdysseyError::ConfigError(format!("Invalid settings: {e}")))?;

        let mut settings = Self::new(base_dir);
        if let Some(sql_src) = raw.sql_src {
            settings.sql_src = settings.resolve(sql_src);
        }
        if let Some(migration_dir) = raw.migration_dir {
            settings.migration_dir = settings.resolve(migration_dir);
        }
        if let Some(manifest) = raw.manifest {
            settings.manifest = settings.resolve(manifest);
        }
        if let Some(dialect) = raw.dialect {
            settings.dialect = dialect.parse()?;
        }
        if let Some(tag) = raw.marker_tag {
            settings.marker_tag = validate_marker_tag(&tag)?;
        }

        Ok(settings)
    }

    /// Resolves `path` against the project root unless it is absolute.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.base_dir.join(path)
    }
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| OdysseyError::io(".", e))
}

/// Marker tags end up inside `-- <TAG> BEGIN |..|..` lines.
pub fn validate_marker_tag(tag: &str) -> Result<String> {
    let tag = tag.trim();
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(OdysseyError::ConfigError(format!(
            "Invalid marker tag '{tag}': use letters, digits and underscores"
        )));
    }
    Ok(tag.to_string())
}

/// Version and release stamped into every artifact footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersion {
    /// Short `MAJOR.MINOR` version.
    pub version: String,
    /// Full release string.
    pub release: String,
}

impl ToolVersion {
    pub fn current() -> Result<Self> {
        Self::from_release(env!("CARGO_PKG_VERSION"))
    }

    pub fn from_release(release: &str) -> Result<Self> {
        let mut parts = release.trim().split('.');
        let (Some(major), Some(minor)) = (parts.next(), parts.next()) else {
            return Err(OdysseyError::ConfigError(format!(
                "Cannot derive tool version from release '{release}'"
            )));
        };

        if major.is_empty() || minor.is_empty() {
            return Err(OdysseyError::ConfigError(format!(
                "Cannot derive tool version from release '{release}'"
            )));
        }

        Ok(Self {
            version: format!("{major}.{minor}"),
            release: release.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_rooted_at_base_dir() {
        let settings = Settings::new("/project");
        assert_eq!(settings.sql_src, PathBuf::from("/project/src"));
        assert_eq!(settings.migration_dir, PathBuf::from("/project/migrations"));
        assert_eq!(
            settings.manifest,
            PathBuf::from("/project/migrations/manifest.toml")
        );
        assert_eq!(settings.dialect, Dialect::Postgres);
        assert_eq!(settings.marker_tag, "ODESSEY");
    }

    #[test]
    fn toml_overrides_and_resolves_paths() {
        let settings = Settings::from_toml(
            r#"
sql_src = "db/src"
migration_dir = "/abs/migrations"
manifest = "db/manifest.toml"
dialect = "postgresql"
marker_tag = "ODYSSEY"
"#,
            "/project",
        )
        .unwrap();

        assert_eq!(settings.sql_src, PathBuf::from("/project/db/src"));
        assert_eq!(settings.migration_dir, PathBuf::from("/abs/migrations"));
        assert_eq!(settings.manifest, PathBuf::from("/project/db/manifest.toml"));
        assert_eq!(settings.marker_tag, "ODYSSEY");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Settings::from_toml("sql_source = \"src\"", "/project").unwrap_err();
        assert!(matches!(err, OdysseyError::ConfigError(_)));
    }

    #[test]
    fn unknown_dialect_is_rejected() {
        let err = Settings::from_toml("dialect = \"mysql\"", "/project").unwrap_err();
        assert!(err.to_string().contains("mysql"));
    }

    #[test]
    fn bad_marker_tag_is_rejected() {
        assert!(Settings::from_toml("marker_tag = \"A B\"", "/project").is_err());
        assert!(Settings::from_toml("marker_tag = \"\"", "/project").is_err());
    }

    #[test]
    fn load_uses_file_directory_as_base() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("odyssey.toml");
        fs::write(&path, "sql_src = \"sql\"\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.base_dir, dir.path());
        assert_eq!(settings.sql_src, dir.path().join("sql"));
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = Settings::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, OdysseyError::ConfigError(_)));
    }

    #[test]
    fn tool_version_from_release() {
        let tool = ToolVersion::from_release("1.4.2").unwrap();
        assert_eq!(tool.version, "1.4");
        assert_eq!(tool.release, "1.4.2");

        assert!(ToolVersion::from_release("1").is_err());
        assert!(ToolVersion::from_release("").is_err());
    }

    #[test]
    fn current_tool_version_resolves() {
        let tool = ToolVersion::current().unwrap();
        assert_eq!(tool.release, env!("CARGO_PKG_VERSION"));
    }
}
