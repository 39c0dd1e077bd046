#![allow(dead_code, unused_imports)]

pub use chrono::{TimeZone, Utc};
pub use odyssey_db::prelude::*;
pub use std::fs;
pub use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

pub const TAG: &str = "ODESSEY";

/// A throwaway project laid out with the default settings.
pub struct Project {
    pub dir: TempDir,
    pub settings: Settings,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let settings = Settings::new(dir.path());
        fs::create_dir_all(&settings.sql_src).unwrap();
        fs::create_dir_all(&settings.migration_dir).unwrap();
        Self { dir, settings }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn source(&self, relative: &str, content: &str) -> PathBuf {
        self.write(&format!("src/{relative}"), content)
    }

    pub fn manifest(&self, content: &str) {
        fs::write(&self.settings.manifest, content).unwrap();
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.settings.migration_dir.join(name)
    }

    pub fn artifact(&self, name: &str) -> String {
        fs::read_to_string(self.artifact_path(name)).unwrap()
    }

    pub fn has_artifact(&self, name: &str) -> bool {
        self.artifact_path(name).exists()
    }

    pub fn build(
        &self,
        options: &BuildOptions,
    ) -> (odyssey_db::util::Result<BuildResult>, RecordingSink) {
        let sink = RecordingSink::new();
        let result = build_with_provenance(&self.settings, options, &provenance(), &sink);
        (result, sink)
    }
}

pub fn provenance() -> Provenance {
    Provenance {
        built_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        version: "0.3".into(),
        release: "0.3.0".into(),
    }
}

pub fn wrapped(name: &str, object_type: &str, sql: &str) -> String {
    WrappedCommand {
        name: name.into(),
        object_type: object_type.into(),
        sql: sql.into(),
    }
    .render(TAG)
}
