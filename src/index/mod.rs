//! SQL source indexing: maps object names to the file defining them.

use crate::dialect::{normalize_type_keyword, DialectEngine};
use crate::events::{BuildEvent, EventSink};
use crate::util::{read_to_string, OdysseyError, Result};
use glob::{glob, Pattern};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub name: String,
    pub file: PathBuf,
}

/// Object index keyed by type bucket (`TABLE`, `SCHEMA`, `EXTERNAL TABLE`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObjectIndex {
    buckets: BTreeMap<String, Vec<IndexEntry>>,
}

/// Name-only view of an [`ObjectIndex`] entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatEntry<'a> {
    pub object_type: &'a str,
    pub name: &'a str,
    pub file: &'a Path,
}

impl ObjectIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry unless the bucket already holds the same name
    /// (case-insensitive). Returns the file that was kept on collision.
    pub fn insert(&mut self, object_type: &str, entry: IndexEntry) -> Option<PathBuf> {
        let bucket = self
            .buckets
            .entry(normalize_type_keyword(object_type))
            .or_default();

        if let Some(existing) = bucket
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(&entry.name))
        {
            return Some(existing.file.clone());
        }

        bucket.push(entry);
        None
    }

    pub fn buckets(&self) -> &BTreeMap<String, Vec<IndexEntry>> {
        &self.buckets
    }

    pub fn bucket(&self, object_type: &str) -> &[IndexEntry] {
        self.buckets
            .get(&normalize_type_keyword(object_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn flattened(&self) -> impl Iterator<Item = FlatEntry<'_>> {
        self.buckets.iter().flat_map(|(object_type, entries)| {
            entries.iter().map(move |entry| FlatEntry {
                object_type,
                name: &entry.name,
                file: &entry.file,
            })
        })
    }

    /// Finds the source file for `name`, ignoring case.
    ///
    /// A name found in several buckets is narrowed to the bucket matching
    /// `object_type`; if that does not leave exactly one file the lookup fails.
    pub fn lookup(&self, name: &str, object_type: &str) -> Result<&Path> {
        let matches: Vec<FlatEntry<'_>> = self
            .flattened()
            .filter(|e| e.name.eq_ignore_ascii_case(name))
            .collect();

        match matches.as_slice() {
            [] => Err(OdysseyError::ResolutionError(format!(
                "Object '{name}' not found in SQL sources"
            ))),
            [only] => Ok(only.file),
            _ => {
                let bucket = normalize_type_keyword(object_type);
                let narrowed: Vec<&FlatEntry<'_>> = matches
                    .iter()
                    .filter(|e| e.object_type == bucket)
                    .collect();

                match narrowed.as_slice() {
                    [only] => Ok(only.file),
                    _ => Err(OdysseyError::ResolutionError(format!(
                        "Object '{name}' is ambiguous: defined in {}",
                        matches
                            .iter()
                            .map(|e| format!("{} ({})", e.file.display(), e.object_type))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))),
                }
            }
        }
    }
}

/// Lists every `.sql` file below `root`, in sorted path order.
pub fn find_sql_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(OdysseyError::ConfigError(format!(
            "SQL source directory not found: {}",
            root.display()
        )));
    }

    let root_str = root.to_str().ok_or_else(|| {
        OdysseyError::ConfigError(format!(
            "SQL source path is not valid UTF-8: {}",
            root.display()
        ))
    })?;
    // The root is literal; only the suffix is a pattern.
    let pattern = Path::new(&Pattern::escape(root_str)).join("**/*.sql");
    let pattern = pattern.to_string_lossy();

    let entries = glob(&pattern)
        .map_err(|e| OdysseyError::ConfigError(format!("Invalid glob pattern: {e}")))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            OdysseyError::io(path, e.into_error())
        })?;
        if path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Indexes every SQL source file under `root` by its first object header.
pub fn index_sources(
    root: &Path,
    engine: &dyn DialectEngine,
    sink: &dyn EventSink,
) -> Result<ObjectIndex> {
    let files = find_sql_files(root)?;
    let mut index = ObjectIndex::new();

    for file in &files {
        let content = read_to_string(file)?;
        let Some(header) = engine.detect_header(&content) else {
            sink.emit(BuildEvent::NoObjectHeader { file: file.clone() });
            continue;
        };

        let entry = IndexEntry {
            name: header.name.clone(),
            file: file.clone(),
        };
        if let Some(kept) = index.insert(&header.object_type, entry) {
            sink.emit(BuildEvent::DuplicateObject {
                object_type: header.object_type,
                name: header.name,
                kept,
                ignored: file.clone(),
            });
        }
    }

    sink.emit(BuildEvent::SourcesIndexed {
        files: files.len(),
        objects: index.len(),
    });

    Ok(index)
}
