use crate::util::{read_to_string, OdysseyError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};

fn block_pattern(name: &str, object_type: &str, tag: &str) -> Result<Regex> {
    let tag = regex::escape(tag);
    let name = regex::escape(name);
    let object_type = regex::escape(object_type);

    // Both markers must end their line right after the type. The wrapper's own
    // newline after BEGIN and before END is not part of the body.
    Regex::new(&format!(
        r"(?sm)-- {tag} BEGIN \|{name}\|{object_type}[ \t]*\r?\n(.*?)\r?\n?-- {tag} END \|{name}\|{object_type}[ \t]*\r?$"
    ))
    .map_err(|e| OdysseyError::ResolutionError(format!("Invalid rollback pattern: {e}")))
}

/// Returns the body of the first `name`/`type` marker block in `content`.
pub fn match_previous_definition(
    content: &str,
    name: &str,
    object_type: &str,
    tag: &str,
) -> Result<Option<String>> {
    let pattern = block_pattern(name, object_type, tag)?;
    Ok(pattern
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string()))
}

/// Walks `candidates` (most recent first) and returns the first definition
/// found together with the artifact it came from.
pub fn resolve_previous_definition(
    name: &str,
    object_type: &str,
    candidates: &[PathBuf],
    tag: &str,
) -> Result<(String, PathBuf)> {
    for candidate in candidates {
        if let Some(body) = match_previous_definition_in_file(candidate, name, object_type, tag)? {
            return Ok((body, candidate.clone()));
        }
    }

    Err(OdysseyError::ResolutionError(format!(
        "No previous definition of {name} ({object_type}) in {} earlier up migration(s)",
        candidates.len()
    )))
}

/// Same as [`match_previous_definition`] over one artifact on disk.
pub fn match_previous_definition_in_file(
    path: &Path,
    name: &str,
    object_type: &str,
    tag: &str,
) -> Result<Option<String>> {
    let content = read_to_string(path)?;
    match_previous_definition(&content, name, object_type, tag)
}
