use crate::artifact::artifact_path;
use crate::chain::{scan_artifacts, select_targets};
use crate::config::Settings;
use crate::manifest::{load_manifest, Direction};
use crate::util::{hash_file, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltVersion {
    pub version: String,
    pub up_digest: Option<String>,
    pub down_digest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainStatus {
    pub manifest_versions: usize,
    pub built: Vec<BuiltVersion>,
    pub pending: Vec<String>,
    /// Set when the on-disk chain is inconsistent with the manifest.
    pub integrity_error: Option<String>,
}

impl ChainStatus {
    pub fn is_healthy(&self) -> bool {
        self.integrity_error.is_none()
    }

    pub fn next_target(&self) -> Option<&str> {
        self.pending.first().map(String::as_str)
    }
}

/// Summarizes the artifact chain. Chain integrity problems are reported in
/// the status rather than returned as errors.
pub fn chain_status(settings: &Settings) -> Result<ChainStatus> {
    let manifest = load_manifest(&settings.manifest)?;
    let state = scan_artifacts(&settings.migration_dir)?;

    let (pending, integrity_error) = match select_targets(&manifest, &state, None) {
        Ok(pending) => (pending, None),
        Err(e) => (Vec::new(), Some(e.to_string())),
    };

    let mut built = Vec::new();
    for version in state.up.union(&state.down) {
        built.push(BuiltVersion {
            version: version.clone(),
            up_digest: digest_if_present(settings, version, Direction::Up)?,
            down_digest: digest_if_present(settings, version, Direction::Down)?,
        });
    }

    Ok(ChainStatus {
        manifest_versions: manifest.len(),
        built,
        pending,
        integrity_error,
    })
}

fn digest_if_present(
    settings: &Settings,
    version: &str,
    direction: Direction,
) -> Result<Option<String>> {
    let path = artifact_path(&settings.migration_dir, version, direction);
    if path.is_file() {
        hash_file(&path).map(Some)
    } else {
        Ok(None)
    }
}

pub fn generate_text_report(status: &ChainStatus) -> String {
    let mut output = String::new();

    output.push_str("=== odyssey status ===\n");
    output.push_str(&format!("Manifest versions: {}\n", status.manifest_versions));
    output.push_str(&format!("Built: {}\n", status.built.len()));

    for built in &status.built {
        output.push_str(&format!(
            "  {}  up {}  down {}\n",
            built.version,
            short_digest(built.up_digest.as_deref()),
            short_digest(built.down_digest.as_deref())
        ));
    }

    if status.pending.is_empty() {
        output.push_str("Pending: none\n");
    } else {
        output.push_str(&format!("Pending: {}\n", status.pending.join(", ")));
    }

    if let Some(error) = &status.integrity_error {
        output.push_str(&format!("\nCHAIN BROKEN: {error}\n"));
    }

    output
}

fn short_digest(digest: Option<&str>) -> &str {
    match digest {
        Some(d) => &d[..d.len().min(12)],
        None => "missing",
    }
}
