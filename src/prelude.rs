//! Convenient re-exports for common odyssey-db usage.
//!
//! # Example
//!
//! ```no_run
//! use odyssey_db::prelude::*;
//!
//! let settings = Settings::load(None).unwrap();
//! let result = build(&settings, &BuildOptions::default().with_target("0003"), &TracingSink).unwrap();
//! println!("Generated {} version(s)", result.generated.len());
//! ```

// Pipeline
pub use crate::build::{build, build_with_provenance, BuildOptions, BuildResult, GeneratedVersion};
pub use crate::migrate::plan_migration_files;
pub use crate::status::{chain_status, ChainStatus};

// Configuration
pub use crate::config::{Settings, ToolVersion};
pub use crate::dialect::{create_engine, Dialect, DialectEngine};

// Events
pub use crate::events::{BuildEvent, EventSink, RecordingSink, TracingSink};

// Core types
pub use crate::artifact::{ArtifactSummary, Provenance};
pub use crate::compile::WrappedCommand;
pub use crate::index::ObjectIndex;
pub use crate::manifest::{Action, ActionEntry, BuildSpec, Direction, Manifest};

// Error types
pub use crate::util::{ErrorCategory, OdysseyError};
