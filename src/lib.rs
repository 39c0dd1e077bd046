//! odyssey-db - database-first migration builder.
//!
//! A TOML manifest lists, per build version, the actions that make up the
//! "up" and "down" scripts. Each action is resolved against a tree of SQL
//! source files (or, for rollbacks, against earlier generated scripts) and
//! written out as `<version>_up.sql` / `<version>_down.sql`.
//!
//! # Quick Start
//!
//! ```no_run
//! use odyssey_db::prelude::*;
//!
//! let settings = Settings::load(None).unwrap();
//! let result = build(&settings, &BuildOptions::default(), &TracingSink).unwrap();
//! println!("Generated {} version(s)", result.generated.len());
//! ```
//!
//! # Modules
//!
//! - [`manifest`] - Manifest parsing into typed actions
//! - [`index`] - SQL source indexing by object header
//! - [`compile`] - Action compilation and rollback resolution
//! - [`chain`] - Artifact chain validation and target selection
//! - [`artifact`] - Artifact writing
//! - [`build`] - The end-to-end pipeline

pub mod artifact;
pub mod build;
pub mod chain;
pub mod compile;
pub mod config;
pub mod dialect;
pub mod events;
pub mod index;
pub mod manifest;
pub mod migrate;
pub mod prelude;
pub mod status;
pub mod util;
