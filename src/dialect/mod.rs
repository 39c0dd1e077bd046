//! SQL dialect engines.
//!
//! A dialect engine owns the single compiled pattern used to find the
//! `CREATE <TYPE> <NAME>` header of a source file. The pattern's participating
//! capture groups must yield, in order, the type keyword and the object name.

mod postgres;

use crate::util::{OdysseyError, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;

pub use postgres::PostgresEngine;

/// Object header detected in a SQL source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    /// Upper-cased, whitespace-collapsed type keyword (`TABLE`, `EXTERNAL TABLE`).
    pub object_type: String,
    pub name: String,
}

pub trait DialectEngine {
    fn name(&self) -> &'static str;

    fn object_header(&self) -> &Regex;

    /// Returns the first object header in `sql`, if any.
    fn detect_header(&self, sql: &str) -> Option<ObjectHeader> {
        let captures = self.object_header().captures(sql)?;
        let mut groups = captures
            .iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str().trim());

        let object_type = normalize_type_keyword(groups.next()?);
        let name = groups.next()?.to_string();
        if object_type.is_empty() || name.is_empty() {
            return None;
        }

        Some(ObjectHeader { object_type, name })
    }
}

/// Upper-cases a type keyword and collapses inner whitespace to single spaces.
pub fn normalize_type_keyword(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Postgres,
    /// Reserved name; no engine exists yet.
    Greenplum,
}

impl FromStr for Dialect {
    type Err = OdysseyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "greenplum" => Ok(Dialect::Greenplum),
            other => Err(OdysseyError::ConfigError(format!(
                "Unknown SQL dialect '{other}'. Valid dialects: postgres"
            ))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dialect::Postgres => "postgres",
            Dialect::Greenplum => "greenplum",
        };
        write!(f, "{s}")
    }
}

/// Builds the engine for `dialect`. Reserved dialects fail instead of
/// falling back to another engine.
pub fn create_engine(dialect: Dialect) -> Result<Box<dyn DialectEngine>> {
    match dialect {
        Dialect::Postgres => Ok(Box::new(PostgresEngine::new())),
        Dialect::Greenplum => Err(OdysseyError::ConfigError(format!(
            "SQL dialect '{dialect}' is reserved but not implemented"
        ))),
    }
}
