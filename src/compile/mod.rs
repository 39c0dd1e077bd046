//! Compiles manifest actions into marker-wrapped SQL commands.

pub mod rollback;

use crate::events::{BuildEvent, EventSink};
use crate::index::ObjectIndex;
use crate::manifest::{Action, ActionEntry, Direction};
use crate::util::{read_to_string, OdysseyError, Result};
use std::path::{Path, PathBuf};

pub use rollback::{match_previous_definition, resolve_previous_definition};

/// SQL text owned by one manifest entry. Marker name and type are kept
/// exactly as written in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedCommand {
    pub name: String,
    pub object_type: String,
    pub sql: String,
}

impl WrappedCommand {
    pub fn new(entry: &ActionEntry, sql: impl Into<String>) -> Self {
        Self {
            name: entry.name.clone(),
            object_type: entry.object_type.clone(),
            sql: sql.into(),
        }
    }

    pub fn begin_marker(&self, tag: &str) -> String {
        format!("-- {tag} BEGIN |{}|{}", self.name, self.object_type)
    }

    pub fn end_marker(&self, tag: &str) -> String {
        format!("-- {tag} END |{}|{}", self.name, self.object_type)
    }

    pub fn render(&self, tag: &str) -> String {
        format!(
            "\n{}\n{}\n{}\n",
            self.begin_marker(tag),
            self.sql,
            self.end_marker(tag)
        )
    }
}

/// Inputs shared by every action of one (version, direction) pair.
pub struct CompileContext<'a> {
    pub index: &'a ObjectIndex,
    /// Root that relative `execute` locations are resolved against.
    pub base_dir: &'a Path,
    /// Up artifacts of earlier versions, most recent first.
    pub prior_up_artifacts: &'a [PathBuf],
    pub tag: &'a str,
    pub sink: &'a dyn EventSink,
}

pub fn compile_action(entry: &ActionEntry, ctx: &CompileContext<'_>) -> Result<WrappedCommand> {
    let sql = match &entry.action {
        Action::Drop => format!("DROP {} {};", entry.object_type.to_uppercase(), entry.name),
        Action::Create if entry.object_type.eq_ignore_ascii_case("schema") => {
            format!("CREATE SCHEMA {};", entry.name.to_lowercase())
        }
        Action::Create => {
            let file = ctx.index.lookup(&entry.name, &entry.object_type)?;
            read_to_string(file)?
        }
        Action::Execute { location } => read_to_string(&ctx.base_dir.join(location))?,
        Action::Rollback => {
            let (body, source) = resolve_previous_definition(
                &entry.name,
                &entry.object_type,
                ctx.prior_up_artifacts,
                ctx.tag,
            )?;
            ctx.sink.emit(BuildEvent::RollbackResolved {
                name: entry.name.clone(),
                object_type: entry.object_type.clone(),
                source,
            });
            body
        }
    };

    if sql.trim().is_empty() {
        return Err(OdysseyError::ResolutionError(format!(
            "{} of {} ({}) produced no SQL",
            entry.action.keyword(),
            entry.name,
            entry.object_type
        )));
    }

    Ok(WrappedCommand::new(entry, sql))
}

/// Compiles one direction of a version, in manifest order.
pub fn compile_actions(
    version: &str,
    direction: Direction,
    entries: &[ActionEntry],
    ctx: &CompileContext<'_>,
) -> Result<Vec<WrappedCommand>> {
    let mut commands = Vec::with_capacity(entries.len());

    for entry in entries {
        let command = compile_action(entry, ctx).map_err(|e| match e {
            OdysseyError::ResolutionError(message) => OdysseyError::ResolutionError(format!(
                "version {version} {direction}: {message}"
            )),
            other => other,
        })?;

        ctx.sink.emit(BuildEvent::CommandCompiled {
            version: version.to_string(),
            direction: direction.to_string(),
            name: command.name.clone(),
            object_type: command.object_type.clone(),
        });
        commands.push(command);
    }

    Ok(commands)
}
