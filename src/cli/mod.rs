use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use odyssey_db::build::{build, BuildOptions};
use odyssey_db::config::Settings;
use odyssey_db::dialect::create_engine;
use odyssey_db::events::TracingSink;
use odyssey_db::index::index_sources;
use odyssey_db::manifest::Direction;
use odyssey_db::migrate::plan_migration_files;
use odyssey_db::status::{chain_status, generate_text_report};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "odyssey")]
#[command(about = "Database-first migration builder", long_about = None, version)]
struct Cli {
    /// Settings file (defaults to ./odyssey.toml when present)
    #[arg(long, short, global = true, env = "ODYSSEY_CONFIG")]
    config: Option<PathBuf>,

    /// Root of the SQL source tree
    #[arg(long, global = true, env = "ODYSSEY_SQL_SRC")]
    sql_src: Option<PathBuf>,

    /// Directory holding generated migration scripts
    #[arg(long, global = true, env = "ODYSSEY_MIGRATION_DIR")]
    migration_dir: Option<PathBuf>,

    /// Build manifest (TOML)
    #[arg(long, global = true, env = "ODYSSEY_MANIFEST")]
    manifest: Option<PathBuf>,

    /// SQL dialect used to detect object headers
    #[arg(long, global = true, env = "ODYSSEY_DIALECT")]
    dialect: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate up/down scripts for every unbuilt manifest version
    Build {
        /// Last version to build
        #[arg(short, long)]
        target: Option<String>,
    },

    /// List the scripts a migration would apply, in order
    Migrate {
        #[arg(value_enum, default_value_t = MigrateDirection::Up)]
        direction: MigrateDirection,
        /// Migrate to target version; `latest` means the highest built version
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Load or extract table data as JSON fixtures
    Fixture {
        #[arg(value_enum)]
        action: FixtureAction,
    },

    /// Show which versions are built and which are pending
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Show the object index built from the SQL sources
    Index {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MigrateDirection {
    Up,
    Down,
}

#[derive(Clone, Copy, ValueEnum)]
enum FixtureAction {
    Load,
    Dump,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;

    if let Some(sql_src) = &cli.sql_src {
        settings.sql_src = sql_src.clone();
    }
    if let Some(migration_dir) = &cli.migration_dir {
        settings.migration_dir = migration_dir.clone();
    }
    if let Some(manifest) = &cli.manifest {
        settings.manifest = manifest.clone();
    }
    if let Some(dialect) = &cli.dialect {
        settings.dialect = dialect.parse()?;
    }

    Ok(settings)
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::Build { target } => {
            let options = BuildOptions { target };
            let result = build(&settings, &options, &TracingSink)?;
            if result.is_empty() {
                println!("Nothing to build");
            }
            for version in &result.generated {
                println!("{}", version.up.path.display());
                println!("{}", version.down.path.display());
            }
            Ok(())
        }
        Commands::Migrate { direction, target } => {
            let direction = match direction {
                MigrateDirection::Up => Direction::Up,
                MigrateDirection::Down => Direction::Down,
            };
            let target = target.filter(|t| !t.eq_ignore_ascii_case("latest"));
            let files = plan_migration_files(&settings, direction, target.as_deref())?;
            for file in &files {
                println!("{}", file.display());
            }
            Ok(())
        }
        Commands::Fixture { action } => {
            let name = match action {
                FixtureAction::Load => "load",
                FixtureAction::Dump => "dump",
            };
            bail!("fixture {name} is not implemented")
        }
        Commands::Status { json } => {
            let status = chain_status(&settings)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print!("{}", generate_text_report(&status));
            }
            if let Some(error) = status.integrity_error {
                bail!(error);
            }
            Ok(())
        }
        Commands::Index { json } => {
            let engine = create_engine(settings.dialect)?;
            let index = index_sources(&settings.sql_src, engine.as_ref(), &TracingSink)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&index)?);
            } else {
                for (object_type, entries) in index.buckets() {
                    println!("{object_type}");
                    for entry in entries {
                        println!("  {}  {}", entry.name, entry.file.display());
                    }
                }
            }
            Ok(())
        }
    }
}
