// ABOUTME: CLI entry point for sqlite-dumper
// ABOUTME: Parses commands and routes to the dump and verify handlers

use clap::{Args, Parser, Subcommand};
use sqlite_dumper::commands;
use sqlite_dumper::config::{self, DumpRules, TableRules};
use sqlite_dumper::filters::TableFilter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sqlite-dumper")]
#[command(about = "Render SQLite and libSQL databases as replayable SQL", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct TableRuleArgs {
    /// Dump only these tables (comma-separated)
    #[arg(long, value_delimiter = ',')]
    include_tables: Vec<String>,
    /// Skip these tables (comma-separated)
    #[arg(long, value_delimiter = ',')]
    exclude_tables: Vec<String>,
    /// Dump these tables' schema without their rows (comma-separated)
    #[arg(long, value_delimiter = ',')]
    schema_only_tables: Vec<String>,
    /// Path to a TOML file with [tables] include/exclude/schema_only lists
    #[arg(long = "config")]
    config_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the database's schema and rows as SQL statements
    Dump {
        /// SQLite database file (or file: URI)
        #[arg(long)]
        db: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing output file without asking
        #[arg(short = 'y', long)]
        yes: bool,
        #[command(flatten)]
        table_rules: TableRuleArgs,
    },
    /// Replay a dump into a scratch database and compare it with the source
    Verify {
        /// SQLite database file the dump was taken from
        #[arg(long)]
        db: String,
        /// Dump file to check
        #[arg(long)]
        dump: PathBuf,
        #[command(flatten)]
        table_rules: TableRuleArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so a dump on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dump {
            db,
            output,
            yes,
            table_rules,
        } => {
            let filter = build_filter(table_rules)?;
            commands::dump(&db, output.as_deref(), filter, yes).await
        }
        Commands::Verify {
            db,
            dump,
            table_rules,
        } => {
            let filter = build_filter(table_rules)?;
            commands::verify(&db, &dump, filter).await
        }
    }
}

fn build_filter(args: TableRuleArgs) -> anyhow::Result<TableFilter> {
    let mut rules = DumpRules::default();
    if let Some(path) = &args.config_path {
        rules.merge(config::load_dump_rules_from_file(path)?);
    }
    rules.merge(DumpRules {
        tables: TableRules {
            include: args.include_tables,
            exclude: args.exclude_tables,
            schema_only: args.schema_only_tables,
        },
    });
    rules.into_filter()
}
