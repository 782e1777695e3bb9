//! Schema reconciliation CLI
//!
//! Command-line tool for loading `^`-delimited schema files into a SQLite
//! snapshot and reporting where a schema file has drifted from it.

use clap::{Parser, Subcommand};
use env_logger::Env;
use sch_core::{
    parse_schema_file, reconcile_file, DiffReport, SchemaCatalog, SchemaStore, SqliteStore,
    DEFAULT_DB_PATH, DEFAULT_FILTER_SIZE,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sch")]
#[command(about = "Compare schema files with a stored schema snapshot", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a schema file and store it as the new snapshot
    Load {
        /// Path to schema file (e.g., ds.sch)
        schema_file: PathBuf,

        /// SQLite database file
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: PathBuf,

        /// Drop and rebuild the store tables before loading
        #[arg(long)]
        reset: bool,

        /// Do not print the stored tables afterwards
        #[arg(short, long)]
        quiet: bool,
    },

    /// Compare a schema file with the stored snapshot
    Compare {
        /// Path to schema file (e.g., ds.sch)
        schema_file: PathBuf,

        /// SQLite database file
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: PathBuf,

        /// Export differences to a JSON file instead of printing them
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Show the stored snapshot
    Show {
        /// SQLite database file
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: PathBuf,

        /// Only show this table
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Export the stored snapshot to a file
    Dump {
        /// SQLite database file
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: PathBuf,

        /// Output format (json or csv)
        #[arg(long, default_value = "json")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Parse and display a schema file without touching the store
    Parse {
        /// Path to schema file
        schema_file: PathBuf,

        /// Only show this table
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Find records in an exported report whose file size differs from SIZE
    FilterSize {
        /// Exported differences (JSON)
        report: PathBuf,

        /// Expected file size
        #[arg(short, long, default_value = DEFAULT_FILTER_SIZE)]
        size: String,

        /// Export the filtered records to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init_from_env(Env::default().default_filter_or("warn"));

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> sch_core::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Load {
            schema_file,
            db,
            reset,
            quiet,
        } => cmd_load(&schema_file, &db, reset, quiet),
        Commands::Compare {
            schema_file,
            db,
            json,
        } => cmd_compare(&schema_file, &db, json.as_deref()),
        Commands::Show { db, table } => cmd_show(&db, table.as_deref()),
        Commands::Dump { db, format, output } => cmd_dump(&db, &format, &output),
        Commands::Parse { schema_file, table } => cmd_parse(&schema_file, table.as_deref()),
        Commands::FilterSize {
            report,
            size,
            output,
        } => cmd_filter_size(&report, &size, output.as_deref()),
    }
}

fn cmd_load(schema_file: &Path, db: &Path, reset: bool, quiet: bool) -> sch_core::Result<()> {
    let parsed = parse_schema_file(schema_file)?;
    let mut store = SqliteStore::open(db)?;

    let count = if reset {
        store.reset(&parsed.definitions, Some(schema_file))?
    } else {
        store.bulk_replace(&parsed.definitions, Some(schema_file))?
    };

    if reset {
        println!("Database reset and new schema saved to {}", db.display());
    }
    println!(
        "Stored {} columns from {} ({} malformed lines skipped)",
        count,
        schema_file.display(),
        parsed.skipped_lines
    );

    if !quiet {
        let catalog = SchemaCatalog::from_definitions(&store.list_all()?);
        println!();
        print!("{}", catalog.render_all());
    }

    Ok(())
}

fn cmd_compare(schema_file: &Path, db: &Path, json: Option<&Path>) -> sch_core::Result<()> {
    let store = SqliteStore::open_existing(db)?;
    let report = reconcile_file(&store, schema_file)?;

    match json {
        Some(output) if !report.is_empty() => {
            report.save(output)?;
            println!(
                "Differences exported to {} ({} missing, {} different)",
                output.display(),
                report.missing_count(),
                report.different_count()
            );
        }
        _ => print!("{}", report.render_text()),
    }

    Ok(())
}

fn cmd_show(db: &Path, table: Option<&str>) -> sch_core::Result<()> {
    let store = SqliteStore::open_existing(db)?;
    let catalog = SchemaCatalog::from_definitions(&store.list_all()?);

    match store.snapshot_info()? {
        Some(info) => {
            let source = info
                .source
                .map(|s| s.display().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "Snapshot: {} columns from {}, loaded {}",
                info.column_count,
                source,
                info.loaded_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        None => println!("Snapshot: never loaded"),
    }
    println!("{} tables, {} columns", catalog.table_count(), catalog.column_count());
    println!();

    print_catalog(&catalog, table);
    Ok(())
}

fn cmd_dump(db: &Path, format: &str, output: &Path) -> sch_core::Result<()> {
    let store = SqliteStore::open_existing(db)?;
    let catalog = SchemaCatalog::from_definitions(&store.list_all()?);

    catalog.export(output, format)?;
    println!(
        "Exported {} columns in {} tables to {}",
        catalog.column_count(),
        catalog.table_count(),
        output.display()
    );

    Ok(())
}

fn cmd_parse(schema_file: &Path, table: Option<&str>) -> sch_core::Result<()> {
    let parsed = parse_schema_file(schema_file)?;
    let catalog = SchemaCatalog::from_definitions(&parsed.definitions);

    println!("File: {}", schema_file.display());
    println!("Lines: {}", parsed.total_lines);
    println!("Columns: {}", parsed.definitions.len());
    println!("Skipped: {}", parsed.skipped_lines);
    println!("Tables: {}", catalog.table_count());
    println!();

    print_catalog(&catalog, table);
    Ok(())
}

fn cmd_filter_size(report: &Path, size: &str, output: Option<&Path>) -> sch_core::Result<()> {
    let report = DiffReport::load(report)?;
    let filtered = report.filter_file_size_ne(size);

    print!("{}", filtered.render_sizes());

    if let Some(output) = output {
        filtered.save(output)?;
        println!("Results exported to {}", output.display());
    }

    Ok(())
}

fn print_catalog(catalog: &SchemaCatalog, table: Option<&str>) {
    match table {
        Some(name) => match catalog.render_table(name) {
            Some(text) => print!("{}", text),
            None => println!("Table {} not found", name),
        },
        None => print!("{}", catalog.render_all()),
    }
}
