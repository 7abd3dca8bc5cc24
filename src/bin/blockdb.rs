//! blockdb Binary
//!
//! Loads the games TSV into a database file and runs FG_PCT_home range queries
//! against it, reporting block accesses.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use blockdb::{
    mean_fg_pct_home, BlockKind, Config, Data, Database, DiskStore, QueryMode, Record, SpyOp,
    SpyStore, Store, DEFAULT_PAGE_SIZE,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// Block storage engine with a bulk-loaded B+Tree index
#[derive(Parser, Debug)]
#[command(name = "blockdb")]
#[command(about = "Load and query games data in a B+Tree indexed block store")]
#[command(version)]
struct Args {
    /// Page size in bytes; a database must be reopened with the size it was
    /// created with
    #[arg(short, long, global = true, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Keys per B+Tree node (defaults to what fits in one page)
    #[arg(short, long, global = true)]
    node_capacity: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a games TSV into a fresh database file
    Load {
        /// Database file to create
        db_path: PathBuf,

        /// games TSV to load
        input_path: PathBuf,
    },

    /// Query FG_PCT_home in [begin, end] and report block accesses
    Query {
        /// Database file to query
        db_path: PathBuf,

        /// Query mode: scan or index
        mode: QueryMode,

        /// Lower bound of FG_PCT_home (inclusive)
        #[arg(long, default_value_t = 0.6)]
        begin: f32,

        /// Upper bound of FG_PCT_home (inclusive)
        #[arg(long, default_value_t = 0.9)]
        end: f32,
    },
}

fn main() -> ExitCode {
    // Initialize tracing/logging; stdout carries only the report
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,blockdb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            // help and version go to stdout
            if let Err(io_err) = e.print() {
                tracing::error!("Failed to print usage: {}", io_err);
                return ExitCode::from(1);
            }
            return ExitCode::from(code);
        }
    };

    tracing::info!("blockdb v{}", blockdb::VERSION);

    let mut builder = Config::builder().page_size(args.page_size);
    if let Some(capacity) = args.node_capacity {
        builder = builder.node_capacity(capacity);
    }

    let result = match args.command {
        Commands::Load {
            db_path,
            input_path,
        } => run_load(builder.build(), &db_path, &input_path),
        Commands::Query {
            db_path,
            mode,
            begin,
            end,
        } => run_query(builder.query_range(begin, end).build(), &db_path, mode),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(1)
        }
    }
}

fn open_database(config: &Config, db_path: &Path) -> blockdb::Result<Database<SpyStore<DiskStore>>> {
    config.validate()?;
    let store = SpyStore::new(DiskStore::open(db_path, config.page_size)?);
    Database::with_node_capacity(store, config.node_capacity())
}

fn run_load(config: Config, db_path: &Path, input_path: &Path) -> blockdb::Result<()> {
    config.validate()?;
    if db_path.exists() {
        tracing::warn!(path = %db_path.display(), "replacing existing database file");
        std::fs::remove_file(db_path)?;
    }

    let input = BufReader::new(File::open(input_path)?);
    let mut db = open_database(&config, db_path)?;
    let stats = db.load(input)?;
    let root_keys = db.root_keys()?;
    let meta = db.store().meta();

    println!("[Load]");
    println!("Record size: {}", Record::SIZE);
    println!("Loaded records: {}", stats.records);
    println!("Max records per data block: {}", Data::capacity_for(config.page_size));
    println!("No. of data blocks: {}", meta.data_ids.len());
    println!("[Index]");
    println!("Keys per B+Tree node (parameter n): {}", db.node_capacity());
    println!("No. of B+Tree nodes: {}", meta.btree_ids.len());
    println!("Levels in B+Tree: {}", stats.levels);
    let keys: Vec<String> = root_keys.iter().map(|k| k.to_string()).collect();
    println!("Keys in root node: {}", keys.join(" "));

    db.into_store().into_inner().close()
}

fn run_query(config: Config, db_path: &Path, mode: QueryMode) -> blockdb::Result<()> {
    if !db_path.exists() {
        return Err(blockdb::DbError::Config(format!(
            "no database at {}, run load first",
            db_path.display()
        )));
    }

    let mut db = open_database(&config, db_path)?;
    let (begin, end) = config.query_keys();

    let started = Instant::now();
    let records = db.query(mode, begin, end)?;
    let mean = mean_fg_pct_home(&records);
    let elapsed = started.elapsed();

    let store = db.store();
    println!("[Query]");
    println!("Matched records: {}", records.len());
    println!("Index block accesses: {}", store.count(SpyOp::Read, BlockKind::BTreeNode));
    println!("Data block accesses: {}", store.count(SpyOp::Read, BlockKind::Data));
    println!("Query result: {}", mean);
    println!("Query time (microseconds): {}", elapsed.as_micros());
    Ok(())
}
