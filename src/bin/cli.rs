//! opsledger CLI
//!
//! Command-line front end over [`OpsEngine`], working against a JSON
//! snapshot in the data directory. Mutating commands save the snapshot back
//! on success.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

use opsledger::{Config, Document, EntityKind, OpsEngine};

/// opsledger CLI
#[derive(Parser, Debug)]
#[command(name = "opsledger-cli")]
#[command(about = "CLI for the opsledger operations core")]
#[command(version)]
struct Args {
    /// Data directory (snapshot + import spool)
    #[arg(short, long, default_value = "./opsledger_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the identifier a record with these attributes would receive
    Allocate {
        /// Entity kind (party, agent, store, order, product)
        kind: String,

        /// Record attributes as field=value pairs
        fields: Vec<String>,
    },

    /// Create a record
    Create {
        /// Entity kind
        kind: String,

        /// Record attributes as field=value pairs
        fields: Vec<String>,
    },

    /// Bulk-import a .csv or .xlsx file
    Import {
        /// Entity kind
        kind: String,

        /// File to import
        file: PathBuf,
    },

    /// Register a user
    Register {
        /// First name
        #[arg(long)]
        first_name: String,

        /// Email address
        #[arg(long)]
        email: String,
    },

    /// Verify a registered user
    Verify {
        /// Email address
        email: String,
    },

    /// List records, newest first
    List {
        /// Entity kind
        kind: String,

        /// Page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Records per page
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,opsledger=debug"));

    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(args: Args) -> opsledger::Result<()> {
    let config = Config::builder().data_dir(&args.data_dir).build();
    let engine = OpsEngine::open(config)?;

    match args.command {
        Commands::Allocate { kind, fields } => {
            let kind: EntityKind = kind.parse()?;
            let doc = parse_fields(&fields)?;
            println!("{}", engine.allocate(kind, &doc)?);
        }

        Commands::Create { kind, fields } => {
            let kind: EntityKind = kind.parse()?;
            let doc = parse_fields(&fields)?;
            let stored = engine.create(kind, doc)?;
            engine.save()?;
            println!("{}", Value::Object(stored));
        }

        Commands::Import { kind, file } => {
            let kind: EntityKind = kind.parse()?;
            // Spool a copy so the importer owns (and removes) its input,
            // the way it owns an uploaded temp file
            let spooled = spool(&args.data_dir, &file)?;
            let report = engine.import_batch(kind, &spooled)?;
            engine.save()?;
            println!("{} rows imported", report.inserted);
        }

        Commands::Register { first_name, email } => {
            let mut user = Document::new();
            user.insert("first_name".to_string(), Value::from(first_name));
            user.insert("email".to_string(), Value::from(email));
            let receipt = engine.register_user(user)?;
            engine.save()?;
            println!("{}", Value::Object(receipt.user));
        }

        Commands::Verify { email } => {
            engine.verify_user(&email)?;
            engine.save()?;
            println!("verified {email}");
        }

        Commands::List { kind, page, limit } => {
            let kind: EntityKind = kind.parse()?;
            let (docs, total) = engine.list(kind, page, limit);
            for doc in docs {
                println!("{}", Value::Object(doc));
            }
            println!("{total} total");
        }
    }

    Ok(())
}

/// Parse `field=value` arguments into a document
fn parse_fields(fields: &[String]) -> opsledger::Result<Document> {
    let mut doc = Document::new();
    for field in fields {
        let (key, value) = field.split_once('=').ok_or_else(|| {
            opsledger::OpsError::Config(format!("expected field=value, got \"{field}\""))
        })?;
        doc.insert(key.to_string(), Value::from(value));
    }
    Ok(doc)
}

/// Copy an input file into the spool directory for import
fn spool(data_dir: &PathBuf, file: &PathBuf) -> opsledger::Result<PathBuf> {
    let spool_dir = data_dir.join("spool");
    fs::create_dir_all(&spool_dir)?;
    let name = file
        .file_name()
        .ok_or_else(|| opsledger::OpsError::Config(format!("not a file: {}", file.display())))?;
    let target = spool_dir.join(name);
    fs::copy(file, &target)?;
    Ok(target)
}
