//! redshift-frame CLI - Offline decoding and statement generation for Redshift tables.

use clap::{Parser, Subcommand};
use redshift_frame::{
    catalog, decode, encode::Encoder, schema, statement, Config, DtypeSpec, IfExists, RedshiftError,
    StatementResult, TypeTag, TypedTable,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "redshift-frame")]
#[command(about = "Typed tables in and out of Amazon Redshift")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode saved GetStatementResult pages into a table
    Decode {
        /// JSON file holding one result page or an array of pages
        #[arg(short, long)]
        input: PathBuf,

        /// Pretty-print the table JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a table and print the CREATE TABLE and INSERT statements
    Encode {
        /// JSON file holding {"columns": [...], "data": [[...], ...]}
        #[arg(short, long)]
        input: PathBuf,

        /// Target table name
        #[arg(short, long)]
        table: String,

        /// Column types: a single token such as varchar(60) or a JSON object
        #[arg(long)]
        dtype: Option<String>,

        /// Override target schema
        #[arg(long)]
        schema: Option<String>,

        /// Override the statement size limit in bytes
        #[arg(long)]
        max_statement_size: Option<usize>,
    },

    /// Resolve a type token to its canonical Redshift type
    Resolve {
        /// Type token, e.g. "character varying(60)"
        token: String,
    },

    /// List the supported Redshift types and their aliases
    Types,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), RedshiftError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(RedshiftError::Config)?;

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Decode { input, pretty } => {
            let pages = read_pages(&input)?;
            let table = decode::decode_pages(&pages)?;
            info!(
                "Decoded {} rows x {} columns from {} page(s)",
                table.num_rows(),
                table.num_columns(),
                pages.len()
            );
            print_json(&table.to_json(), pretty)?;
        }

        Commands::Encode {
            input,
            table,
            dtype,
            schema,
            max_statement_size,
        } => {
            if let Some(s) = schema {
                config.target.schema = s;
            }
            if let Some(size) = max_statement_size {
                config.encode.max_statement_size = size;
            }
            config.validate()?;

            let spec = match dtype {
                Some(raw) => parse_dtype(&raw)?,
                None => config.dtype.clone().ok_or_else(|| {
                    RedshiftError::Config("No dtype given on the command line or in the config".to_string())
                })?,
            };

            let content = std::fs::read_to_string(&input)?;
            let frame = TypedTable::from_json(&serde_json::from_str(&content)?)?;
            debug!("Loaded {} rows from {}", frame.num_rows(), input.display());

            let resolved = schema::resolve(&spec, &frame)?;
            let encoder = Encoder::new(config.encode.max_statement_size);
            let encoded = encoder.encode(&frame, &resolved, &config.target.schema, &table)?;

            if config.target.if_exists == IfExists::Fail {
                println!("{}", statement::create_table_sql(&encoded)?);
            }
            let statements = statement::insert_statements(&encoded, encoder.max_statement_size())?;
            for stmt in &statements {
                println!("{}", stmt.sql);
            }
            info!(
                "{} rows in {} statement(s) for {}.{}",
                encoded.num_rows(),
                statements.len(),
                config.target.schema,
                table
            );
        }

        Commands::Resolve { token } => {
            let resolved = catalog::resolve(&token)?;
            println!("{}", resolved);
        }

        Commands::Types => {
            for tag in TypeTag::ALL {
                println!("{:<18} {}", tag.name(), tag.aliases().join(", "));
            }
        }
    }

    Ok(())
}

/// Accept either a bare token (`varchar(60)`) or JSON (`{"id": "integer"}`).
fn parse_dtype(raw: &str) -> Result<DtypeSpec, RedshiftError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('"') {
        Ok(serde_json::from_str(trimmed)?)
    } else {
        Ok(DtypeSpec::from(trimmed))
    }
}

fn read_pages(path: &Path) -> Result<Vec<StatementResult>, RedshiftError> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(vec![serde_json::from_value(value)?])
    }
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<(), RedshiftError> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("Unknown log format '{}', expected text or json", other)),
    }

    Ok(())
}
