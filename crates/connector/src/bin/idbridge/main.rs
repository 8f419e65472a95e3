// idbridge - identity reconciliation passes from the command line

mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};

use idbridge_connector::pass::PassOutcome;
use idbridge_connector::{authoritative, merging, orphan, schema, ConnectorConfig, ConnectorError};
use idbridge_platform::{PlatformClient, PlatformError};

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "idbridge")]
#[command(about = "Identity reconciliation connector (merging, orphan, authoritative)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the identity merging pass
    #[command(after_help = "\
Examples:
  idbridge merging connector.toml
  idbridge merging connector.toml --json")]
    Merging {
        /// Path to the connector TOML config file
        config: PathBuf,

        /// Output one JSON document instead of JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Run the orphan account pass
    Orphan {
        /// Path to the connector TOML config file
        config: PathBuf,

        /// Output one JSON document instead of JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Run the authoritative source pass
    Authoritative {
        /// Path to the connector TOML config file
        config: PathBuf,

        /// Output one JSON document instead of JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Print the account schema for a pass
    Schema {
        #[arg(value_enum)]
        pass: SchemaPass,
    },

    /// Validate a config file without connecting
    Validate {
        /// Path to the connector TOML config file
        config: PathBuf,
    },

    /// Check connectivity and the configured source
    Test {
        /// Path to the connector TOML config file
        config: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaPass {
    Merging,
    Orphan,
    Authoritative,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(exit_codes::for_error(&err))
        }
    }
}

fn run(command: Commands) -> Result<(), ConnectorError> {
    match command {
        Commands::Merging { config, json } => {
            let config = load_config(&config)?;
            let client = connect(&config)?;
            let outcome = merging::run(&client, &config, Utc::now())?;
            print_pass(&outcome, json)
        }
        Commands::Orphan { config, json } => {
            let config = load_config(&config)?;
            let client = connect(&config)?;
            let outcome = orphan::run(&client, &config, Utc::now())?;
            print_pass(&outcome, json)
        }
        Commands::Authoritative { config, json } => {
            let config = load_config(&config)?;
            let client = connect(&config)?;
            let outcome = authoritative::run(&client, &config)?;
            if json {
                println!("{}", to_json_pretty(&outcome.accounts)?);
            } else {
                for account in &outcome.accounts {
                    println!("{}", to_json(account)?);
                }
            }
            eprintln!("{} accounts, {} errors", outcome.accounts.len(), outcome.errors.len());
            Ok(())
        }
        Commands::Schema { pass } => {
            let schema = match pass {
                SchemaPass::Merging | SchemaPass::Orphan => schema::record_schema(),
                SchemaPass::Authoritative => schema::authoritative_schema(),
            };
            println!("{}", to_json_pretty(&schema)?);
            Ok(())
        }
        Commands::Validate { config } => {
            load_config(&config)?;
            eprintln!("config OK");
            Ok(())
        }
        Commands::Test { config } => {
            let config = load_config(&config)?;
            let client = connect(&config)?;
            let source =
                client.get_source(&config.connection.source_id).map_err(|e| match e {
                    PlatformError::NotFound(_) => {
                        ConnectorError::SourceNotFound(config.connection.source_id.clone())
                    }
                    other => other.into(),
                })?;
            eprintln!("Test successful! source '{}' found", source.name);
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<ConnectorConfig, ConnectorError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConnectorError::Io(format!("cannot read {}: {e}", path.display())))?;
    ConnectorConfig::from_toml(&raw)
}

fn connect(config: &ConnectorConfig) -> Result<PlatformClient, ConnectorError> {
    let conn = &config.connection;
    PlatformClient::connect(&conn.base_url, &conn.client_id, &conn.client_secret)
        .map_err(Into::into)
}

/// Records as JSON lines (the account feed), reviews and a summary to
/// stderr. `--json` prints one document instead.
fn print_pass(outcome: &PassOutcome, json: bool) -> Result<(), ConnectorError> {
    if json {
        let document = serde_json::json!({
            "records": outcome.records,
            "reviews": outcome.reviews,
            "errors": outcome.errors,
        });
        println!("{}", to_json_pretty(&document)?);
    } else {
        for record in &outcome.records {
            println!("{}", to_json(record)?);
        }
        for review in &outcome.reviews {
            eprintln!("open review: {} ({})", review.name, review.url);
        }
    }
    eprintln!(
        "{} records, {} open reviews, {} errors",
        outcome.records.len(),
        outcome.reviews.len(),
        outcome.errors.len()
    );
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ConnectorError> {
    serde_json::to_string(value).map_err(|e| ConnectorError::Io(e.to_string()))
}

fn to_json_pretty<T: serde::Serialize>(value: &T) -> Result<String, ConnectorError> {
    serde_json::to_string_pretty(value).map_err(|e| ConnectorError::Io(e.to_string()))
}
