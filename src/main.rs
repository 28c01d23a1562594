/*!
 * pgpw CLI - Command Line Interface
 *
 * Version: 0.3.0
 * Author: Shane Wall <shaneawall@gmail.com>
 */

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pgpw::{
    error::{EXIT_FAILURE, EXIT_SUCCESS},
    logging, DatabaseOps, ExecOptions, PgpwConfig, Registry, RetryConfig,
};
use serde_json::Value;
use tracing::info;

#[derive(Parser)]
#[command(name = "pgpw")]
#[command(version, about = "Call PostgreSQL functions with connectivity-aware retries", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Debug logging regardless of the configured level
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file and list its databases
    Check,

    /// Call a database function and print its rows as JSON
    Exec(ExecArgs),
}

#[derive(Args)]
struct ExecArgs {
    /// Database name from the configuration file
    database: String,

    /// Function to call, optionally schema-qualified
    function: String,

    /// Positional parameters; arguments that are not valid JSON are sent as strings
    #[arg(allow_negative_numbers = true)]
    params: Vec<String>,

    #[command(flatten)]
    retry: RetryArgs,
}

#[derive(Args)]
struct RetryArgs {
    /// Single attempt, ignoring the database's default retry configuration
    #[arg(long, conflicts_with_all = ["initial_delay_ms", "max_attempts", "exponent"])]
    no_retry: bool,

    /// Delay before the first retry in milliseconds
    #[arg(long, requires_all = ["max_attempts", "exponent"])]
    initial_delay_ms: Option<u64>,

    /// Retries after the first attempt
    #[arg(long, requires_all = ["initial_delay_ms", "exponent"])]
    max_attempts: Option<u32>,

    /// Growth factor of the delay between retries
    #[arg(long, requires_all = ["initial_delay_ms", "max_attempts"])]
    exponent: Option<f64>,
}

impl RetryArgs {
    fn to_exec_options(&self) -> pgpw::Result<ExecOptions> {
        if self.no_retry {
            return Ok(ExecOptions::no_retry());
        }
        match (self.initial_delay_ms, self.max_attempts, self.exponent) {
            (Some(delay), Some(attempts), Some(exponent)) => Ok(ExecOptions::with_retry(
                RetryConfig::new(delay, attempts, exponent)?,
            )),
            _ => Ok(ExecOptions::default()),
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            e.downcast_ref::<pgpw::Error>()
                .map(pgpw::Error::exit_code)
                .unwrap_or(EXIT_FAILURE)
        }
    };
    std::process::exit(code);
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => PgpwConfig::from_file(path)?,
        None => PgpwConfig::default(),
    };

    logging::init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Check => check(&config),
        Commands::Exec(args) => {
            let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
            runtime.block_on(exec(&config, args))
        }
    }
}

fn check(config: &PgpwConfig) -> anyhow::Result<()> {
    if config.databases.is_empty() {
        println!("configuration is valid; no databases configured");
        return Ok(());
    }

    println!("configuration is valid");
    for (name, db) in &config.databases {
        let retry = match db.retry {
            Some(r) => format!(
                "retry {}ms x{} ^{}",
                r.initial_delay_ms(),
                r.max_attempts(),
                r.exponent()
            ),
            None => "no retry".to_string(),
        };
        println!(
            "  {name}: {}@{}:{}/{} ({retry})",
            db.connection.user, db.connection.host, db.connection.port, db.connection.database
        );
    }
    Ok(())
}

async fn exec(config: &PgpwConfig, args: ExecArgs) -> anyhow::Result<()> {
    let db_config = config.database(&args.database).ok_or_else(|| {
        pgpw::Error::Config(format!(
            "database \"{}\" is not defined in the configuration",
            args.database
        ))
    })?;

    let registry = Registry::new();
    registry.init(&args.database, &db_config.connection, db_config.retry)?;
    let db = registry.database(&args.database);

    let params: Vec<Value> = args.params.iter().map(String::as_str).map(parse_param).collect();
    let options = args.retry.to_exec_options()?;

    info!(db = %args.database, function = %args.function, "calling function");
    let rows = db.exec_func(&args.function, &params, &options).await?;

    let output = serde_json::to_string_pretty(&rows).context("failed to render result")?;
    println!("{output}");
    Ok(())
}

fn parse_param(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
