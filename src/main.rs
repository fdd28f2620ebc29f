//! edel-crawler - Resilient book catalog extraction from Edelweiss
//!
//! Looks up ISBNs (or author names) one isolated browser session at a time,
//! or downloads a Hachette trade catalog.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edel_crawler::commands::{BatchCommand, CatalogCommand, StatusCommand};
use edel_crawler::config::{Config, OutputFormat};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "edel-crawler",
    version,
    about = "Resilient book catalog extraction from Edelweiss",
    long_about = "Searches the Edelweiss catalog for each ISBN or author, reveals BISAC \
                  classifications and summaries, and writes results incrementally to JSON."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Results file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Delay between keys in milliseconds
    #[arg(long, global = true)]
    delay: Option<u64>,

    /// Show the browser window
    #[arg(long, global = true)]
    headed: bool,

    /// Chrome/Chromium executable
    #[arg(long, global = true)]
    chrome: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up ISBNs or author names
    #[command(alias = "b")]
    Batch {
        /// ISBN(s) or author name(s)
        keys: Vec<String>,

        /// Read keys from a file, one per line
        #[arg(long)]
        input: Option<PathBuf>,

        /// Search anonymously (no summaries)
        #[arg(long)]
        no_login: bool,

        /// Keep results already in the output file and skip those keys
        #[arg(long)]
        resume: bool,
    },

    /// Download a Hachette trade catalog
    #[command(alias = "h")]
    Hachette {
        /// Catalog name as linked, e.g. "January 2026 HNZ"
        query: String,

        /// Hachette customer number
        #[arg(long)]
        customer: Option<String>,
    },

    /// Show progress of a results file
    #[command(alias = "s")]
    Status {
        /// Print every result instead of counts
        #[arg(long)]
        full: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    config.format = cli.format;
    if let Some(output) = cli.output {
        config.output = output;
    }
    if let Some(delay) = cli.delay {
        config.delay_ms = delay;
    }
    if cli.headed {
        config.headless = false;
    }
    if let Some(chrome) = cli.chrome {
        config.chrome_path = Some(chrome);
    }

    match cli.command {
        Commands::Batch { mut keys, input, no_login, resume } => {
            if let Some(path) = input {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read key file: {}", path.display()))?;
                keys.extend(content.lines().map(str::to_string));
            }

            let authenticated = config.login && !no_login;
            let cmd = BatchCommand::new(config);
            let output = cmd.execute(&keys, authenticated, resume).await?;
            println!("{}", output);
        }

        Commands::Hachette { query, customer } => {
            if let Some(customer) = customer {
                config.hachette.customer_number = Some(customer);
            }
            let cmd = CatalogCommand::new(config);
            println!("{}", cmd.execute(&query).await?);
        }

        Commands::Status { full } => {
            let cmd = StatusCommand::new(config);
            println!("{}", cmd.execute(full)?);
        }
    }

    Ok(())
}
