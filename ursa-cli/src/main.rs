//! Command-line front end for the ursadb client.
//!
//! Wraps each client operation in a subcommand and prints replies as JSON,
//! which makes it usable both interactively and from scripts.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use ursa_client::{QueryOutcome, UrsaClient};

#[derive(Parser, Debug)]
#[command(name = "ursa", about = "Talk to an ursadb index server")]
struct Args {
    /// Server endpoint
    #[arg(long, default_value = "tcp://127.0.0.1:9281")]
    endpoint: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print server status
    Status,
    /// Print the index topology
    Topology,
    /// Run a select query and print the resulting iterator handle
    Query {
        /// Query expression, e.g. "{41 41 41}" or min-of/and expressions
        expr: String,
        /// Restrict the query to datasets carrying this taint (repeatable)
        #[arg(long = "taint")]
        taints: Vec<String>,
        /// Restrict the query to a single dataset
        #[arg(long)]
        dataset: Option<String>,
    },
    /// Pop up to COUNT files from an iterator
    Pop {
        /// Iterator handle returned by a query
        iterator: String,
        /// Maximum number of files to fetch
        count: usize,
    },
    /// Send a raw command verbatim and print the reply
    Execute {
        /// Full command text, including the trailing semicolon
        command: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let client = UrsaClient::new(&args.endpoint);

    match args.command {
        Command::Status => print_json(&client.status()?),
        Command::Topology => print_json(&client.topology()?),
        Command::Query {
            expr,
            taints,
            dataset,
        } => match client.query(&expr, &taints, dataset.as_deref())? {
            QueryOutcome::Ready(result) => {
                println!("iterator: {}", result.iterator);
                println!("file count: {}", result.file_count);
                println!("elapsed: {:.3}s", result.elapsed.as_secs_f64());
            }
            QueryOutcome::Rejected { message } => bail!(message),
        },
        Command::Pop { iterator, count } => {
            let result = client.pop(&iterator, count)?;
            if result.was_locked {
                println!("iterator is locked, try again later");
            } else {
                for file in &result.files {
                    println!("{}", file);
                }
                println!(
                    "position: {}/{} (empty: {})",
                    result.iterator_pos,
                    result.total_files,
                    result.iterator_empty()
                );
            }
        }
        Command::Execute { command } => print_json(&client.execute(&command)?),
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) {
    println!("{:#}", value);
}
