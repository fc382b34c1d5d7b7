//! SnapKV CLI Client
//!
//! Command-line interface for interacting with a SnapKV server.

use std::collections::BTreeMap;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use snapkv::client::Client;

/// SnapKV CLI
#[derive(Parser, Debug)]
#[command(name = "snapkv-cli")]
#[command(about = "CLI for the SnapKV key-value store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Write a batch given as a JSON object, e.g. '{"a":"1","b":"2"}'
    Load {
        /// JSON object of string values
        json: String,
    },

    /// Print the whole store
    Get {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Json,
    Html,
    Csv,
}

fn main() {
    let args = Args::parse();
    let client = Client::new(&args.server);

    let result = match args.command {
        Commands::Set { key, value } => client.put(&key, &value).map(|_| None),
        Commands::Load { json } => client.set_raw(&json).map(|_| None),
        Commands::Get { format: Format::Json } => client
            .get_json()
            .and_then(|records| {
                let sorted: BTreeMap<String, String> = records.into_iter().collect();
                Ok(serde_json::to_string_pretty(&sorted)?)
            })
            .map(Some),
        Commands::Get { format: Format::Html } => client.get_html().map(Some),
        Commands::Get { format: Format::Csv } => client.get_csv().map(Some),
    };

    match result {
        Ok(Some(output)) => println!("{}", output.trim_end()),
        Ok(None) => println!("OK"),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}
