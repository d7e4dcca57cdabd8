//! `fieldseal`: command-line entry point.
//!
//! Startup sequence:
//! 1. Parse arguments.
//! 2. For `encrypt` and `decrypt`, load and validate [`Config`] from
//!    environment variables; a missing `ENCRYPTION_KEY` stops the process here.
//!    `inspect` reads no configuration and needs no key.
//! 3. Initialise structured JSON logging on stderr.
//! 4. Run the requested command and print its result on stdout.

mod commands;
mod telemetry;

use anyhow::Result;
use clap::{Parser, Subcommand};
use common::LogicalType;
use fieldseal::Config;

#[derive(Parser)]
#[command(name = "fieldseal")]
#[command(about = "Seal and open typed column values")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serialize and encrypt one value, printing the stored blob.
    Encrypt {
        /// Column the value belongs to (reported in errors).
        #[arg(short, long, default_value = "value")]
        column: String,

        /// Logical type: integer, number, boolean, short_text, text, json, timestamp.
        #[arg(short = 't', long = "type")]
        logical_type: LogicalType,

        /// The value in its text form; plain JSON for the json type.
        value: String,
    },

    /// Decrypt and deserialize one stored blob, printing the value.
    Decrypt {
        /// Column the blob belongs to (reported in errors).
        #[arg(short, long, default_value = "value")]
        column: String,

        /// Logical type the column was declared with.
        #[arg(short = 't', long = "type")]
        logical_type: LogicalType,

        /// Base64 blob as read from storage.
        blob: String,
    },

    /// Show the byte layout of a stored blob without decrypting it.
    Inspect {
        /// Base64 blob as read from storage.
        blob: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = execute(cli.command, || {
        // -------------------------------------------------------------------
        // 1. Configuration
        // -------------------------------------------------------------------
        let cfg = Config::from_env().map_err(|e| {
            // Telemetry is not yet up; write to stderr directly.
            eprintln!("ERROR: configuration invalid: {e:#}");
            e
        })?;

        // -------------------------------------------------------------------
        // 2. Telemetry
        // -------------------------------------------------------------------
        telemetry::init(&cfg.log_level)?;
        Ok(cfg)
    })?;

    println!("{output}");
    Ok(())
}

/// Run `command`, calling `load_config` only for commands that use the key.
fn execute(command: Command, load_config: impl FnOnce() -> Result<Config>) -> Result<String> {
    match command {
        Command::Inspect { blob } => commands::inspect(&blob),
        Command::Encrypt {
            column,
            logical_type,
            value,
        } => commands::encrypt(&load_config()?, &column, logical_type, &value),
        Command::Decrypt {
            column,
            logical_type,
            blob,
        } => commands::decrypt(&load_config()?, &column, logical_type, &blob),
    }
}
