//! symdb: inspect and maintain symbol index databases
//!
//! Usage:
//!   symdb status <db>      Show index statistics
//!   symdb clear <db>       Remove every recorded fact
//!   symdb optimize <db>    Compact the database file
//!   symdb version          Show version information

use std::env;

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use symdb::cli::{clear_command, optimize_command, status_command, version_command};

fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().collect();

    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    args.retain(|a| a != "--verbose" && a != "-v");
    if verbose {
        setup_debug_logging();
    } else {
        setup_logging();
    }

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "status" | "clear" | "optimize" => {
            let Some(path) = args.get(2) else {
                eprintln!("Usage: symdb {} <db>", args[1]);
                return Ok(());
            };
            match args[1].as_str() {
                "status" => status_command(path)?,
                "clear" => clear_command(path)?,
                _ => optimize_command(path)?,
            }
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "--version" | "-V" | "version" => {
            version_command();
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
        }
    }

    Ok(())
}

fn print_usage() {
    println!(
        r#"symdb: inspect and maintain symbol index databases

USAGE:
    symdb <COMMAND> [OPTIONS]

COMMANDS:
    status <db>            Show index statistics
    clear <db>             Remove every recorded fact, keeping the file
    optimize <db>          Compact the database file
    version                Show crate and storage versions
    help                   Show this help message

OPTIONS:
    -v, --verbose          Log debug output to stderr

ENVIRONMENT:
    RUST_LOG               Log filter used when --verbose is not given

EXAMPLES:
    symdb status project.srctrldb
    symdb clear project              # .srctrldb is added when missing
"#
    );
}

/// Warnings only, unless `RUST_LOG` asks for more
fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::WARN.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn setup_debug_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}
