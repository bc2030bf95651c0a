//! Controller doc generator - command-line tool for documenting PHP controllers.
//!
//! Extracts structured metadata from controller classes (public methods, signatures,
//! embedded query chains, verbatim method source) and writes documentation blocks
//! produced elsewhere back into the source without disturbing its formatting.
//!
//! # Usage
//!
//! ```bash
//! controller-docgen [OPTIONS] <COMMAND>
//! ```
//!
//! # Examples
//!
//! Describe a controller as YAML:
//! ```bash
//! controller-docgen extract app/Http/Controllers/UserController.php
//! ```
//!
//! Describe every controller in a directory as JSON:
//! ```bash
//! controller-docgen extract app/Http/Controllers -f json -o controllers.json
//! ```
//!
//! Write documentation blocks from a map, previewing first:
//! ```bash
//! controller-docgen write app/Http/Controllers/UserController.php --docs docs.json --dry-run
//! controller-docgen write app/Http/Controllers/UserController.php --docs docs.json
//! ```

use anyhow::Result;
use clap::Parser;
use controller_docgen::cli;
use log::info;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Controller doc generator starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    Ok(())
}
