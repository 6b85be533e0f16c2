//! Configuration management for the slicer-meta CLI
//!
//! This module handles CLI argument parsing and logging setup.

use anyhow::{anyhow, Result};
use clap::builder::styling;
use clap::{value_parser, Arg, ArgMatches, ColorChoice, Command};
use std::path::PathBuf;
use tracing::info;

/// Build the CLI command
pub fn build_cli() -> Command {
    let styles = styling::Styles::styled()
        .header(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(styling::AnsiColor::Blue.on_default() | styling::Effects::BOLD)
        .placeholder(styling::AnsiColor::Cyan.on_default());

    Command::new("slicer-meta")
        .about("Print slicer, timing, filament and thumbnail metadata of sliced files")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("files")
                .help("G-code (.gcode, .g), GX (.gx) or 3MF (.3mf) files")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .num_args(1..)
                .required(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no_thumbnail")
                .long("no-thumbnail")
                .help("Omit thumbnail and plate image data from the report")
                .action(clap::ArgAction::SetTrue),
        )
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Files to parse, in the order given
    pub files: Vec<PathBuf>,

    /// Enable verbose logging
    pub verbose: bool,

    /// Leave image data out of the report
    pub no_thumbnail: bool,
}

impl Config {
    /// Parse arguments and apply initial configuration
    pub fn from_args() -> Result<Self> {
        let config = Self::from_matches(&build_cli().get_matches())?;

        // RUST_LOG takes precedence over the verbose flag
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(if config.verbose { "debug" } else { "warn" })
        });

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();

        if config.verbose {
            info!("Configuration: {:?}", config);
        }

        Ok(config)
    }

    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let files: Vec<PathBuf> = matches
            .get_many::<PathBuf>("files")
            .ok_or_else(|| anyhow!("At least one input file is required"))?
            .cloned()
            .collect();

        Ok(Config {
            files,
            verbose: matches.get_flag("verbose"),
            no_thumbnail: matches.get_flag("no_thumbnail"),
        })
    }
}
