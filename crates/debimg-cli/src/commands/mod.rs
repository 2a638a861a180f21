//! CLI command definitions and dispatch.

pub mod convert;
pub mod resolve;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use debimg_common::config::{ConvertConfig, PackerKind};
use debimg_common::constants::BIN_NAME;

/// debimg — Convert Debian packages into appc container images.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build an image from packages and a base manifest.
    Convert(convert::ConvertArgs),
    /// Print the dependency closure of packages without building an image.
    Resolve(resolve::ResolveArgs),
}

/// Configuration flags shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// JSON configuration file.
    #[arg(long, value_name = "FILE", env = "DEBIMG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory under which the temporary working directory is created.
    #[arg(long, value_name = "DIR")]
    pub work_root: Option<PathBuf>,

    /// How the image file is produced (`actool` or `native`).
    #[arg(long, value_name = "KIND")]
    pub packer: Option<PackerKind>,
}

impl ConfigArgs {
    /// Loads the configuration file, if any, and applies flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the result is invalid.
    pub fn load(&self) -> anyhow::Result<ConvertConfig> {
        let mut config = match &self.config {
            Some(path) => ConvertConfig::load(path)
                .with_context(|| format!("loading configuration {}", path.display()))?,
            None => ConvertConfig::default(),
        };
        if let Some(work_root) = &self.work_root {
            config.work_root.clone_from(work_root);
        }
        if let Some(packer) = self.packer {
            config.packer = packer;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Convert(args) => convert::execute(args),
        Command::Resolve(args) => resolve::execute(args),
    }
}
