//! `debimg resolve` — Print the dependency closure of packages.

use clap::Args;
use debimg_common::config::{ConvertConfig, PackerKind};
use debimg_common::types::PackageName;
use debimg_sdk::builder::ConverterBuilder;

use super::ConfigArgs;
use crate::output;

/// Arguments for the `resolve` subcommand.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Root package. Repeat for several packages.
    #[arg(short, long = "pkg", value_name = "NAME", required = true)]
    pub pkg: Vec<String>,

    /// Print the closure as JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Executes the `resolve` command.
///
/// # Errors
///
/// Returns an error if any package cannot be fetched.
pub fn execute(args: ResolveArgs) -> anyhow::Result<()> {
    // Nothing is packed, so the packer's tool is not required.
    let config = ConvertConfig {
        packer: PackerKind::Native,
        ..args.config.load()?
    };
    let roots: Vec<PackageName> = args.pkg.into_iter().map(PackageName::from).collect();

    let mut converter = ConverterBuilder::new(config).build()?;
    let closure = converter.resolve(&roots)?;

    if args.json {
        let packages: Vec<_> = closure.iter().collect();
        println!("{}", serde_json::to_string_pretty(&packages)?);
    } else {
        print!("{}", output::format_closure(&closure));
    }
    Ok(())
}
