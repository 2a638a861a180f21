//! `debimg convert` — Build an image from packages and a base manifest.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use debimg_common::types::PackageName;
use debimg_image::manifest::ImageManifest;
use debimg_sdk::builder::ConverterBuilder;

use super::ConfigArgs;
use crate::output;

/// Arguments for the `convert` subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Package to install into the image. Repeat for several packages.
    #[arg(short, long = "pkg", value_name = "NAME", required = true)]
    pub pkg: Vec<String>,

    /// Path of the image file to write.
    #[arg(long, value_name = "PATH")]
    pub image: PathBuf,

    /// Base image manifest (JSON) to annotate.
    #[arg(long, value_name = "PATH")]
    pub manifest: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Executes the `convert` command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read or any conversion step fails.
pub fn execute(args: ConvertArgs) -> anyhow::Result<()> {
    let config = args.config.load()?;
    let manifest = ImageManifest::load(&args.manifest)
        .with_context(|| format!("reading manifest {}", args.manifest.display()))?;
    let roots: Vec<PackageName> = args.pkg.into_iter().map(PackageName::from).collect();

    tracing::info!(
        packages = ?roots.iter().map(PackageName::as_str).collect::<Vec<_>>(),
        image = %args.image.display(),
        "converting packages"
    );

    let mut converter = ConverterBuilder::new(config).build()?;
    let report = converter
        .convert(&roots, manifest, &args.image)
        .context("conversion failed")?;

    print!("{}", output::format_report(&report));
    Ok(())
}
