//! The conversion pipeline.
//!
//! A conversion runs inside a fresh working directory created under
//! `config.work_root`:
//!
//! ```text
//! <work>/packages/<name>/...   fetched archives and extracted trees
//! <work>/image/manifest        annotated manifest
//! <work>/image/rootfs/...      merged root filesystem
//! ```
//!
//! The directory is removed when the conversion ends, whether it
//! succeeded or not.

use std::path::{Path, PathBuf};

use debimg_common::config::ConvertConfig;
use debimg_common::constants::{APP_NAME, IMAGE_DIR, MANIFEST_FILE, ROOTFS_DIR};
use debimg_common::error::{DebimgError, Result};
use debimg_common::types::{DependencyClosure, PackageName, Sha256Hash};
use debimg_image::assemble::merge_closure;
use debimg_image::hash::hash_file;
use debimg_image::manifest::{ImageManifest, ManifestAnnotator};
use debimg_image::pack::ImagePacker;
use debimg_resolve::fetcher::PackageFetcher;
use debimg_resolve::resolver::DependencyResolver;
use tempfile::TempDir;

/// Summary of a finished conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    /// Absolute path of the image written.
    pub image: PathBuf,
    /// Packages in the closure, in merge order.
    pub packages: Vec<PackageName>,
    /// Entries merged into the root filesystem, duplicates included.
    pub entries: usize,
    /// Size of the image file in bytes.
    pub size_bytes: u64,
    /// SHA-256 digest of the image file.
    pub digest: Sha256Hash,
}

/// Converts packages into an image. Created by
/// [`ConverterBuilder`](crate::builder::ConverterBuilder).
pub struct Converter {
    config: ConvertConfig,
    fetcher: Box<dyn PackageFetcher>,
    packer: Box<dyn ImagePacker>,
}

impl Converter {
    pub(crate) fn new(
        config: ConvertConfig,
        fetcher: Box<dyn PackageFetcher>,
        packer: Box<dyn ImagePacker>,
    ) -> Self {
        Self {
            config,
            fetcher,
            packer,
        }
    }

    /// Builds an image at `output` from `roots` and their dependencies,
    /// annotating `manifest` with every package included.
    ///
    /// Nothing is written to `output` unless every step succeeds.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by fetching, merging, annotating,
    /// or packing.
    pub fn convert(
        &mut self,
        roots: &[PackageName],
        manifest: ImageManifest,
        output: &Path,
    ) -> Result<ConversionReport> {
        require_roots(roots)?;
        let output = std::path::absolute(output).map_err(|e| DebimgError::Io {
            path: output.to_path_buf(),
            source: e,
        })?;

        let work = self.create_work_dir()?;
        let result = self.run(roots, manifest, &output, work.path());
        remove_work_dir(work);

        if let Ok(report) = &result {
            tracing::info!(
                image = %report.image.display(),
                packages = report.packages.len(),
                digest = %report.digest,
                "conversion complete"
            );
        }
        result
    }

    /// Resolves the dependency closure of `roots` without building an image.
    ///
    /// Packages are fetched into a temporary working directory that is
    /// removed before returning, so the `root` paths of the returned
    /// packages no longer exist.
    ///
    /// # Errors
    ///
    /// Returns `DebimgError::Fetch` if any package cannot be fetched.
    pub fn resolve(&mut self, roots: &[PackageName]) -> Result<DependencyClosure> {
        require_roots(roots)?;
        let work = self.create_work_dir()?;
        let result = DependencyResolver::new(&mut self.fetcher, work.path()).resolve(roots);
        remove_work_dir(work);
        result
    }

    fn run(
        &mut self,
        roots: &[PackageName],
        manifest: ImageManifest,
        output: &Path,
        work_dir: &Path,
    ) -> Result<ConversionReport> {
        let closure = DependencyResolver::new(&mut self.fetcher, work_dir).resolve(roots)?;

        let image_dir = work_dir.join(IMAGE_DIR);
        let stats = merge_closure(&closure, &image_dir.join(ROOTFS_DIR))?;

        let manifest = ManifestAnnotator::from_config(&self.config).annotate(manifest, &closure)?;
        manifest.save(&image_dir.join(MANIFEST_FILE))?;

        self.packer.pack(&image_dir, output)?;

        let size_bytes = std::fs::metadata(output)
            .map_err(|e| DebimgError::Io {
                path: output.to_path_buf(),
                source: e,
            })?
            .len();
        let digest = hash_file(output)?;

        Ok(ConversionReport {
            image: output.to_path_buf(),
            packages: closure.iter().map(|p| p.name.clone()).collect(),
            entries: stats.entries,
            size_bytes,
            digest,
        })
    }

    fn create_work_dir(&self) -> Result<TempDir> {
        let root = &self.config.work_root;
        let io_err = |e: std::io::Error| DebimgError::Io {
            path: root.clone(),
            source: e,
        };
        std::fs::create_dir_all(root).map_err(io_err)?;
        let work = tempfile::Builder::new()
            .prefix(&format!("{APP_NAME}-"))
            .tempdir_in(root)
            .map_err(io_err)?;
        tracing::debug!(work_dir = %work.path().display(), "working directory created");
        Ok(work)
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn require_roots(roots: &[PackageName]) -> Result<()> {
    if roots.is_empty() {
        return Err(DebimgError::Config {
            message: "at least one package is required".into(),
        });
    }
    Ok(())
}

fn remove_work_dir(work: TempDir) {
    let path = work.path().to_path_buf();
    match work.close() {
        Ok(()) => tracing::debug!(work_dir = %path.display(), "working directory removed"),
        Err(e) => tracing::warn!(
            work_dir = %path.display(),
            error = %e,
            "failed to remove working directory"
        ),
    }
}
