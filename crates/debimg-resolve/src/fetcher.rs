//! Package retrieval seam.
//!
//! The resolver only needs a package's control metadata and the location
//! of its extracted tree; how the archive is obtained is up to the
//! [`PackageFetcher`] implementation.

use std::path::{Path, PathBuf};

use debimg_common::error::Result;
use debimg_common::types::PackageName;

/// Control metadata and extracted tree of one fetched package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPackage {
    /// `Version:` control field.
    pub version: String,
    /// `Architecture:` control field.
    pub architecture: String,
    /// Raw `Depends:` control field; empty when the package has none.
    pub depends: String,
    /// Directory holding the extracted file tree.
    pub root: PathBuf,
}

/// Retrieves packages by name.
pub trait PackageFetcher {
    /// Fetches `name`, placing any files it produces under `work_dir`.
    ///
    /// Exactly one archive must match the name.
    ///
    /// # Errors
    ///
    /// Returns `DebimgError::Fetch` if the package cannot be retrieved,
    /// its metadata cannot be read, or zero or several archives match.
    fn fetch(&mut self, name: &PackageName, work_dir: &Path) -> Result<FetchedPackage>;
}

impl<F: PackageFetcher + ?Sized> PackageFetcher for &mut F {
    fn fetch(&mut self, name: &PackageName, work_dir: &Path) -> Result<FetchedPackage> {
        (**self).fetch(name, work_dir)
    }
}

impl<F: PackageFetcher + ?Sized> PackageFetcher for Box<F> {
    fn fetch(&mut self, name: &PackageName, work_dir: &Path) -> Result<FetchedPackage> {
        (**self).fetch(name, work_dir)
    }
}
