//! Package fetcher backed by `apt-get download` and `dpkg-deb`.
//!
//! Each package gets its own directory under `<work>/packages/<name>/`.
//! The archive is downloaded there, unpacked into `root/`, and its
//! `Architecture`, `Version`, and `Depends` control fields are read back
//! with `dpkg-deb -f`.

use std::path::{Path, PathBuf};

use debimg_common::config::ToolPaths;
use debimg_common::constants::{DEB_EXTENSION, EXTRACTED_DIR, PACKAGES_DIR};
use debimg_common::error::{DebimgError, Result};
use debimg_common::process::ToolCommand;
use debimg_common::types::PackageName;

use crate::fetcher::{FetchedPackage, PackageFetcher};

/// Fetches packages from the host's configured APT sources.
#[derive(Debug, Clone)]
pub struct AptFetcher {
    apt_get: PathBuf,
    dpkg_deb: PathBuf,
}

impl AptFetcher {
    /// Creates a fetcher using the given tool executables.
    #[must_use]
    pub fn new(apt_get: impl Into<PathBuf>, dpkg_deb: impl Into<PathBuf>) -> Self {
        Self {
            apt_get: apt_get.into(),
            dpkg_deb: dpkg_deb.into(),
        }
    }

    /// Creates a fetcher from configured tool paths.
    #[must_use]
    pub fn from_tools(tools: &ToolPaths) -> Self {
        Self::new(&tools.apt_get, &tools.dpkg_deb)
    }

    fn control_field(&self, name: &PackageName, archive: &Path, field: &str) -> Result<String> {
        ToolCommand::new(&self.dpkg_deb)
            .arg("-f")
            .arg(archive)
            .arg(field)
            .capture()
            .map_err(|e| DebimgError::fetch(name, e))
    }

    fn required_field(&self, name: &PackageName, archive: &Path, field: &str) -> Result<String> {
        let value = self.control_field(name, archive, field)?;
        if value.is_empty() {
            return Err(DebimgError::fetch(
                name,
                format!("control field {field} is missing from {}", archive.display()),
            ));
        }
        Ok(value)
    }
}

impl Default for AptFetcher {
    fn default() -> Self {
        Self::from_tools(&ToolPaths::default())
    }
}

impl PackageFetcher for AptFetcher {
    fn fetch(&mut self, name: &PackageName, work_dir: &Path) -> Result<FetchedPackage> {
        check_package_name(name)?;

        let packages_dir = work_dir.join(PACKAGES_DIR);
        std::fs::create_dir_all(&packages_dir).map_err(|e| DebimgError::Io {
            path: packages_dir.clone(),
            source: e,
        })?;
        let package_dir = packages_dir.join(name.as_str());
        std::fs::create_dir(&package_dir).map_err(|e| DebimgError::Io {
            path: package_dir.clone(),
            source: e,
        })?;

        tracing::info!(package = %name, dir = %package_dir.display(), "downloading package");
        ToolCommand::new(&self.apt_get)
            .arg("download")
            .arg(name.as_str())
            .current_dir(&package_dir)
            .stream()
            .map_err(|e| DebimgError::fetch(name, e))?;

        let archive = single_archive(name, &package_dir)?;
        let root = package_dir.join(EXTRACTED_DIR);
        tracing::info!(archive = %archive.display(), root = %root.display(), "unpacking archive");
        ToolCommand::new(&self.dpkg_deb)
            .arg("-x")
            .arg(&archive)
            .arg(&root)
            .stream()
            .map_err(|e| DebimgError::fetch(name, e))?;

        let architecture = self.required_field(name, &archive, "Architecture")?;
        let version = self.required_field(name, &archive, "Version")?;
        let depends = self.control_field(name, &archive, "Depends")?;
        tracing::debug!(package = %name, %version, %architecture, %depends, "read control fields");

        Ok(FetchedPackage {
            version,
            architecture,
            depends,
            root,
        })
    }
}

/// Lists the `.deb` archives directly inside `dir`, sorted by path.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn find_archives(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| DebimgError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut archives = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| DebimgError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?
            .path();
        let is_deb = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(DEB_EXTENSION));
        if is_deb && path.is_file() {
            archives.push(path);
        }
    }
    archives.sort();
    Ok(archives)
}

fn single_archive(name: &PackageName, dir: &Path) -> Result<PathBuf> {
    let mut archives = find_archives(dir).map_err(|e| DebimgError::fetch(name, e))?;
    match archives.len() {
        1 => Ok(archives.remove(0)),
        0 => Err(DebimgError::fetch(
            name,
            format!("no .deb archive was downloaded into {}", dir.display()),
        )),
        n => Err(DebimgError::fetch(
            name,
            format!(
                "expected exactly one .deb archive, found {n}: {:?}",
                archives
                    .iter()
                    .filter_map(|p| p.file_name())
                    .collect::<Vec<_>>()
            ),
        )),
    }
}

/// Package names become directory names, so they must be a single path component.
fn check_package_name(name: &PackageName) -> Result<()> {
    let s = name.as_str();
    if s.is_empty() || s == "." || s == ".." || s.contains('/') || s.contains('\0') {
        return Err(DebimgError::fetch(name, "not a valid package name"));
    }
    Ok(())
}
