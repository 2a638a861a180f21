//! Domain primitive types used across the debimg workspace.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name of a package as used by the source repository.
///
/// Carries no version information. Two requests for the same name are
/// the same package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageName(String);

impl PackageName {
    /// Creates a package name from a string value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PackageName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A fetched package, immutable once it enters a [`DependencyClosure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPackage {
    /// Repository name of the package.
    pub name: PackageName,
    /// Version from the package's control metadata.
    pub version: String,
    /// Architecture from the package's control metadata.
    pub architecture: String,
    /// Directory holding the extracted file tree.
    pub root: PathBuf,
    /// Names parsed from the package's dependency declaration.
    pub dependencies: Vec<PackageName>,
}

/// The transitive set of packages required by one or more roots.
///
/// Keys are unique and iteration follows discovery order, which makes the
/// merge order, and therefore the assembled root filesystem, reproducible.
#[derive(Debug, Clone, Default)]
pub struct DependencyClosure {
    packages: Vec<ResolvedPackage>,
    index: HashMap<PackageName, usize>,
}

impl DependencyClosure {
    /// Creates an empty closure.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a package unless one with the same name is already present.
    ///
    /// Returns `false` and keeps the existing entry on a duplicate name.
    pub fn insert(&mut self, package: ResolvedPackage) -> bool {
        if self.index.contains_key(&package.name) {
            return false;
        }
        let _ = self
            .index
            .insert(package.name.clone(), self.packages.len());
        self.packages.push(package);
        true
    }

    /// Returns whether a package with this name is in the closure.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Looks up a package by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResolvedPackage> {
        self.index.get(name).map(|&i| &self.packages[i])
    }

    /// Iterates over packages in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedPackage> {
        self.packages.iter()
    }

    /// Number of packages in the closure.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Returns `true` if the closure holds no packages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl<'a> IntoIterator for &'a DependencyClosure {
    type Item = &'a ResolvedPackage;
    type IntoIter = std::slice::Iter<'a, ResolvedPackage>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// SHA-256 hash digest used to identify a produced image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Creates a hash from a hex-encoded string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid 64-character hex string.
    pub fn from_hex(hex: impl Into<String>) -> crate::error::Result<Self> {
        let hex = hex.into();
        if hex.len() != crate::constants::SHA256_HEX_LENGTH
            || !hex.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(crate::error::DebimgError::Config {
                message: format!("invalid SHA-256 hex string: {hex}"),
            });
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// Returns the hex-encoded hash string.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}
