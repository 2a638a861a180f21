//! Configuration model for a conversion run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{DebimgError, Result};

/// Strategy used to turn the assembled directory into an image file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackerKind {
    /// Invoke `actool build`.
    #[default]
    Actool,
    /// Write the gzip-compressed tar in-process.
    Native,
}

impl fmt::Display for PackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Actool => write!(f, "actool"),
            Self::Native => write!(f, "native"),
        }
    }
}

impl FromStr for PackerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "actool" => Ok(Self::Actool),
            "native" => Ok(Self::Native),
            other => Err(format!(
                "unknown packer \"{other}\" (expected \"actool\" or \"native\")"
            )),
        }
    }
}

/// Paths of the external tools invoked during a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    /// Downloads package archives.
    pub apt_get: PathBuf,
    /// Unpacks archives and reads control fields.
    pub dpkg_deb: PathBuf,
    /// Builds the image when [`PackerKind::Actool`] is selected.
    pub actool: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            apt_get: PathBuf::from(constants::DEFAULT_APT_GET),
            dpkg_deb: PathBuf::from(constants::DEFAULT_DPKG_DEB),
            actool: PathBuf::from(constants::DEFAULT_ACTOOL),
        }
    }
}

/// Root configuration for a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Parent directory of the temporary working directory.
    pub work_root: PathBuf,
    /// Namespace prefix of package annotation names.
    pub namespace: String,
    /// Kind segment of package annotation names.
    pub kind: String,
    /// How the final image is produced.
    pub packer: PackerKind,
    /// External tool locations.
    pub tools: ToolPaths,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir(),
            namespace: constants::DEFAULT_NAMESPACE.to_string(),
            kind: constants::DEFAULT_KIND.to_string(),
            packer: PackerKind::default(),
            tools: ToolPaths::default(),
        }
    }
}

impl ConvertConfig {
    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON,
    /// or if the identifier segments are empty.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| DebimgError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the identifier segments are usable.
    ///
    /// # Errors
    ///
    /// Returns `DebimgError::Config` if `namespace` or `kind` is empty.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(DebimgError::Config {
                message: "namespace must not be empty".into(),
            });
        }
        if self.kind.trim().is_empty() {
            return Err(DebimgError::Config {
                message: "kind must not be empty".into(),
            });
        }
        Ok(())
    }
}
