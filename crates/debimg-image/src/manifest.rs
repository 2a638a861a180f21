//! appc image manifest handling.
//!
//! Only the fields this tool touches are modelled; everything else in the
//! caller's base manifest (`app`, `labels`, `dependencies`, ...) is carried
//! through verbatim in [`ImageManifest::extra`].

use std::path::Path;

use debimg_common::config::ConvertConfig;
use debimg_common::constants::IMAGE_MANIFEST_KIND;
use debimg_common::error::{DebimgError, Result};
use debimg_common::types::DependencyClosure;
use serde::{Deserialize, Serialize};

use crate::identifier::{AcIdentifier, package_identifier};

/// One `{name, value}` entry of the manifest's `annotations` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Namespaced identifier, e.g. `debian.org/deb/libjbig0`.
    pub name: AcIdentifier,
    /// Annotation value, e.g. `amd64/2.1-3.1`.
    pub value: String,
}

/// An appc image manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    /// Must be `ImageManifest`.
    pub ac_kind: String,
    /// Schema version the manifest targets.
    pub ac_version: String,
    /// Image name.
    pub name: AcIdentifier,
    /// Ordered annotations.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub annotations: Vec<Annotation>,
    /// All other manifest fields, preserved unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ImageManifest {
    /// Parses and validates a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, the image name or an
    /// annotation name is not a valid identifier, or the kind/version
    /// fields are wrong.
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(json)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Reads and validates a manifest file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid manifest.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "loading base manifest");
        let content = std::fs::read_to_string(path).map_err(|e| DebimgError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Serializes the manifest to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec(self)?;
        std::fs::write(path, json).map_err(|e| DebimgError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::info!(path = %path.display(), annotations = self.annotations.len(), "manifest written");
        Ok(())
    }

    /// Returns the value of the annotation called `name`, if present.
    #[must_use]
    pub fn annotation(&self, name: &str) -> Option<&str> {
        self.annotations
            .iter()
            .find(|a| a.name.as_str() == name)
            .map(|a| a.value.as_str())
    }

    /// Sets an annotation, replacing the value in place if `name` already
    /// exists and appending otherwise.
    pub fn set_annotation(&mut self, name: AcIdentifier, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self.annotations.iter_mut().find(|a| a.name == name) {
            existing.value = value;
        } else {
            self.annotations.push(Annotation { name, value });
        }
    }

    fn validate(&self) -> Result<()> {
        if self.ac_kind != IMAGE_MANIFEST_KIND {
            return Err(DebimgError::Config {
                message: format!(
                    "manifest acKind must be \"{IMAGE_MANIFEST_KIND}\", got \"{}\"",
                    self.ac_kind
                ),
            });
        }
        if self.ac_version.trim().is_empty() {
            return Err(DebimgError::Config {
                message: "manifest acVersion must not be empty".into(),
            });
        }
        Ok(())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Annotation>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Annotation>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Records every package of a closure as a manifest annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestAnnotator {
    namespace: String,
    kind: String,
}

impl ManifestAnnotator {
    /// Creates an annotator emitting `<namespace>/<kind>/<package>` names.
    #[must_use]
    pub fn new(namespace: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            kind: kind.into(),
        }
    }

    /// Creates an annotator from the configured namespace and kind.
    #[must_use]
    pub fn from_config(config: &ConvertConfig) -> Self {
        Self::new(&config.namespace, &config.kind)
    }

    /// Adds one `<architecture>/<version>` annotation per package, in
    /// closure order. Existing manifest content is left as it was.
    ///
    /// # Errors
    ///
    /// Returns `DebimgError::Identifier` if a package name cannot be
    /// turned into a valid identifier.
    pub fn annotate(
        &self,
        mut manifest: ImageManifest,
        closure: &DependencyClosure,
    ) -> Result<ImageManifest> {
        for package in closure {
            let name = package_identifier(&self.namespace, &self.kind, package.name.as_str())?;
            let value = format!("{}/{}", package.architecture, package.version);
            tracing::debug!(annotation = %name, %value, "annotating package");
            manifest.set_annotation(name, value);
        }
        Ok(manifest)
    }
}

impl Default for ManifestAnnotator {
    fn default() -> Self {
        Self::from_config(&ConvertConfig::default())
    }
}
