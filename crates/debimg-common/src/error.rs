//! Unified error type for the debimg workspace.
//!
//! Every failure aborts the whole conversion, so a single enum is shared by
//! all crates. Each variant carries the context needed for a diagnostic, and
//! [`DebimgError::kind`] exposes the failure class to callers.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum DebimgError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value or input document is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An external tool could not be started or exited unsuccessfully.
    #[error("`{program}` failed: {message}")]
    Command {
        /// Program that was invoked.
        program: String,
        /// Exit status and captured diagnostics.
        message: String,
    },

    /// A package could not be retrieved or its metadata could not be read.
    #[error("failed to fetch package {package}: {message}")]
    Fetch {
        /// Name of the package being fetched.
        package: String,
        /// Description of the failure.
        message: String,
    },

    /// Copying an extracted tree into the root filesystem failed.
    #[error("failed to merge {path} into the root filesystem: {source}")]
    Filesystem {
        /// Path of the entry being merged.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A string could not be turned into a valid annotation identifier.
    #[error("invalid identifier \"{identifier}\": {reason}")]
    Identifier {
        /// The offending identifier.
        identifier: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Packing the assembled directory into an image failed.
    #[error("failed to pack image {output}: {message}")]
    Pack {
        /// Requested output path.
        output: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Failure class of a [`DebimgError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`DebimgError::Io`].
    Io,
    /// See [`DebimgError::Config`].
    Config,
    /// See [`DebimgError::Command`].
    Command,
    /// See [`DebimgError::Fetch`].
    Fetch,
    /// See [`DebimgError::Filesystem`].
    Filesystem,
    /// See [`DebimgError::Identifier`].
    Identifier,
    /// See [`DebimgError::Pack`].
    Pack,
    /// See [`DebimgError::Serialization`].
    Serialization,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Io => "io",
            Self::Config => "config",
            Self::Command => "command",
            Self::Fetch => "fetch",
            Self::Filesystem => "filesystem",
            Self::Identifier => "identifier",
            Self::Pack => "pack",
            Self::Serialization => "serialization",
        };
        f.write_str(name)
    }
}

impl DebimgError {
    /// Returns the failure class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::Config { .. } => ErrorKind::Config,
            Self::Command { .. } => ErrorKind::Command,
            Self::Fetch { .. } => ErrorKind::Fetch,
            Self::Filesystem { .. } => ErrorKind::Filesystem,
            Self::Identifier { .. } => ErrorKind::Identifier,
            Self::Pack { .. } => ErrorKind::Pack,
            Self::Serialization { .. } => ErrorKind::Serialization,
        }
    }

    /// Builds a [`DebimgError::Fetch`] for `package` from any displayable cause.
    pub fn fetch(package: impl fmt::Display, cause: impl fmt::Display) -> Self {
        Self::Fetch {
            package: package.to_string(),
            message: cause.to_string(),
        }
    }

    /// Builds a [`DebimgError::Pack`] for `output` from any displayable cause.
    pub fn pack(output: impl Into<PathBuf>, cause: impl fmt::Display) -> Self {
        Self::Pack {
            output: output.into(),
            message: cause.to_string(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DebimgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_names_the_package() {
        let err = DebimgError::fetch("libjbig0", "no archive downloaded");
        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert_eq!(
            err.to_string(),
            "failed to fetch package libjbig0: no archive downloaded"
        );
    }

    #[test]
    fn pack_error_names_the_output() {
        let err = DebimgError::pack("/tmp/out.aci", "actool exited with 1");
        assert_eq!(err.kind(), ErrorKind::Pack);
        assert!(err.to_string().contains("/tmp/out.aci"));
    }

    #[test]
    fn serde_errors_convert_into_serialization_kind() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DebimgError = source.into();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn kind_display_is_lowercase() {
        assert_eq!(ErrorKind::Filesystem.to_string(), "filesystem");
        assert_eq!(ErrorKind::Identifier.to_string(), "identifier");
    }
}
