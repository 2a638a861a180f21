//! appc identifiers (`ACIdentifier`).
//!
//! A valid identifier matches `^[a-z0-9]+([-._~/][a-z0-9]+)*$`: lowercase
//! alphanumeric runs joined by single separator characters.
//! [`sanitize`] maps arbitrary text onto that alphabet but cannot repair
//! every input; `libstdc++6`, for instance, sanitizes to `libstdc__6`,
//! which still has two adjacent separators and is rejected.

use std::fmt;

use debimg_common::error::{DebimgError, Result};
use serde::{Deserialize, Serialize};

const SEPARATORS: &[char] = &['-', '.', '_', '~', '/'];

/// A validated appc identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AcIdentifier(String);

impl AcIdentifier {
    /// Validates `value` as an identifier.
    ///
    /// # Errors
    ///
    /// Returns `DebimgError::Identifier` if `value` is not a valid identifier.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate(&value)?;
        Ok(Self(value))
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AcIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AcIdentifier {
    type Error = DebimgError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AcIdentifier> for String {
    fn from(id: AcIdentifier) -> Self {
        id.0
    }
}

const fn is_alnum(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

fn is_separator(c: char) -> bool {
    SEPARATORS.contains(&c)
}

fn validate(value: &str) -> Result<()> {
    let reject = |reason: &str| {
        Err(DebimgError::Identifier {
            identifier: value.to_string(),
            reason: reason.to_string(),
        })
    };

    if value.is_empty() {
        return reject("identifier cannot be empty");
    }
    let mut previous_was_separator = true;
    for c in value.chars() {
        if is_alnum(c) {
            previous_was_separator = false;
        } else if is_separator(c) {
            if previous_was_separator {
                return reject(
                    "separators must be surrounded by lowercase letters or digits",
                );
            }
            previous_was_separator = true;
        } else {
            return reject("only lowercase letters, digits, and -._~/ are allowed");
        }
    }
    if previous_was_separator {
        return reject("separators must be surrounded by lowercase letters or digits");
    }
    Ok(())
}

/// Lowercases `value`, replaces disallowed characters with `_`, and strips
/// leading and trailing separators.
///
/// The result is not guaranteed to be valid; pass it to
/// [`AcIdentifier::new`].
///
/// # Errors
///
/// Returns `DebimgError::Identifier` if nothing usable remains.
pub fn sanitize(value: &str) -> Result<String> {
    let replaced: String = value
        .to_lowercase()
        .chars()
        .map(|c| if is_alnum(c) || is_separator(c) { c } else { '_' })
        .collect();
    let trimmed = replaced.trim_matches(SEPARATORS);
    if trimmed.is_empty() {
        return Err(DebimgError::Identifier {
            identifier: value.to_string(),
            reason: "must contain at least one valid character".into(),
        });
    }
    Ok(trimmed.to_string())
}

/// Builds the annotation identifier `<namespace>/<kind>/<name>` for a package.
///
/// # Errors
///
/// Returns `DebimgError::Identifier` if the result cannot be made valid.
pub fn package_identifier(namespace: &str, kind: &str, name: &str) -> Result<AcIdentifier> {
    let raw = format!("{namespace}/{kind}/{name}");
    AcIdentifier::new(sanitize(&raw)?)
}
