//! Parsing of Debian `Depends:` declarations.
//!
//! Only package names are extracted. Each comma-separated clause
//! contributes its first whitespace-delimited token, so version
//! constraints such as `(>= 2.14)` are dropped and, for alternatives
//! like `foo | bar`, the first-listed package is always chosen.

use debimg_common::types::PackageName;

/// Parses a dependency declaration into package names, in declaration order.
///
/// Never fails: empty or whitespace-only input yields no names, and
/// empty clauses (e.g. from a trailing comma) are skipped.
#[must_use]
pub fn parse_depends(declaration: &str) -> Vec<PackageName> {
    declaration
        .split(',')
        .filter_map(|clause| clause.split_whitespace().next())
        .map(PackageName::from)
        .collect()
}
