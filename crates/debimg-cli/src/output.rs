//! Formatted output helpers for CLI commands.
//!
//! Provides the conversion summary, the closure table, and
//! human-readable byte formatting.

use std::fmt::Write;

use debimg_common::types::{DependencyClosure, PackageName};
use debimg_sdk::converter::ConversionReport;

/// Formats a byte count into a human-readable string (e.g., "128 MiB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Summary printed after a successful conversion.
#[must_use]
pub fn format_report(report: &ConversionReport) -> String {
    let names: Vec<&str> = report.packages.iter().map(PackageName::as_str).collect();
    let mut out = String::new();
    let _ = writeln!(out, "Image:    {}", report.image.display());
    let _ = writeln!(out, "Packages: {} ({})", names.len(), names.join(", "));
    let _ = writeln!(out, "Entries:  {}", report.entries);
    let _ = writeln!(out, "Size:     {}", format_bytes(report.size_bytes));
    let _ = writeln!(out, "Digest:   {}", report.digest);
    out
}

/// One row per package, in discovery order.
#[must_use]
pub fn format_closure(closure: &DependencyClosure) -> String {
    let width = closure
        .iter()
        .map(|p| p.name.as_str().len())
        .max()
        .unwrap_or(0)
        .max("PACKAGE".len());

    let mut out = format!("{:<width$}  {:<20}  {:<8}  DEPENDS\n", "PACKAGE", "VERSION", "ARCH");
    for package in closure {
        let depends: Vec<&str> = package
            .dependencies
            .iter()
            .map(PackageName::as_str)
            .collect();
        let row = format!(
            "{:<width$}  {:<20}  {:<8}  {}",
            package.name.as_str(),
            package.version,
            package.architecture,
            depends.join(", ")
        );
        let _ = writeln!(out, "{}", row.trim_end());
    }
    out
}
