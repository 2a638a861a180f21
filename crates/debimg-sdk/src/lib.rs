//! # debimg-sdk
//!
//! Library entry point for converting Debian packages into appc images.
//!
//! - [`ConverterBuilder`](builder::ConverterBuilder): Configures fetching and packing.
//! - [`Converter`](converter::Converter): Runs resolve, merge, annotate, and pack
//!   inside a temporary working directory.
//!
//! # Example
//!
//! ```rust,no_run
//! use debimg_common::config::ConvertConfig;
//! use debimg_common::types::PackageName;
//! use debimg_image::manifest::ImageManifest;
//! use debimg_sdk::builder::ConverterBuilder;
//!
//! # fn main() -> debimg_common::error::Result<()> {
//! let manifest = ImageManifest::load("manifest.json".as_ref())?;
//! let mut converter = ConverterBuilder::new(ConvertConfig::default()).build()?;
//! let report = converter.convert(
//!     &[PackageName::new("libtiff-tools")],
//!     manifest,
//!     "tiff-tools.aci".as_ref(),
//! )?;
//! assert_eq!(report.packages[0].as_str(), "libtiff-tools");
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod builder;
pub mod converter;
