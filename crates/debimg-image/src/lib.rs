//! # debimg-image
//!
//! Turns a resolved dependency closure into a container image.
//!
//! Handles:
//! - **Assemble**: Merging every package's extracted tree into one root filesystem.
//! - **Identifier**: appc identifier sanitizing and validation.
//! - **Manifest**: Loading, annotating, and saving the image manifest.
//! - **Pack**: Producing the image file, via `actool` or in-process.
//! - **Hashing**: SHA-256 digests of produced images.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod assemble;
pub mod hash;
pub mod identifier;
pub mod manifest;
pub mod pack;
