//! # debimg-resolve
//!
//! Computes the set of packages an image needs.
//!
//! Handles:
//! - **Depends**: Parsing raw `Depends:` declarations into package names.
//! - **Fetcher**: Retrieving a package and its control metadata by name.
//! - **Apt**: The `apt-get download` + `dpkg-deb` fetcher.
//! - **Resolver**: Depth-first transitive closure over a fetcher.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod apt;
pub mod depends;
pub mod fetcher;
pub mod resolver;
