//! System-wide constants and default names.

/// Application name used in log output and working-directory prefixes.
pub const APP_NAME: &str = "debimg";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "debimg";

/// Namespace prefix of package annotation names.
pub const DEFAULT_NAMESPACE: &str = "debian.org";

/// Kind segment of package annotation names.
pub const DEFAULT_KIND: &str = "deb";

/// Default `apt-get` executable used to download archives.
pub const DEFAULT_APT_GET: &str = "apt-get";

/// Default `dpkg-deb` executable used to unpack archives and read control fields.
pub const DEFAULT_DPKG_DEB: &str = "dpkg-deb";

/// Default `actool` executable used to pack the image.
pub const DEFAULT_ACTOOL: &str = "actool";

/// Directory under the working directory holding one subdirectory per package.
pub const PACKAGES_DIR: &str = "packages";

/// Directory under a package directory holding its extracted tree.
pub const EXTRACTED_DIR: &str = "root";

/// Directory under the working directory holding the assembled image.
pub const IMAGE_DIR: &str = "image";

/// Root filesystem directory inside the assembled image.
pub const ROOTFS_DIR: &str = "rootfs";

/// Manifest file name inside the assembled image.
pub const MANIFEST_FILE: &str = "manifest";

/// File extension of Debian binary package archives.
pub const DEB_EXTENSION: &str = "deb";

/// Expected `acKind` of an image manifest.
pub const IMAGE_MANIFEST_KIND: &str = "ImageManifest";

/// SHA-256 digest length in hex characters.
pub const SHA256_HEX_LENGTH: usize = 64;
