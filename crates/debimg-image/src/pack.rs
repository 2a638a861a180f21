//! Image packing.
//!
//! An image directory holds a `manifest` file and a `rootfs/` tree. A
//! packer turns that directory into a single image file. The default
//! delegates to `actool build`; [`ArchivePacker`] writes the gzip tarball
//! directly.

use std::fs::File;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use debimg_common::config::{ConvertConfig, PackerKind};
use debimg_common::constants::{DEFAULT_ACTOOL, MANIFEST_FILE, ROOTFS_DIR};
use debimg_common::error::{DebimgError, Result};
use debimg_common::process::ToolCommand;
use flate2::Compression;
use flate2::write::GzEncoder;
use walkdir::WalkDir;

/// Mode of images written by [`ArchivePacker`]; temporary files start out owner-only.
const IMAGE_MODE: u32 = 0o644;

/// Produces an image file from an image directory.
pub trait ImagePacker {
    /// Packs `image_dir` into `output`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns `DebimgError::Pack` if the image cannot be produced.
    fn pack(&self, image_dir: &Path, output: &Path) -> Result<()>;
}

impl<P: ImagePacker + ?Sized> ImagePacker for Box<P> {
    fn pack(&self, image_dir: &Path, output: &Path) -> Result<()> {
        (**self).pack(image_dir, output)
    }
}

/// Returns the packer selected by `config`.
#[must_use]
pub fn packer_for(config: &ConvertConfig) -> Box<dyn ImagePacker> {
    match config.packer {
        PackerKind::Actool => Box::new(ActoolPacker::new(&config.tools.actool)),
        PackerKind::Native => Box::new(ArchivePacker::new()),
    }
}

/// Packs by running `actool build -overwrite <dir> <output>`.
#[derive(Debug, Clone)]
pub struct ActoolPacker {
    program: PathBuf,
}

impl ActoolPacker {
    /// Uses the given `actool` executable.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for ActoolPacker {
    fn default() -> Self {
        Self::new(DEFAULT_ACTOOL)
    }
}

impl ImagePacker for ActoolPacker {
    fn pack(&self, image_dir: &Path, output: &Path) -> Result<()> {
        tracing::info!(
            tool = %self.program.display(),
            image_dir = %image_dir.display(),
            output = %output.display(),
            "building image"
        );
        ToolCommand::new(&self.program)
            .arg("build")
            .arg("-overwrite")
            .arg(image_dir)
            .arg(output)
            .stream()
            .map_err(|e| DebimgError::pack(output, e))
    }
}

/// Writes the image as a gzip-compressed tarball without external tools.
///
/// The archive holds `manifest` first, then every entry of `rootfs/` in
/// file-name order. Symlinks are stored as links. The archive is written
/// to a temporary file next to `output` and renamed into place once
/// complete.
#[derive(Debug, Clone, Copy)]
pub struct ArchivePacker {
    compression: Compression,
}

impl ArchivePacker {
    /// Creates a packer using the default gzip level.
    #[must_use]
    pub fn new() -> Self {
        Self {
            compression: Compression::default(),
        }
    }

    /// Sets the gzip level (0-9).
    #[must_use]
    pub fn with_level(level: u32) -> Self {
        Self {
            compression: Compression::new(level.min(9)),
        }
    }

    fn write_archive(&self, image_dir: &Path, file: &File) -> std::io::Result<()> {
        let encoder = GzEncoder::new(file, self.compression);
        let mut builder = tar::Builder::new(encoder);
        builder.follow_symlinks(false);

        builder.append_path_with_name(image_dir.join(MANIFEST_FILE), MANIFEST_FILE)?;

        let rootfs = image_dir.join(ROOTFS_DIR);
        for entry in WalkDir::new(&rootfs).follow_links(false).sort_by_file_name() {
            let entry = entry?;
            let Ok(relative) = entry.path().strip_prefix(&rootfs) else {
                continue;
            };
            let file_type = entry.file_type();
            if !(file_type.is_dir() || file_type.is_file() || file_type.is_symlink()) {
                tracing::warn!(path = %entry.path().display(), "not packing special file");
                continue;
            }
            builder.append_path_with_name(entry.path(), Path::new(ROOTFS_DIR).join(relative))?;
        }

        let _ = builder.into_inner()?.finish()?;
        Ok(())
    }
}

impl Default for ArchivePacker {
    fn default() -> Self {
        Self::new()
    }
}

impl ImagePacker for ArchivePacker {
    fn pack(&self, image_dir: &Path, output: &Path) -> Result<()> {
        tracing::info!(
            image_dir = %image_dir.display(),
            output = %output.display(),
            "writing image archive"
        );
        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let temp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| DebimgError::pack(output, e))?;

        self.write_archive(image_dir, temp.as_file())
            .map_err(|e| DebimgError::pack(output, e))?;
        let file = temp.as_file();
        file.set_permissions(std::fs::Permissions::from_mode(IMAGE_MODE))
            .and_then(|()| file.sync_all())
            .map_err(|e| DebimgError::pack(output, e))?;
        let _ = temp
            .persist(output)
            .map_err(|e| DebimgError::pack(output, e.error))?;
        Ok(())
    }
}
