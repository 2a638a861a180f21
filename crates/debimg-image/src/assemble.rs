//! Root filesystem assembly.
//!
//! Every package's extracted tree is copied into one target directory, in
//! closure order. Regular files, directories, and symlinks are recreated
//! with their permission bits, modification times, and (when the process
//! is allowed to) ownership. When two packages ship the same path the
//! later one silently replaces the earlier one.
//!
//! A failure aborts the merge immediately and leaves whatever was already
//! copied in place; the caller owns the target and discards it.

use std::fs::{self, File, Metadata};
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use debimg_common::error::{DebimgError, Result};
use debimg_common::types::DependencyClosure;
use walkdir::WalkDir;

/// Counters reported after a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Packages merged.
    pub packages: usize,
    /// Files, directories, and symlinks written, duplicates included.
    pub entries: usize,
}

/// Merges the tree of every package in `closure` into `target`.
///
/// # Errors
///
/// Returns `DebimgError::Filesystem` on the first entry that cannot be copied.
pub fn merge_closure(closure: &DependencyClosure, target: &Path) -> Result<MergeStats> {
    fs::create_dir_all(target).map_err(|e| fs_err(target, e))?;

    let mut stats = MergeStats::default();
    for package in closure {
        tracing::info!(
            package = %package.name,
            source = %package.root.display(),
            "merging package tree"
        );
        stats.entries += merge_tree(&package.root, target)?;
        stats.packages += 1;
    }

    tracing::info!(
        packages = stats.packages,
        entries = stats.entries,
        target = %target.display(),
        "root filesystem assembled"
    );
    Ok(stats)
}

/// Copies the contents of `source` into the existing directory `target`.
///
/// Returns the number of entries written.
///
/// # Errors
///
/// Returns `DebimgError::Filesystem` on the first entry that cannot be copied.
pub fn merge_tree(source: &Path, target: &Path) -> Result<usize> {
    let root = fs::canonicalize(target).map_err(|e| fs_err(target, e))?;
    let mut directories: Vec<(PathBuf, Metadata)> = Vec::new();
    let mut entries = 0;

    let walker = WalkDir::new(source)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1);
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| source.to_path_buf(), Path::to_path_buf);
            fs_err(&path, e.into())
        })?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let dest = target.join(relative);
        let metadata = entry
            .metadata()
            .map_err(|e| fs_err(entry.path(), e.into()))?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if merge_dir(&root, &dest)? {
                directories.push((dest, metadata));
            }
        } else if file_type.is_symlink() {
            merge_symlink(entry.path(), &dest)?;
            preserve_owner(&dest, &metadata)?;
        } else if file_type.is_file() {
            merge_file(entry.path(), &dest, &metadata)?;
        } else {
            tracing::warn!(path = %entry.path().display(), "skipping special file");
            continue;
        }
        entries += 1;
    }

    // Deepest first, so a read-only directory is only locked after its children are written.
    for (dir, metadata) in directories.iter().rev() {
        apply_dir_attributes(dir, metadata)?;
    }
    Ok(entries)
}

/// Ensures `dest` is a directory. Returns `true` if it is a real directory
/// whose attributes should be set, `false` if it is a symlink to one.
fn merge_dir(root: &Path, dest: &Path) -> Result<bool> {
    match fs::symlink_metadata(dest) {
        Ok(m) if m.is_dir() => Ok(true),
        Ok(m) if m.file_type().is_symlink() => {
            let resolved = fs::canonicalize(dest).map_err(|e| fs_err(dest, e))?;
            if resolved.starts_with(root) && resolved.is_dir() {
                Ok(false)
            } else {
                Err(fs_err(
                    dest,
                    io::Error::other(format!(
                        "symlink resolves to {}, outside the root filesystem or not a directory",
                        resolved.display()
                    )),
                ))
            }
        }
        Ok(_) => Err(fs_err(
            dest,
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                "cannot replace a non-directory with a directory",
            ),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir(dest).map_err(|e| fs_err(dest, e))?;
            Ok(true)
        }
        Err(e) => Err(fs_err(dest, e)),
    }
}

fn merge_file(source: &Path, dest: &Path, metadata: &Metadata) -> Result<()> {
    remove_non_dir(dest)?;

    let mut input = File::open(source).map_err(|e| fs_err(source, e))?;
    let mut output = File::options()
        .write(true)
        .create_new(true)
        .open(dest)
        .map_err(|e| fs_err(dest, e))?;
    let _ = io::copy(&mut input, &mut output).map_err(|e| fs_err(dest, e))?;
    if let Ok(modified) = metadata.modified() {
        output.set_modified(modified).map_err(|e| fs_err(dest, e))?;
    }
    drop(output);

    // chown clears setuid/setgid, so ownership goes first.
    preserve_owner(dest, metadata)?;
    fs::set_permissions(dest, metadata.permissions()).map_err(|e| fs_err(dest, e))
}

fn merge_symlink(source: &Path, dest: &Path) -> Result<()> {
    remove_non_dir(dest)?;
    let link = fs::read_link(source).map_err(|e| fs_err(source, e))?;
    std::os::unix::fs::symlink(&link, dest).map_err(|e| fs_err(dest, e))
}

fn apply_dir_attributes(dir: &Path, metadata: &Metadata) -> Result<()> {
    preserve_owner(dir, metadata)?;
    fs::set_permissions(dir, metadata.permissions()).map_err(|e| fs_err(dir, e))?;
    if let Ok(modified) = metadata.modified() {
        File::open(dir)
            .and_then(|handle| handle.set_modified(modified))
            .map_err(|e| fs_err(dir, e))?;
    }
    Ok(())
}

/// Removes a file or symlink at `dest` so it can be replaced; a directory
/// cannot be replaced by a non-directory.
fn remove_non_dir(dest: &Path) -> Result<()> {
    match fs::symlink_metadata(dest) {
        Ok(m) if m.is_dir() => Err(fs_err(
            dest,
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                "cannot replace a directory with a non-directory",
            ),
        )),
        Ok(_) => fs::remove_file(dest).map_err(|e| fs_err(dest, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(fs_err(dest, e)),
    }
}

/// Unprivileged runs cannot chown; that is not an error.
fn preserve_owner(dest: &Path, metadata: &Metadata) -> Result<()> {
    match std::os::unix::fs::lchown(dest, Some(metadata.uid()), Some(metadata.gid())) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            tracing::trace!(path = %dest.display(), "ownership not preserved");
            Ok(())
        }
        Err(e) => Err(fs_err(dest, e)),
    }
}

fn fs_err(path: &Path, source: io::Error) -> DebimgError {
    DebimgError::Filesystem {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::time::{Duration, SystemTime};

    use debimg_common::error::ErrorKind;
    use debimg_common::types::{PackageName, ResolvedPackage};

    use super::*;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
        fs::write(path, content).expect("write");
    }

    fn closure_of<P: AsRef<Path>>(roots: &[(&str, P)]) -> DependencyClosure {
        let mut closure = DependencyClosure::new();
        for (name, root) in roots {
            let _ = closure.insert(ResolvedPackage {
                name: PackageName::new(*name),
                version: "1.0".into(),
                architecture: "amd64".into(),
                root: root.as_ref().to_path_buf(),
                dependencies: Vec::new(),
            });
        }
        closure
    }

    #[test]
    fn later_package_overwrites_same_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        write(&first.join("etc/motd"), "from first");
        write(&first.join("etc/only-first"), "kept");
        write(&second.join("etc/motd"), "from second");
        let rootfs = dir.path().join("rootfs");

        let stats = merge_closure(
            &closure_of(&[("first", &first), ("second", &second)]),
            &rootfs,
        )
        .expect("merge");

        assert_eq!(fs::read_to_string(rootfs.join("etc/motd")).unwrap(), "from second");
        assert_eq!(fs::read_to_string(rootfs.join("etc/only-first")).unwrap(), "kept");
        assert_eq!(stats.packages, 2);
        assert_eq!(stats.entries, 5);
    }

    #[test]
    fn merge_order_follows_closure_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        write(&first.join("conf"), "first");
        write(&second.join("conf"), "second");
        let rootfs = dir.path().join("rootfs");

        let _ = merge_closure(
            &closure_of(&[("second", &second), ("first", &first)]),
            &rootfs,
        )
        .expect("merge");
        assert_eq!(fs::read_to_string(rootfs.join("conf")).unwrap(), "first");
    }

    #[test]
    fn permissions_and_mtime_are_preserved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pkg = dir.path().join("pkg");
        let script = pkg.join("usr/bin/tool");
        write(&script, "#!/bin/sh\n");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o750)).expect("chmod");
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        File::options()
            .write(true)
            .open(&script)
            .and_then(|f| f.set_modified(mtime))
            .expect("set mtime");
        fs::set_permissions(pkg.join("usr/bin"), fs::Permissions::from_mode(0o711))
            .expect("chmod dir");

        let rootfs = dir.path().join("rootfs");
        let _ = merge_closure(&closure_of(&[("pkg", &pkg)]), &rootfs).expect("merge");

        let copied = fs::metadata(rootfs.join("usr/bin/tool")).expect("stat");
        assert_eq!(copied.permissions().mode() & 0o7777, 0o750);
        assert_eq!(copied.modified().expect("mtime"), mtime);
        let bin = fs::metadata(rootfs.join("usr/bin")).expect("stat dir");
        assert_eq!(bin.permissions().mode() & 0o7777, 0o711);
    }

    #[test]
    fn symlinks_are_recreated_not_followed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pkg = dir.path().join("pkg");
        write(&pkg.join("usr/lib/libz.so.1.2.11"), "elf");
        std::os::unix::fs::symlink("libz.so.1.2.11", pkg.join("usr/lib/libz.so.1"))
            .expect("symlink");
        std::os::unix::fs::symlink("/etc/hostname", pkg.join("usr/lib/absolute"))
            .expect("symlink");

        let rootfs = dir.path().join("rootfs");
        let _ = merge_closure(&closure_of(&[("zlib1g", &pkg)]), &rootfs).expect("merge");

        let link = rootfs.join("usr/lib/libz.so.1");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("libz.so.1.2.11"));
        assert_eq!(
            fs::read_link(rootfs.join("usr/lib/absolute")).unwrap(),
            PathBuf::from("/etc/hostname")
        );
    }

    #[test]
    fn later_file_replaces_earlier_symlink_without_writing_through_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outside = dir.path().join("outside");
        write(&outside, "untouched");
        let first = dir.path().join("first");
        fs::create_dir_all(first.join("etc")).expect("mkdir");
        std::os::unix::fs::symlink(&outside, first.join("etc/conf")).expect("symlink");
        let second = dir.path().join("second");
        write(&second.join("etc/conf"), "regular");

        let rootfs = dir.path().join("rootfs");
        let _ = merge_closure(
            &closure_of(&[("first", &first), ("second", &second)]),
            &rootfs,
        )
        .expect("merge");

        let conf = rootfs.join("etc/conf");
        assert!(fs::symlink_metadata(&conf).unwrap().is_file());
        assert_eq!(fs::read_to_string(&conf).unwrap(), "regular");
        assert_eq!(fs::read_to_string(&outside).unwrap(), "untouched");
    }

    #[test]
    fn directory_merges_through_relative_symlink() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path().join("base");
        fs::create_dir_all(base.join("usr/lib")).expect("mkdir");
        std::os::unix::fs::symlink("usr/lib", base.join("lib")).expect("symlink");
        let legacy = dir.path().join("legacy");
        write(&legacy.join("lib/libold.so"), "old");

        let rootfs = dir.path().join("rootfs");
        let _ = merge_closure(
            &closure_of(&[("base-files", &base), ("legacy", &legacy)]),
            &rootfs,
        )
        .expect("merge");

        assert!(fs::symlink_metadata(rootfs.join("lib")).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(rootfs.join("usr/lib/libold.so")).unwrap(), "old");
    }

    #[test]
    fn directory_symlink_leaving_rootfs_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outside = dir.path().join("outside");
        fs::create_dir_all(&outside).expect("mkdir");
        let first = dir.path().join("first");
        fs::create_dir_all(&first).expect("mkdir");
        std::os::unix::fs::symlink(&outside, first.join("lib")).expect("symlink");
        let second = dir.path().join("second");
        write(&second.join("lib/evil.so"), "evil");

        let rootfs = dir.path().join("rootfs");
        let err = merge_closure(
            &closure_of(&[("first", &first), ("second", &second)]),
            &rootfs,
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Filesystem);
        assert!(!outside.join("evil.so").exists());
    }

    #[test]
    fn directory_cannot_replace_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("first");
        write(&first.join("usr/share/doc"), "a file");
        let second = dir.path().join("second");
        write(&second.join("usr/share/doc/README"), "doc");

        let err = merge_closure(
            &closure_of(&[("first", &first), ("second", &second)]),
            &dir.path().join("rootfs"),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Filesystem);
    }

    #[test]
    fn missing_source_tree_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("never-extracted");
        let err = merge_closure(
            &closure_of(&[("ghost", &missing)]),
            &dir.path().join("rootfs"),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Filesystem);
    }

    #[test]
    fn empty_closure_creates_empty_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rootfs = dir.path().join("rootfs");
        let stats = merge_closure(&DependencyClosure::new(), &rootfs).expect("merge");
        assert_eq!(stats, MergeStats::default());
        assert!(rootfs.is_dir());
    }
}
