//! Exercises `AptFetcher` against shell scripts standing in for
//! `apt-get` and `dpkg-deb`.
//!
//! The fake `apt-get download <name>` writes `<name>_1.0_amd64.deb`
//! containing the package name; the fake `dpkg-deb` reads that name back
//! to answer `-x` and `-f` requests.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use debimg_common::error::ErrorKind;
use debimg_common::types::PackageName;
use debimg_resolve::apt::AptFetcher;
use debimg_resolve::fetcher::PackageFetcher;
use debimg_resolve::resolver::DependencyResolver;
use serial_test::serial;

const FAKE_APT_GET: &str = r#"#!/bin/sh
[ "$1" = "download" ] || exit 64
case "$2" in
  missing) echo "E: Unable to locate package $2" >&2; exit 100 ;;
  nothing) exit 0 ;;
  twice) echo "$2" > "${2}_1.0_amd64.deb"; echo "$2" > "${2}_2.0_amd64.deb" ;;
  *) echo "Get:1 http://deb.example.org $2"; echo "$2" > "${2}_1.0_amd64.deb" ;;
esac
"#;

const FAKE_DPKG_DEB: &str = r#"#!/bin/sh
pkg=$(cat "$2")
case "$1" in
  -x)
    mkdir -p "$3/usr/share/doc/$pkg"
    echo "copyright of $pkg" > "$3/usr/share/doc/$pkg/copyright"
    ;;
  -f)
    case "$3" in
      Architecture) echo amd64 ;;
      Version) [ "$pkg" = "unversioned" ] || echo "1.0-1" ;;
      Depends) [ "$pkg" = "app" ] && echo "libfoo (>= 1.0), libbar | libbaz" ;;
      *) exit 2 ;;
    esac
    ;;
  *) exit 64 ;;
esac
exit 0
"#;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

fn fake_fetcher(dir: &Path) -> AptFetcher {
    let bin = dir.join("bin");
    std::fs::create_dir_all(&bin).expect("mkdir bin");
    AptFetcher::new(
        write_script(&bin, "apt-get", FAKE_APT_GET),
        write_script(&bin, "dpkg-deb", FAKE_DPKG_DEB),
    )
}

#[test]
#[serial]
fn fetch_downloads_unpacks_and_reads_control_fields() {
    let dir = tempfile::tempdir().expect("tempdir");
    let work = dir.path().join("work");
    let mut fetcher = fake_fetcher(dir.path());

    let fetched = fetcher
        .fetch(&PackageName::new("app"), &work)
        .expect("fetch");

    assert_eq!(fetched.version, "1.0-1");
    assert_eq!(fetched.architecture, "amd64");
    assert_eq!(fetched.depends, "libfoo (>= 1.0), libbar | libbaz");
    assert_eq!(fetched.root, work.join("packages/app/root"));
    assert!(work.join("packages/app/app_1.0_amd64.deb").is_file());

    let copyright =
        std::fs::read_to_string(fetched.root.join("usr/share/doc/app/copyright")).expect("read");
    assert_eq!(copyright.trim(), "copyright of app");
}

#[test]
#[serial]
fn fetch_fails_when_nothing_is_downloaded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut fetcher = fake_fetcher(dir.path());

    let err = fetcher
        .fetch(&PackageName::new("nothing"), &dir.path().join("work"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
}

#[test]
#[serial]
fn fetch_fails_when_several_archives_are_downloaded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut fetcher = fake_fetcher(dir.path());

    let err = fetcher
        .fetch(&PackageName::new("twice"), &dir.path().join("work"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
    assert!(err.to_string().contains("found 2"), "got: {err}");
}

#[test]
#[serial]
fn fetch_fails_when_download_tool_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut fetcher = fake_fetcher(dir.path());

    let err = fetcher
        .fetch(&PackageName::new("missing"), &dir.path().join("work"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
    assert!(err.to_string().contains("apt-get"), "got: {err}");
}

#[test]
#[serial]
fn fetch_fails_when_version_field_is_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut fetcher = fake_fetcher(dir.path());

    let err = fetcher
        .fetch(&PackageName::new("unversioned"), &dir.path().join("work"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
    assert!(err.to_string().contains("Version"), "got: {err}");
}

#[test]
#[serial]
fn resolver_walks_dependencies_through_apt_fetcher() {
    let dir = tempfile::tempdir().expect("tempdir");
    let work = dir.path().join("work");
    let mut resolver = DependencyResolver::new(fake_fetcher(dir.path()), &work);

    let closure = resolver
        .resolve(&[PackageName::new("app")])
        .expect("resolve");

    let names: Vec<&str> = closure.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["app", "libfoo", "libbar"]);
    for package in &closure {
        assert!(package.root.starts_with(&work));
        assert!(package.root.is_dir(), "{}", package.root.display());
    }
}
