//! Writing extracted entries to disk.
//!
//! Regular files are written to a temporary file in the destination
//! directory and renamed into place, so an interrupted run never leaves a
//! truncated final file behind.

use crate::extract::error::{
    CommitSnafu, CreateDirectorySnafu, OutputIsDirectorySnafu, SetPermissionsSnafu, WriteSnafu,
};
use crate::extract::EntryError;
use snafu::{ResultExt, ensure};
use std::fs::{self, Permissions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Permissions of files that have no mode of their own.
pub const DEFAULT_MODE: u32 = 0o644;

/// Suffix of the raw payload written before decompression.
pub const COMPRESSED_SUFFIX: &str = ".Z";

/// Suffix of the text file written when a symlink cannot be created.
pub const LINK_FALLBACK_SUFFIX: &str = ".link.txt";

/// Makes a manifest name safe to join onto the output root.
///
/// Leading slashes go, and so do `.` and `..` segments. The segments are
/// dropped, not resolved, so `a/../b` becomes `a/b`.
#[must_use]
pub fn sanitize(name: &str) -> String {
    name.split('/')
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns where the entry named `name` lands under `root`.
#[must_use]
pub fn output_path(root: &Path, name: &str) -> PathBuf {
    let rel = sanitize(name);

    if rel.is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    }
}

/// Appends `suffix` to the last component of `path`.
#[must_use]
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Creates `path` and its parents and applies `mode`.
pub fn create_dir(path: &Path, mode: u32) -> Result<(), EntryError> {
    fs::create_dir_all(path).context(CreateDirectorySnafu { path })?;

    let current = fs::metadata(path)
        .context(SetPermissionsSnafu { path })?
        .permissions();

    fs::set_permissions(path, permissions(current, mode)).context(SetPermissionsSnafu { path })
}

/// Atomically replaces or creates `path` with `data`.
///
/// `mode` is applied before the file is moved into place. An existing
/// read-only file at `path` is made writable first.
pub fn write_file(path: &Path, data: &[u8], mode: u32) -> Result<(), EntryError> {
    let parent = ensure_parent(path)?;

    if let Ok(meta) = fs::symlink_metadata(path) {
        ensure!(!meta.is_dir(), OutputIsDirectorySnafu { path });

        if meta.is_file() && meta.permissions().readonly() {
            make_writable(path).context(SetPermissionsSnafu { path })?;
        }
    }

    let mut temp = NamedTempFile::new_in(parent).context(WriteSnafu { path })?;

    temp.write_all(data).context(WriteSnafu { path })?;
    temp.as_file().sync_all().context(WriteSnafu { path })?;

    let current = temp
        .as_file()
        .metadata()
        .context(SetPermissionsSnafu { path })?
        .permissions();

    temp.as_file()
        .set_permissions(permissions(current, mode))
        .context(SetPermissionsSnafu { path })?;

    temp.persist(path)
        .map_err(|e| e.error)
        .context(CommitSnafu { path })?;

    Ok(())
}

/// What [`write_symlink`] ended up creating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked,
    /// The link could not be created; the target was written to this file.
    Fallback(PathBuf),
}

/// Creates a symlink at `path` pointing to `target`, replacing whatever is
/// there.
///
/// If the platform or filesystem refuses the link, the target text is
/// written to `<path>.link.txt` instead.
pub fn write_symlink(path: &Path, target: &str) -> Result<LinkOutcome, EntryError> {
    ensure_parent(path)?;

    if fs::symlink_metadata(path).is_ok_and(|meta| !meta.is_dir()) {
        if let Err(e) = remove_file(path) {
            tracing::debug!(path = %path.display(), error = %e, "cannot remove old entry");
        }
    }

    match symlink(target, path) {
        Ok(()) => Ok(LinkOutcome::Linked),
        Err(e) => {
            let fallback = with_suffix(path, LINK_FALLBACK_SUFFIX);

            tracing::warn!(
                path = %path.display(),
                target,
                error = %e,
                "symlink failed, writing target to {}",
                fallback.display()
            );

            write_file(&fallback, target.as_bytes(), DEFAULT_MODE)?;

            Ok(LinkOutcome::Fallback(fallback))
        }
    }
}

/// Removes the file at `path` even if it is read-only. A missing file is
/// not an error.
pub fn remove_file(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if meta.is_file() && meta.permissions().readonly() {
        make_writable(path)?;
    }

    fs::remove_file(path)
}

fn ensure_parent(path: &Path) -> Result<&Path, EntryError> {
    let parent = path.parent().unwrap_or(Path::new("."));

    fs::create_dir_all(parent).context(CreateDirectorySnafu { path: parent })?;

    Ok(parent)
}

#[cfg(unix)]
fn permissions(_current: Permissions, mode: u32) -> Permissions {
    use std::os::unix::fs::PermissionsExt;

    Permissions::from_mode(mode & 0o777)
}

#[cfg(not(unix))]
fn permissions(mut current: Permissions, mode: u32) -> Permissions {
    current.set_readonly(mode & 0o200 == 0);
    current
}

fn make_writable(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        perms.set_mode(perms.mode() | 0o200);
    }

    #[cfg(not(unix))]
    perms.set_readonly(false);

    fs::set_permissions(path, perms)
}

#[cfg(unix)]
fn symlink(target: &str, path: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, path)
}

#[cfg(windows)]
fn symlink(target: &str, path: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, path)
}

#[cfg(not(any(unix, windows)))]
fn symlink(_target: &str, _path: &Path) -> io::Result<()> {
    Err(io::ErrorKind::Unsupported.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sanitize_drops_dot_segments() {
        assert_eq!(sanitize("../../etc/passwd"), "etc/passwd");
        assert_eq!(sanitize("/usr/bin/ls"), "usr/bin/ls");
        assert_eq!(sanitize("./a/./b//c"), "a/b/c");
        assert_eq!(sanitize("a/../b"), "a/b");
        assert_eq!(sanitize("/"), "");
        assert_eq!(sanitize("..."), "...");
    }

    #[test]
    fn output_path_of_root() {
        let root = Path::new("/out");

        assert_eq!(output_path(root, "./"), root);
        assert_eq!(output_path(root, "/usr/lib"), root.join("usr/lib"));
    }

    #[test]
    fn suffix_is_appended() {
        assert_eq!(
            with_suffix(Path::new("out/usr/a.txt"), COMPRESSED_SUFFIX),
            Path::new("out/usr/a.txt.Z")
        );
    }

    #[test]
    fn write_creates_parents_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usr/share/file");

        write_file(&path, b"one", 0o644).unwrap();
        write_file(&path, b"two", 0o644).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"two");
    }

    #[test]
    fn write_over_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usr");

        fs::create_dir(&path).unwrap();

        let err = write_file(&path, b"x", 0o644).unwrap_err();

        assert!(matches!(err, EntryError::OutputIsDirectory { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn read_only_file_is_replaced_and_mode_applied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ro");

        write_file(&path, b"old", 0o444).unwrap();
        write_file(&path, b"new", 0o750).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();

        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert_eq!(mode & 0o777, 0o750);
    }

    #[test]
    fn remove_read_only_and_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tmp.Z");

        write_file(&path, b"z", 0o444).unwrap();
        remove_file(&path).unwrap();

        assert!(!path.exists());
        remove_file(&path).unwrap();
    }

    #[test]
    fn remove_failure_is_reported() {
        use crate::extract::error::RemoveTempSnafu;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("busy.Z");

        fs::create_dir(&path).unwrap();
        fs::write(path.join("inner"), b"x").unwrap();

        let err = remove_file(&path)
            .context(RemoveTempSnafu { path: &path })
            .unwrap_err();

        assert!(matches!(err, EntryError::RemoveTemp { .. }));
        assert!(err.to_string().starts_with("cannot remove temp file"));
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin/sh");

        write_file(&path, b"stale", 0o644).unwrap();

        assert_eq!(write_symlink(&path, "bash").unwrap(), LinkOutcome::Linked);
        assert_eq!(fs::read_link(&path).unwrap(), Path::new("bash"));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_over_directory_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lib");

        fs::create_dir(&path).unwrap();

        let outcome = write_symlink(&path, "lib64").unwrap();
        let fallback = dir.path().join("lib.link.txt");

        assert_eq!(outcome, LinkOutcome::Fallback(fallback.clone()));
        assert_eq!(fs::read_to_string(fallback).unwrap(), "lib64");
    }
}
