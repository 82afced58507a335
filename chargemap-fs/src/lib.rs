//! Filesystem helpers for snapshot artefacts, built on `cap-std` and `camino`.
//!
//! All access goes through an ambient directory handle opened on the parent
//! of the target path. [`write_atomic`] publishes a file by writing a
//! temporary sibling and renaming it over the target, so readers observe
//! either the previous content or the complete new content.
#![forbid(unsafe_code)]

use std::io::{self, Read, Write};
use std::path::Component;
use std::sync::atomic::{AtomicU64, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Open a UTF-8 file path for reading using ambient authority.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Read a whole file into memory.
pub fn read_file(path: &Utf8Path) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    open_utf8_file(path)?.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Open the parent directory of `path` and return it with the file name.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} does not name a file")))?
        .to_owned();
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Create every missing directory above `path`.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }
    let (base_dir, relative) = base_dir_and_relative(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Returns true when `path` exists and is a regular file.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.metadata(name.as_str()).map(|meta| meta.is_file())
}

/// Size of the file at `path` in bytes.
pub fn file_size(path: &Utf8Path) -> io::Result<u64> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.metadata(name.as_str()).map(|meta| meta.len())
}

/// Split `parent` into an ambient base directory and the path below it.
///
/// Absolute paths are anchored at their root (or Windows prefix); relative
/// paths are anchored at the current directory.
pub fn base_dir_and_relative(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_parent = parent.as_std_path();
    let base = match std_parent.components().next() {
        Some(Component::Prefix(prefix)) => {
            let prefix = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            Utf8PathBuf::from(prefix).join(std::path::MAIN_SEPARATOR.to_string())
        }
        Some(Component::RootDir) => Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string()),
        _ => Utf8PathBuf::from("."),
    };
    let relative = if base == Utf8Path::new(".") {
        parent.to_path_buf()
    } else {
        parent
            .strip_prefix(&base)
            .map_err(|_| io::Error::other(format!("cannot split {parent} at {base}")))?
            .to_path_buf()
    };
    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    Ok((dir, relative))
}

/// Replace the file at `path` with `bytes` atomically.
///
/// The bytes go to a uniquely named temporary file next to `path`, are
/// synced to disk, and the temporary file is then renamed over `path`. On
/// failure the temporary file is removed and `path` is left as it was.
///
/// # Examples
/// ```
/// use camino::Utf8PathBuf;
///
/// let dir = tempfile::tempdir()?;
/// let path = Utf8PathBuf::from_path_buf(dir.path().join("out/data.json"))
///     .map_err(|_| std::io::Error::other("non-UTF-8 temp dir"))?;
/// chargemap_fs::write_atomic(&path, b"{}")?;
/// assert_eq!(chargemap_fs::read_file(&path)?, b"{}");
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn write_atomic(path: &Utf8Path, bytes: &[u8]) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_dir_and_file(path)?;
    let temp_name = format!(
        ".{name}.{}.{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    );

    let written = write_and_sync(&dir, &temp_name, bytes)
        .and_then(|()| dir.rename(&temp_name, &dir, &name));
    if written.is_err() {
        let _ = dir.remove_file(&temp_name);
    }
    written
}

fn write_and_sync(dir: &fs_utf8::Dir, name: &str, bytes: &[u8]) -> io::Result<()> {
    let mut file = dir.create(name)?;
    file.write_all(bytes)?;
    file.sync_all()
}
