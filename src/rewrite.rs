// src/rewrite.rs

//! Path rewriting for relocatable environments
//!
//! Three kinds of path-sensitive artifact carry the build-time absolute
//! prefix and must be rewritten before the tree can be installed anywhere
//! else:
//!
//! - **Interpreter directives**: the `#!` first line of executable scripts
//! - **Path-hint files**: `.pth` files listing absolute import directories
//! - **Symbolic links**: targets pointing into the build-time tree
//!
//! Content rewrites go through a sibling temporary file that is atomically
//! renamed over the original with the original's permission bits, so a
//! crash mid-rewrite never leaves a half-written or non-executable file
//! under the original name. Symlink targets cannot be edited in place;
//! those are deleted and recreated.
//!
//! All rewrites are idempotent: once the old prefix is gone, a second run
//! finds nothing to match and leaves the file byte-identical, metadata
//! included.

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::fs as unix_fs;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Marker introducing an interpreter directive line
const SHEBANG: &[u8] = b"#!";

/// Outcome of a rewrite attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    Changed,
    Unchanged,
}

/// Rewrite the interpreter directive of an executable script
///
/// Reads only the first line; if it starts with `#!` and contains
/// `old_prefix`, that one line is rewritten and every subsequent byte is
/// streamed through untouched, so large scripts are never loaded into
/// memory. Files whose first line is not a matching directive (including
/// non-UTF-8 binaries) are left completely untouched.
pub fn rewrite_shebang(path: &Path, old_prefix: &str, new_prefix: &str) -> Result<Rewrite> {
    let file = File::open(path).map_err(|e| rewrite_err(path, &e))?;
    let mut reader = BufReader::new(file);

    let mut first_line = Vec::new();
    reader
        .read_until(b'\n', &mut first_line)
        .map_err(|e| rewrite_err(path, &e))?;

    if !first_line.starts_with(SHEBANG) {
        return Ok(Rewrite::Unchanged);
    }
    // A binary that happens to start with "#!" but is not valid UTF-8 on
    // its first line is not a script we can rewrite.
    let Ok(line) = std::str::from_utf8(&first_line) else {
        return Ok(Rewrite::Unchanged);
    };
    if !line.contains(old_prefix) {
        return Ok(Rewrite::Unchanged);
    }

    let permissions = fs::metadata(path)
        .map_err(|e| rewrite_err(path, &e))?
        .permissions();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| rewrite_err(path, &e))?;
    tmp.write_all(line.replace(old_prefix, new_prefix).as_bytes())
        .map_err(|e| rewrite_err(path, &e))?;
    io::copy(&mut reader, &mut tmp).map_err(|e| rewrite_err(path, &e))?;

    tmp.as_file()
        .set_permissions(permissions)
        .map_err(|e| rewrite_err(path, &e))?;
    tmp.persist(path).map_err(|e| rewrite_err(path, &e.error))?;

    debug!("rewrote interpreter directive in {}", path.display());
    Ok(Rewrite::Changed)
}

/// Rewrite recorded absolute paths in a path-hint (`.pth`) file
///
/// Every occurrence of `old_prefix` is replaced; the rewrite is atomic
/// and permission-preserving like the shebang variant.
pub fn rewrite_path_hints(path: &Path, old_prefix: &str, new_prefix: &str) -> Result<Rewrite> {
    let content = fs::read_to_string(path).map_err(|e| rewrite_err(path, &e))?;
    if !content.contains(old_prefix) {
        return Ok(Rewrite::Unchanged);
    }

    let permissions = fs::metadata(path)
        .map_err(|e| rewrite_err(path, &e))?
        .permissions();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| rewrite_err(path, &e))?;
    tmp.write_all(content.replace(old_prefix, new_prefix).as_bytes())
        .map_err(|e| rewrite_err(path, &e))?;
    tmp.as_file()
        .set_permissions(permissions)
        .map_err(|e| rewrite_err(path, &e))?;
    tmp.persist(path).map_err(|e| rewrite_err(path, &e.error))?;

    debug!("rewrote path hints in {}", path.display());
    Ok(Rewrite::Changed)
}

/// Recreate a symbolic link whose target contains the build-time prefix
///
/// Symlink targets are immutable once created, so this is delete-then-
/// recreate rather than a content rewrite. The link is created with a
/// direct filesystem call, never through a shell, so targets containing
/// spaces or shell metacharacters are safe.
pub fn relink(link: &Path, old_prefix: &str, new_prefix: &str) -> Result<Rewrite> {
    let target = fs::read_link(link).map_err(|e| rewrite_err(link, &e))?;
    let target_str = target.to_string_lossy();
    if !target_str.contains(old_prefix) {
        return Ok(Rewrite::Unchanged);
    }

    let new_target = target_str.replace(old_prefix, new_prefix);
    fs::remove_file(link).map_err(|e| rewrite_err(link, &e))?;
    unix_fs::symlink(&new_target, link).map_err(|e| rewrite_err(link, &e))?;

    debug!("relinked {} -> {}", link.display(), new_target);
    Ok(Rewrite::Changed)
}

/// Replace an arbitrary directory entry with a symlink to `target`
///
/// Used for the installer quirk where platform-specific entries are
/// created as real absolute-path-bearing children instead of being
/// relative to the environment root.
pub fn replace_with_symlink(entry: &Path, target: &Path) -> Result<Rewrite> {
    let meta = fs::symlink_metadata(entry).map_err(|e| rewrite_err(entry, &e))?;
    if meta.is_dir() {
        fs::remove_dir_all(entry).map_err(|e| rewrite_err(entry, &e))?;
    } else {
        // covers regular files and existing symlinks
        fs::remove_file(entry).map_err(|e| rewrite_err(entry, &e))?;
    }
    unix_fs::symlink(target, entry).map_err(|e| rewrite_err(entry, &e))?;

    debug!("replaced {} with link to {}", entry.display(), target.display());
    Ok(Rewrite::Changed)
}

fn rewrite_err(path: &Path, err: &dyn std::fmt::Display) -> Error {
    Error::Rewrite {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
