//! Path handling. Paths are absolute, `/` separated; empty components
//! (`//`, a trailing `/`) are ignored.

use vfs::{Error, Result};

/// The non-empty components of `path`, in order.
#[inline]
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|cmp| !cmp.is_empty())
}

/// Returns the `(parent, child)` of `path`: split at the last `/` before the
/// final component. The parent of a top level item is `/`.
pub fn split_parent_child(path: &str) -> Result<(&str, &str)> {
    let trimmed = match path.strip_suffix('/') {
        Some(rest) if !rest.is_empty() => rest,
        _ => path,
    };

    let (parent, child) = trimmed.rsplit_once('/').ok_or(Error::InvalidPath)?;
    if child.is_empty() {
        return Err(Error::InvalidPath);
    }

    let parent = match parent.trim_end_matches('/') {
        "" => "/",
        parent => parent,
    };

    Ok((parent, child))
}
