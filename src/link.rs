//! Deferred ownership of a child subtree.
//!
//! A store written by [`crate::store::write`] keeps every archive, fund and
//! inventory in its own file. Reading the root only yields the *names* of the
//! archives; each one stays [`Link::Unloaded`] until somebody calls
//! [`Link::resolve`], which parses the shard and caches the node in place.
//!
//! ```text
//! Unloaded(Some(path)) ──resolve──▶ Loaded(node)
//!          │
//!          └──resolve (no file)──▶ Absent(path)
//! Unloaded(None) ──resolve──▶ Err(NoBaseDirectory)
//! ```
//!
//! Resolution needs `&mut self`, so a tree is only ever materialized from one
//! thread at a time. There is no implicit access: every place that may hit the
//! disk goes through `resolve()` and has to handle its `Result`.

use crate::store::StoreError;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A node type that lives in its own shard file.
pub trait Shard: Sized {
    /// Human name of the level, used in errors and logs.
    const KIND: &'static str;

    /// Parse the shard at `path`.
    fn load(path: &Path) -> Result<Self, StoreError>;
}

/// Tri-state reference to a child node.
#[derive(Debug, Clone, PartialEq)]
pub enum Link<T> {
    /// Known to exist on disk, not read yet. `None` when the tree has no
    /// backing directory.
    Unloaded(Option<PathBuf>),
    /// Materialized in memory.
    Loaded(T),
    /// A previous resolve found no file at this path.
    Absent(PathBuf),
}

impl<T: Shard> Link<T> {
    /// The node if it is already in memory; never touches the disk.
    pub fn get(&self) -> Option<&T> {
        match self {
            Link::Loaded(node) => Some(node),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_loaded(&self) -> bool {
        matches!(self, Link::Loaded(_))
    }

    /// Return the node, reading its shard on first use.
    pub fn resolve(&mut self) -> Result<&mut T, StoreError> {
        if let Link::Unloaded(path) = self {
            let path = path.clone().ok_or(StoreError::NoBaseDirectory(T::KIND))?;
            debug!(kind = T::KIND, path = %path.display(), "loading shard");
            *self = match T::load(&path) {
                Ok(node) => Link::Loaded(node),
                Err(StoreError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                    Link::Absent(path)
                }
                Err(err) => return Err(err),
            };
        }

        match self {
            Link::Loaded(node) => Ok(node),
            Link::Absent(path) => Err(StoreError::ShardMissing(path.clone())),
            Link::Unloaded(_) => Err(StoreError::NoBaseDirectory(T::KIND)),
        }
    }
}
