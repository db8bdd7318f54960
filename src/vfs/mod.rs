//! Filesystem abstraction consumed by the transfer engine.
//!
//! The engine never touches `std::fs` directly; everything goes through
//! [`VfsEntry`] handles so jobs can run against the real filesystem, an
//! in-memory tree in tests, or any other backend. Handles are cheap to clone
//! and may refer to entries that do not exist yet (a destination about to be
//! created).

mod local;
mod memory;

pub use local::LocalEntry;
pub use memory::{MemoryEntry, MemoryFs};

use std::io::{self, Read, Write};
use std::path::PathBuf;

/// Operations a backend may or may not support, queryable per handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileOp {
    Read,
    Write,
    Append,
    CreateDirectory,
    Delete,
    Rename,
    ChangeDate,
}

/// A handle to a filesystem entry (existing or not).
///
/// `child` is fallible: obtaining a handle may require backend I/O and is the
/// retry point of destination resolution.
pub trait VfsEntry: Clone {
    /// Last path component, or the path itself for a root.
    fn name(&self) -> String;

    /// Absolute path of this entry within its backend.
    fn path(&self) -> PathBuf;

    /// Path with links resolved where the backend can; falls back to
    /// [`VfsEntry::path`] when resolution is impossible (e.g. the entry does
    /// not exist yet).
    fn canonical_path(&self) -> PathBuf;

    fn exists(&self) -> bool;
    fn is_dir(&self) -> bool;
    fn size(&self) -> u64;

    /// Last-modified time in milliseconds since the Unix epoch; 0 when the
    /// backend cannot tell.
    fn modified_ms(&self) -> i64;

    fn parent(&self) -> Option<Self>;

    /// Handle to a direct child by name. The child need not exist.
    fn child(&self, name: &str) -> io::Result<Self>;

    /// Existing direct children, in a stable order.
    fn children(&self) -> io::Result<Vec<Self>>;

    fn supports(&self, op: FileOp) -> bool;

    /// True when both handles refer to the same underlying entry through
    /// distinct paths (hard links). Path equality is not consulted here.
    fn is_same_entry(&self, _other: &Self) -> bool {
        false
    }

    fn open_read(&self) -> io::Result<Box<dyn Read + Send>>;

    /// Open for writing; `append` keeps existing bytes, otherwise truncates.
    fn open_write(&self, append: bool) -> io::Result<Box<dyn Write + Send>>;

    fn mkdir(&self) -> io::Result<()>;
    fn delete(&self) -> io::Result<()>;
    fn rename_to(&self, dest: &Self) -> io::Result<()>;
    fn set_modified_ms(&self, ms: i64) -> io::Result<()>;

    /// Carry source metadata over to this entry after a copy. The default
    /// preserves the modification time only; backends may do more.
    fn preserve_metadata_from(&self, source: &Self) -> io::Result<()> {
        self.set_modified_ms(source.modified_ms())
    }
}

/// Reject child names that would escape the parent directory.
pub(crate) fn validate_child_name(name: &str) -> io::Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid child name: {name:?}"),
        ));
    }
    Ok(())
}
