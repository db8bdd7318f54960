//! Collision classification.
//!
//! Pure: looks at the two handles and the current backend state, never
//! mutates anything, and is safe to call repeatedly. The loop re-runs it
//! after every retry because the filesystem may have changed in between.

use std::fmt;

use crate::vfs::VfsEntry;

/// Relationship between a source file and a candidate destination.
/// Exactly one kind applies per pair at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    NoCollision,
    /// Source and destination resolve to the same path.
    SameSourceAndDestination,
    /// Distinct paths referring to the same underlying entry (hard links).
    SourceAndDestinationIdentical,
    DestinationExists,
    /// Copying a directory into itself.
    DestinationIsSubfolderOfSource,
    DestinationIsParentOfSource,
}

impl CollisionKind {
    pub fn describe(&self) -> &'static str {
        match self {
            CollisionKind::NoCollision => "no collision",
            CollisionKind::SameSourceAndDestination => "source and destination are the same file",
            CollisionKind::SourceAndDestinationIdentical => {
                "source and destination refer to the same entry"
            }
            CollisionKind::DestinationExists => "destination already exists",
            CollisionKind::DestinationIsSubfolderOfSource => {
                "destination is inside the source folder"
            }
            CollisionKind::DestinationIsParentOfSource => "destination is a parent of the source",
        }
    }
}

impl fmt::Display for CollisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Classify the relationship between `source` and `destination`.
///
/// `source` may be absent when the caller only wants to know whether the
/// destination path is occupied.
pub fn classify<F: VfsEntry>(source: Option<&F>, destination: &F) -> CollisionKind {
    if let Some(src) = source {
        if src.canonical_path() == destination.canonical_path() {
            return CollisionKind::SameSourceAndDestination;
        }
        if src.is_same_entry(destination) {
            return CollisionKind::SourceAndDestinationIdentical;
        }
        if src.is_dir() && destination.path().starts_with(src.path()) {
            return CollisionKind::DestinationIsSubfolderOfSource;
        }
        if destination.is_dir() && src.path().starts_with(destination.path()) {
            return CollisionKind::DestinationIsParentOfSource;
        }
    }
    if destination.exists() {
        return CollisionKind::DestinationExists;
    }
    CollisionKind::NoCollision
}

/// True when two names are equal ignoring case but not equal as written —
/// the `Foo` -> `foo` rename on a case-insensitive filesystem.
pub fn case_only_variation(a: &str, b: &str) -> bool {
    a != b && a.to_lowercase() == b.to_lowercase()
}
