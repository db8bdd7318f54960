//! Conditional overwrite actions: strictly-newer and size-differs.

mod common;

use common::ScriptedDecider;
use haul::job::{
    CollisionAction, CollisionVerdict, JobMonitor, ResolutionContext, ResolutionOutcome,
    resolve_collision,
};
use haul::vfs::{MemoryEntry, MemoryFs, VfsEntry};

fn resolve_once(fs: &MemoryFs, action: CollisionAction) -> ResolutionOutcome<MemoryEntry> {
    let mut ctx = ResolutionContext::new(CollisionAction::Ask);
    let monitor = JobMonitor::new();
    let mut provider = ScriptedDecider::new().answer_collision(CollisionVerdict::once(action));

    let source = fs.entry("/src/a.txt");
    let folder = fs.entry("/dest");
    let dest = fs.entry("/dest/a.txt");
    resolve_collision(&mut ctx, &monitor, &mut provider, &source, &folder, dest, false, "Copy error")
}

#[test]
fn overwrite_if_older_requires_strictly_newer_source() {
    // Older source loses.
    let fs = MemoryFs::new();
    fs.add_file("/src/a.txt", b"src", 100);
    fs.add_file("/dest/a.txt", b"dst", 200);
    assert_eq!(
        resolve_once(&fs, CollisionAction::OverwriteIfOlder),
        ResolutionOutcome::AbandonFile
    );

    // Equal timestamps do not overwrite.
    let fs = MemoryFs::new();
    fs.add_file("/src/a.txt", b"src", 100);
    fs.add_file("/dest/a.txt", b"dst", 100);
    assert_eq!(
        resolve_once(&fs, CollisionAction::OverwriteIfOlder),
        ResolutionOutcome::AbandonFile
    );

    // Strictly newer source wins.
    let fs = MemoryFs::new();
    fs.add_file("/src/a.txt", b"src", 200);
    fs.add_file("/dest/a.txt", b"dst", 100);
    match resolve_once(&fs, CollisionAction::OverwriteIfOlder) {
        ResolutionOutcome::ProceedFresh(d) => assert_eq!(d.name(), "a.txt"),
        other => panic!("expected ProceedFresh, got {other:?}"),
    }
}

#[test]
fn overwrite_if_size_differs_skips_equal_sizes() {
    let fs = MemoryFs::new();
    fs.add_file("/src/a.txt", b"12345", 100);
    fs.add_file("/dest/a.txt", b"abcde", 200);
    assert_eq!(
        resolve_once(&fs, CollisionAction::OverwriteIfSizeDiffers),
        ResolutionOutcome::AbandonFile
    );

    let fs = MemoryFs::new();
    fs.add_file("/src/a.txt", b"123456", 100);
    fs.add_file("/dest/a.txt", b"abcde", 200);
    assert!(matches!(
        resolve_once(&fs, CollisionAction::OverwriteIfSizeDiffers),
        ResolutionOutcome::ProceedFresh(_)
    ));
}
