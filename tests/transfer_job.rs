//! End-to-end job runs on the in-memory filesystem.

mod common;

use std::sync::Arc;

use common::ScriptedDecider;
use haul::job::{
    CollisionAction, CollisionVerdict, JobMonitor, PolicyDecider, ResolutionOutcome, TransferJob,
    TransferMode,
};
use haul::vfs::{MemoryFs, VfsEntry};

fn job_with<P: haul::DecisionProvider>(
    fs: &MemoryFs,
    mode: TransferMode,
    sources: &[&str],
    provider: P,
) -> TransferJob<haul::vfs::MemoryEntry, P> {
    let files = sources.iter().map(|p| fs.entry(p)).collect();
    TransferJob::new(mode, files, fs.entry("/dest"), provider, Arc::new(JobMonitor::new()))
}

#[test]
fn copies_a_file_into_an_empty_folder() {
    let fs = MemoryFs::new();
    fs.add_file("/src/a.txt", b"hello", 1);
    fs.add_dir("/dest");

    let mut job = job_with(&fs, TransferMode::Copy, &["/src/a.txt"], ScriptedDecider::new());
    let stats = job.run().expect("run");

    assert_eq!(stats.files_transferred, 1);
    assert_eq!(stats.bytes_transferred, 5);
    assert_eq!(fs.read("/dest/a.txt").unwrap(), b"hello");
    assert_eq!(fs.read("/src/a.txt").unwrap(), b"hello");
}

#[test]
fn resume_appends_to_the_existing_destination() {
    let fs = MemoryFs::new();
    fs.add_file("/src/a.txt", b"world", 10);
    fs.add_file("/dest/a.txt", b"hello ", 2);

    let provider =
        ScriptedDecider::new().answer_collision(CollisionVerdict::once(CollisionAction::Resume));
    let mut job = job_with(&fs, TransferMode::Copy, &["/src/a.txt"], provider);
    let stats = job.run().expect("run");

    assert_eq!(stats.files_transferred, 1);
    assert_eq!(fs.read("/dest/a.txt").unwrap(), b"hello world");
}

#[test]
fn skip_leaves_the_destination_untouched() {
    let fs = MemoryFs::new();
    fs.add_file("/src/a.txt", b"new", 10);
    fs.add_file("/dest/a.txt", b"old", 2);

    let provider =
        ScriptedDecider::new().answer_collision(CollisionVerdict::once(CollisionAction::Skip));
    let mut job = job_with(&fs, TransferMode::Copy, &["/src/a.txt"], provider);
    let stats = job.run().expect("run");

    assert_eq!(stats.files_transferred, 0);
    assert_eq!(stats.files_skipped, 1);
    assert_eq!(fs.read("/dest/a.txt").unwrap(), b"old");
}

#[test]
fn move_transfers_and_removes_the_source() {
    let fs = MemoryFs::new();
    fs.add_file("/src/a.txt", b"payload", 1);
    fs.add_dir("/dest");

    let mut job = job_with(&fs, TransferMode::Move, &["/src/a.txt"], ScriptedDecider::new());
    let stats = job.run().expect("run");

    assert_eq!(stats.files_transferred, 1);
    assert_eq!(fs.read("/dest/a.txt").unwrap(), b"payload");
    assert!(fs.read("/src/a.txt").is_none());
}

#[test]
fn directories_recurse_and_prompt_per_nested_collision() {
    let fs = MemoryFs::new();
    fs.add_file("/src/tree/one.txt", b"one", 1);
    fs.add_file("/src/tree/sub/two.txt", b"two", 1);
    fs.add_file("/dest/tree/one.txt", b"stale", 2);

    // Both the existing folder and the nested one.txt collide.
    let provider = ScriptedDecider::new()
        .answer_collision(CollisionVerdict::once(CollisionAction::Overwrite))
        .answer_collision(CollisionVerdict::once(CollisionAction::Overwrite));
    let counters = provider.counters();
    let mut job = job_with(&fs, TransferMode::Copy, &["/src/tree"], provider);
    let stats = job.run().expect("run");

    assert_eq!(counters.collisions(), 2);
    assert_eq!(stats.files_transferred, 2);
    assert_eq!(fs.read("/dest/tree/one.txt").unwrap(), b"one");
    assert_eq!(fs.read("/dest/tree/sub/two.txt").unwrap(), b"two");
}

#[test]
fn moving_a_directory_removes_emptied_source_folders() {
    let fs = MemoryFs::new();
    fs.add_file("/src/tree/one.txt", b"one", 1);
    fs.add_file("/src/tree/sub/two.txt", b"two", 1);
    fs.add_dir("/dest");

    let mut job = job_with(&fs, TransferMode::Move, &["/src/tree"], ScriptedDecider::new());
    job.run().expect("run");

    assert_eq!(fs.read("/dest/tree/one.txt").unwrap(), b"one");
    assert_eq!(fs.read("/dest/tree/sub/two.txt").unwrap(), b"two");
    assert!(!fs.entry("/src/tree").exists());
}

#[test]
fn rename_override_produces_proceed_renamed() {
    let fs = MemoryFs::new();
    fs.add_file("/src/a.txt", b"x", 1);
    fs.add_dir("/dest");

    let file = fs.entry("/src/a.txt");
    let mut job = job_with(&fs, TransferMode::Copy, &["/src/a.txt"], ScriptedDecider::new())
        .with_rename_to(Some("b.txt".to_string()));

    match job.resolve_destination(&file) {
        ResolutionOutcome::ProceedRenamed(d) => assert_eq!(d.name(), "b.txt"),
        other => panic!("expected ProceedRenamed, got {other:?}"),
    }

    // Without an override the same resolution is a plain fresh outcome.
    let mut plain = job_with(&fs, TransferMode::Copy, &["/src/a.txt"], ScriptedDecider::new());
    assert!(matches!(
        plain.resolve_destination(&file),
        ResolutionOutcome::ProceedFresh(_)
    ));
}

#[test]
fn rename_policy_lands_on_a_numbered_name() {
    let fs = MemoryFs::new();
    fs.add_file("/src/a.txt", b"new", 10);
    fs.add_file("/dest/a.txt", b"old", 2);

    let provider = PolicyDecider::new(CollisionAction::Rename);
    let mut job = job_with(&fs, TransferMode::Copy, &["/src/a.txt"], provider);
    let stats = job.run().expect("run");

    assert_eq!(stats.files_transferred, 1);
    assert_eq!(fs.read("/dest/a.txt").unwrap(), b"old");
    assert_eq!(fs.read("/dest/a (2).txt").unwrap(), b"new");
}

#[test]
fn unattended_ask_policy_degrades_to_skip() {
    let fs = MemoryFs::new();
    fs.add_file("/src/a.txt", b"new", 10);
    fs.add_file("/dest/a.txt", b"old", 2);

    let provider = PolicyDecider::new(CollisionAction::Ask);
    let mut job = job_with(&fs, TransferMode::Copy, &["/src/a.txt"], provider);
    let stats = job.run().expect("run");

    assert_eq!(stats.files_skipped, 1);
    assert_eq!(fs.read("/dest/a.txt").unwrap(), b"old");
}
