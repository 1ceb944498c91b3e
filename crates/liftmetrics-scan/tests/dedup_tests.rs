use liftmetrics_core::{LiftError, WarningKind};
use liftmetrics_scan::{DedupPhase, DigestIndex, DigestKind, FileDeduper, FileMatcher, RemovalMode};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn csv_deduper(removal: RemovalMode) -> FileDeduper {
    FileDeduper::new(FileMatcher::new(&["*.csv"]).unwrap(), removal)
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_duplicate_files_later_copy_removed() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(&root.join("siteA/S-L1-a.csv"), "_mb1s\n1\n");
    write(&root.join("siteB/S-L1-a.csv"), "_mb1s\n1\n");
    write(&root.join("siteB/S-L1-b.csv"), "_mb1s\n0\n");

    let report = csv_deduper(RemovalMode::Delete)
        .dedup(root, &DigestIndex::new())
        .unwrap();

    assert_eq!(report.files_hashed, 3);
    assert_eq!(report.files_removed(), 1);
    assert!(root.join("siteA/S-L1-a.csv").exists());
    assert!(!root.join("siteB/S-L1-a.csv").exists());
    assert!(root.join("siteB/S-L1-b.csv").exists());
    assert_eq!(report.bytes_reclaimed, "_mb1s\n1\n".len() as u64);
}

#[test]
fn test_sibling_directories_later_one_removed() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    // Non-matching files survive the file pass, so the directories stay identical.
    write(&root.join("alpha/notes.txt"), "same");
    write(&root.join("alpha/extra.txt"), "more");
    write(&root.join("beta/notes.txt"), "same");
    write(&root.join("beta/extra.txt"), "more");

    let report = csv_deduper(RemovalMode::Delete)
        .dedup(root, &DigestIndex::new())
        .unwrap();

    assert!(root.join("alpha/notes.txt").exists());
    assert!(root.join("alpha/extra.txt").exists());
    assert!(!root.join("beta").exists());
    assert_eq!(report.files_removed(), 0);
    assert_eq!(report.dirs_removed(), 1);
    assert_eq!(report.removed[0].kind, DigestKind::Directory);
    assert!(report.removed[0].path.ends_with("beta"));
    assert!(report.removed[0].kept.ends_with("alpha"));
}

#[test]
fn test_second_run_is_noop() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(&root.join("a/S-L1-x.csv"), "_lds\n1\n0\n");
    write(&root.join("b/S-L1-x.csv"), "_lds\n1\n0\n");
    write(&root.join("c/S-L2-x.csv"), "_lds\n0\n");

    let deduper = csv_deduper(RemovalMode::Delete);
    let first = deduper.dedup(root, &DigestIndex::new()).unwrap();
    assert!(first.has_removals());

    let second = deduper.dedup(root, &DigestIndex::new()).unwrap();
    assert!(!second.has_removals());
    assert_eq!(second.bytes_reclaimed, 0);
}

#[test]
fn test_second_run_with_same_index_is_noop() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(&root.join("a/S-L1-x.csv"), "_lds\n1\n0\n");
    write(&root.join("a/S-L1-y.csv"), "_lds\n0\n");
    write(&root.join("b/S-L1-x.csv"), "_lds\n1\n0\n");

    let deduper = csv_deduper(RemovalMode::Delete);
    let index = DigestIndex::new();
    let first = deduper.dedup(root, &index).unwrap();
    assert_eq!(first.files_removed(), 1);

    let second = deduper.dedup(root, &index).unwrap();
    assert!(!second.has_removals());
    assert!(root.join("a/S-L1-x.csv").exists());
    assert!(root.join("a/S-L1-y.csv").exists());
}

#[test]
fn test_failed_removal_is_reported_and_not_recorded() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("csv_files");
    let quarantine = temp.path().join("quarantine");
    write(&root.join("a/S-L1-x.csv"), "_lds\n1\n");
    write(&root.join("a/notes.txt"), "one");
    write(&root.join("b/S-L1-x.csv"), "_lds\n1\n");
    write(&root.join("b/notes.txt"), "two");
    // A plain file where the quarantine needs a directory
    write(&quarantine.join("b"), "blocker");

    let index = DigestIndex::new();
    let report = csv_deduper(RemovalMode::Quarantine { dir: quarantine })
        .dedup(&root, &index)
        .unwrap();

    assert!(!report.has_removals());
    assert_eq!(report.bytes_reclaimed, 0);
    assert!(root.join("b/S-L1-x.csv").exists());
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::RemovalFailed && w.path.ends_with("b/S-L1-x.csv"))
    );

    // The kept copy is still the one on record
    let report = csv_deduper(RemovalMode::Delete).dedup(&root, &index).unwrap();
    assert_eq!(report.files_removed(), 1);
    assert!(report.removed[0].path.ends_with("b/S-L1-x.csv"));
    assert!(report.removed[0].kept.ends_with("a/S-L1-x.csv"));
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let locked = root.join("a/S-L1-1.csv");
    let open = root.join("a/S-L1-2.csv");
    write(&locked, "_lds\n1\n");
    write(&open, "_lds\n1\n");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::File::open(&locked).is_ok() {
        // Permission bits are not enforced for this user
        return;
    }

    let deduper = csv_deduper(RemovalMode::Delete);
    let index = DigestIndex::new();
    let report = deduper.dedup(root, &index).unwrap();

    assert!(!report.has_removals());
    assert_eq!(report.files_hashed, 1);
    assert!(locked.exists());
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::Unreadable && w.path.ends_with("S-L1-1.csv"))
    );

    // Once readable it is a duplicate of the copy that was recorded instead
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
    let report = deduper.dedup(root, &index).unwrap();
    assert_eq!(report.files_removed(), 1);
    assert!(report.removed[0].path.ends_with("S-L1-1.csv"));
    assert!(report.removed[0].kept.ends_with("S-L1-2.csv"));
    assert!(open.exists());
}

#[test]
fn test_trash_mode_removes_or_warns() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(&root.join("a/S-L1-x.csv"), "_lds\n1\n");
    write(&root.join("b/S-L1-x.csv"), "_lds\n1\n");

    let report = csv_deduper(RemovalMode::Trash)
        .dedup(root, &DigestIndex::new())
        .unwrap();

    assert!(root.join("a/S-L1-x.csv").exists());
    let duplicate = root.join("b/S-L1-x.csv");
    if report.has_removals() {
        assert!(!duplicate.exists());
        assert!(report.removed[0].quarantined_to.is_none());
    } else {
        // Headless environments may have no usable trash
        assert!(duplicate.exists());
        assert!(report.warnings.iter().any(|w| w.kind == WarningKind::RemovalFailed));
    }
}

#[test]
fn test_empty_files_dedup_normally() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(&root.join("one.csv"), "");
    write(&root.join("two.csv"), "");

    let report = csv_deduper(RemovalMode::Delete)
        .dedup(root, &DigestIndex::new())
        .unwrap();

    assert_eq!(report.files_removed(), 1);
    assert!(root.join("one.csv").exists());
    assert!(!root.join("two.csv").exists());
}

#[test]
fn test_non_matching_files_are_not_deduplicated() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(&root.join("a.txt"), "same");
    write(&root.join("b.txt"), "same");

    let report = csv_deduper(RemovalMode::Delete)
        .dedup(root, &DigestIndex::new())
        .unwrap();

    assert_eq!(report.files_hashed, 0);
    assert!(root.join("a.txt").exists());
    assert!(root.join("b.txt").exists());
}

#[test]
fn test_shared_index_spans_roots() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write(&first.path().join("S-L1-a.csv"), "_mb1s\n1\n");
    write(&second.path().join("S-L1-a.csv"), "_mb1s\n1\n");

    let deduper = csv_deduper(RemovalMode::Delete);
    let index = DigestIndex::new();
    deduper.dedup(first.path(), &index).unwrap();
    let report = deduper.dedup(second.path(), &index).unwrap();

    assert_eq!(report.files_removed(), 1);
    assert!(first.path().join("S-L1-a.csv").exists());
    assert!(!second.path().join("S-L1-a.csv").exists());
}

#[test]
fn test_quarantine_mode_moves_duplicates() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("csv_files");
    let quarantine = temp.path().join("quarantine");
    write(&root.join("a/S-L1-x.csv"), "_lds\n1\n");
    write(&root.join("b/S-L1-x.csv"), "_lds\n1\n");

    let report = csv_deduper(RemovalMode::Quarantine {
        dir: quarantine.clone(),
    })
    .dedup(&root, &DigestIndex::new())
    .unwrap();

    assert_eq!(report.files_removed(), 1);
    assert!(!root.join("b/S-L1-x.csv").exists());

    let removal = &report.removed[0];
    let target = removal.quarantined_to.as_ref().unwrap();
    assert!(target.exists());
    assert!(target.ends_with("b/S-L1-x.csv"));
    assert_eq!(fs::read_to_string(target).unwrap(), "_lds\n1\n");
}

#[test]
fn test_dedup_rejects_file_root() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("file.csv");
    write(&file, "x");

    let err = csv_deduper(RemovalMode::Delete)
        .dedup(&file, &DigestIndex::new())
        .unwrap_err();
    assert!(matches!(err, LiftError::NotADirectory { .. }));
}

#[test]
fn test_progress_updates_are_published() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(&root.join("d/a.csv"), "1");
    write(&root.join("d/b.csv"), "2");

    let deduper = csv_deduper(RemovalMode::Delete);
    let mut rx = deduper.subscribe();
    deduper.dedup(root, &DigestIndex::new()).unwrap();

    let mut last = None;
    while let Ok(progress) = rx.try_recv() {
        last = Some(progress);
    }
    let last = last.unwrap();
    assert_eq!(last.files_hashed, 2);
    assert_eq!(last.phase, DedupPhase::Directories);
}
