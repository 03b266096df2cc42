use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::*;

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_project_dir() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let sequence = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut path = std::env::temp_dir();
    path.push(format!(
        "chainlift-store-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        sequence
    ));
    path
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("must create parent dirs");
    }
    fs::write(path, content).expect("must write file");
}

fn seed_project(dir: &Path) {
    write_file(
        &dir.join("project.toml"),
        "[project]\nname = \"storefront\"\nframework_version = \"14.2.0\"\n\n[dependencies]\nacme-router = \"14.2.0\"\n",
    );
    write_file(&dir.join("src/main.code"), "entrypoint v14\n");
    write_file(&dir.join("src/widgets/cart.code"), "cart widget\n");
    write_file(&dir.join("node_modules/acme-router/index.code"), "vendored\n");
    write_file(&dir.join(".git/HEAD"), "ref: refs/heads/main\n");
}

fn read_file(path: &Path) -> String {
    fs::read_to_string(path).expect("must read file")
}

#[test]
fn capture_then_restore_round_trips_project_files() {
    let dir = test_project_dir();
    seed_project(&dir);
    let store = CheckpointStore::open(&dir);

    let checkpoint = store
        .create_checkpoint("14.2.0", "before upgrade")
        .expect("must create checkpoint");
    assert_eq!(checkpoint.version_label, "14.2.0");
    assert_eq!(checkpoint.metadata.build_status, BuildStatus::Skipped);
    assert!(checkpoint.metadata.file_count >= 3);

    // Mutate and damage the working tree.
    write_file(&dir.join("src/main.code"), "entrypoint v15\n");
    fs::remove_file(dir.join("src/widgets/cart.code")).expect("must remove file");
    write_file(&dir.join("src/new-in-15.code"), "should disappear\n");

    store.restore(&checkpoint.id).expect("must restore");

    assert_eq!(read_file(&dir.join("src/main.code")), "entrypoint v14\n");
    assert_eq!(read_file(&dir.join("src/widgets/cart.code")), "cart widget\n");
    assert!(!dir.join("src/new-in-15.code").exists());
    // Excluded trees are left alone by both capture and restore.
    assert_eq!(
        read_file(&dir.join("node_modules/acme-router/index.code")),
        "vendored\n"
    );
    assert_eq!(read_file(&dir.join(".git/HEAD")), "ref: refs/heads/main\n");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn capture_never_includes_its_own_storage() {
    let dir = test_project_dir();
    seed_project(&dir);
    let store = CheckpointStore::open(&dir);

    let first = store
        .create_checkpoint("14.2.0", "first")
        .expect("must create checkpoint");
    let second = store
        .create_checkpoint("14.2.0", "second")
        .expect("must create checkpoint");

    let second_payload = store.layout().payload_dir(&second.id);
    assert!(!second_payload.join(STORE_DIR_NAME).exists());
    // Both captures of an unchanged tree see identical content.
    assert_eq!(
        first.metadata.tree_digest,
        second.metadata.tree_digest
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn restore_is_idempotent() {
    let dir = test_project_dir();
    seed_project(&dir);
    let store = CheckpointStore::open(&dir);

    let checkpoint = store
        .create_checkpoint("14.2.0", "baseline")
        .expect("must create checkpoint");
    write_file(&dir.join("src/main.code"), "scribbled\n");

    store.restore(&checkpoint.id).expect("first restore");
    let after_first = store
        .create_checkpoint("14.2.0", "after first restore")
        .expect("must create checkpoint");

    store.restore(&checkpoint.id).expect("second restore");
    let after_second = store
        .create_checkpoint("14.2.0", "after second restore")
        .expect("must create checkpoint");

    assert_eq!(
        after_first.metadata.tree_digest,
        after_second.metadata.tree_digest
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn restore_unknown_checkpoint_is_typed_error() {
    let dir = test_project_dir();
    seed_project(&dir);
    let store = CheckpointStore::open(&dir);

    let err = store.restore("cp-0-000000").expect_err("must fail");
    assert!(matches!(
        err.downcast_ref::<UpgradeError>(),
        Some(UpgradeError::CheckpointNotFound(_))
    ));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn list_preserves_creation_order() {
    let dir = test_project_dir();
    seed_project(&dir);
    let store = CheckpointStore::open(&dir);

    let first = store
        .create_checkpoint("14.2.0", "first")
        .expect("must create checkpoint");
    let second = store
        .create_checkpoint("15.0.0", "second")
        .expect("must create checkpoint");

    let listed = store.list().expect("must list");
    let ids: Vec<&str> = listed.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cleanup_keeps_most_recent_checkpoints() {
    let dir = test_project_dir();
    seed_project(&dir);
    let store = CheckpointStore::open(&dir);

    let mut ids = Vec::new();
    for index in 0..4 {
        let checkpoint = store
            .create_checkpoint("14.2.0", &format!("checkpoint {index}"))
            .expect("must create checkpoint");
        ids.push(checkpoint.id);
    }

    let deleted = store.cleanup(2).expect("must clean up");
    assert_eq!(deleted.len(), 2);

    let remaining: Vec<String> = store
        .list()
        .expect("must list")
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(remaining, vec![ids[2].clone(), ids[3].clone()]);

    // Storage for deleted checkpoints is gone too.
    for id in &deleted {
        assert!(!store.layout().checkpoint_dir(id).exists());
    }

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cleanup_with_enough_room_is_a_no_op() {
    let dir = test_project_dir();
    seed_project(&dir);
    let store = CheckpointStore::open(&dir);

    store
        .create_checkpoint("14.2.0", "only")
        .expect("must create checkpoint");
    let deleted = store.cleanup(5).expect("must clean up");
    assert!(deleted.is_empty());
    assert_eq!(store.list().expect("must list").len(), 1);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn validate_passes_for_intact_checkpoint() {
    let dir = test_project_dir();
    seed_project(&dir);
    let store = CheckpointStore::open(&dir);

    let checkpoint = store
        .create_checkpoint("14.2.0", "intact")
        .expect("must create checkpoint");
    let validation = store.validate(&checkpoint.id);
    assert!(validation.valid, "unexpected errors: {:?}", validation.errors);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn validate_reports_damaged_payload() {
    let dir = test_project_dir();
    seed_project(&dir);
    let store = CheckpointStore::open(&dir);

    let checkpoint = store
        .create_checkpoint("14.2.0", "to damage")
        .expect("must create checkpoint");
    let payload = store.layout().payload_dir(&checkpoint.id);
    fs::remove_file(payload.join("project.toml")).expect("must remove essential file");

    let validation = store.validate(&checkpoint.id);
    assert!(!validation.valid);
    assert!(validation
        .errors
        .iter()
        .any(|error| error.contains("essential file missing")));
    assert!(validation
        .errors
        .iter()
        .any(|error| error.contains("digest mismatch")));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn validate_reports_index_storage_divergence() {
    let dir = test_project_dir();
    seed_project(&dir);
    let store = CheckpointStore::open(&dir);

    // Storage without an index entry.
    let orphan_dir = store.layout().checkpoint_dir("cp-orphan-000001");
    fs::create_dir_all(orphan_dir.join("payload")).expect("must create orphan storage");
    let validation = store.validate("cp-orphan-000001");
    assert!(!validation.valid);
    assert!(validation
        .errors
        .iter()
        .any(|error| error.contains("index has no entry")));

    // Index entry without storage.
    let checkpoint = store
        .create_checkpoint("14.2.0", "will lose storage")
        .expect("must create checkpoint");
    fs::remove_dir_all(store.layout().checkpoint_dir(&checkpoint.id))
        .expect("must remove storage");
    let validation = store.validate(&checkpoint.id);
    assert!(!validation.valid);
    assert!(validation
        .errors
        .iter()
        .any(|error| error.contains("storage is missing")));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn delete_removes_index_entry_and_storage() {
    let dir = test_project_dir();
    seed_project(&dir);
    let store = CheckpointStore::open(&dir);

    let checkpoint = store
        .create_checkpoint("14.2.0", "short lived")
        .expect("must create checkpoint");
    store.delete(&checkpoint.id).expect("must delete");

    assert!(store.list().expect("must list").is_empty());
    assert!(!store.layout().checkpoint_dir(&checkpoint.id).exists());

    let err = store.delete(&checkpoint.id).expect_err("second delete must fail");
    assert!(matches!(
        err.downcast_ref::<UpgradeError>(),
        Some(UpgradeError::CheckpointNotFound(_))
    ));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn checkpoint_metadata_captures_manifest() {
    let dir = test_project_dir();
    seed_project(&dir);
    let store = CheckpointStore::open(&dir);

    let checkpoint = store
        .create_checkpoint("14.2.0", "with manifest")
        .expect("must create checkpoint");
    let manifest = checkpoint
        .metadata
        .manifest
        .expect("manifest must be captured");
    assert_eq!(manifest.project.name, "storefront");
    assert_eq!(manifest.project.framework_version.major, 14);

    let _ = fs::remove_dir_all(&dir);
}
