use liftmetrics_core::{
    Digest, LiftError, PipelineConfig, RemovalMode, Table, TieBreak, group_by_lift,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_config_from_toml() {
    let config = PipelineConfig::from_toml_str(
        r#"
        root = "/srv/lifts"
        ignore_columns = ["id"]
        parallel_lifts = true
        track_mileage = false

        [columns]
        door = "door_state"

        [removal]
        mode = "quarantine"
        dir = "quarantine"

        [mode]
        excluded_floors = [0, -1]
        tie_break = "highest_floor"
        "#,
    )
    .unwrap();

    assert_eq!(config.root, PathBuf::from("/srv/lifts"));
    assert_eq!(config.ignore_columns, vec!["id".to_string()]);
    assert!(config.parallel_lifts);
    assert!(!config.track_mileage);
    assert_eq!(config.columns.door, "door_state");
    // Unset columns keep their defaults
    assert_eq!(config.columns.floor, "_lfls");
    assert_eq!(
        config.removal,
        RemovalMode::Quarantine {
            dir: PathBuf::from("quarantine")
        }
    );
    assert_eq!(config.mode.excluded_floors, vec![0, -1]);
    assert_eq!(config.mode.tie_break, TieBreak::HighestFloor);
    assert_eq!(config.brake.from, [1, 1]);
}

#[test]
fn test_config_missing_root_is_fatal() {
    let err = PipelineConfig::from_toml_str("raw_dir = \"x\"").unwrap_err();
    assert!(matches!(err, LiftError::ConfigMissing { .. }));
    assert!(!err.is_recoverable());
}

#[test]
fn test_config_missing_file_is_config_missing() {
    let temp = TempDir::new().unwrap();
    let err = PipelineConfig::from_toml_file(temp.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, LiftError::ConfigMissing { .. }));
}

#[test]
fn test_config_rejects_bad_patterns() {
    let err = PipelineConfig::from_toml_str(
        r#"
        root = "/srv"
        [brake]
        from = [2, 1]
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, LiftError::InvalidConfig { .. }));

    let err = PipelineConfig::from_toml_str("root = \"/srv\"\nfile_patterns = [\"[\"]")
        .unwrap()
        .file_matcher()
        .unwrap_err();
    assert!(matches!(err, LiftError::InvalidConfig { .. }));
}

#[test]
fn test_table_from_empty_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("S-L1-empty.csv");
    fs::write(&path, "").unwrap();

    let err = Table::from_path(&path).unwrap_err();
    assert!(matches!(err, LiftError::EmptyFile { .. }));
    assert!(err.is_recoverable());
}

#[test]
fn test_table_header_only() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("S-L1-header.csv");
    fs::write(&path, "_mb1s,_mb2s\n").unwrap();

    let table = Table::from_path(&path).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.source(), path.as_path());
}

#[test]
fn test_table_unreadable() {
    let err = Table::from_path("/definitely/not/here.csv").unwrap_err();
    assert!(matches!(err, LiftError::FileUnreadable { .. }));
}

#[test]
fn test_table_write_creates_parents() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("site/nested/S-L1-x.csv");

    let mut table = Table::new(["id", "_lds"]);
    table.push(["1", "0"]);
    table.write_path(&path).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "id,_lds\n1,0\n");
}

#[test]
fn test_grouping_is_order_independent() {
    let a = group_by_lift(["/x/S-L1-a.csv", "/x/S-L2-b.csv", "/y/S-L1-c.csv"]);
    let b = group_by_lift(["/y/S-L1-c.csv", "/x/S-L2-b.csv", "/x/S-L1-a.csv"]);
    assert_eq!(a.datasets, b.datasets);
}

#[test]
fn test_digest_equality() {
    assert_eq!(Digest::new([7; 32]), Digest::new([7; 32]));
    assert_ne!(Digest::new([7; 32]), Digest::new([8; 32]));
}
