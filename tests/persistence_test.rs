#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

const SEEDS: &str = r#"
    "actors": [
        {"id": 1, "role": "superadmin"},
        {"id": 2, "role": "course_owner"},
        {"id": 10, "role": "student"},
        {"id": 11, "role": "student"}
    ],
    "courses": [{"id": 1, "instructor": 2, "price": "2999"}]
"#;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: an offline payment gets approved.
    let mut scenario1 = tempfile::NamedTempFile::new().unwrap();
    write!(
        scenario1,
        r#"{{ {SEEDS},
            "operations": [
                {{"op": "request_offline", "student": 10, "course": 1,
                  "bank_name": "First Bank", "transaction_id": "TXN-1",
                  "transaction_date": "2024-06-01",
                  "evidence_ref": "uploads/r1.png"}},
                {{"op": "approve", "actor": 2, "payment": 1}}
            ]
        }}"#
    )
    .unwrap();

    let mut cmd1 = Command::new(cargo_bin!("coursegate"));
    cmd1.arg(scenario1.path()).arg("--db-path").arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("1,10,1,offline,completed,2999"));
    assert!(stdout1.contains("10,1,completed,offline"));

    // 2. Second run against the same DB path: the ledger and enrollment are
    // recovered, and the payment id sequence continues.
    let mut scenario2 = tempfile::NamedTempFile::new().unwrap();
    write!(
        scenario2,
        r#"{{ {SEEDS},
            "operations": [
                {{"op": "initiate_online", "student": 11, "course": 1}},
                {{"op": "verify_online", "student": 11, "course": 1}}
            ]
        }}"#
    )
    .unwrap();

    let mut cmd2 = Command::new(cargo_bin!("coursegate"));
    cmd2.arg(scenario2.path()).arg("--db-path").arg(&db_path);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains("1,10,1,offline,completed,2999"));
    assert!(stdout2.contains("2,11,1,online,completed,2999"));
    assert!(stdout2.contains("10,1,completed,offline"));
    assert!(stdout2.contains("11,1,completed,online"));
}

#[test]
fn test_rocksdb_blocks_second_enrollment_purchase() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut scenario1 = tempfile::NamedTempFile::new().unwrap();
    write!(
        scenario1,
        r#"{{ {SEEDS},
            "operations": [
                {{"op": "initiate_online", "student": 10, "course": 1}},
                {{"op": "verify_online", "student": 10, "course": 1}}
            ]
        }}"#
    )
    .unwrap();
    let output1 = Command::new(cargo_bin!("coursegate"))
        .arg(scenario1.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());

    // The recovered enrollment refuses a second purchase of the same course.
    let mut scenario2 = tempfile::NamedTempFile::new().unwrap();
    write!(
        scenario2,
        r#"{{ {SEEDS},
            "operations": [
                {{"op": "initiate_online", "student": 10, "course": 1}}
            ]
        }}"#
    )
    .unwrap();
    let output2 = Command::new(cargo_bin!("coursegate"))
        .arg(scenario2.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());
    let stderr2 = String::from_utf8_lossy(&output2.stderr);
    assert!(stderr2.contains("Error applying operation"));
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    // No second payment row was created.
    assert!(!stdout2.contains("2,10,1,online"));
}
