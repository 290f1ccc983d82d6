#![forbid(unsafe_code)]

use psip_contracts::location::{SchoolId, SchoolSiteInput};
use psip_contracts::project::{
    EngineerPayload, ProgressPercent, ProjectIdentifier, ProjectPayload, ProjectStatus,
    ProjectVersionInput, SubmitterRole, UserId, VersionId,
};
use psip_contracts::{IsoDate, MonotonicTimeNs};
use psip_storage::{LedgerStore, StorageError};
use rust_decimal::Decimal;

fn seeded_store() -> LedgerStore {
    let mut store = LedgerStore::new_in_memory();
    store
        .ingest_school_site(SchoolSiteInput {
            school_id: "100001".to_string(),
            school_name: "San Isidro Elementary School".to_string(),
            region: "Region I".to_string(),
            division: "Ilocos Norte".to_string(),
            district: "Laoag East".to_string(),
            municipality: "Laoag City".to_string(),
            legislative_district: "1st District".to_string(),
            barangay: "Barangay 7".to_string(),
        })
        .unwrap();
    store
}

fn version_input(ipc: &str, progress: u8, reported_as_of: &str) -> ProjectVersionInput {
    ProjectVersionInput::v1(
        ProjectIdentifier::new(ipc).unwrap(),
        SchoolId::new("100001").unwrap(),
        ProjectStatus::Ongoing,
        ProgressPercent::new(progress).unwrap(),
        IsoDate::new(reported_as_of).unwrap(),
        MonotonicTimeNs(1_000),
        ProjectPayload::Engineer(EngineerPayload {
            project_name: "Two-Storey Classroom".to_string(),
            contractor_name: Some("JB Builders".to_string()),
            project_allocation: Some(Decimal::new(1_500_000, 0)),
            batch_of_funds: None,
            target_completion_date: None,
            actual_completion_date: None,
            notice_to_proceed: None,
            other_remarks: None,
        }),
        UserId::new("engineer_uid_1").unwrap(),
        SubmitterRole::Engineer,
    )
    .unwrap()
}

#[test]
fn at_ledger_01_append_always_grows_the_ledger() {
    let mut store = seeded_store();
    let v1 = store
        .append_project_version(version_input("IPC-2025-00001", 40, "2025-06-01"))
        .unwrap();
    let v2 = store
        .append_project_version(version_input("IPC-2025-00001", 60, "2025-07-01"))
        .unwrap();
    assert!(v2 > v1);
    assert_eq!(store.project_ledger().len(), 2);
    assert_eq!(
        store
            .project_versions(&ProjectIdentifier::new("IPC-2025-00001").unwrap())
            .len(),
        2
    );
}

#[test]
fn at_ledger_02_no_uniqueness_on_identical_field_values() {
    let mut store = seeded_store();
    // Same identifier, same status, same progress, same date: both rows
    // must land, as two distinct auditable versions.
    let a = store
        .append_project_version(version_input("IPC-2025-00001", 40, "2025-06-01"))
        .unwrap();
    let b = store
        .append_project_version(version_input("IPC-2025-00001", 40, "2025-06-01"))
        .unwrap();
    assert_ne!(a, b);
    assert_eq!(store.project_ledger().len(), 2);
}

#[test]
fn at_ledger_03_current_follows_version_id_not_reported_date() {
    let mut store = seeded_store();
    store
        .append_project_version(version_input("IPC-2025-00001", 40, "2025-07-01"))
        .unwrap();
    // Later write carries an earlier reported date; it is still current.
    let v2 = store
        .append_project_version(version_input("IPC-2025-00001", 60, "2025-05-01"))
        .unwrap();

    let current = store
        .project_current(&ProjectIdentifier::new("IPC-2025-00001").unwrap())
        .unwrap();
    assert_eq!(current.version_id, v2);
    assert_eq!(current.progress_percent.as_u8(), 60);
    assert_eq!(current.reported_as_of, IsoDate::new("2025-05-01").unwrap());
}

#[test]
fn at_ledger_04_rebuild_reproduces_the_projection() {
    let mut store = seeded_store();
    store
        .append_project_version(version_input("IPC-2025-00001", 40, "2025-06-01"))
        .unwrap();
    store
        .append_project_version(version_input("IPC-2025-00001", 60, "2025-07-01"))
        .unwrap();
    store
        .append_project_version(version_input("IPC-2025-00002", 10, "2025-07-15"))
        .unwrap();

    let before = store.projects_current().clone();
    store.rebuild_projects_current_from_ledger();
    assert_eq!(store.projects_current(), &before);

    let scope = SchoolId::new("100001").unwrap();
    assert_eq!(store.current_for_scope(&scope).len(), 2);
}

#[test]
fn at_ledger_05_overwrite_is_refused() {
    let mut store = seeded_store();
    store
        .append_project_version(version_input("IPC-2025-00001", 40, "2025-06-01"))
        .unwrap();
    let err = store
        .attempt_overwrite_project_version(VersionId(1))
        .unwrap_err();
    assert_eq!(
        err,
        StorageError::AppendOnlyViolation {
            table: "project_ledger"
        }
    );
}

#[test]
fn at_ledger_06_unknown_scope_is_a_foreign_key_violation() {
    let mut store = seeded_store();
    let input = ProjectVersionInput::v1(
        ProjectIdentifier::new("IPC-2025-00001").unwrap(),
        SchoolId::new("999999").unwrap(),
        ProjectStatus::NotYetStarted,
        ProgressPercent::new(0).unwrap(),
        IsoDate::new("2025-06-01").unwrap(),
        MonotonicTimeNs(1_000),
        ProjectPayload::Engineer(EngineerPayload {
            project_name: "Covered Court".to_string(),
            contractor_name: None,
            project_allocation: None,
            batch_of_funds: None,
            target_completion_date: None,
            actual_completion_date: None,
            notice_to_proceed: None,
            other_remarks: None,
        }),
        UserId::new("engineer_uid_1").unwrap(),
        SubmitterRole::Engineer,
    )
    .unwrap();
    let err = store.append_project_version(input).unwrap_err();
    assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));
    assert!(store.project_ledger().is_empty());
}
