#![forbid(unsafe_code)]

use psip_contracts::activity::{ActivityAction, ActivityInput};
use psip_contracts::forms::{FormCategory, FormSubmissionInput};
use psip_contracts::location::{SchoolId, SchoolSiteInput};
use psip_contracts::project::{AttachmentKind, AttachmentRef, UserId, VersionId};
use psip_contracts::MonotonicTimeNs;
use psip_storage::{LedgerStore, StorageError};

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

fn submission(school_id: &str, category: FormCategory, at: u64) -> FormSubmissionInput {
    FormSubmissionInput::v1(
        SchoolId::new(school_id).unwrap(),
        category,
        UserId::new("head_uid_1").unwrap(),
        MonotonicTimeNs(at),
    )
    .unwrap()
}

#[test]
fn at_forms_01_latest_per_category_wins() {
    let mut store = seeded_store();
    store
        .append_form_submission(submission("100001", FormCategory::Enrolment, 10))
        .unwrap();
    let second = store
        .append_form_submission(submission("100001", FormCategory::Enrolment, 20))
        .unwrap();
    store
        .append_form_submission(submission("100001", FormCategory::Profile, 30))
        .unwrap();

    let school = SchoolId::new("100001").unwrap();
    let latest = store.latest_form_submissions(&school);
    assert_eq!(latest.len(), 2);
    assert_eq!(
        latest
            .get(&FormCategory::Enrolment)
            .unwrap()
            .form_submission_id,
        second
    );
    // The ledger keeps every row.
    assert_eq!(store.form_submissions().len(), 3);
}

#[test]
fn at_forms_02_unknown_school_is_refused() {
    let mut store = seeded_store();
    let err = store
        .append_form_submission(submission("999999", FormCategory::Profile, 10))
        .unwrap_err();
    assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));
}

#[test]
fn at_activity_01_rows_append_in_order() {
    let mut store = seeded_store();
    for (i, action) in [ActivityAction::Create, ActivityAction::Update].iter().enumerate() {
        store
            .append_activity(
                ActivityInput::v1(
                    MonotonicTimeNs(1 + i as u64),
                    UserId::new("engineer_uid_1").unwrap(),
                    "Engineer",
                    *action,
                    "IPC-2025-00001",
                    "test row",
                )
                .unwrap(),
            )
            .unwrap();
    }
    let log = store.activity_log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].activity_id, 1);
    assert_eq!(log[1].action, ActivityAction::Update);
}

#[test]
fn at_attachments_01_reference_requires_an_existing_version() {
    let mut store = seeded_store();
    let reference = AttachmentRef {
        kind: AttachmentKind::Image,
        digest_hex: "a".repeat(64),
        byte_len: 2_048,
    };
    let err = store
        .append_attachment(
            VersionId(99),
            reference,
            UserId::new("engineer_uid_1").unwrap(),
            MonotonicTimeNs(5),
        )
        .unwrap_err();
    assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));
}
