#![forbid(unsafe_code)]

use psip_contracts::forms::{FormCategory, FormSubmissionInput};
use psip_contracts::location::{LocationPath, RollupGroupBy, SchoolId, SchoolSiteInput};
use psip_contracts::project::{
    EngineerPayload, ProgressPercent, ProjectIdentifier, ProjectPayload, ProjectStatus,
    ProjectVersionInput, SubmitterRole, UserId, VersionId,
};
use psip_contracts::validation::{
    ActorContext, ActorRole, ValidationDecision, ValidationDecisionRequest,
};
use psip_contracts::{IsoDate, MonotonicTimeNs};
use psip_core::error::LedgerError;
use psip_core::runtime::{LedgerRuntime, NewProjectInput};
use rust_decimal::Decimal;

fn site(school_id: &str, district: &str, legislative: &str, municipality: &str) -> SchoolSiteInput {
    SchoolSiteInput {
        school_id: school_id.to_string(),
        school_name: format!("School {school_id}"),
        region: "Region I".to_string(),
        division: "Ilocos Norte".to_string(),
        district: district.to_string(),
        municipality: municipality.to_string(),
        legislative_district: legislative.to_string(),
        barangay: "Poblacion".to_string(),
    }
}

fn seeded_runtime() -> LedgerRuntime {
    let mut rt = LedgerRuntime::new();
    rt.ingest_school_sites(vec![
        site("100001", "Laoag East", "1st District", "Laoag City"),
        site("100002", "Laoag West", "2nd District", "Laoag City"),
        site("100003", "Batac North", "2nd District", "Batac City"),
    ])
    .unwrap();
    rt
}

fn engineer_payload(name: &str) -> ProjectPayload {
    ProjectPayload::Engineer(EngineerPayload {
        project_name: name.to_string(),
        contractor_name: Some("JB Builders".to_string()),
        project_allocation: Some(Decimal::new(1_500_000, 0)),
        batch_of_funds: Some("Batch 2".to_string()),
        target_completion_date: None,
        actual_completion_date: None,
        notice_to_proceed: None,
        other_remarks: None,
    })
}

fn new_project(school_id: &str, progress: u8, at: u64) -> NewProjectInput {
    NewProjectInput::v1(
        SchoolId::new(school_id).unwrap(),
        ProjectStatus::Ongoing,
        ProgressPercent::new(progress).unwrap(),
        IsoDate::new("2025-06-01").unwrap(),
        MonotonicTimeNs(at),
        engineer_payload("Two-Storey Classroom"),
        UserId::new("engineer_uid_1").unwrap(),
        SubmitterRole::Engineer,
    )
    .unwrap()
}

fn follow_up(
    identifier: &ProjectIdentifier,
    school_id: &str,
    progress: u8,
    at: u64,
) -> ProjectVersionInput {
    ProjectVersionInput::v1(
        identifier.clone(),
        SchoolId::new(school_id).unwrap(),
        ProjectStatus::Ongoing,
        ProgressPercent::new(progress).unwrap(),
        IsoDate::new("2025-07-01").unwrap(),
        MonotonicTimeNs(at),
        engineer_payload("Two-Storey Classroom"),
        UserId::new("engineer_uid_1").unwrap(),
        SubmitterRole::Engineer,
    )
    .unwrap()
}

fn head_decision(
    identifier: &ProjectIdentifier,
    school_id: &str,
    decision: ValidationDecision,
    version: VersionId,
    remarks: Option<&str>,
    at: u64,
) -> ValidationDecisionRequest {
    ValidationDecisionRequest::v1(
        identifier.clone(),
        decision,
        version,
        remarks.map(|r| r.to_string()),
        ActorContext {
            user_id: UserId::new("head_uid_1").unwrap(),
            role: ActorRole::SchoolHead,
            scope_key: SchoolId::new(school_id).unwrap(),
        },
        MonotonicTimeNs(at),
    )
    .unwrap()
}

#[test]
fn at_runtime_01_create_issues_sequential_codes_and_seeds_pending() {
    let mut rt = seeded_runtime();
    let first = rt.create_project(new_project("100001", 40, 1_000)).unwrap();
    let second = rt.create_project(new_project("100002", 10, 2_000)).unwrap();

    assert_eq!(first.project_identifier.as_str(), "IPC-2025-00001");
    assert_eq!(second.project_identifier.as_str(), "IPC-2025-00002");

    let view = rt.project_view(&first.project_identifier).unwrap();
    assert_eq!(view.effective_decision, ValidationDecision::Pending);
    assert_eq!(view.version_count, 1);
}

#[test]
fn at_runtime_02_unknown_school_burns_no_sequence_number() {
    let mut rt = seeded_runtime();
    let err = rt
        .create_project(new_project("999999", 40, 1_000))
        .unwrap_err();
    assert!(matches!(err, LedgerError::UnknownScope { .. }));

    let created = rt.create_project(new_project("100001", 40, 2_000)).unwrap();
    assert_eq!(created.project_identifier.as_str(), "IPC-2025-00001");
}

#[test]
fn at_runtime_03_reject_then_update_reads_pending_with_remarks_retained() {
    let mut rt = seeded_runtime();
    let created = rt.create_project(new_project("100001", 40, 1_000)).unwrap();
    let ipc = created.project_identifier.clone();

    rt.decide_validation(head_decision(
        &ipc,
        "100001",
        ValidationDecision::Rejected,
        created.version_id,
        Some("missing photos"),
        2_000,
    ))
    .unwrap();
    let view = rt.project_view(&ipc).unwrap();
    assert_eq!(view.effective_decision, ValidationDecision::Rejected);

    let v2 = rt.append_version(follow_up(&ipc, "100001", 60, 3_000)).unwrap();
    let view = rt.project_view(&ipc).unwrap();
    assert_eq!(view.current.version_id, v2);
    assert_eq!(view.current.progress_percent.as_u8(), 60);
    // The stored record still carries the rejection remarks; the effective
    // state is Pending because the decision is bound to a superseded row.
    assert_eq!(view.effective_decision, ValidationDecision::Pending);
    let record = view.decision_record.unwrap();
    assert_eq!(record.remarks.as_deref(), Some("missing photos"));
    assert_eq!(record.validated_version_id, created.version_id);
}

#[test]
fn at_runtime_04_stale_decision_is_refused_with_both_versions() {
    let mut rt = seeded_runtime();
    let created = rt.create_project(new_project("100001", 40, 1_000)).unwrap();
    let ipc = created.project_identifier.clone();
    let v2 = rt.append_version(follow_up(&ipc, "100001", 60, 2_000)).unwrap();

    rt.decide_validation(head_decision(
        &ipc,
        "100001",
        ValidationDecision::Validated,
        v2,
        None,
        3_000,
    ))
    .unwrap();
    let view = rt.project_view(&ipc).unwrap();
    assert_eq!(view.effective_decision, ValidationDecision::Validated);

    // A late confirm against the superseded version must not apply.
    let err = rt
        .decide_validation(head_decision(
            &ipc,
            "100001",
            ValidationDecision::Validated,
            created.version_id,
            None,
            4_000,
        ))
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::StaleDecision {
            referenced: created.version_id,
            current: v2,
        }
    );
    let view = rt.project_view(&ipc).unwrap();
    assert_eq!(view.effective_decision, ValidationDecision::Validated);
}

#[test]
fn at_runtime_05_only_the_owning_school_head_may_decide() {
    let mut rt = seeded_runtime();
    let created = rt.create_project(new_project("100001", 40, 1_000)).unwrap();
    let ipc = created.project_identifier.clone();

    let wrong_school = ValidationDecisionRequest::v1(
        ipc.clone(),
        ValidationDecision::Validated,
        created.version_id,
        None,
        ActorContext {
            user_id: UserId::new("head_uid_2").unwrap(),
            role: ActorRole::SchoolHead,
            scope_key: SchoolId::new("100002").unwrap(),
        },
        MonotonicTimeNs(2_000),
    )
    .unwrap();
    assert!(matches!(
        rt.decide_validation(wrong_school).unwrap_err(),
        LedgerError::Forbidden { .. }
    ));

    let engineer = ValidationDecisionRequest::v1(
        ipc.clone(),
        ValidationDecision::Validated,
        created.version_id,
        None,
        ActorContext {
            user_id: UserId::new("engineer_uid_1").unwrap(),
            role: ActorRole::Engineer,
            scope_key: SchoolId::new("100001").unwrap(),
        },
        MonotonicTimeNs(2_000),
    )
    .unwrap();
    assert!(matches!(
        rt.decide_validation(engineer).unwrap_err(),
        LedgerError::Forbidden { .. }
    ));
}

#[test]
fn at_runtime_06_identical_resubmission_appends_a_new_version() {
    let mut rt = seeded_runtime();
    let created = rt.create_project(new_project("100001", 40, 1_000)).unwrap();
    let ipc = created.project_identifier.clone();

    let a = rt.append_version(follow_up(&ipc, "100001", 60, 2_000)).unwrap();
    let b = rt.append_version(follow_up(&ipc, "100001", 60, 2_000)).unwrap();
    assert_ne!(a, b);

    let history = rt.project_history(&ipc).unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(rt.project_view(&ipc).unwrap().current.version_id, b);
}

#[test]
fn at_runtime_07_rebuild_agrees_with_live_projection() {
    let mut rt = seeded_runtime();
    let created = rt.create_project(new_project("100001", 40, 1_000)).unwrap();
    let ipc = created.project_identifier.clone();
    rt.append_version(follow_up(&ipc, "100001", 60, 2_000)).unwrap();
    rt.create_project(new_project("100003", 90, 3_000)).unwrap();

    let before = rt.project_view(&ipc).unwrap();
    rt.rebuild_projections();
    let after = rt.project_view(&ipc).unwrap();
    assert_eq!(before, after);
}

#[test]
fn at_runtime_08_region_stats_partition_by_requested_dimension() {
    let mut rt = seeded_runtime();
    rt.create_project(new_project("100001", 40, 1_000)).unwrap();
    rt.create_project(new_project("100002", 60, 2_000)).unwrap();
    rt.create_project(new_project("100003", 80, 3_000)).unwrap();

    let path = LocationPath {
        region: Some("region i".to_string()),
        division: Some("ILOCOS NORTE".to_string()),
        ..LocationPath::default()
    };
    let by_municipality = rt
        .region_stats(path.clone(), RollupGroupBy::Municipality)
        .unwrap();
    assert_eq!(by_municipality.len(), 2);
    let laoag = by_municipality
        .iter()
        .find(|g| g.group == "Laoag City")
        .unwrap();
    assert_eq!(laoag.total_schools, 2);
    assert_eq!(laoag.project_count, 2);
    assert_eq!(laoag.mean_progress_percent, Some(50.0));

    let by_legislative = rt
        .region_stats(path, RollupGroupBy::LegislativeDistrict)
        .unwrap();
    let second = by_legislative
        .iter()
        .find(|g| g.group == "2nd District")
        .unwrap();
    assert_eq!(second.total_schools, 2);
    assert_eq!(second.project_count, 2);
}

#[test]
fn at_runtime_09_form_status_flips_complete_on_last_category() {
    let mut rt = seeded_runtime();
    let school = SchoolId::new("100001").unwrap();

    for (i, category) in FormCategory::ALL.iter().enumerate().take(7) {
        rt.submit_form(
            FormSubmissionInput::v1(
                school.clone(),
                *category,
                UserId::new("head_uid_1").unwrap(),
                MonotonicTimeNs(1 + i as u64),
            )
            .unwrap(),
        )
        .unwrap();
    }
    let status = rt.school_form_status(&school).unwrap();
    assert!(!status.complete);

    rt.submit_form(
        FormSubmissionInput::v1(
            school.clone(),
            FormCategory::TeacherSpecialization,
            UserId::new("head_uid_1").unwrap(),
            MonotonicTimeNs(100),
        )
        .unwrap(),
    )
    .unwrap();
    let status = rt.school_form_status(&school).unwrap();
    assert!(status.complete);
}

#[test]
fn at_runtime_10_location_children_walk_the_hierarchy() {
    let rt = seeded_runtime();
    assert_eq!(
        rt.location_children(LocationPath::default()).unwrap(),
        vec!["Region I".to_string()]
    );
    let divisions = rt
        .location_children(LocationPath {
            region: Some("REGION  I".to_string()),
            ..LocationPath::default()
        })
        .unwrap();
    assert_eq!(divisions, vec!["Ilocos Norte".to_string()]);

    // A level without its parent is a malformed query, not an empty result.
    let err = rt
        .location_children(LocationPath {
            division: Some("Ilocos Norte".to_string()),
            ..LocationPath::default()
        })
        .unwrap_err();
    assert!(matches!(err, LedgerError::StructuralViolation(_)));
}

#[test]
fn at_runtime_11_every_mutation_leaves_an_activity_row() {
    let mut rt = seeded_runtime();
    let created = rt.create_project(new_project("100001", 40, 1_000)).unwrap();
    let ipc = created.project_identifier.clone();
    rt.append_version(follow_up(&ipc, "100001", 60, 2_000)).unwrap();
    rt.decide_validation(head_decision(
        &ipc,
        "100001",
        ValidationDecision::Validated,
        VersionId(2),
        None,
        3_000,
    ))
    .unwrap();

    let actions: Vec<&str> = rt
        .activity_log()
        .iter()
        .map(|row| row.action.as_str())
        .collect();
    assert_eq!(actions, vec!["CREATE", "UPDATE", "VALIDATE"]);
}

#[test]
fn at_runtime_12_project_exists_tracks_issuance() {
    let mut rt = seeded_runtime();
    let unissued = ProjectIdentifier::new("IPC-2025-00001").unwrap();
    assert!(!rt.project_exists(&unissued));

    let created = rt.create_project(new_project("100001", 40, 1_000)).unwrap();
    assert!(rt.project_exists(&created.project_identifier));

    // Appending under a code that was never issued is refused, not created.
    let err = rt
        .append_version(follow_up(
            &ProjectIdentifier::new("IPC-2025-09999").unwrap(),
            "100001",
            60,
            2_000,
        ))
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}
