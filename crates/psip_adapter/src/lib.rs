#![forbid(unsafe_code)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use psip_contracts::forms::{FormCategory, FormSubmissionInput, SchoolFormStatus};
use psip_contracts::location::{LocationPath, RollupGroupBy, SchoolId, SchoolSite, SchoolSiteInput};
use psip_contracts::project::{
    AttachmentKind, AttachmentRef, EngineerPayload, LguPayload, ProgressPercent,
    ProjectIdentifier, ProjectPayload, ProjectStatus, ProjectVersion, ProjectVersionInput,
    UserId, VersionId,
};
use psip_contracts::validation::{
    ActorContext, ActorRole, ValidationDecision, ValidationDecisionRequest,
};
use psip_contracts::{ContractViolation, IsoDate, MonotonicTimeNs};
use psip_core::runtime::{LedgerRuntime, NewProjectInput, ProjectView};
use psip_core::LedgerError;
use psip_engines::rollup::RollupGroup;

pub type SharedRuntime = Arc<Mutex<LedgerRuntime>>;

type ErrorReply = (StatusCode, Json<ErrorDto>);

// ------------------------
// Wire DTOs.
// ------------------------

#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorDto {
    pub status: String,
    pub outcome: String,
    pub reason: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "kind")]
pub enum PayloadDto {
    Engineer {
        project_name: String,
        contractor_name: Option<String>,
        project_allocation: Option<Decimal>,
        batch_of_funds: Option<String>,
        target_completion_date: Option<String>,
        actual_completion_date: Option<String>,
        notice_to_proceed: Option<String>,
        other_remarks: Option<String>,
    },
    #[serde(rename = "LGU")]
    LocalGovernment {
        project_name: String,
        contractor_name: Option<String>,
        project_allocation: Option<Decimal>,
        batch_of_funds: Option<String>,
        latitude: Option<f64>,
        longitude: Option<f64>,
        other_remarks: Option<String>,
    },
}

fn opt_date(field: &'static str, v: Option<String>) -> Result<Option<IsoDate>, LedgerError> {
    match v {
        None => Ok(None),
        Some(raw) => IsoDate::new(raw).map(Some).map_err(|_| {
            LedgerError::StructuralViolation(ContractViolation::InvalidValue {
                field,
                reason: "must be YYYY-MM-DD",
            })
        }),
    }
}

impl PayloadDto {
    fn into_payload(self) -> Result<ProjectPayload, LedgerError> {
        match self {
            PayloadDto::Engineer {
                project_name,
                contractor_name,
                project_allocation,
                batch_of_funds,
                target_completion_date,
                actual_completion_date,
                notice_to_proceed,
                other_remarks,
            } => Ok(ProjectPayload::Engineer(EngineerPayload {
                project_name,
                contractor_name,
                project_allocation,
                batch_of_funds,
                target_completion_date: opt_date("payload.target_completion_date", target_completion_date)?,
                actual_completion_date: opt_date("payload.actual_completion_date", actual_completion_date)?,
                notice_to_proceed: opt_date("payload.notice_to_proceed", notice_to_proceed)?,
                other_remarks,
            })),
            PayloadDto::LocalGovernment {
                project_name,
                contractor_name,
                project_allocation,
                batch_of_funds,
                latitude,
                longitude,
                other_remarks,
            } => Ok(ProjectPayload::LocalGovernment(LguPayload {
                project_name,
                contractor_name,
                project_allocation,
                batch_of_funds,
                latitude,
                longitude,
                other_remarks,
            })),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SubmitVersionRequest {
    pub status: String,
    pub progress_percent: u8,
    pub reported_as_of: String,
    pub payload: PayloadDto,
    pub submitted_by: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CreateProjectResponse {
    pub status: String,
    pub project_identifier: String,
    pub version_id: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AppendVersionResponse {
    pub status: String,
    pub version_id: u64,
    pub current: ProjectViewDto,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationStateDto {
    pub effective_decision: &'static str,
    pub decided_version_id: Option<u64>,
    pub remarks: Option<String>,
    pub decided_by: Option<String>,
    pub decided_at_ns: Option<u64>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProjectViewDto {
    pub project_identifier: String,
    pub scope_key: String,
    pub version_id: u64,
    pub status: &'static str,
    pub progress_percent: u8,
    pub reported_as_of: IsoDate,
    pub recorded_at_ns: u64,
    pub submitted_by: String,
    pub submitter_role: &'static str,
    pub payload: ProjectPayload,
    pub validation: ValidationStateDto,
    pub version_count: u64,
}

fn project_view_dto(view: ProjectView) -> ProjectViewDto {
    let record = view.decision_record;
    ProjectViewDto {
        project_identifier: view.current.project_identifier.as_str().to_string(),
        scope_key: view.current.scope_key.as_str().to_string(),
        version_id: view.current.version_id.0,
        status: view.current.status.as_str(),
        progress_percent: view.current.progress_percent.as_u8(),
        reported_as_of: view.current.reported_as_of.clone(),
        recorded_at_ns: view.current.recorded_at.0,
        submitted_by: view.current.submitted_by.as_str().to_string(),
        submitter_role: view.current.submitter_role.as_str(),
        payload: view.current.payload,
        validation: ValidationStateDto {
            effective_decision: view.effective_decision.as_str(),
            decided_version_id: record.as_ref().map(|r| r.validated_version_id.0),
            remarks: record.as_ref().and_then(|r| r.remarks.clone()),
            decided_by: record
                .as_ref()
                .and_then(|r| r.decided_by.as_ref().map(|u| u.as_str().to_string())),
            decided_at_ns: record.as_ref().and_then(|r| r.decided_at.map(|t| t.0)),
        },
        version_count: view.version_count,
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct VersionDto {
    pub version_id: u64,
    pub status: &'static str,
    pub progress_percent: u8,
    pub reported_as_of: IsoDate,
    pub recorded_at_ns: u64,
    pub submitted_by: String,
    pub submitter_role: &'static str,
    pub payload: ProjectPayload,
}

fn version_dto(row: &ProjectVersion) -> VersionDto {
    VersionDto {
        version_id: row.version_id.0,
        status: row.status.as_str(),
        progress_percent: row.progress_percent.as_u8(),
        reported_as_of: row.reported_as_of.clone(),
        recorded_at_ns: row.recorded_at.0,
        submitted_by: row.submitted_by.as_str().to_string(),
        submitter_role: row.submitter_role.as_str(),
        payload: row.payload.clone(),
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ValidateRequest {
    pub decision: String,
    pub referenced_version_id: u64,
    pub remarks: Option<String>,
    pub actor_user_id: String,
    pub actor_role: String,
    pub actor_scope_key: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidateResponse {
    pub status: String,
    pub decision: &'static str,
    pub decided_version_id: u64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct FormSubmitRequest {
    pub category: String,
    pub submitted_by: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FormSubmitResponse {
    pub status: String,
    pub form_submission_id: u64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct AttachmentRequest {
    pub kind: String,
    pub content_base64: String,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AttachmentResponse {
    pub status: String,
    pub attachment_id: u64,
    pub version_id: u64,
    pub digest_hex: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct StatsQuery {
    pub region: Option<String>,
    pub division: Option<String>,
    pub district: Option<String>,
    pub municipality: Option<String>,
    pub group_by: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StatsResponse {
    pub status: String,
    pub group_by: &'static str,
    pub groups: Vec<RollupGroup>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct LocationsQuery {
    pub region: Option<String>,
    pub division: Option<String>,
    pub district: Option<String>,
    pub municipality: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LocationsResponse {
    pub status: String,
    pub children: Vec<String>,
    pub schools: Vec<SchoolSite>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub schools: usize,
    pub projects: usize,
    pub ledger_rows: usize,
}

// ------------------------
// Error mapping. One boundary outcome per runtime refusal.
// ------------------------

fn error_reply(err: LedgerError) -> ErrorReply {
    let (code, outcome, reason) = match err {
        LedgerError::StructuralViolation(v) => {
            (StatusCode::BAD_REQUEST, "REJECTED", format!("{v:?}"))
        }
        LedgerError::UnknownScope { scope_key } => (
            StatusCode::BAD_REQUEST,
            "UNKNOWN_SCOPE",
            format!("school {scope_key} is not in the masterlist"),
        ),
        LedgerError::NotFound { entity, key } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} {key} does not exist"),
        ),
        LedgerError::StaleDecision {
            referenced,
            current,
        } => (
            StatusCode::CONFLICT,
            "STALE_DECISION",
            format!(
                "decision referenced version {} but version {} is current",
                referenced.0, current.0
            ),
        ),
        LedgerError::Forbidden { reason } => {
            (StatusCode::FORBIDDEN, "FORBIDDEN", reason.to_string())
        }
        LedgerError::Unavailable { reason } => {
            (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", reason)
        }
    };
    (
        code,
        Json(ErrorDto {
            status: "error".to_string(),
            outcome: outcome.to_string(),
            reason,
        }),
    )
}

fn lock_runtime(runtime: &SharedRuntime) -> Result<MutexGuard<'_, LedgerRuntime>, ErrorReply> {
    runtime.lock().map_err(|_| {
        error_reply(LedgerError::Unavailable {
            reason: "ledger runtime lock poisoned".to_string(),
        })
    })
}

fn contract(err: ContractViolation) -> ErrorReply {
    error_reply(LedgerError::StructuralViolation(err))
}

pub fn now_ns() -> MonotonicTimeNs {
    let ns = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1);
    MonotonicTimeNs(ns.max(1))
}

fn location_path(
    region: Option<String>,
    division: Option<String>,
    district: Option<String>,
    municipality: Option<String>,
) -> LocationPath {
    LocationPath {
        region,
        division,
        district,
        municipality,
    }
}

// ------------------------
// Handlers.
// ------------------------

async fn healthz(State(runtime): State<SharedRuntime>) -> Result<Json<HealthResponse>, ErrorReply> {
    let runtime = lock_runtime(&runtime)?;
    let store = runtime.store();
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        schools: store.school_sites().len(),
        projects: store.projects_current().len(),
        ledger_rows: store.project_ledger().len(),
    }))
}

async fn create_project(
    State(runtime): State<SharedRuntime>,
    UrlPath(scope_key): UrlPath<String>,
    Json(req): Json<SubmitVersionRequest>,
) -> Result<(StatusCode, Json<CreateProjectResponse>), ErrorReply> {
    let payload = req.payload.into_payload().map_err(error_reply)?;
    let input = NewProjectInput::v1(
        SchoolId::new(scope_key).map_err(contract)?,
        ProjectStatus::parse(&req.status).map_err(contract)?,
        ProgressPercent::new(req.progress_percent).map_err(contract)?,
        IsoDate::new(req.reported_as_of).map_err(contract)?,
        now_ns(),
        payload.clone(),
        UserId::new(req.submitted_by).map_err(contract)?,
        payload.role(),
    )
    .map_err(contract)?;

    let mut runtime = lock_runtime(&runtime)?;
    let created = runtime.create_project(input).map_err(error_reply)?;
    Ok((
        StatusCode::CREATED,
        Json(CreateProjectResponse {
            status: "ok".to_string(),
            project_identifier: created.project_identifier.as_str().to_string(),
            version_id: created.version_id.0,
        }),
    ))
}

async fn append_version(
    State(runtime): State<SharedRuntime>,
    UrlPath(identifier): UrlPath<String>,
    Json(req): Json<SubmitVersionRequest>,
) -> Result<(StatusCode, Json<AppendVersionResponse>), ErrorReply> {
    let identifier = ProjectIdentifier::new(identifier).map_err(contract)?;
    let payload = req.payload.into_payload().map_err(error_reply)?;

    let mut runtime = lock_runtime(&runtime)?;
    // The owning school never changes across versions; it comes from the
    // record, not the caller.
    let scope_key = runtime
        .project_view(&identifier)
        .map_err(error_reply)?
        .current
        .scope_key;
    let input = ProjectVersionInput::v1(
        identifier.clone(),
        scope_key,
        ProjectStatus::parse(&req.status).map_err(contract)?,
        ProgressPercent::new(req.progress_percent).map_err(contract)?,
        IsoDate::new(req.reported_as_of).map_err(contract)?,
        now_ns(),
        payload.clone(),
        UserId::new(req.submitted_by).map_err(contract)?,
        payload.role(),
    )
    .map_err(contract)?;
    let version_id = runtime.append_version(input).map_err(error_reply)?;
    let view = runtime.project_view(&identifier).map_err(error_reply)?;
    Ok((
        StatusCode::CREATED,
        Json(AppendVersionResponse {
            status: "ok".to_string(),
            version_id: version_id.0,
            current: project_view_dto(view),
        }),
    ))
}

async fn get_project(
    State(runtime): State<SharedRuntime>,
    UrlPath(identifier): UrlPath<String>,
) -> Result<Json<ProjectViewDto>, ErrorReply> {
    let identifier = ProjectIdentifier::new(identifier).map_err(contract)?;
    let runtime = lock_runtime(&runtime)?;
    let view = runtime.project_view(&identifier).map_err(error_reply)?;
    Ok(Json(project_view_dto(view)))
}

async fn get_versions(
    State(runtime): State<SharedRuntime>,
    UrlPath(identifier): UrlPath<String>,
) -> Result<Json<Vec<VersionDto>>, ErrorReply> {
    let identifier = ProjectIdentifier::new(identifier).map_err(contract)?;
    let runtime = lock_runtime(&runtime)?;
    let history = runtime.project_history(&identifier).map_err(error_reply)?;
    Ok(Json(history.iter().map(version_dto).collect()))
}

async fn school_projects(
    State(runtime): State<SharedRuntime>,
    UrlPath(scope_key): UrlPath<String>,
) -> Result<Json<Vec<ProjectViewDto>>, ErrorReply> {
    let scope_key = SchoolId::new(scope_key).map_err(contract)?;
    let runtime = lock_runtime(&runtime)?;
    let views = runtime.projects_for_school(&scope_key).map_err(error_reply)?;
    Ok(Json(views.into_iter().map(project_view_dto).collect()))
}

async fn validate_project(
    State(runtime): State<SharedRuntime>,
    UrlPath(identifier): UrlPath<String>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ErrorReply> {
    let request = ValidationDecisionRequest::v1(
        ProjectIdentifier::new(identifier).map_err(contract)?,
        ValidationDecision::parse(&req.decision).map_err(contract)?,
        VersionId(req.referenced_version_id),
        req.remarks,
        ActorContext {
            user_id: UserId::new(req.actor_user_id).map_err(contract)?,
            role: ActorRole::parse(&req.actor_role).map_err(contract)?,
            scope_key: SchoolId::new(req.actor_scope_key).map_err(contract)?,
        },
        now_ns(),
    )
    .map_err(contract)?;

    let mut runtime = lock_runtime(&runtime)?;
    let record = runtime.decide_validation(request).map_err(error_reply)?;
    Ok(Json(ValidateResponse {
        status: "ok".to_string(),
        decision: record.decision.as_str(),
        decided_version_id: record.validated_version_id.0,
    }))
}

async fn submit_form(
    State(runtime): State<SharedRuntime>,
    UrlPath(scope_key): UrlPath<String>,
    Json(req): Json<FormSubmitRequest>,
) -> Result<(StatusCode, Json<FormSubmitResponse>), ErrorReply> {
    let input = FormSubmissionInput::v1(
        SchoolId::new(scope_key).map_err(contract)?,
        FormCategory::parse(&req.category).map_err(contract)?,
        UserId::new(req.submitted_by).map_err(contract)?,
        now_ns(),
    )
    .map_err(contract)?;
    let mut runtime = lock_runtime(&runtime)?;
    let id = runtime.submit_form(input).map_err(error_reply)?;
    Ok((
        StatusCode::CREATED,
        Json(FormSubmitResponse {
            status: "ok".to_string(),
            form_submission_id: id,
        }),
    ))
}

async fn form_status(
    State(runtime): State<SharedRuntime>,
    UrlPath(scope_key): UrlPath<String>,
) -> Result<Json<SchoolFormStatus>, ErrorReply> {
    let scope_key = SchoolId::new(scope_key).map_err(contract)?;
    let runtime = lock_runtime(&runtime)?;
    let status = runtime.school_form_status(&scope_key).map_err(error_reply)?;
    Ok(Json(status))
}

async fn attach_document(
    State(runtime): State<SharedRuntime>,
    UrlPath(identifier): UrlPath<String>,
    Json(req): Json<AttachmentRequest>,
) -> Result<(StatusCode, Json<AttachmentResponse>), ErrorReply> {
    let identifier = ProjectIdentifier::new(identifier).map_err(contract)?;
    let kind = AttachmentKind::parse(&req.kind).map_err(contract)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(req.content_base64.as_bytes())
        .map_err(|_| {
            contract(ContractViolation::InvalidValue {
                field: "attachment.content_base64",
                reason: "must be valid base64",
            })
        })?;
    let digest_hex: String = Sha256::digest(&bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    let reference = AttachmentRef {
        kind,
        digest_hex: digest_hex.clone(),
        byte_len: bytes.len() as u64,
    };

    let mut runtime = lock_runtime(&runtime)?;
    // Attachments always land on the current version.
    let version_id = runtime
        .project_view(&identifier)
        .map_err(error_reply)?
        .current
        .version_id;
    let attachment_id = runtime
        .attach_document(
            version_id,
            reference,
            UserId::new(req.uploaded_by).map_err(contract)?,
            now_ns(),
        )
        .map_err(error_reply)?;
    Ok((
        StatusCode::CREATED,
        Json(AttachmentResponse {
            status: "ok".to_string(),
            attachment_id,
            version_id: version_id.0,
            digest_hex,
        }),
    ))
}

async fn stats(
    State(runtime): State<SharedRuntime>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, ErrorReply> {
    let group_by = match query.group_by.as_deref() {
        None => RollupGroupBy::Municipality,
        Some(raw) => RollupGroupBy::parse(raw).map_err(contract)?,
    };
    let path = location_path(query.region, query.division, query.district, query.municipality);
    let runtime = lock_runtime(&runtime)?;
    let groups = runtime.region_stats(path, group_by).map_err(error_reply)?;
    Ok(Json(StatsResponse {
        status: "ok".to_string(),
        group_by: group_by.as_str(),
        groups,
    }))
}

async fn locations(
    State(runtime): State<SharedRuntime>,
    Query(query): Query<LocationsQuery>,
) -> Result<Json<LocationsResponse>, ErrorReply> {
    let path = location_path(query.region, query.division, query.district, query.municipality)
        .canonicalized();
    let runtime = lock_runtime(&runtime)?;
    let children = runtime.location_children(path.clone()).map_err(error_reply)?;
    let schools = runtime
        .store()
        .schools_for_path(&path)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(LocationsResponse {
        status: "ok".to_string(),
        children,
        schools,
    }))
}

// ------------------------
// Wiring.
// ------------------------

pub fn router(runtime: SharedRuntime) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/schools/:scope_key/projects",
            get(school_projects).post(create_project),
        )
        .route("/schools/:scope_key/forms", post(submit_form))
        .route("/schools/:scope_key/form-status", get(form_status))
        .route("/projects/:identifier", get(get_project).post(append_version))
        .route("/projects/:identifier/versions", get(get_versions))
        .route("/projects/:identifier/validate", post(validate_project))
        .route("/projects/:identifier/attachments", post(attach_document))
        .route("/stats", get(stats))
        .route("/locations", get(locations))
        .with_state(runtime)
}

/// Masterlist seed: a JSON array of school rows, loaded once at startup.
pub fn load_school_seed(path: &Path) -> Result<Vec<SchoolSiteInput>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("cannot read school seed {}: {e}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|e| format!("cannot parse school seed {}: {e}", path.display()))
}
