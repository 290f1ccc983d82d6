#![forbid(unsafe_code)]

use rust_decimal::Decimal;

use crate::common::{validate_opt_text, validate_text, validate_token};
use crate::location::SchoolId;
use crate::{ContractViolation, IsoDate, MonotonicTimeNs, SchemaVersion, Validate};

pub const PROJECT_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Stable infrastructure project code (IPC). Assigned once at first
/// creation and shared by every subsequent version of the same project.
/// Uniqueness is never enforced on this value in the ledger: a legitimate
/// update carries the same code as every prior version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct ProjectIdentifier(String);

impl ProjectIdentifier {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = v.into().trim().to_string();
        validate_token("project_identifier", &v, 64)?;
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for ProjectIdentifier {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_token("project_identifier", &self.0, 64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = v.into();
        validate_token("user_id", &v, 128)?;
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for UserId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_token("user_id", &self.0, 128)
    }
}

/// System-assigned ordering key, strictly increasing across the whole
/// ledger. The sole authority for "which row is current".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct VersionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct ProgressPercent(u8);

impl ProgressPercent {
    pub fn new(v: u8) -> Result<Self, ContractViolation> {
        if v > 100 {
            return Err(ContractViolation::InvalidRange {
                field: "progress_percent",
                min: 0.0,
                max: 100.0,
                got: v as f64,
            });
        }
        Ok(Self(v))
    }

    pub fn as_u8(self) -> u8 {
        self.0
    }
}

/// Fixed status vocabulary. Unknown values are rejected at the boundary
/// before any row is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub enum ProjectStatus {
    NotYetStarted,
    UnderProcurement,
    Ongoing,
    ForFinalInspection,
    Completed,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 5] = [
        ProjectStatus::NotYetStarted,
        ProjectStatus::UnderProcurement,
        ProjectStatus::Ongoing,
        ProjectStatus::ForFinalInspection,
        ProjectStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::NotYetStarted => "Not Yet Started",
            ProjectStatus::UnderProcurement => "Under Procurement",
            ProjectStatus::Ongoing => "Ongoing",
            ProjectStatus::ForFinalInspection => "For Final Inspection",
            ProjectStatus::Completed => "Completed",
        }
    }

    pub fn parse(v: &str) -> Result<Self, ContractViolation> {
        match v.trim() {
            "Not Yet Started" => Ok(ProjectStatus::NotYetStarted),
            "Under Procurement" => Ok(ProjectStatus::UnderProcurement),
            "Ongoing" => Ok(ProjectStatus::Ongoing),
            "For Final Inspection" => Ok(ProjectStatus::ForFinalInspection),
            "Completed" => Ok(ProjectStatus::Completed),
            _ => Err(ContractViolation::InvalidValue {
                field: "status",
                reason: "unknown project status",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum SubmitterRole {
    Engineer,
    LocalGovernment,
}

impl SubmitterRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmitterRole::Engineer => "Engineer",
            SubmitterRole::LocalGovernment => "LGU",
        }
    }

    pub fn parse(v: &str) -> Result<Self, ContractViolation> {
        match v.trim() {
            "Engineer" => Ok(SubmitterRole::Engineer),
            "LGU" | "Local Government" => Ok(SubmitterRole::LocalGovernment),
            _ => Err(ContractViolation::InvalidValue {
                field: "submitter_role",
                reason: "unknown submitter role",
            }),
        }
    }
}

/// Blob-store reference carried in a version's payload. The blob itself
/// lives in the external document store, keyed by version at upload time.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AttachmentRef {
    pub kind: AttachmentKind,
    pub digest_hex: String,
    pub byte_len: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum AttachmentKind {
    Image,
    Pdf,
}

impl AttachmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::Pdf => "pdf",
        }
    }

    pub fn parse(v: &str) -> Result<Self, ContractViolation> {
        match v.trim() {
            "image" => Ok(AttachmentKind::Image),
            "pdf" => Ok(AttachmentKind::Pdf),
            _ => Err(ContractViolation::InvalidValue {
                field: "attachment_kind",
                reason: "must be image or pdf",
            }),
        }
    }
}

impl Validate for AttachmentRef {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.digest_hex.len() != 64
            || !self.digest_hex.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(ContractViolation::InvalidValue {
                field: "attachment_ref.digest_hex",
                reason: "must be 64 hex characters",
            });
        }
        if self.byte_len == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "attachment_ref.byte_len",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// Descriptive/financial fields, fixed per submitter type. The ledger never
/// interprets these beyond boundary validation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind")]
pub enum ProjectPayload {
    Engineer(EngineerPayload),
    LocalGovernment(LguPayload),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EngineerPayload {
    pub project_name: String,
    pub contractor_name: Option<String>,
    pub project_allocation: Option<Decimal>,
    pub batch_of_funds: Option<String>,
    pub target_completion_date: Option<IsoDate>,
    pub actual_completion_date: Option<IsoDate>,
    pub notice_to_proceed: Option<IsoDate>,
    pub other_remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LguPayload {
    pub project_name: String,
    pub contractor_name: Option<String>,
    pub project_allocation: Option<Decimal>,
    pub batch_of_funds: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub other_remarks: Option<String>,
}

impl ProjectPayload {
    pub fn role(&self) -> SubmitterRole {
        match self {
            ProjectPayload::Engineer(_) => SubmitterRole::Engineer,
            ProjectPayload::LocalGovernment(_) => SubmitterRole::LocalGovernment,
        }
    }

    pub fn project_name(&self) -> &str {
        match self {
            ProjectPayload::Engineer(p) => &p.project_name,
            ProjectPayload::LocalGovernment(p) => &p.project_name,
        }
    }

    pub fn project_allocation(&self) -> Option<Decimal> {
        match self {
            ProjectPayload::Engineer(p) => p.project_allocation,
            ProjectPayload::LocalGovernment(p) => p.project_allocation,
        }
    }
}

fn validate_allocation(value: &Option<Decimal>) -> Result<(), ContractViolation> {
    if let Some(v) = value {
        if v.is_sign_negative() {
            return Err(ContractViolation::InvalidValue {
                field: "payload.project_allocation",
                reason: "must not be negative",
            });
        }
    }
    Ok(())
}

impl Validate for ProjectPayload {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            ProjectPayload::Engineer(p) => {
                validate_text("payload.project_name", &p.project_name, 160)?;
                validate_opt_text("payload.contractor_name", &p.contractor_name, 160)?;
                validate_opt_text("payload.batch_of_funds", &p.batch_of_funds, 96)?;
                validate_opt_text("payload.other_remarks", &p.other_remarks, 512)?;
                validate_allocation(&p.project_allocation)
            }
            ProjectPayload::LocalGovernment(p) => {
                validate_text("payload.project_name", &p.project_name, 160)?;
                validate_opt_text("payload.contractor_name", &p.contractor_name, 160)?;
                validate_opt_text("payload.batch_of_funds", &p.batch_of_funds, 96)?;
                validate_opt_text("payload.other_remarks", &p.other_remarks, 512)?;
                validate_allocation(&p.project_allocation)?;
                if let Some(lat) = p.latitude {
                    if !(-90.0..=90.0).contains(&lat) {
                        return Err(ContractViolation::InvalidRange {
                            field: "payload.latitude",
                            min: -90.0,
                            max: 90.0,
                            got: lat,
                        });
                    }
                }
                if let Some(lon) = p.longitude {
                    if !(-180.0..=180.0).contains(&lon) {
                        return Err(ContractViolation::InvalidRange {
                            field: "payload.longitude",
                            min: -180.0,
                            max: 180.0,
                            got: lon,
                        });
                    }
                }
                Ok(())
            }
        }
    }
}

/// One status report as received at the boundary, before a version id is
/// assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectVersionInput {
    pub schema_version: SchemaVersion,
    pub project_identifier: ProjectIdentifier,
    pub scope_key: SchoolId,
    pub status: ProjectStatus,
    pub progress_percent: ProgressPercent,
    pub reported_as_of: IsoDate,
    pub recorded_at: MonotonicTimeNs,
    pub payload: ProjectPayload,
    pub submitted_by: UserId,
    pub submitter_role: SubmitterRole,
}

impl ProjectVersionInput {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        project_identifier: ProjectIdentifier,
        scope_key: SchoolId,
        status: ProjectStatus,
        progress_percent: ProgressPercent,
        reported_as_of: IsoDate,
        recorded_at: MonotonicTimeNs,
        payload: ProjectPayload,
        submitted_by: UserId,
        submitter_role: SubmitterRole,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            schema_version: PROJECT_CONTRACT_VERSION,
            project_identifier,
            scope_key,
            status,
            progress_percent,
            reported_as_of,
            recorded_at,
            payload,
            submitted_by,
            submitter_role,
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for ProjectVersionInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PROJECT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "project_version_input.schema_version",
                reason: "must match PROJECT_CONTRACT_VERSION",
            });
        }
        self.project_identifier.validate()?;
        self.scope_key.validate()?;
        self.submitted_by.validate()?;
        self.payload.validate()?;
        if self.payload.role() != self.submitter_role {
            return Err(ContractViolation::InvalidValue {
                field: "project_version_input.payload",
                reason: "payload kind must match submitter_role",
            });
        }
        if self.recorded_at.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "project_version_input.recorded_at",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// One ledger row. Immutable once written; a logical edit is always a new
/// row under the same `project_identifier`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectVersion {
    pub schema_version: SchemaVersion,
    pub version_id: VersionId,
    pub project_identifier: ProjectIdentifier,
    pub scope_key: SchoolId,
    pub status: ProjectStatus,
    pub progress_percent: ProgressPercent,
    pub reported_as_of: IsoDate,
    pub recorded_at: MonotonicTimeNs,
    pub payload: ProjectPayload,
    pub submitted_by: UserId,
    pub submitter_role: SubmitterRole,
}

impl ProjectVersion {
    pub fn from_input_v1(
        version_id: VersionId,
        input: ProjectVersionInput,
    ) -> Result<Self, ContractViolation> {
        input.validate()?;
        if version_id.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "project_version.version_id",
                reason: "must be > 0",
            });
        }
        Ok(Self {
            schema_version: PROJECT_CONTRACT_VERSION,
            version_id,
            project_identifier: input.project_identifier,
            scope_key: input.scope_key,
            status: input.status,
            progress_percent: input.progress_percent,
            reported_as_of: input.reported_as_of,
            recorded_at: input.recorded_at,
            payload: input.payload,
            submitted_by: input.submitted_by,
            submitter_role: input.submitter_role,
        })
    }
}

impl Validate for ProjectVersion {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PROJECT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "project_version.schema_version",
                reason: "must match PROJECT_CONTRACT_VERSION",
            });
        }
        if self.version_id.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "project_version.version_id",
                reason: "must be > 0",
            });
        }
        self.project_identifier.validate()?;
        self.scope_key.validate()?;
        self.submitted_by.validate()?;
        self.payload.validate()?;
        if self.payload.role() != self.submitter_role {
            return Err(ContractViolation::InvalidValue {
                field: "project_version.payload",
                reason: "payload kind must match submitter_role",
            });
        }
        if self.recorded_at.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "project_version.recorded_at",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// Read-side projection: the single authoritative row per identifier.
/// Rebuildable from the ledger at any time; "latest" is the greatest
/// `version_id`, never a caller-supplied timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectCurrentRecord {
    pub schema_version: SchemaVersion,
    pub project_identifier: ProjectIdentifier,
    pub scope_key: SchoolId,
    pub version_id: VersionId,
    pub status: ProjectStatus,
    pub progress_percent: ProgressPercent,
    pub reported_as_of: IsoDate,
    pub recorded_at: MonotonicTimeNs,
    pub payload: ProjectPayload,
    pub submitted_by: UserId,
    pub submitter_role: SubmitterRole,
}

impl ProjectCurrentRecord {
    pub fn from_version(v: &ProjectVersion) -> Result<Self, ContractViolation> {
        v.validate()?;
        Ok(Self {
            schema_version: PROJECT_CONTRACT_VERSION,
            project_identifier: v.project_identifier.clone(),
            scope_key: v.scope_key.clone(),
            version_id: v.version_id,
            status: v.status,
            progress_percent: v.progress_percent,
            reported_as_of: v.reported_as_of.clone(),
            recorded_at: v.recorded_at,
            payload: v.payload.clone(),
            submitted_by: v.submitted_by.clone(),
            submitter_role: v.submitter_role,
        })
    }
}
