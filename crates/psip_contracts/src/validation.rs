#![forbid(unsafe_code)]

use crate::common::validate_opt_text;
use crate::location::SchoolId;
use crate::project::{ProjectIdentifier, UserId, VersionId};
use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

pub const VALIDATION_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ValidationDecision {
    Pending,
    Validated,
    Rejected,
}

impl ValidationDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationDecision::Pending => "Pending",
            ValidationDecision::Validated => "Validated",
            ValidationDecision::Rejected => "Rejected",
        }
    }

    pub fn parse(v: &str) -> Result<Self, ContractViolation> {
        match v.trim() {
            "Pending" => Ok(ValidationDecision::Pending),
            "Validated" => Ok(ValidationDecision::Validated),
            "Rejected" => Ok(ValidationDecision::Rejected),
            _ => Err(ContractViolation::InvalidValue {
                field: "decision",
                reason: "unknown validation decision",
            }),
        }
    }
}

/// Who is acting, in what role, over which school. Passed explicitly on
/// every decision request so the state machine never reads ambient session
/// state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    pub user_id: UserId,
    pub role: ActorRole,
    pub scope_key: SchoolId,
}

impl Validate for ActorContext {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.user_id.validate()?;
        self.scope_key.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ActorRole {
    SchoolHead,
    Engineer,
    LocalGovernment,
}

impl ActorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ActorRole::SchoolHead => "School Head",
            ActorRole::Engineer => "Engineer",
            ActorRole::LocalGovernment => "LGU",
        }
    }

    pub fn parse(v: &str) -> Result<Self, ContractViolation> {
        match v.trim() {
            "School Head" => Ok(ActorRole::SchoolHead),
            "Engineer" => Ok(ActorRole::Engineer),
            "LGU" | "Local Government" => Ok(ActorRole::LocalGovernment),
            _ => Err(ContractViolation::InvalidValue {
                field: "actor_role",
                reason: "unknown actor role",
            }),
        }
    }
}

/// One mutable record per project identifier. A decision binds to the
/// version that was current at transition time; whenever a newer version
/// exists the effective state reads as Pending again, while the last
/// decision's remarks are retained as historical context until the next
/// decision overwrites them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRecord {
    pub schema_version: SchemaVersion,
    pub project_identifier: ProjectIdentifier,
    pub validated_version_id: VersionId,
    pub decision: ValidationDecision,
    pub remarks: Option<String>,
    pub decided_by: Option<UserId>,
    pub decided_at: Option<MonotonicTimeNs>,
}

impl ValidationRecord {
    /// Initial record for a freshly created project.
    pub fn pending_for(
        project_identifier: ProjectIdentifier,
        version_id: VersionId,
    ) -> Result<Self, ContractViolation> {
        let record = Self {
            schema_version: VALIDATION_CONTRACT_VERSION,
            project_identifier,
            validated_version_id: version_id,
            decision: ValidationDecision::Pending,
            remarks: None,
            decided_by: None,
            decided_at: None,
        };
        record.validate()?;
        Ok(record)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        project_identifier: ProjectIdentifier,
        validated_version_id: VersionId,
        decision: ValidationDecision,
        remarks: Option<String>,
        decided_by: Option<UserId>,
        decided_at: Option<MonotonicTimeNs>,
    ) -> Result<Self, ContractViolation> {
        let record = Self {
            schema_version: VALIDATION_CONTRACT_VERSION,
            project_identifier,
            validated_version_id,
            decision,
            remarks,
            decided_by,
            decided_at,
        };
        record.validate()?;
        Ok(record)
    }
}

impl Validate for ValidationRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != VALIDATION_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "validation_record.schema_version",
                reason: "must match VALIDATION_CONTRACT_VERSION",
            });
        }
        self.project_identifier.validate()?;
        if self.validated_version_id.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "validation_record.validated_version_id",
                reason: "must be > 0",
            });
        }
        validate_opt_text("validation_record.remarks", &self.remarks, 512)?;
        if self.decision != ValidationDecision::Pending {
            if self.decided_by.is_none() {
                return Err(ContractViolation::InvalidValue {
                    field: "validation_record.decided_by",
                    reason: "must be present for a decided record",
                });
            }
            if self.decided_at.map(|t| t.0).unwrap_or(0) == 0 {
                return Err(ContractViolation::InvalidValue {
                    field: "validation_record.decided_at",
                    reason: "must be present for a decided record",
                });
            }
        }
        if let Some(decided_by) = &self.decided_by {
            decided_by.validate()?;
        }
        Ok(())
    }
}

/// A school head's confirm/reject request against a specific version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDecisionRequest {
    pub schema_version: SchemaVersion,
    pub project_identifier: ProjectIdentifier,
    pub decision: ValidationDecision,
    pub referenced_version_id: VersionId,
    pub remarks: Option<String>,
    pub actor: ActorContext,
    pub decided_at: MonotonicTimeNs,
}

impl ValidationDecisionRequest {
    pub fn v1(
        project_identifier: ProjectIdentifier,
        decision: ValidationDecision,
        referenced_version_id: VersionId,
        remarks: Option<String>,
        actor: ActorContext,
        decided_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let req = Self {
            schema_version: VALIDATION_CONTRACT_VERSION,
            project_identifier,
            decision,
            referenced_version_id,
            remarks,
            actor,
            decided_at,
        };
        req.validate()?;
        Ok(req)
    }
}

impl Validate for ValidationDecisionRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != VALIDATION_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "validation_decision_request.schema_version",
                reason: "must match VALIDATION_CONTRACT_VERSION",
            });
        }
        self.project_identifier.validate()?;
        self.actor.validate()?;
        if self.decision == ValidationDecision::Pending {
            return Err(ContractViolation::InvalidValue {
                field: "validation_decision_request.decision",
                reason: "must be Validated or Rejected",
            });
        }
        if self.referenced_version_id.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "validation_decision_request.referenced_version_id",
                reason: "must be > 0",
            });
        }
        if self.decided_at.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "validation_decision_request.decided_at",
                reason: "must be > 0",
            });
        }
        validate_opt_text("validation_decision_request.remarks", &self.remarks, 512)?;
        Ok(())
    }
}
