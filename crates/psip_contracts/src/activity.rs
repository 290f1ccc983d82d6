#![forbid(unsafe_code)]

use crate::common::validate_text;
use crate::project::UserId;
use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

pub const ACTIVITY_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ActivityAction {
    Create,
    Update,
    Validate,
    Upload,
    Ingest,
}

impl ActivityAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityAction::Create => "CREATE",
            ActivityAction::Update => "UPDATE",
            ActivityAction::Validate => "VALIDATE",
            ActivityAction::Upload => "UPLOAD",
            ActivityAction::Ingest => "INGEST",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityInput {
    pub schema_version: SchemaVersion,
    pub at: MonotonicTimeNs,
    pub actor_user_id: UserId,
    pub actor_role: String,
    pub action: ActivityAction,
    pub target: String,
    pub detail: String,
}

impl ActivityInput {
    pub fn v1(
        at: MonotonicTimeNs,
        actor_user_id: UserId,
        actor_role: impl Into<String>,
        action: ActivityAction,
        target: impl Into<String>,
        detail: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            schema_version: ACTIVITY_CONTRACT_VERSION,
            at,
            actor_user_id,
            actor_role: actor_role.into(),
            action,
            target: target.into(),
            detail: detail.into(),
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for ActivityInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != ACTIVITY_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "activity_input.schema_version",
                reason: "must match ACTIVITY_CONTRACT_VERSION",
            });
        }
        if self.at.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "activity_input.at",
                reason: "must be > 0",
            });
        }
        self.actor_user_id.validate()?;
        validate_text("activity_input.actor_role", &self.actor_role, 48)?;
        validate_text("activity_input.target", &self.target, 192)?;
        validate_text("activity_input.detail", &self.detail, 512)?;
        Ok(())
    }
}

/// Append-only audit row: one per mutating operation, never pruned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub schema_version: SchemaVersion,
    pub activity_id: u64,
    pub at: MonotonicTimeNs,
    pub actor_user_id: UserId,
    pub actor_role: String,
    pub action: ActivityAction,
    pub target: String,
    pub detail: String,
}

impl ActivityRecord {
    pub fn from_input_v1(activity_id: u64, input: ActivityInput) -> Result<Self, ContractViolation> {
        input.validate()?;
        if activity_id == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "activity_record.activity_id",
                reason: "must be > 0",
            });
        }
        Ok(Self {
            schema_version: ACTIVITY_CONTRACT_VERSION,
            activity_id,
            at: input.at,
            actor_user_id: input.actor_user_id,
            actor_role: input.actor_role,
            action: input.action,
            target: input.target,
            detail: input.detail,
        })
    }
}
