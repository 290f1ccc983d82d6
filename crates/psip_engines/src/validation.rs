#![forbid(unsafe_code)]

use psip_contracts::project::{ProjectCurrentRecord, VersionId};
use psip_contracts::validation::{
    ActorRole, ValidationDecision, ValidationDecisionRequest, ValidationRecord,
};
use psip_contracts::{ContractViolation, ReasonCodeId, Validate};

pub mod reason_codes {
    use psip_contracts::ReasonCodeId;

    pub const VALIDATION_APPLIED: ReasonCodeId = ReasonCodeId(0x5A11_0001);
    pub const VALIDATION_STALE: ReasonCodeId = ReasonCodeId(0x5A11_0002);
    pub const VALIDATION_FORBIDDEN: ReasonCodeId = ReasonCodeId(0x5A11_0003);
}

pub const VALIDATION_ENGINE_ID: &str = "PSIP.VALIDATE";
pub const VALIDATION_IMPLEMENTATION_ID: &str = "PSIP.VALIDATE.001";

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationRefusal {
    Contract(ContractViolation),
    Forbidden {
        reason: &'static str,
    },
    StaleDecision {
        referenced: VersionId,
        current: VersionId,
    },
}

impl From<ContractViolation> for ValidationRefusal {
    fn from(v: ContractViolation) -> Self {
        ValidationRefusal::Contract(v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationTransition {
    pub record: ValidationRecord,
    pub reason_code: ReasonCodeId,
}

/// Pure decision policy for the Pending/Validated/Rejected state machine.
/// Reads its whole world from the arguments; the caller supplies the
/// current version under whatever lock makes the check-and-set atomic.
#[derive(Debug, Default, Clone)]
pub struct ValidationPolicyRuntime;

impl ValidationPolicyRuntime {
    /// The state a reader observes. A decision bound to anything but the
    /// current version is superseded and reads as Pending; nothing is
    /// written to make that happen.
    pub fn effective_decision(
        record: Option<&ValidationRecord>,
        current_version: VersionId,
    ) -> ValidationDecision {
        match record {
            None => ValidationDecision::Pending,
            Some(r) if r.validated_version_id != current_version => ValidationDecision::Pending,
            Some(r) => r.decision,
        }
    }

    /// Evaluate one confirm/reject request against the current version.
    /// Ordering of the guards is observable: a forbidden actor is refused
    /// before staleness is considered.
    pub fn evaluate(
        &self,
        req: &ValidationDecisionRequest,
        current: &ProjectCurrentRecord,
    ) -> Result<ValidationTransition, ValidationRefusal> {
        req.validate()?;
        if req.actor.role != ActorRole::SchoolHead {
            return Err(ValidationRefusal::Forbidden {
                reason: "only a school head may validate projects",
            });
        }
        if req.actor.scope_key != current.scope_key {
            return Err(ValidationRefusal::Forbidden {
                reason: "actor is not the head of this project's school",
            });
        }
        if req.referenced_version_id != current.version_id {
            return Err(ValidationRefusal::StaleDecision {
                referenced: req.referenced_version_id,
                current: current.version_id,
            });
        }
        let record = ValidationRecord::v1(
            req.project_identifier.clone(),
            current.version_id,
            req.decision,
            req.remarks.clone(),
            Some(req.actor.user_id.clone()),
            Some(req.decided_at),
        )?;
        Ok(ValidationTransition {
            record,
            reason_code: reason_codes::VALIDATION_APPLIED,
        })
    }
}
