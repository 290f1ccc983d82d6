#![forbid(unsafe_code)]

use psip_contracts::activity::{ActivityAction, ActivityInput, ActivityRecord};
use psip_contracts::forms::{FormSubmissionInput, SchoolFormStatus};
use psip_contracts::location::{
    LocationPath, RollupGroupBy, SchoolId, SchoolSite, SchoolSiteInput,
};
use psip_contracts::project::{
    AttachmentRef, ProgressPercent, ProjectCurrentRecord, ProjectIdentifier, ProjectPayload,
    ProjectStatus, ProjectVersion, ProjectVersionInput, SubmitterRole, UserId, VersionId,
};
use psip_contracts::validation::{
    ValidationDecision, ValidationDecisionRequest, ValidationRecord,
};
use psip_contracts::{ContractViolation, IsoDate, MonotonicTimeNs, Validate};
use psip_engines::rollup::{self, RollupGroup};
use psip_engines::validation::ValidationPolicyRuntime;
use psip_storage::{AttachmentRow, LedgerStore};

use crate::error::LedgerError;
use crate::identifier::next_project_identifier;

/// Boundary shape for a first submission, before a code exists.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProjectInput {
    pub scope_key: SchoolId,
    pub status: ProjectStatus,
    pub progress_percent: ProgressPercent,
    pub reported_as_of: IsoDate,
    pub recorded_at: MonotonicTimeNs,
    pub payload: ProjectPayload,
    pub submitted_by: UserId,
    pub submitter_role: SubmitterRole,
}

impl NewProjectInput {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
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

impl Validate for NewProjectInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.scope_key.validate()?;
        self.submitted_by.validate()?;
        self.payload.validate()?;
        if self.payload.role() != self.submitter_role {
            return Err(ContractViolation::InvalidValue {
                field: "new_project_input.payload",
                reason: "payload kind must match submitter_role",
            });
        }
        if self.recorded_at.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "new_project_input.recorded_at",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedProject {
    pub project_identifier: ProjectIdentifier,
    pub version_id: VersionId,
}

/// Read model for one project: the current version plus the validation
/// state a reader actually observes. `effective_decision` is computed on
/// every read; a decision bound to a superseded version reads as Pending
/// while the stored record's remarks are still reported as context.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectView {
    pub current: ProjectCurrentRecord,
    pub effective_decision: ValidationDecision,
    pub decision_record: Option<ValidationRecord>,
    pub version_count: u64,
}

/// Single entry point over the ledger. Owns the store; the adapter owns
/// the lock. Every mutating operation leaves an activity row behind.
pub struct LedgerRuntime {
    store: LedgerStore,
    validation: ValidationPolicyRuntime,
}

impl Default for LedgerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerRuntime {
    pub fn new() -> Self {
        Self {
            store: LedgerStore::new_in_memory(),
            validation: ValidationPolicyRuntime,
        }
    }

    // ------------------------
    // Reference data.
    // ------------------------

    /// Load or refresh masterlist rows. Returns how many rows landed.
    pub fn ingest_school_sites(
        &mut self,
        inputs: Vec<SchoolSiteInput>,
    ) -> Result<usize, LedgerError> {
        let mut count = 0usize;
        for input in inputs {
            self.store.ingest_school_site(input)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn school_site(&self, school_id: &SchoolId) -> Result<&SchoolSite, LedgerError> {
        self.store
            .school_site(school_id)
            .ok_or_else(|| LedgerError::UnknownScope {
                scope_key: school_id.as_str().to_string(),
            })
    }

    pub fn location_children(&self, path: LocationPath) -> Result<Vec<String>, LedgerError> {
        let path = path.canonicalized();
        path.validate()?;
        Ok(self.store.location_children(&path))
    }

    // ------------------------
    // Project ledger.
    // ------------------------

    /// First submission: issues the project code, appends version 1 and
    /// seeds the Pending validation record.
    pub fn create_project(&mut self, input: NewProjectInput) -> Result<CreatedProject, LedgerError> {
        input.validate()?;
        // Resolve scope before issuing a code so a bad school id never
        // burns a sequence number.
        if self.store.school_site(&input.scope_key).is_none() {
            return Err(LedgerError::UnknownScope {
                scope_key: input.scope_key.as_str().to_string(),
            });
        }
        let identifier = next_project_identifier(
            self.store.projects_current().keys(),
            input.reported_as_of.year(),
        )?;

        let recorded_at = input.recorded_at;
        let submitted_by = input.submitted_by.clone();
        let submitter_role = input.submitter_role;
        let version_input = ProjectVersionInput::v1(
            identifier.clone(),
            input.scope_key,
            input.status,
            input.progress_percent,
            input.reported_as_of,
            input.recorded_at,
            input.payload,
            input.submitted_by,
            input.submitter_role,
        )?;
        let version_id = self.store.append_project_version(version_input)?;
        self.store
            .put_validation_record(ValidationRecord::pending_for(identifier.clone(), version_id)?)?;
        self.store.append_activity(ActivityInput::v1(
            recorded_at,
            submitted_by,
            submitter_role.as_str(),
            ActivityAction::Create,
            identifier.as_str(),
            format!("created project, version {}", version_id.0),
        )?)?;
        Ok(CreatedProject {
            project_identifier: identifier,
            version_id,
        })
    }

    /// Identifier Authority lookup: has this code ever been issued? True
    /// as soon as version 1 lands, regardless of validation state.
    pub fn project_exists(&self, identifier: &ProjectIdentifier) -> bool {
        self.store.project_current(identifier).is_some()
    }

    /// Later submission under an existing code. Appends unconditionally:
    /// a byte-identical re-report is still a new, auditable version.
    pub fn append_version(
        &mut self,
        input: ProjectVersionInput,
    ) -> Result<VersionId, LedgerError> {
        input.validate()?;
        if !self.project_exists(&input.project_identifier) {
            return Err(LedgerError::NotFound {
                entity: "project",
                key: input.project_identifier.as_str().to_string(),
            });
        }
        let recorded_at = input.recorded_at;
        let submitted_by = input.submitted_by.clone();
        let submitter_role = input.submitter_role;
        let identifier = input.project_identifier.clone();
        let version_id = self.store.append_project_version(input)?;
        self.store.append_activity(ActivityInput::v1(
            recorded_at,
            submitted_by,
            submitter_role.as_str(),
            ActivityAction::Update,
            identifier.as_str(),
            format!("appended version {}", version_id.0),
        )?)?;
        Ok(version_id)
    }

    pub fn project_view(&self, identifier: &ProjectIdentifier) -> Result<ProjectView, LedgerError> {
        let current = self
            .store
            .project_current(identifier)
            .ok_or_else(|| LedgerError::NotFound {
                entity: "project",
                key: identifier.as_str().to_string(),
            })?;
        let record = self.store.validation_record(identifier);
        Ok(ProjectView {
            current: current.clone(),
            effective_decision: ValidationPolicyRuntime::effective_decision(
                record,
                current.version_id,
            ),
            decision_record: record.cloned(),
            version_count: self.store.project_versions(identifier).len() as u64,
        })
    }

    /// Full version history, oldest first.
    pub fn project_history(
        &self,
        identifier: &ProjectIdentifier,
    ) -> Result<Vec<ProjectVersion>, LedgerError> {
        let rows = self.store.project_versions(identifier);
        if rows.is_empty() {
            return Err(LedgerError::NotFound {
                entity: "project",
                key: identifier.as_str().to_string(),
            });
        }
        Ok(rows.into_iter().cloned().collect())
    }

    pub fn projects_for_school(
        &self,
        scope_key: &SchoolId,
    ) -> Result<Vec<ProjectView>, LedgerError> {
        self.school_site(scope_key)?;
        self.store
            .current_for_scope(scope_key)
            .into_iter()
            .map(|current| self.project_view(&current.project_identifier))
            .collect()
    }

    // ------------------------
    // Validation.
    // ------------------------

    pub fn decide_validation(
        &mut self,
        req: ValidationDecisionRequest,
    ) -> Result<ValidationRecord, LedgerError> {
        let current = self
            .store
            .project_current(&req.project_identifier)
            .ok_or_else(|| LedgerError::NotFound {
                entity: "project",
                key: req.project_identifier.as_str().to_string(),
            })?;
        let transition = self.validation.evaluate(&req, current)?;
        self.store.put_validation_record(transition.record.clone())?;
        self.store.append_activity(ActivityInput::v1(
            req.decided_at,
            req.actor.user_id.clone(),
            req.actor.role.as_str(),
            ActivityAction::Validate,
            req.project_identifier.as_str(),
            format!(
                "{} version {}",
                req.decision.as_str(),
                req.referenced_version_id.0
            ),
        )?)?;
        Ok(transition.record)
    }

    // ------------------------
    // Forms.
    // ------------------------

    pub fn submit_form(&mut self, input: FormSubmissionInput) -> Result<u64, LedgerError> {
        let submitted_at = input.submitted_at;
        let submitted_by = input.submitted_by.clone();
        let school = input.school_id.clone();
        let category = input.category;
        let id = self.store.append_form_submission(input)?;
        self.store.append_activity(ActivityInput::v1(
            submitted_at,
            submitted_by,
            "School Head",
            ActivityAction::Update,
            school.as_str(),
            format!("submitted {} form", category.as_str()),
        )?)?;
        Ok(id)
    }

    pub fn school_form_status(
        &self,
        school_id: &SchoolId,
    ) -> Result<SchoolFormStatus, LedgerError> {
        self.school_site(school_id)?;
        let latest = self.store.latest_form_submissions(school_id);
        Ok(rollup::school_completeness(school_id.clone(), &latest))
    }

    // ------------------------
    // Rollups.
    // ------------------------

    /// Aggregate over all schools matching the path, grouped by the given
    /// dimension. The path bounds the school set; the dimension partitions
    /// it.
    pub fn region_stats(
        &self,
        path: LocationPath,
        group_by: RollupGroupBy,
    ) -> Result<Vec<RollupGroup>, LedgerError> {
        let path = path.canonicalized();
        path.validate()?;
        let sites = self.store.schools_for_path(&path);
        let mut currents: Vec<&ProjectCurrentRecord> = Vec::new();
        for site in &sites {
            currents.extend(self.store.current_for_scope(&site.school_id));
        }
        Ok(rollup::region_stats(&sites, &currents, group_by))
    }

    // ------------------------
    // Attachments and audit.
    // ------------------------

    pub fn attach_document(
        &mut self,
        version_id: VersionId,
        reference: AttachmentRef,
        uploaded_by: UserId,
        uploaded_at: MonotonicTimeNs,
    ) -> Result<u64, LedgerError> {
        let row = self
            .store
            .project_version(version_id)
            .ok_or_else(|| LedgerError::NotFound {
                entity: "project_version",
                key: version_id.0.to_string(),
            })?;
        let identifier = row.project_identifier.clone();
        let id =
            self.store
                .append_attachment(version_id, reference, uploaded_by.clone(), uploaded_at)?;
        self.store.append_activity(ActivityInput::v1(
            uploaded_at,
            uploaded_by,
            "Uploader",
            ActivityAction::Upload,
            identifier.as_str(),
            format!("attached document to version {}", version_id.0),
        )?)?;
        Ok(id)
    }

    pub fn attachments_for_version(&self, version_id: VersionId) -> Vec<&AttachmentRow> {
        self.store.attachments_for_version(version_id)
    }

    pub fn activity_log(&self) -> &[ActivityRecord] {
        self.store.activity_log()
    }

    /// Drop and replay the current projection from the ledger. Exposed for
    /// recovery tooling; reads before and after must agree.
    pub fn rebuild_projections(&mut self) {
        self.store.rebuild_projects_current_from_ledger();
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }
}
