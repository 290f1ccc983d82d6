#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use psip_contracts::activity::{ActivityInput, ActivityRecord};
use psip_contracts::forms::{FormCategory, FormSubmissionInput, FormSubmissionRow};
use psip_contracts::location::{loc_eq, LocationPath, SchoolId, SchoolSite, SchoolSiteInput};
use psip_contracts::project::{
    AttachmentRef, ProjectCurrentRecord, ProjectIdentifier, ProjectVersion, ProjectVersionInput,
    UserId, VersionId,
};
use psip_contracts::validation::ValidationRecord;
use psip_contracts::{ContractViolation, MonotonicTimeNs, Validate};

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    ForeignKeyViolation { table: &'static str, key: String },
    AppendOnlyViolation { table: &'static str },
    ContractViolation(ContractViolation),
    Unavailable { reason: String },
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

/// Blob-store pointer for an image or PDF attached to one version.
/// The blob bytes never enter this store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRow {
    pub attachment_id: u64,
    pub version_id: VersionId,
    pub reference: AttachmentRef,
    pub uploaded_by: UserId,
    pub uploaded_at: MonotonicTimeNs,
}

/// In-memory reference storage for the project ledger.
///
/// Tables:
/// - `project_ledger`: append-only version rows; `version_id` assigned from
///   a monotonic counter at insert time, never client-generated. There is
///   deliberately NO uniqueness constraint on `project_identifier` or on any
///   natural-key tuple: re-submitting identical field values under the same
///   identifier is a legitimate, auditable event.
/// - `projects_current`: rebuildable projection, one row per identifier,
///   keyed to the greatest `version_id`.
/// - `validation_records`: one mutable record per identifier.
/// - `school_sites`: normalized location hierarchy reference data.
/// - `form_submission_ledger` and `activity_ledger`: append-only.
pub struct LedgerStore {
    project_ledger: Vec<ProjectVersion>,
    projects_current: BTreeMap<ProjectIdentifier, ProjectCurrentRecord>,
    scope_index: BTreeMap<SchoolId, BTreeSet<ProjectIdentifier>>,
    validation_records: BTreeMap<ProjectIdentifier, ValidationRecord>,
    school_sites: BTreeMap<SchoolId, SchoolSite>,
    form_submission_ledger: Vec<FormSubmissionRow>,
    attachment_ledger: Vec<AttachmentRow>,
    activity_ledger: Vec<ActivityRecord>,
    next_version_id: u64,
    next_form_submission_id: u64,
    next_attachment_id: u64,
    next_activity_id: u64,
}

impl LedgerStore {
    pub fn new_in_memory() -> Self {
        Self {
            project_ledger: Vec::new(),
            projects_current: BTreeMap::new(),
            scope_index: BTreeMap::new(),
            validation_records: BTreeMap::new(),
            school_sites: BTreeMap::new(),
            form_submission_ledger: Vec::new(),
            attachment_ledger: Vec::new(),
            activity_ledger: Vec::new(),
            next_version_id: 1,
            next_form_submission_id: 1,
            next_attachment_id: 1,
            next_activity_id: 1,
        }
    }

    // ------------------------
    // Location hierarchy (read-only reference data, refreshed out of band).
    // ------------------------

    /// Upsert one masterlist row. Labels are canonicalized here, once, so
    /// no query site has to compensate for legacy casing/whitespace.
    pub fn ingest_school_site(&mut self, input: SchoolSiteInput) -> Result<SchoolId, StorageError> {
        let site = SchoolSite::from_input_v1(input)?;
        let school_id = site.school_id.clone();
        self.school_sites.insert(school_id.clone(), site);
        Ok(school_id)
    }

    pub fn school_site(&self, school_id: &SchoolId) -> Option<&SchoolSite> {
        self.school_sites.get(school_id)
    }

    pub fn school_sites(&self) -> &BTreeMap<SchoolId, SchoolSite> {
        &self.school_sites
    }

    /// All sites matching the given partial path, case-insensitively.
    pub fn schools_for_path(&self, path: &LocationPath) -> Vec<&SchoolSite> {
        self.school_sites
            .values()
            .filter(|site| {
                path.region.as_deref().map_or(true, |r| loc_eq(&site.region, r))
                    && path
                        .division
                        .as_deref()
                        .map_or(true, |d| loc_eq(&site.division, d))
                    && path
                        .district
                        .as_deref()
                        .map_or(true, |d| loc_eq(&site.district, d))
                    && path
                        .municipality
                        .as_deref()
                        .map_or(true, |m| loc_eq(&site.municipality, m))
            })
            .collect()
    }

    /// Child labels one level below the given path: regions when the path
    /// is empty, divisions under a region, districts under a division,
    /// municipalities under a district, barangays under a municipality.
    pub fn location_children(&self, path: &LocationPath) -> Vec<String> {
        let matched = self.schools_for_path(path);
        let mut out: Vec<String> = Vec::new();
        for site in matched {
            let child = if path.region.is_none() {
                &site.region
            } else if path.division.is_none() {
                &site.division
            } else if path.district.is_none() && path.municipality.is_none() {
                &site.district
            } else if path.municipality.is_none() {
                &site.municipality
            } else {
                &site.barangay
            };
            if !out.iter().any(|existing| loc_eq(existing, child)) {
                out.push(child.clone());
            }
        }
        out.sort();
        out
    }

    // ------------------------
    // Project ledger (append-only + rebuildable current projection).
    // ------------------------

    fn apply_version_to_current(&mut self, row: &ProjectVersion) {
        let key = row.project_identifier.clone();
        let should_apply = match self.projects_current.get(&key) {
            Some(existing) => row.version_id >= existing.version_id,
            None => true,
        };
        if !should_apply {
            return;
        }
        let record = ProjectCurrentRecord::from_version(row)
            .expect("ledger row already validated; projection must be valid");
        self.projects_current.insert(key, record);
        self.scope_index
            .entry(row.scope_key.clone())
            .or_default()
            .insert(row.project_identifier.clone());
    }

    /// Always inserts. Succeeds even when the identifier already has N
    /// prior versions with otherwise-identical field values; the only
    /// rejected writes are contract violations and an unknown scope.
    pub fn append_project_version(
        &mut self,
        input: ProjectVersionInput,
    ) -> Result<VersionId, StorageError> {
        input.validate()?;
        if !self.school_sites.contains_key(&input.scope_key) {
            return Err(StorageError::ForeignKeyViolation {
                table: "project_ledger.scope_key",
                key: input.scope_key.as_str().to_string(),
            });
        }

        let version_id = VersionId(self.next_version_id);
        self.next_version_id = self.next_version_id.saturating_add(1);

        let row = ProjectVersion::from_input_v1(version_id, input)?;
        self.apply_version_to_current(&row);
        self.project_ledger.push(row);
        Ok(version_id)
    }

    pub fn project_ledger(&self) -> &[ProjectVersion] {
        &self.project_ledger
    }

    /// Full audit trail for one identifier, in version order.
    pub fn project_versions(&self, identifier: &ProjectIdentifier) -> Vec<&ProjectVersion> {
        self.project_ledger
            .iter()
            .filter(|row| &row.project_identifier == identifier)
            .collect()
    }

    pub fn project_version(&self, version_id: VersionId) -> Option<&ProjectVersion> {
        self.project_ledger
            .iter()
            .find(|row| row.version_id == version_id)
    }

    pub fn project_current(&self, identifier: &ProjectIdentifier) -> Option<&ProjectCurrentRecord> {
        self.projects_current.get(identifier)
    }

    pub fn projects_current(&self) -> &BTreeMap<ProjectIdentifier, ProjectCurrentRecord> {
        &self.projects_current
    }

    /// One entry per distinct identifier under the scope, each the latest
    /// version.
    pub fn current_for_scope(&self, scope_key: &SchoolId) -> Vec<&ProjectCurrentRecord> {
        match self.scope_index.get(scope_key) {
            Some(identifiers) => identifiers
                .iter()
                .filter_map(|id| self.projects_current.get(id))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn rebuild_projects_current_from_ledger(&mut self) {
        self.projects_current.clear();
        self.scope_index.clear();
        let mut ordered = self.project_ledger.clone();
        ordered.sort_by_key(|row| row.version_id);
        for row in ordered {
            self.apply_version_to_current(&row);
        }
    }

    pub fn attempt_overwrite_project_version(
        &mut self,
        _version_id: VersionId,
    ) -> Result<(), StorageError> {
        Err(StorageError::AppendOnlyViolation {
            table: "project_ledger",
        })
    }

    // ------------------------
    // Validation records (one mutable row per identifier).
    // ------------------------

    pub fn put_validation_record(&mut self, record: ValidationRecord) -> Result<(), StorageError> {
        record.validate()?;
        if !self
            .projects_current
            .contains_key(&record.project_identifier)
        {
            return Err(StorageError::ForeignKeyViolation {
                table: "validation_records.project_identifier",
                key: record.project_identifier.as_str().to_string(),
            });
        }
        self.validation_records
            .insert(record.project_identifier.clone(), record);
        Ok(())
    }

    pub fn validation_record(&self, identifier: &ProjectIdentifier) -> Option<&ValidationRecord> {
        self.validation_records.get(identifier)
    }

    // ------------------------
    // Form submissions (append-only; latest per category wins).
    // ------------------------

    pub fn append_form_submission(
        &mut self,
        input: FormSubmissionInput,
    ) -> Result<u64, StorageError> {
        input.validate()?;
        if !self.school_sites.contains_key(&input.school_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "form_submission_ledger.school_id",
                key: input.school_id.as_str().to_string(),
            });
        }
        let form_submission_id = self.next_form_submission_id;
        self.next_form_submission_id = self.next_form_submission_id.saturating_add(1);
        let row = FormSubmissionRow::from_input_v1(form_submission_id, input)?;
        self.form_submission_ledger.push(row);
        Ok(form_submission_id)
    }

    pub fn form_submissions(&self) -> &[FormSubmissionRow] {
        &self.form_submission_ledger
    }

    /// Latest submission per category for one school, by submission id.
    pub fn latest_form_submissions(
        &self,
        school_id: &SchoolId,
    ) -> BTreeMap<FormCategory, &FormSubmissionRow> {
        let mut latest: BTreeMap<FormCategory, &FormSubmissionRow> = BTreeMap::new();
        for row in &self.form_submission_ledger {
            if &row.school_id != school_id {
                continue;
            }
            match latest.get(&row.category) {
                Some(existing) if existing.form_submission_id > row.form_submission_id => {}
                _ => {
                    latest.insert(row.category, row);
                }
            }
        }
        latest
    }

    // ------------------------
    // Attachments (blob-store references keyed by version).
    // ------------------------

    pub fn append_attachment(
        &mut self,
        version_id: VersionId,
        reference: AttachmentRef,
        uploaded_by: UserId,
        uploaded_at: MonotonicTimeNs,
    ) -> Result<u64, StorageError> {
        reference.validate()?;
        if self.project_version(version_id).is_none() {
            return Err(StorageError::ForeignKeyViolation {
                table: "attachment_ledger.version_id",
                key: version_id.0.to_string(),
            });
        }
        let attachment_id = self.next_attachment_id;
        self.next_attachment_id = self.next_attachment_id.saturating_add(1);
        self.attachment_ledger.push(AttachmentRow {
            attachment_id,
            version_id,
            reference,
            uploaded_by,
            uploaded_at,
        });
        Ok(attachment_id)
    }

    pub fn attachments_for_version(&self, version_id: VersionId) -> Vec<&AttachmentRow> {
        self.attachment_ledger
            .iter()
            .filter(|row| row.version_id == version_id)
            .collect()
    }

    // ------------------------
    // Activity log (append-only audit trail).
    // ------------------------

    pub fn append_activity(&mut self, input: ActivityInput) -> Result<u64, StorageError> {
        input.validate()?;
        let activity_id = self.next_activity_id;
        self.next_activity_id = self.next_activity_id.saturating_add(1);
        let row = ActivityRecord::from_input_v1(activity_id, input)?;
        self.activity_ledger.push(row);
        Ok(activity_id)
    }

    pub fn activity_log(&self) -> &[ActivityRecord] {
        &self.activity_ledger
    }
}
