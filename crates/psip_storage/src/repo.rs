#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use psip_contracts::activity::{ActivityInput, ActivityRecord};
use psip_contracts::forms::{FormCategory, FormSubmissionInput, FormSubmissionRow};
use psip_contracts::location::{LocationPath, SchoolId, SchoolSite, SchoolSiteInput};
use psip_contracts::project::{
    ProjectCurrentRecord, ProjectIdentifier, ProjectVersion, ProjectVersionInput, VersionId,
};
use psip_contracts::validation::ValidationRecord;

use crate::store::{LedgerStore, StorageError};

/// Typed repository interface for the append-only project ledger and its
/// current-version projection.
pub trait ProjectLedgerRepo {
    fn append_project_version_row(
        &mut self,
        input: ProjectVersionInput,
    ) -> Result<VersionId, StorageError>;
    fn project_ledger_rows(&self) -> &[ProjectVersion];
    fn project_version_rows(&self, identifier: &ProjectIdentifier) -> Vec<&ProjectVersion>;
    fn project_current_row(&self, identifier: &ProjectIdentifier)
        -> Option<&ProjectCurrentRecord>;
    fn projects_current_rows(&self) -> &BTreeMap<ProjectIdentifier, ProjectCurrentRecord>;
    fn current_rows_for_scope(&self, scope_key: &SchoolId) -> Vec<&ProjectCurrentRecord>;
    fn rebuild_projects_current_rows(&mut self);
}

/// Typed repository interface for per-identifier validation records.
pub trait ValidationRepo {
    fn put_validation_row(&mut self, record: ValidationRecord) -> Result<(), StorageError>;
    fn validation_row(&self, identifier: &ProjectIdentifier) -> Option<&ValidationRecord>;
}

/// Typed repository interface for the location hierarchy reference data.
pub trait LocationRepo {
    fn ingest_school_site_row(&mut self, input: SchoolSiteInput) -> Result<SchoolId, StorageError>;
    fn school_site_row(&self, school_id: &SchoolId) -> Option<&SchoolSite>;
    fn school_rows_for_path(&self, path: &LocationPath) -> Vec<&SchoolSite>;
    fn location_child_labels(&self, path: &LocationPath) -> Vec<String>;
}

/// Typed repository interface for append-only school form submissions.
pub trait FormStatusRepo {
    fn append_form_submission_row(
        &mut self,
        input: FormSubmissionInput,
    ) -> Result<u64, StorageError>;
    fn latest_form_submission_rows(
        &self,
        school_id: &SchoolId,
    ) -> BTreeMap<FormCategory, &FormSubmissionRow>;
}

/// Typed repository interface for append-only activity persistence.
pub trait ActivityLogRepo {
    fn append_activity_row(&mut self, input: ActivityInput) -> Result<u64, StorageError>;
    fn activity_rows(&self) -> &[ActivityRecord];
}

impl ProjectLedgerRepo for LedgerStore {
    fn append_project_version_row(
        &mut self,
        input: ProjectVersionInput,
    ) -> Result<VersionId, StorageError> {
        self.append_project_version(input)
    }

    fn project_ledger_rows(&self) -> &[ProjectVersion] {
        self.project_ledger()
    }

    fn project_version_rows(&self, identifier: &ProjectIdentifier) -> Vec<&ProjectVersion> {
        self.project_versions(identifier)
    }

    fn project_current_row(
        &self,
        identifier: &ProjectIdentifier,
    ) -> Option<&ProjectCurrentRecord> {
        self.project_current(identifier)
    }

    fn projects_current_rows(&self) -> &BTreeMap<ProjectIdentifier, ProjectCurrentRecord> {
        self.projects_current()
    }

    fn current_rows_for_scope(&self, scope_key: &SchoolId) -> Vec<&ProjectCurrentRecord> {
        self.current_for_scope(scope_key)
    }

    fn rebuild_projects_current_rows(&mut self) {
        self.rebuild_projects_current_from_ledger()
    }
}

impl ValidationRepo for LedgerStore {
    fn put_validation_row(&mut self, record: ValidationRecord) -> Result<(), StorageError> {
        self.put_validation_record(record)
    }

    fn validation_row(&self, identifier: &ProjectIdentifier) -> Option<&ValidationRecord> {
        self.validation_record(identifier)
    }
}

impl LocationRepo for LedgerStore {
    fn ingest_school_site_row(&mut self, input: SchoolSiteInput) -> Result<SchoolId, StorageError> {
        self.ingest_school_site(input)
    }

    fn school_site_row(&self, school_id: &SchoolId) -> Option<&SchoolSite> {
        self.school_site(school_id)
    }

    fn school_rows_for_path(&self, path: &LocationPath) -> Vec<&SchoolSite> {
        self.schools_for_path(path)
    }

    fn location_child_labels(&self, path: &LocationPath) -> Vec<String> {
        self.location_children(path)
    }
}

impl FormStatusRepo for LedgerStore {
    fn append_form_submission_row(
        &mut self,
        input: FormSubmissionInput,
    ) -> Result<u64, StorageError> {
        self.append_form_submission(input)
    }

    fn latest_form_submission_rows(
        &self,
        school_id: &SchoolId,
    ) -> BTreeMap<FormCategory, &FormSubmissionRow> {
        self.latest_form_submissions(school_id)
    }
}

impl ActivityLogRepo for LedgerStore {
    fn append_activity_row(&mut self, input: ActivityInput) -> Result<u64, StorageError> {
        self.append_activity(input)
    }

    fn activity_rows(&self) -> &[ActivityRecord] {
        self.activity_log()
    }
}
