#![forbid(unsafe_code)]

use crate::location::SchoolId;
use crate::project::UserId;
use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

pub const FORM_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Fixed set of school-head form categories. A school is complete when the
/// latest submission in every category exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub enum FormCategory {
    Profile,
    HeadInformation,
    Enrolment,
    OrganizedClasses,
    TeachingPersonnel,
    ShiftingModality,
    Resources,
    TeacherSpecialization,
}

impl FormCategory {
    pub const ALL: [FormCategory; 8] = [
        FormCategory::Profile,
        FormCategory::HeadInformation,
        FormCategory::Enrolment,
        FormCategory::OrganizedClasses,
        FormCategory::TeachingPersonnel,
        FormCategory::ShiftingModality,
        FormCategory::Resources,
        FormCategory::TeacherSpecialization,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FormCategory::Profile => "profile",
            FormCategory::HeadInformation => "head",
            FormCategory::Enrolment => "enrolment",
            FormCategory::OrganizedClasses => "classes",
            FormCategory::TeachingPersonnel => "teachers",
            FormCategory::ShiftingModality => "shifting",
            FormCategory::Resources => "resources",
            FormCategory::TeacherSpecialization => "specialization",
        }
    }

    pub fn parse(v: &str) -> Result<Self, ContractViolation> {
        match v.trim() {
            "profile" => Ok(FormCategory::Profile),
            "head" => Ok(FormCategory::HeadInformation),
            "enrolment" => Ok(FormCategory::Enrolment),
            "classes" => Ok(FormCategory::OrganizedClasses),
            "teachers" => Ok(FormCategory::TeachingPersonnel),
            "shifting" => Ok(FormCategory::ShiftingModality),
            "resources" => Ok(FormCategory::Resources),
            "specialization" => Ok(FormCategory::TeacherSpecialization),
            _ => Err(ContractViolation::InvalidValue {
                field: "form_category",
                reason: "unknown form category",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmissionInput {
    pub schema_version: SchemaVersion,
    pub school_id: SchoolId,
    pub category: FormCategory,
    pub submitted_by: UserId,
    pub submitted_at: MonotonicTimeNs,
}

impl FormSubmissionInput {
    pub fn v1(
        school_id: SchoolId,
        category: FormCategory,
        submitted_by: UserId,
        submitted_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            schema_version: FORM_CONTRACT_VERSION,
            school_id,
            category,
            submitted_by,
            submitted_at,
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for FormSubmissionInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != FORM_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "form_submission_input.schema_version",
                reason: "must match FORM_CONTRACT_VERSION",
            });
        }
        self.school_id.validate()?;
        self.submitted_by.validate()?;
        if self.submitted_at.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "form_submission_input.submitted_at",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// Append-only row; re-submitting a category is a new row, the latest one
/// wins for the completeness flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmissionRow {
    pub schema_version: SchemaVersion,
    pub form_submission_id: u64,
    pub school_id: SchoolId,
    pub category: FormCategory,
    pub submitted_by: UserId,
    pub submitted_at: MonotonicTimeNs,
}

impl FormSubmissionRow {
    pub fn from_input_v1(
        form_submission_id: u64,
        input: FormSubmissionInput,
    ) -> Result<Self, ContractViolation> {
        input.validate()?;
        if form_submission_id == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "form_submission_row.form_submission_id",
                reason: "must be > 0",
            });
        }
        Ok(Self {
            schema_version: FORM_CONTRACT_VERSION,
            form_submission_id,
            school_id: input.school_id,
            category: input.category,
            submitted_by: input.submitted_by,
            submitted_at: input.submitted_at,
        })
    }
}

/// Derived, never stored: recomputed from the latest submission per
/// category on every read.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SchoolFormStatus {
    pub school_id: SchoolId,
    pub categories: Vec<FormCategoryStatus>,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FormCategoryStatus {
    pub category: FormCategory,
    pub submitted: bool,
}
