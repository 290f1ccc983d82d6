#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use psip_contracts::forms::{
    FormCategory, FormCategoryStatus, FormSubmissionRow, SchoolFormStatus,
};
use psip_contracts::location::{RollupGroupBy, SchoolId, SchoolSite};
use psip_contracts::project::{ProjectCurrentRecord, ProjectStatus};

pub mod reason_codes {
    use psip_contracts::ReasonCodeId;

    pub const ROLLUP_COMPUTED: ReasonCodeId = ReasonCodeId(0x8011_0001);
    pub const ROLLUP_EMPTY_SCOPE: ReasonCodeId = ReasonCodeId(0x8011_0002);
}

pub const ROLLUP_ENGINE_ID: &str = "PSIP.ROLLUP";
pub const ROLLUP_IMPLEMENTATION_ID: &str = "PSIP.ROLLUP.001";

/// One aggregate bucket: all schools of the scope whose grouping label
/// matches, plus every current project version owned by those schools.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RollupGroup {
    pub group: String,
    pub total_schools: u32,
    pub project_count: u32,
    /// Arithmetic mean of `progress_percent` over matched current versions.
    /// None when the group has no projects.
    pub mean_progress_percent: Option<f64>,
    pub allocation_sum: Decimal,
    pub status_counts: Vec<StatusCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StatusCount {
    pub status: ProjectStatus,
    pub count: u32,
}

struct GroupAccumulator {
    label: String,
    schools: BTreeSet<SchoolId>,
    project_count: u32,
    progress_sum: u64,
    allocation_sum: Decimal,
    status_counts: BTreeMap<ProjectStatus, u32>,
}

impl GroupAccumulator {
    fn new(label: String) -> Self {
        Self {
            label,
            schools: BTreeSet::new(),
            project_count: 0,
            progress_sum: 0,
            allocation_sum: Decimal::ZERO,
            status_counts: BTreeMap::new(),
        }
    }
}

fn group_label(site: &SchoolSite, group_by: RollupGroupBy) -> &str {
    match group_by {
        RollupGroupBy::AdministrativeDistrict => &site.district,
        RollupGroupBy::LegislativeDistrict => &site.legislative_district,
        RollupGroupBy::Municipality => &site.municipality,
    }
}

/// Aggregate current versions over one partition of the school set.
///
/// The three grouping dimensions are independently assigned attributes of a
/// school; each call partitions from scratch and no dimension is ever
/// derived from another. Only current versions enter the numbers: counts,
/// allocation sums, and the progress mean all ignore superseded rows by
/// construction, because the caller hands over current records only.
pub fn region_stats(
    sites: &[&SchoolSite],
    currents: &[&ProjectCurrentRecord],
    group_by: RollupGroupBy,
) -> Vec<RollupGroup> {
    // Grouping key is the case-folded label; display label is first seen.
    let mut groups: BTreeMap<String, GroupAccumulator> = BTreeMap::new();
    let mut school_to_key: BTreeMap<SchoolId, String> = BTreeMap::new();

    for site in sites {
        let label = group_label(site, group_by);
        let key = label.to_ascii_uppercase();
        let acc = groups
            .entry(key.clone())
            .or_insert_with(|| GroupAccumulator::new(label.to_string()));
        acc.schools.insert(site.school_id.clone());
        school_to_key.insert(site.school_id.clone(), key);
    }

    for current in currents {
        // Current version outside the requested scope is skipped.
        let Some(acc) = school_to_key
            .get(&current.scope_key)
            .and_then(|key| groups.get_mut(key))
        else {
            continue;
        };
        acc.project_count += 1;
        acc.progress_sum += current.progress_percent.as_u8() as u64;
        if let Some(allocation) = current.payload.project_allocation() {
            acc.allocation_sum += allocation;
        }
        *acc.status_counts.entry(current.status).or_insert(0) += 1;
    }

    groups
        .into_values()
        .map(|acc| RollupGroup {
            group: acc.label,
            total_schools: acc.schools.len() as u32,
            project_count: acc.project_count,
            mean_progress_percent: if acc.project_count == 0 {
                None
            } else {
                Some(acc.progress_sum as f64 / acc.project_count as f64)
            },
            allocation_sum: acc.allocation_sum,
            status_counts: acc
                .status_counts
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
        })
        .collect()
}

/// Completeness flags for one school: a category is submitted when its
/// latest append-only submission row exists. Derived on every read, never
/// stored.
pub fn school_completeness(
    school_id: SchoolId,
    latest: &BTreeMap<FormCategory, &FormSubmissionRow>,
) -> SchoolFormStatus {
    let categories: Vec<FormCategoryStatus> = FormCategory::ALL
        .iter()
        .map(|category| FormCategoryStatus {
            category: *category,
            submitted: latest.contains_key(category),
        })
        .collect();
    let complete = categories.iter().all(|c| c.submitted);
    SchoolFormStatus {
        school_id,
        categories,
        complete,
    }
}
