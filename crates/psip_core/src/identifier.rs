#![forbid(unsafe_code)]

use psip_contracts::project::ProjectIdentifier;
use psip_contracts::ContractViolation;

/// Infrastructure project codes look like `IPC-2025-00042`: a fixed prefix,
/// the reporting year, and a zero-padded per-year sequence. The next code
/// is always one past the highest sequence already issued for that year,
/// so the series survives deletions-by-supersede and a rebuilt projection.
pub const IPC_PREFIX: &str = "IPC";

fn sequence_for_year(identifier: &ProjectIdentifier, year: u16) -> Option<u64> {
    let rest = identifier
        .as_str()
        .strip_prefix(IPC_PREFIX)?
        .strip_prefix('-')?;
    let (id_year, seq) = rest.split_once('-')?;
    if id_year.parse::<u16>().ok()? != year {
        return None;
    }
    seq.parse::<u64>().ok()
}

/// Issue the next code for `year`, scanning the identifiers already on
/// record. Gaps are never reused.
pub fn next_project_identifier<'a>(
    existing: impl Iterator<Item = &'a ProjectIdentifier>,
    year: u16,
) -> Result<ProjectIdentifier, ContractViolation> {
    let max_seq = existing
        .filter_map(|id| sequence_for_year(id, year))
        .max()
        .unwrap_or(0);
    ProjectIdentifier::new(format!("{IPC_PREFIX}-{year}-{:05}", max_seq + 1))
}
