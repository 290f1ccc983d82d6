#![forbid(unsafe_code)]

use crate::common::{validate_text, validate_token};
use crate::{ContractViolation, SchemaVersion, Validate};

pub const LOCATION_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Stable school identifier from the national masterlist. Owning scope of
/// every project and form submission.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct SchoolId(String);

impl SchoolId {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = v.into().trim().to_string();
        validate_token("school_id", &v, 32)?;
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for SchoolId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_token("school_id", &self.0, 32)
    }
}

/// Canonical form of a hierarchy label: trimmed, inner whitespace collapsed.
/// Upstream reference data has historically carried inconsistent casing and
/// stray whitespace, so every label is canonicalized once at ingestion and
/// compared case-insensitively from then on.
pub fn canon_location(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn loc_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Raw masterlist row as delivered by the reference-data loader.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct SchoolSiteInput {
    pub school_id: String,
    pub school_name: String,
    pub region: String,
    pub division: String,
    pub district: String,
    pub municipality: String,
    pub legislative_district: String,
    pub barangay: String,
}

/// One school in the administrative hierarchy. All labels canonicalized.
/// `district` (administrative) and `legislative_district` are independently
/// assigned attributes, never derived from one another.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SchoolSite {
    pub schema_version: SchemaVersion,
    pub school_id: SchoolId,
    pub school_name: String,
    pub region: String,
    pub division: String,
    pub district: String,
    pub municipality: String,
    pub legislative_district: String,
    pub barangay: String,
}

impl SchoolSite {
    pub fn from_input_v1(input: SchoolSiteInput) -> Result<Self, ContractViolation> {
        let site = Self {
            schema_version: LOCATION_CONTRACT_VERSION,
            school_id: SchoolId::new(input.school_id)?,
            school_name: canon_location(&input.school_name),
            region: canon_location(&input.region),
            division: canon_location(&input.division),
            district: canon_location(&input.district),
            municipality: canon_location(&input.municipality),
            legislative_district: canon_location(&input.legislative_district),
            barangay: canon_location(&input.barangay),
        };
        site.validate()?;
        Ok(site)
    }
}

impl Validate for SchoolSite {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != LOCATION_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "school_site.schema_version",
                reason: "must match LOCATION_CONTRACT_VERSION",
            });
        }
        self.school_id.validate()?;
        validate_text("school_site.school_name", &self.school_name, 160)?;
        validate_text("school_site.region", &self.region, 96)?;
        validate_text("school_site.division", &self.division, 96)?;
        validate_text("school_site.district", &self.district, 96)?;
        validate_text("school_site.municipality", &self.municipality, 96)?;
        validate_text(
            "school_site.legislative_district",
            &self.legislative_district,
            96,
        )?;
        validate_text("school_site.barangay", &self.barangay, 96)?;
        Ok(())
    }
}

/// Grouping dimension for rollups. Three different partitions of the same
/// school set, computed independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum RollupGroupBy {
    AdministrativeDistrict,
    LegislativeDistrict,
    Municipality,
}

impl RollupGroupBy {
    pub fn as_str(self) -> &'static str {
        match self {
            RollupGroupBy::AdministrativeDistrict => "school_district",
            RollupGroupBy::LegislativeDistrict => "legislative",
            RollupGroupBy::Municipality => "municipality",
        }
    }

    pub fn parse(v: &str) -> Result<Self, ContractViolation> {
        match v.trim() {
            "school_district" | "district" => Ok(RollupGroupBy::AdministrativeDistrict),
            "legislative" => Ok(RollupGroupBy::LegislativeDistrict),
            "municipality" => Ok(RollupGroupBy::Municipality),
            _ => Err(ContractViolation::InvalidValue {
                field: "group_by",
                reason: "must be school_district, legislative, or municipality",
            }),
        }
    }
}

/// Partial path down the hierarchy. Each level requires its parent: a
/// division filter without a region is a malformed query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationPath {
    pub region: Option<String>,
    pub division: Option<String>,
    pub district: Option<String>,
    pub municipality: Option<String>,
}

impl LocationPath {
    pub fn canonicalized(self) -> Self {
        Self {
            region: self.region.map(|v| canon_location(&v)),
            division: self.division.map(|v| canon_location(&v)),
            district: self.district.map(|v| canon_location(&v)),
            municipality: self.municipality.map(|v| canon_location(&v)),
        }
    }
}

impl Validate for LocationPath {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.division.is_some() && self.region.is_none() {
            return Err(ContractViolation::InvalidValue {
                field: "location_path.division",
                reason: "requires region",
            });
        }
        if self.district.is_some() && self.division.is_none() {
            return Err(ContractViolation::InvalidValue {
                field: "location_path.district",
                reason: "requires division",
            });
        }
        if self.municipality.is_some() && self.division.is_none() {
            return Err(ContractViolation::InvalidValue {
                field: "location_path.municipality",
                reason: "requires division",
            });
        }
        for (field, value) in [
            ("location_path.region", &self.region),
            ("location_path.division", &self.division),
            ("location_path.district", &self.district),
            ("location_path.municipality", &self.municipality),
        ] {
            if let Some(v) = value {
                validate_text(field, v, 96)?;
            }
        }
        Ok(())
    }
}
