#![forbid(unsafe_code)]

use psip_contracts::location::{LocationPath, SchoolId, SchoolSiteInput};
use psip_storage::LedgerStore;

fn input(school_id: &str, region: &str, division: &str, district: &str, municipality: &str) -> SchoolSiteInput {
    SchoolSiteInput {
        school_id: school_id.to_string(),
        school_name: format!("School {school_id}"),
        region: region.to_string(),
        division: division.to_string(),
        district: district.to_string(),
        municipality: municipality.to_string(),
        legislative_district: "1st District".to_string(),
        barangay: "Poblacion".to_string(),
    }
}

fn seeded_store() -> LedgerStore {
    let mut store = LedgerStore::new_in_memory();
    // Messy labels on purpose: stray whitespace and inconsistent casing.
    store
        .ingest_school_site(input("100001", "  Region   I ", "Ilocos Norte", "Laoag East", "Laoag City"))
        .unwrap();
    store
        .ingest_school_site(input("100002", "REGION I", "ilocos norte", "Laoag West", "Laoag City"))
        .unwrap();
    store
        .ingest_school_site(input("100003", "Region II", "Isabela", "Ilagan North", "Ilagan City"))
        .unwrap();
    store
}

#[test]
fn at_location_01_labels_are_canonicalized_at_ingestion() {
    let store = seeded_store();
    let site = store
        .school_site(&SchoolId::new("100001").unwrap())
        .unwrap();
    assert_eq!(site.region, "Region I");
}

#[test]
fn at_location_02_path_match_is_case_insensitive() {
    let store = seeded_store();
    let path = LocationPath {
        region: Some("region i".to_string()),
        division: Some("ILOCOS NORTE".to_string()),
        ..LocationPath::default()
    };
    let matched = store.schools_for_path(&path);
    assert_eq!(matched.len(), 2);
}

#[test]
fn at_location_03_children_deduplicate_across_casings() {
    let store = seeded_store();
    // Two rows spelled "Ilocos Norte" and "ilocos norte" are one division.
    let divisions = store.location_children(&LocationPath {
        region: Some("Region I".to_string()),
        ..LocationPath::default()
    });
    assert_eq!(divisions.len(), 1);

    let regions = store.location_children(&LocationPath::default());
    assert_eq!(regions, vec!["Region I".to_string(), "Region II".to_string()]);
}

#[test]
fn at_location_04_municipality_path_descends_to_barangays() {
    let mut store = seeded_store();
    let mut other = input("100004", "Region I", "Ilocos Norte", "Laoag East", "Laoag City");
    other.barangay = "Barangay 12".to_string();
    store.ingest_school_site(other).unwrap();

    let barangays = store.location_children(&LocationPath {
        region: Some("Region I".to_string()),
        division: Some("Ilocos Norte".to_string()),
        municipality: Some("Laoag City".to_string()),
        ..LocationPath::default()
    });
    assert_eq!(
        barangays,
        vec!["Barangay 12".to_string(), "Poblacion".to_string()]
    );
}

#[test]
fn at_location_05_reingest_replaces_the_row() {
    let mut store = seeded_store();
    store
        .ingest_school_site(input("100001", "Region I", "Ilocos Norte", "Laoag Central", "Laoag City"))
        .unwrap();
    let site = store
        .school_site(&SchoolId::new("100001").unwrap())
        .unwrap();
    assert_eq!(site.district, "Laoag Central");
    assert_eq!(store.school_sites().len(), 3);
}
