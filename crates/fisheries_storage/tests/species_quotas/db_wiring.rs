#![forbid(unsafe_code)]

use fisheries_kernel_contracts::quota::{Kilograms, QuotaYear, SpeciesId, VesselId};
use fisheries_kernel_contracts::BlockHeight;
use fisheries_storage::quota::{LedgerError, QuotaStore};
use fisheries_storage::repo::QuotaTablesRepo;

fn species(id: &str) -> SpeciesId {
    SpeciesId::new(id).unwrap()
}

fn vessel(id: &str) -> VesselId {
    VesselId::new(id).unwrap()
}

#[test]
fn at_species_db_01_set_initializes_remaining_to_total() {
    let mut s = QuotaStore::new_in_memory();

    let rec = s
        .set_species_quota(BlockHeight(100), species("cod"), QuotaYear(2023), Kilograms(100_000))
        .unwrap();

    assert_eq!(rec.total_quota_kg, Kilograms(100_000));
    assert_eq!(rec.remaining_quota_kg, Kilograms(100_000));
    assert_eq!(rec.last_updated, BlockHeight(100));
    assert_eq!(
        s.species_quota_row(&species("cod"), QuotaYear(2023)),
        Some(&rec)
    );
}

#[test]
fn at_species_db_02_tuple_keys_isolate_species_and_years() {
    let mut s = QuotaStore::new_in_memory();

    s.set_species_quota(BlockHeight(10), species("cod"), QuotaYear(2023), Kilograms(1000))
        .unwrap();
    s.set_species_quota(BlockHeight(11), species("cod"), QuotaYear(2024), Kilograms(2000))
        .unwrap();
    // A '-' inside an identifier cannot collide keys; the key is structural.
    s.set_species_quota(
        BlockHeight(12),
        species("north-sea-cod"),
        QuotaYear(2023),
        Kilograms(3000),
    )
    .unwrap();

    assert_eq!(s.species_quota_rows().len(), 3);
    assert_eq!(
        s.species_quota(&species("cod"), QuotaYear(2023)).unwrap().total_quota_kg,
        Kilograms(1000)
    );
    assert_eq!(
        s.species_quota(&species("cod"), QuotaYear(2024)).unwrap().total_quota_kg,
        Kilograms(2000)
    );
    assert!(s.species_quota(&species("north"), QuotaYear(2023)).is_none());
}

#[test]
fn at_species_db_03_reset_recomputes_remaining_and_rejects_total_below_allocated() {
    let mut s = QuotaStore::new_in_memory();

    s.set_species_quota(BlockHeight(10), species("cod"), QuotaYear(2023), Kilograms(100_000))
        .unwrap();
    s.allocate_vessel_quota(
        BlockHeight(11),
        vessel("vessel_1"),
        species("cod"),
        QuotaYear(2023),
        Kilograms(5000),
    )
    .unwrap();

    let rec = s
        .set_species_quota(BlockHeight(12), species("cod"), QuotaYear(2023), Kilograms(50_000))
        .unwrap();
    assert_eq!(rec.remaining_quota_kg, Kilograms(45_000));

    let err = s
        .set_species_quota(BlockHeight(13), species("cod"), QuotaYear(2023), Kilograms(4000))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::TotalBelowAllocated {
            allocated_kg: Kilograms(5000),
            ..
        }
    ));
    // Failed re-set leaves the prior row intact.
    assert_eq!(
        s.species_quota(&species("cod"), QuotaYear(2023)).unwrap().total_quota_kg,
        Kilograms(50_000)
    );
}

#[test]
fn at_species_db_04_timestamp_regression_is_rejected() {
    let mut s = QuotaStore::new_in_memory();

    s.set_species_quota(BlockHeight(100), species("cod"), QuotaYear(2023), Kilograms(1000))
        .unwrap();

    let err = s
        .set_species_quota(BlockHeight(99), species("cod"), QuotaYear(2023), Kilograms(2000))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::TimestampRegression {
            table: "species_quotas",
            ..
        }
    ));
}

#[test]
fn at_species_db_05_conservation_holds_across_interleaved_operations() {
    let mut s = QuotaStore::new_in_memory();

    s.set_species_quota(BlockHeight(10), species("cod"), QuotaYear(2023), Kilograms(100_000))
        .unwrap();
    s.set_species_quota(BlockHeight(11), species("haddock"), QuotaYear(2023), Kilograms(40_000))
        .unwrap();
    s.allocate_vessel_quota(
        BlockHeight(12),
        vessel("vessel_1"),
        species("cod"),
        QuotaYear(2023),
        Kilograms(5000),
    )
    .unwrap();
    s.allocate_vessel_quota(
        BlockHeight(13),
        vessel("vessel_2"),
        species("cod"),
        QuotaYear(2023),
        Kilograms(7000),
    )
    .unwrap();
    s.allocate_vessel_quota(
        BlockHeight(14),
        vessel("vessel_1"),
        species("haddock"),
        QuotaYear(2023),
        Kilograms(1000),
    )
    .unwrap();
    s.record_catch(
        BlockHeight(15),
        &vessel("vessel_1"),
        &species("cod"),
        QuotaYear(2023),
        Kilograms(2500),
    )
    .unwrap();

    s.verify_conservation().unwrap();
    assert_eq!(
        s.allocated_total_kg(&species("cod"), QuotaYear(2023)),
        Kilograms(12_000)
    );
}
