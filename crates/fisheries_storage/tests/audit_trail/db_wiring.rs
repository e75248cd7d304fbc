#![forbid(unsafe_code)]

use fisheries_kernel_contracts::audit::{
    AuditEventId, CorrelationId, QuotaAuditEventInput, QuotaAuditEventType,
};
use fisheries_kernel_contracts::quota::{Kilograms, QuotaYear, SpeciesId, VesselId};
use fisheries_kernel_contracts::{BlockHeight, ReasonCodeId};
use fisheries_storage::audit::AuditTrailRuntime;
use fisheries_storage::quota::{LedgerError, QuotaStore};
use fisheries_storage::repo::AuditTrailRepo;

fn audit_ev(
    t: u64,
    event_type: QuotaAuditEventType,
    vessel_id: Option<&str>,
    amount_kg: u64,
    correlation: u64,
    idempotency_key: Option<&str>,
) -> QuotaAuditEventInput {
    QuotaAuditEventInput::v1(
        BlockHeight(t),
        event_type,
        SpeciesId::new("cod").unwrap(),
        QuotaYear(2023),
        vessel_id.map(|id| VesselId::new(id).unwrap()),
        Kilograms(amount_kg),
        ReasonCodeId(0x4651_0001),
        CorrelationId(correlation),
        idempotency_key.map(ToString::to_string),
    )
    .unwrap()
}

#[test]
fn at_audit_db_01_append_assigns_sequential_event_ids() {
    let mut s = QuotaStore::new_in_memory();

    let id1 = s
        .append_audit_event(audit_ev(
            10,
            QuotaAuditEventType::SpeciesQuotaSet,
            None,
            100_000,
            1,
            None,
        ))
        .unwrap();
    let id2 = s
        .append_audit_event(audit_ev(
            11,
            QuotaAuditEventType::VesselQuotaAllocated,
            Some("vessel_1"),
            5000,
            2,
            None,
        ))
        .unwrap();

    assert_eq!(id1, AuditEventId(1));
    assert_eq!(id2, AuditEventId(2));
    assert_eq!(s.audit_rows().len(), 2);
    assert_eq!(s.audit_rows()[0].event_id, id1);
}

#[test]
fn at_audit_db_02_append_only_enforced() {
    let mut s = QuotaStore::new_in_memory();
    let id = s
        .append_audit_event(audit_ev(
            10,
            QuotaAuditEventType::SpeciesQuotaSet,
            None,
            100_000,
            1,
            Some("idem_append"),
        ))
        .unwrap();

    assert!(matches!(
        s.attempt_overwrite_audit_event(id),
        Err(LedgerError::AppendOnlyViolation { .. })
    ));
}

#[test]
fn at_audit_db_03_idempotency_dedupe_works() {
    let mut s = QuotaStore::new_in_memory();

    let ev1 = s
        .append_audit_event(audit_ev(
            10,
            QuotaAuditEventType::CatchRecorded,
            Some("vessel_1"),
            2000,
            7,
            Some("idem_same"),
        ))
        .unwrap();
    let ev2 = s
        .append_audit_event(audit_ev(
            11,
            QuotaAuditEventType::CatchRecorded,
            Some("vessel_1"),
            2000,
            7,
            Some("idem_same"),
        ))
        .unwrap();

    // Deterministic no-op on retry: same event id, nothing appended.
    assert_eq!(ev1, ev2);
    assert_eq!(s.audit_events().len(), 1);

    // A different correlation scope is a different emission.
    let ev3 = s
        .append_audit_event(audit_ev(
            12,
            QuotaAuditEventType::CatchRecorded,
            Some("vessel_1"),
            2000,
            8,
            Some("idem_same"),
        ))
        .unwrap();
    assert_ne!(ev1, ev3);
    assert_eq!(s.audit_events().len(), 2);
}

#[test]
fn at_audit_db_04_payload_hash_is_deterministic_and_well_formed() {
    let mut s = QuotaStore::new_in_memory();

    s.append_audit_event(audit_ev(
        10,
        QuotaAuditEventType::CatchRecorded,
        Some("vessel_1"),
        2000,
        1,
        None,
    ))
    .unwrap();
    s.append_audit_event(audit_ev(
        10,
        QuotaAuditEventType::CatchRecorded,
        Some("vessel_1"),
        2000,
        1,
        None,
    ))
    .unwrap();
    s.append_audit_event(audit_ev(
        10,
        QuotaAuditEventType::CatchRecorded,
        Some("vessel_1"),
        2001,
        1,
        None,
    ))
    .unwrap();

    let rows = s.audit_events();
    assert_eq!(rows[0].payload_hash_sha256.len(), 64);
    assert!(rows[0]
        .payload_hash_sha256
        .chars()
        .all(|c| c.is_ascii_hexdigit()));
    assert_eq!(rows[0].payload_hash_sha256, rows[1].payload_hash_sha256);
    assert_ne!(rows[0].payload_hash_sha256, rows[2].payload_hash_sha256);
}

#[test]
fn at_audit_db_05_queries_by_correlation_and_vessel() {
    let mut s = QuotaStore::new_in_memory();

    AuditTrailRuntime::emit(
        &mut s,
        audit_ev(10, QuotaAuditEventType::SpeciesQuotaSet, None, 100_000, 1, None),
    )
    .unwrap();
    AuditTrailRuntime::emit(
        &mut s,
        audit_ev(
            11,
            QuotaAuditEventType::VesselQuotaAllocated,
            Some("vessel_1"),
            5000,
            1,
            None,
        ),
    )
    .unwrap();
    AuditTrailRuntime::emit(
        &mut s,
        audit_ev(
            12,
            QuotaAuditEventType::CatchRecorded,
            Some("vessel_2"),
            700,
            2,
            None,
        ),
    )
    .unwrap();

    assert_eq!(s.audit_rows_by_correlation(CorrelationId(1)).len(), 2);
    assert_eq!(s.audit_rows_by_correlation(CorrelationId(2)).len(), 1);
    let vessel_1 = VesselId::new("vessel_1").unwrap();
    let by_vessel = s.audit_rows_by_vessel(&vessel_1);
    assert_eq!(by_vessel.len(), 1);
    assert_eq!(by_vessel[0].amount_kg, Kilograms(5000));
}
