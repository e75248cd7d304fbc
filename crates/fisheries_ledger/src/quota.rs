#![forbid(unsafe_code)]

use fisheries_kernel_contracts::audit::{QuotaAuditEventInput, QuotaAuditEventType};
use fisheries_kernel_contracts::quota::{
    CatchRecordOk, CatchReportInput, QuotaYear, SpeciesId, SpeciesQuotaRecord,
    SpeciesQuotaSetInput, SpeciesQuotaSetOk, VesselId, VesselQuotaAllocateInput,
    VesselQuotaAllocateOk, VesselQuotaRecord,
};
use fisheries_kernel_contracts::{ReasonCodeId, Validate};
use fisheries_storage::audit::AuditTrailRuntime;
use fisheries_storage::quota::LedgerError;
use fisheries_storage::repo::{AuditTrailRepo, QuotaTablesRepo};

use crate::clock::LedgerClock;

pub mod reason_codes {
    use fisheries_kernel_contracts::ReasonCodeId;

    // Quota ledger reason-code namespace ("FQ" prefix).
    pub const QUOTA_OK_SPECIES_SET: ReasonCodeId = ReasonCodeId(0x4651_0001);
    pub const QUOTA_OK_VESSEL_ALLOCATE: ReasonCodeId = ReasonCodeId(0x4651_0002);
    pub const QUOTA_OK_CATCH_RECORD: ReasonCodeId = ReasonCodeId(0x4651_0003);

    pub const QUOTA_NO_SPECIES_QUOTA: ReasonCodeId = ReasonCodeId(0x4651_0010);
    pub const QUOTA_INSUFFICIENT_REMAINING: ReasonCodeId = ReasonCodeId(0x4651_0011);
    pub const QUOTA_NO_VESSEL_QUOTA: ReasonCodeId = ReasonCodeId(0x4651_0012);
    pub const QUOTA_VESSEL_QUOTA_EXCEEDED: ReasonCodeId = ReasonCodeId(0x4651_0013);
    pub const QUOTA_TOTAL_BELOW_ALLOCATED: ReasonCodeId = ReasonCodeId(0x4651_0014);
    pub const QUOTA_ALLOCATION_BELOW_USED: ReasonCodeId = ReasonCodeId(0x4651_0015);

    pub const QUOTA_INTERNAL_STORE_ERROR: ReasonCodeId = ReasonCodeId(0x4651_00F1);
}

/// Reason code a hosting layer should stamp on a refused operation.
pub fn reason_for_error(err: &LedgerError) -> ReasonCodeId {
    match err {
        LedgerError::NoSpeciesQuota { .. } => reason_codes::QUOTA_NO_SPECIES_QUOTA,
        LedgerError::InsufficientQuota { .. } => reason_codes::QUOTA_INSUFFICIENT_REMAINING,
        LedgerError::NoVesselQuota { .. } => reason_codes::QUOTA_NO_VESSEL_QUOTA,
        LedgerError::QuotaExceeded { .. } => reason_codes::QUOTA_VESSEL_QUOTA_EXCEEDED,
        LedgerError::TotalBelowAllocated { .. } => reason_codes::QUOTA_TOTAL_BELOW_ALLOCATED,
        LedgerError::AllocationBelowUsed { .. } => reason_codes::QUOTA_ALLOCATION_BELOW_USED,
        LedgerError::TimestampRegression { .. }
        | LedgerError::ConservationViolation { .. }
        | LedgerError::AppendOnlyViolation { .. }
        | LedgerError::ContractViolation(_) => reason_codes::QUOTA_INTERNAL_STORE_ERROR,
    }
}

/// The Quota Ledger: set totals, carve vessel allocations, debit catch.
///
/// Callers are trusted; authorization happens in the hosting system. Every
/// mutation requires exclusive store access, runs its precondition checks
/// before any write, and appends exactly one audit row on commit. Failed
/// operations leave every table untouched.
#[derive(Debug, Default, Clone)]
pub struct QuotaLedgerRuntime;

impl QuotaLedgerRuntime {
    /// Authority operation: writes or overwrites a species' total quota for a
    /// year. Remaining quota is recomputed against live vessel allocations.
    pub fn set_species_quota<R>(
        &self,
        store: &mut R,
        clock: &dyn LedgerClock,
        input: &SpeciesQuotaSetInput,
    ) -> Result<SpeciesQuotaSetOk, LedgerError>
    where
        R: QuotaTablesRepo + AuditTrailRepo,
    {
        input.validate().map_err(LedgerError::ContractViolation)?;
        let now = clock.now();

        let species = store.set_species_quota_row(
            now,
            input.species_id.clone(),
            input.year,
            input.total_quota_kg,
        )?;

        AuditTrailRuntime::emit(
            store,
            QuotaAuditEventInput::v1(
                now,
                QuotaAuditEventType::SpeciesQuotaSet,
                species.species_id.clone(),
                species.year,
                None,
                species.total_quota_kg,
                reason_codes::QUOTA_OK_SPECIES_SET,
                input.correlation_id,
                input.idempotency_key.clone(),
            )?,
        )?;

        SpeciesQuotaSetOk::v1(reason_codes::QUOTA_OK_SPECIES_SET, species)
            .map_err(LedgerError::ContractViolation)
    }

    /// Carves a vessel allocation out of the species' remaining quota for the
    /// named year. Species decrement and vessel write commit as one unit.
    pub fn allocate_vessel_quota<R>(
        &self,
        store: &mut R,
        clock: &dyn LedgerClock,
        input: &VesselQuotaAllocateInput,
    ) -> Result<VesselQuotaAllocateOk, LedgerError>
    where
        R: QuotaTablesRepo + AuditTrailRepo,
    {
        input.validate().map_err(LedgerError::ContractViolation)?;
        let now = clock.now();

        let (species, vessel) = store.allocate_vessel_quota_row(
            now,
            input.vessel_id.clone(),
            input.species_id.clone(),
            input.year,
            input.quota_kg,
        )?;

        AuditTrailRuntime::emit(
            store,
            QuotaAuditEventInput::v1(
                now,
                QuotaAuditEventType::VesselQuotaAllocated,
                species.species_id.clone(),
                species.year,
                Some(vessel.vessel_id.clone()),
                vessel.allocated_quota_kg,
                reason_codes::QUOTA_OK_VESSEL_ALLOCATE,
                input.correlation_id,
                input.idempotency_key.clone(),
            )?,
        )?;

        VesselQuotaAllocateOk::v1(reason_codes::QUOTA_OK_VESSEL_ALLOCATE, species, vessel)
            .map_err(LedgerError::ContractViolation)
    }

    /// Debits reported catch against the vessel's allocation for the clock's
    /// current year. The species table is never touched: catch consumes the
    /// vessel's already-carved allocation, not the species total.
    pub fn record_catch<R>(
        &self,
        store: &mut R,
        clock: &dyn LedgerClock,
        input: &CatchReportInput,
    ) -> Result<CatchRecordOk, LedgerError>
    where
        R: QuotaTablesRepo + AuditTrailRepo,
    {
        input.validate().map_err(LedgerError::ContractViolation)?;
        let now = clock.now();
        let year = clock.current_year();

        let vessel = store.record_catch_row(
            now,
            &input.vessel_id,
            &input.species_id,
            year,
            input.quantity_kg,
        )?;

        AuditTrailRuntime::emit(
            store,
            QuotaAuditEventInput::v1(
                now,
                QuotaAuditEventType::CatchRecorded,
                vessel.species_id.clone(),
                vessel.year,
                Some(vessel.vessel_id.clone()),
                input.quantity_kg,
                reason_codes::QUOTA_OK_CATCH_RECORD,
                input.correlation_id,
                input.idempotency_key.clone(),
            )?,
        )?;

        CatchRecordOk::v1(reason_codes::QUOTA_OK_CATCH_RECORD, vessel)
            .map_err(LedgerError::ContractViolation)
    }

    pub fn species_quota<R: QuotaTablesRepo>(
        &self,
        store: &R,
        species_id: &SpeciesId,
        year: QuotaYear,
    ) -> Option<SpeciesQuotaRecord> {
        store.species_quota_row(species_id, year).cloned()
    }

    pub fn vessel_quota<R: QuotaTablesRepo>(
        &self,
        store: &R,
        vessel_id: &VesselId,
        species_id: &SpeciesId,
        year: QuotaYear,
    ) -> Option<VesselQuotaRecord> {
        store.vessel_quota_row(vessel_id, species_id, year).cloned()
    }

    /// Absence is compliant. `record_catch` already refuses any write that
    /// would break `used <= allocated`, so a `false` here means the store was
    /// mutated outside the ledger's operations.
    pub fn check_vessel_compliance<R: QuotaTablesRepo>(
        &self,
        store: &R,
        clock: &dyn LedgerClock,
        vessel_id: &VesselId,
        species_id: &SpeciesId,
    ) -> bool {
        store.vessel_compliant(vessel_id, species_id, clock.current_year())
    }
}
