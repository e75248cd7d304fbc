#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use fisheries_kernel_contracts::audit::{
    AuditEventId, CorrelationId, QuotaAuditEvent, QuotaAuditEventInput,
};
use fisheries_kernel_contracts::quota::{
    Kilograms, QuotaYear, SpeciesId, SpeciesQuotaRecord, VesselId, VesselQuotaRecord,
};
use fisheries_kernel_contracts::BlockHeight;

use crate::quota::{LedgerError, QuotaStore};

/// Typed repository interface for the two quota tables.
pub trait QuotaTablesRepo {
    fn set_species_quota_row(
        &mut self,
        now: BlockHeight,
        species_id: SpeciesId,
        year: QuotaYear,
        total_quota_kg: Kilograms,
    ) -> Result<SpeciesQuotaRecord, LedgerError>;

    fn allocate_vessel_quota_row(
        &mut self,
        now: BlockHeight,
        vessel_id: VesselId,
        species_id: SpeciesId,
        year: QuotaYear,
        quota_kg: Kilograms,
    ) -> Result<(SpeciesQuotaRecord, VesselQuotaRecord), LedgerError>;

    fn record_catch_row(
        &mut self,
        now: BlockHeight,
        vessel_id: &VesselId,
        species_id: &SpeciesId,
        year: QuotaYear,
        quantity_kg: Kilograms,
    ) -> Result<VesselQuotaRecord, LedgerError>;

    fn species_quota_row(
        &self,
        species_id: &SpeciesId,
        year: QuotaYear,
    ) -> Option<&SpeciesQuotaRecord>;

    fn vessel_quota_row(
        &self,
        vessel_id: &VesselId,
        species_id: &SpeciesId,
        year: QuotaYear,
    ) -> Option<&VesselQuotaRecord>;

    fn species_quota_rows(&self) -> &BTreeMap<(SpeciesId, QuotaYear), SpeciesQuotaRecord>;

    fn vessel_quota_rows(&self)
        -> &BTreeMap<(VesselId, SpeciesId, QuotaYear), VesselQuotaRecord>;

    fn vessel_compliant(
        &self,
        vessel_id: &VesselId,
        species_id: &SpeciesId,
        year: QuotaYear,
    ) -> bool;

    fn verify_conservation(&self) -> Result<(), LedgerError>;
}

/// Typed repository interface for the append-only quota audit trail.
pub trait AuditTrailRepo {
    fn append_audit_row(&mut self, input: QuotaAuditEventInput)
        -> Result<AuditEventId, LedgerError>;
    fn audit_rows(&self) -> &[QuotaAuditEvent];
    fn audit_rows_by_correlation(&self, correlation_id: CorrelationId) -> Vec<&QuotaAuditEvent>;
    fn audit_rows_by_vessel(&self, vessel_id: &VesselId) -> Vec<&QuotaAuditEvent>;
}

impl QuotaTablesRepo for QuotaStore {
    fn set_species_quota_row(
        &mut self,
        now: BlockHeight,
        species_id: SpeciesId,
        year: QuotaYear,
        total_quota_kg: Kilograms,
    ) -> Result<SpeciesQuotaRecord, LedgerError> {
        self.set_species_quota(now, species_id, year, total_quota_kg)
    }

    fn allocate_vessel_quota_row(
        &mut self,
        now: BlockHeight,
        vessel_id: VesselId,
        species_id: SpeciesId,
        year: QuotaYear,
        quota_kg: Kilograms,
    ) -> Result<(SpeciesQuotaRecord, VesselQuotaRecord), LedgerError> {
        self.allocate_vessel_quota(now, vessel_id, species_id, year, quota_kg)
    }

    fn record_catch_row(
        &mut self,
        now: BlockHeight,
        vessel_id: &VesselId,
        species_id: &SpeciesId,
        year: QuotaYear,
        quantity_kg: Kilograms,
    ) -> Result<VesselQuotaRecord, LedgerError> {
        self.record_catch(now, vessel_id, species_id, year, quantity_kg)
    }

    fn species_quota_row(
        &self,
        species_id: &SpeciesId,
        year: QuotaYear,
    ) -> Option<&SpeciesQuotaRecord> {
        self.species_quota(species_id, year)
    }

    fn vessel_quota_row(
        &self,
        vessel_id: &VesselId,
        species_id: &SpeciesId,
        year: QuotaYear,
    ) -> Option<&VesselQuotaRecord> {
        self.vessel_quota(vessel_id, species_id, year)
    }

    fn species_quota_rows(&self) -> &BTreeMap<(SpeciesId, QuotaYear), SpeciesQuotaRecord> {
        QuotaStore::species_quota_rows(self)
    }

    fn vessel_quota_rows(
        &self,
    ) -> &BTreeMap<(VesselId, SpeciesId, QuotaYear), VesselQuotaRecord> {
        QuotaStore::vessel_quota_rows(self)
    }

    fn vessel_compliant(
        &self,
        vessel_id: &VesselId,
        species_id: &SpeciesId,
        year: QuotaYear,
    ) -> bool {
        self.check_vessel_compliance(vessel_id, species_id, year)
    }

    fn verify_conservation(&self) -> Result<(), LedgerError> {
        QuotaStore::verify_conservation(self)
    }
}

impl AuditTrailRepo for QuotaStore {
    fn append_audit_row(
        &mut self,
        input: QuotaAuditEventInput,
    ) -> Result<AuditEventId, LedgerError> {
        self.append_audit_event(input)
    }

    fn audit_rows(&self) -> &[QuotaAuditEvent] {
        self.audit_events()
    }

    fn audit_rows_by_correlation(&self, correlation_id: CorrelationId) -> Vec<&QuotaAuditEvent> {
        self.audit_events_by_correlation(correlation_id)
    }

    fn audit_rows_by_vessel(&self, vessel_id: &VesselId) -> Vec<&QuotaAuditEvent> {
        self.audit_events_by_vessel(vessel_id)
    }
}
