#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use fisheries_kernel_contracts::audit::{
    AuditEventId, CorrelationId, QuotaAuditEvent, QuotaAuditEventInput,
};
use fisheries_kernel_contracts::quota::{
    Kilograms, QuotaYear, SpeciesId, SpeciesQuotaRecord, VesselId, VesselQuotaRecord,
};
use fisheries_kernel_contracts::{BlockHeight, ContractViolation, Validate};

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Allocation requested against a species/year with no total quota set.
    NoSpeciesQuota {
        species_id: SpeciesId,
        year: QuotaYear,
    },
    /// Allocation request exceeds the species' remaining quota.
    InsufficientQuota {
        species_id: SpeciesId,
        year: QuotaYear,
        requested_kg: Kilograms,
        remaining_kg: Kilograms,
    },
    /// Catch reported against a vessel with no allocation for the year.
    NoVesselQuota {
        vessel_id: VesselId,
        species_id: SpeciesId,
        year: QuotaYear,
    },
    /// Catch report would push a vessel's used quota past its allocation.
    QuotaExceeded {
        vessel_id: VesselId,
        species_id: SpeciesId,
        year: QuotaYear,
        allocated_kg: Kilograms,
        used_kg: Kilograms,
        requested_kg: Kilograms,
    },
    /// Re-set total is below the sum of live vessel allocations.
    TotalBelowAllocated {
        species_id: SpeciesId,
        year: QuotaYear,
        total_kg: Kilograms,
        allocated_kg: Kilograms,
    },
    /// Re-allocation grant is below catch already recorded for the vessel.
    AllocationBelowUsed {
        vessel_id: VesselId,
        species_id: SpeciesId,
        year: QuotaYear,
        requested_kg: Kilograms,
        used_kg: Kilograms,
    },
    /// The supplied tick is older than a row it would overwrite.
    TimestampRegression {
        table: &'static str,
        have: BlockHeight,
        got: BlockHeight,
    },
    /// `total - remaining` diverged from the sum of vessel allocations.
    ConservationViolation {
        species_id: SpeciesId,
        year: QuotaYear,
        total_kg: Kilograms,
        remaining_kg: Kilograms,
        allocated_kg: Kilograms,
    },
    AppendOnlyViolation {
        table: &'static str,
    },
    ContractViolation(ContractViolation),
}

impl From<ContractViolation> for LedgerError {
    fn from(v: ContractViolation) -> Self {
        LedgerError::ContractViolation(v)
    }
}

/// Single-owner in-memory quota ledger store.
///
/// Both quota tables use structural tuple keys; a delimiter character inside a
/// species or vessel identifier cannot collide two keys. Every mutation is one
/// `&mut self` call, so the two-step allocation update (species decrement plus
/// vessel write) cannot interleave with another writer.
#[derive(Debug, Clone)]
pub struct QuotaStore {
    species_quotas: BTreeMap<(SpeciesId, QuotaYear), SpeciesQuotaRecord>,
    vessel_quotas: BTreeMap<(VesselId, SpeciesId, QuotaYear), VesselQuotaRecord>,

    audit_events: Vec<QuotaAuditEvent>,
    // (correlation_id, idempotency_key) -> deterministic no-op on retry.
    audit_idempotency_index: BTreeMap<(CorrelationId, String), AuditEventId>,
    next_audit_event_id: u64,
}

impl Default for QuotaStore {
    fn default() -> Self {
        Self::new_in_memory()
    }
}

impl QuotaStore {
    pub fn new_in_memory() -> Self {
        Self {
            species_quotas: BTreeMap::new(),
            vessel_quotas: BTreeMap::new(),
            audit_events: Vec::new(),
            audit_idempotency_index: BTreeMap::new(),
            next_audit_event_id: 1,
        }
    }

    /// Writes or overwrites the total quota for `(species, year)`.
    ///
    /// Overwriting recomputes `remaining` from the live allocation sum so the
    /// conservation invariant survives a mid-year total adjustment; a total
    /// below the already-allocated sum is rejected. With no dependent
    /// allocations this reduces to `remaining = total`.
    pub fn set_species_quota(
        &mut self,
        now: BlockHeight,
        species_id: SpeciesId,
        year: QuotaYear,
        total_quota_kg: Kilograms,
    ) -> Result<SpeciesQuotaRecord, LedgerError> {
        if let Some(existing) = self.species_quotas.get(&(species_id.clone(), year)) {
            if now < existing.last_updated {
                return Err(LedgerError::TimestampRegression {
                    table: "species_quotas",
                    have: existing.last_updated,
                    got: now,
                });
            }
        }

        let allocated = self.allocated_total_kg(&species_id, year);
        let remaining = match total_quota_kg.checked_sub(allocated) {
            Some(remaining) => remaining,
            None => {
                return Err(LedgerError::TotalBelowAllocated {
                    species_id,
                    year,
                    total_kg: total_quota_kg,
                    allocated_kg: allocated,
                });
            }
        };

        let rec = SpeciesQuotaRecord::v1(species_id.clone(), year, total_quota_kg, remaining, now)?;
        self.species_quotas.insert((species_id, year), rec.clone());
        Ok(rec)
    }

    /// Carves a vessel allocation out of the species' remaining quota.
    ///
    /// Both writes (species decrement, vessel entry) commit together or not at
    /// all: every precondition and record construction is checked before the
    /// first table insert. Re-allocating an existing vessel key refunds the
    /// prior grant before the sufficiency check and preserves recorded catch.
    pub fn allocate_vessel_quota(
        &mut self,
        now: BlockHeight,
        vessel_id: VesselId,
        species_id: SpeciesId,
        year: QuotaYear,
        quota_kg: Kilograms,
    ) -> Result<(SpeciesQuotaRecord, VesselQuotaRecord), LedgerError> {
        let species = match self.species_quotas.get(&(species_id.clone(), year)) {
            Some(rec) => rec.clone(),
            None => {
                return Err(LedgerError::NoSpeciesQuota { species_id, year });
            }
        };
        if now < species.last_updated {
            return Err(LedgerError::TimestampRegression {
                table: "species_quotas",
                have: species.last_updated,
                got: now,
            });
        }

        let prior = self
            .vessel_quotas
            .get(&(vessel_id.clone(), species_id.clone(), year));
        let (prior_allocated, prior_used) = match prior {
            Some(rec) => {
                if now < rec.last_updated {
                    return Err(LedgerError::TimestampRegression {
                        table: "vessel_quotas",
                        have: rec.last_updated,
                        got: now,
                    });
                }
                (rec.allocated_quota_kg, rec.used_quota_kg)
            }
            None => (Kilograms::ZERO, Kilograms::ZERO),
        };

        // Refunded remaining: what the species has left once the prior grant
        // (if any) is handed back. Bounded by total, so the add cannot wrap.
        let refunded_remaining = Kilograms(
            species
                .remaining_quota_kg
                .0
                .saturating_add(prior_allocated.0),
        );
        if quota_kg > refunded_remaining {
            return Err(LedgerError::InsufficientQuota {
                species_id,
                year,
                requested_kg: quota_kg,
                remaining_kg: refunded_remaining,
            });
        }
        if quota_kg < prior_used {
            return Err(LedgerError::AllocationBelowUsed {
                vessel_id,
                species_id,
                year,
                requested_kg: quota_kg,
                used_kg: prior_used,
            });
        }

        let new_remaining = Kilograms(refunded_remaining.0 - quota_kg.0);
        let species_rec = SpeciesQuotaRecord::v1(
            species_id.clone(),
            year,
            species.total_quota_kg,
            new_remaining,
            now,
        )?;
        let vessel_rec = VesselQuotaRecord::v1(
            vessel_id.clone(),
            species_id.clone(),
            year,
            quota_kg,
            prior_used,
            now,
        )?;

        self.species_quotas
            .insert((species_id.clone(), year), species_rec.clone());
        self.vessel_quotas
            .insert((vessel_id, species_id, year), vessel_rec.clone());
        Ok((species_rec, vessel_rec))
    }

    /// Debits reported catch against the vessel's allocation for `year`.
    /// Never touches the species table.
    pub fn record_catch(
        &mut self,
        now: BlockHeight,
        vessel_id: &VesselId,
        species_id: &SpeciesId,
        year: QuotaYear,
        quantity_kg: Kilograms,
    ) -> Result<VesselQuotaRecord, LedgerError> {
        let key = (vessel_id.clone(), species_id.clone(), year);
        let existing = match self.vessel_quotas.get(&key) {
            Some(rec) => rec.clone(),
            None => {
                return Err(LedgerError::NoVesselQuota {
                    vessel_id: vessel_id.clone(),
                    species_id: species_id.clone(),
                    year,
                });
            }
        };
        if now < existing.last_updated {
            return Err(LedgerError::TimestampRegression {
                table: "vessel_quotas",
                have: existing.last_updated,
                got: now,
            });
        }

        let new_used = existing
            .used_quota_kg
            .checked_add(quantity_kg)
            .filter(|used| *used <= existing.allocated_quota_kg);
        let new_used = match new_used {
            Some(used) => used,
            None => {
                return Err(LedgerError::QuotaExceeded {
                    vessel_id: vessel_id.clone(),
                    species_id: species_id.clone(),
                    year,
                    allocated_kg: existing.allocated_quota_kg,
                    used_kg: existing.used_quota_kg,
                    requested_kg: quantity_kg,
                });
            }
        };

        let rec = VesselQuotaRecord::v1(
            vessel_id.clone(),
            species_id.clone(),
            year,
            existing.allocated_quota_kg,
            new_used,
            now,
        )?;
        self.vessel_quotas.insert(key, rec.clone());
        Ok(rec)
    }

    pub fn species_quota(
        &self,
        species_id: &SpeciesId,
        year: QuotaYear,
    ) -> Option<&SpeciesQuotaRecord> {
        self.species_quotas.get(&(species_id.clone(), year))
    }

    pub fn vessel_quota(
        &self,
        vessel_id: &VesselId,
        species_id: &SpeciesId,
        year: QuotaYear,
    ) -> Option<&VesselQuotaRecord> {
        self.vessel_quotas
            .get(&(vessel_id.clone(), species_id.clone(), year))
    }

    pub fn species_quota_rows(&self) -> &BTreeMap<(SpeciesId, QuotaYear), SpeciesQuotaRecord> {
        &self.species_quotas
    }

    pub fn vessel_quota_rows(
        &self,
    ) -> &BTreeMap<(VesselId, SpeciesId, QuotaYear), VesselQuotaRecord> {
        &self.vessel_quotas
    }

    /// Absence is compliant: a vessel with no allocation has nothing to
    /// violate. `record_catch` already rejects any write that would break the
    /// inequality, so this is an observability probe, not an enforcement point.
    pub fn check_vessel_compliance(
        &self,
        vessel_id: &VesselId,
        species_id: &SpeciesId,
        year: QuotaYear,
    ) -> bool {
        match self.vessel_quota(vessel_id, species_id, year) {
            None => true,
            Some(rec) => rec.used_quota_kg <= rec.allocated_quota_kg,
        }
    }

    pub fn allocated_total_kg(&self, species_id: &SpeciesId, year: QuotaYear) -> Kilograms {
        let sum = self
            .vessel_quotas
            .iter()
            .filter(|((_, s, y), _)| s == species_id && *y == year)
            .fold(0u64, |acc, (_, rec)| {
                acc.saturating_add(rec.allocated_quota_kg.0)
            });
        Kilograms(sum)
    }

    /// Confirms `total - remaining = sum of allocations` for every species
    /// key. Returns the first divergence found.
    pub fn verify_conservation(&self) -> Result<(), LedgerError> {
        for ((species_id, year), rec) in &self.species_quotas {
            let allocated = self.allocated_total_kg(species_id, *year);
            let consumed = rec.total_quota_kg.0 - rec.remaining_quota_kg.0;
            if consumed != allocated.0 {
                return Err(LedgerError::ConservationViolation {
                    species_id: species_id.clone(),
                    year: *year,
                    total_kg: rec.total_quota_kg,
                    remaining_kg: rec.remaining_quota_kg,
                    allocated_kg: allocated,
                });
            }
        }
        Ok(())
    }

    pub fn append_audit_event(
        &mut self,
        input: QuotaAuditEventInput,
    ) -> Result<AuditEventId, LedgerError> {
        input.validate()?;

        if let Some(k) = &input.idempotency_key {
            let idx = (input.correlation_id, k.clone());
            if let Some(existing) = self.audit_idempotency_index.get(&idx) {
                // Deterministic no-op on retry: return the original event_id.
                return Ok(*existing);
            }
        }

        let event_id = AuditEventId(self.next_audit_event_id);
        let payload_hash = audit_payload_hash(&input);
        let ev = QuotaAuditEvent::from_input_v1(event_id, payload_hash, input)?;
        self.next_audit_event_id = self.next_audit_event_id.saturating_add(1);

        if let Some(k) = &ev.idempotency_key {
            self.audit_idempotency_index
                .insert((ev.correlation_id, k.clone()), ev.event_id);
        }

        self.audit_events.push(ev);
        Ok(event_id)
    }

    pub fn audit_events(&self) -> &[QuotaAuditEvent] {
        &self.audit_events
    }

    pub fn audit_events_by_correlation(
        &self,
        correlation_id: CorrelationId,
    ) -> Vec<&QuotaAuditEvent> {
        self.audit_events
            .iter()
            .filter(|ev| ev.correlation_id == correlation_id)
            .collect()
    }

    pub fn audit_events_by_vessel(&self, vessel_id: &VesselId) -> Vec<&QuotaAuditEvent> {
        self.audit_events
            .iter()
            .filter(|ev| ev.vessel_id.as_ref() == Some(vessel_id))
            .collect()
    }

    pub fn attempt_overwrite_audit_event(
        &mut self,
        _event_id: AuditEventId,
    ) -> Result<(), LedgerError> {
        Err(LedgerError::AppendOnlyViolation {
            table: "audit_events",
        })
    }
}

fn audit_payload_hash(input: &QuotaAuditEventInput) -> String {
    let year = input.year.0.to_string();
    let amount = input.amount_kg.0.to_string();
    let reason = input.reason_code.0.to_string();
    let correlation = input.correlation_id.0.to_string();
    let vessel = input
        .vessel_id
        .as_ref()
        .map(VesselId::as_str)
        .unwrap_or("");
    sha256_hex(&[
        input.event_type.as_str(),
        input.species_id.as_str(),
        &year,
        vessel,
        &amount,
        &reason,
        &correlation,
    ])
}

fn sha256_hex(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"|");
    }
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
