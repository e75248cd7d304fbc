#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::quota::{validate_token, Kilograms, QuotaYear, SpeciesId, VesselId};
use crate::{BlockHeight, ContractViolation, ReasonCodeId, SchemaVersion, Validate};

pub const AUDIT_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub u64);

impl Validate for CorrelationId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "correlation_id",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuditEventId(pub u64);

impl Validate for AuditEventId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_event_id",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuotaAuditEventType {
    SpeciesQuotaSet,
    VesselQuotaAllocated,
    CatchRecorded,
}

impl QuotaAuditEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuotaAuditEventType::SpeciesQuotaSet => "SPECIES_QUOTA_SET",
            QuotaAuditEventType::VesselQuotaAllocated => "VESSEL_QUOTA_ALLOCATED",
            QuotaAuditEventType::CatchRecorded => "CATCH_RECORDED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaAuditEventInput {
    pub schema_version: SchemaVersion,
    pub recorded_at: BlockHeight,
    pub event_type: QuotaAuditEventType,
    pub species_id: SpeciesId,
    pub year: QuotaYear,
    pub vessel_id: Option<VesselId>,
    pub amount_kg: Kilograms,
    pub reason_code: ReasonCodeId,
    pub correlation_id: CorrelationId,
    /// Optional key to detect duplicate emissions deterministically.
    pub idempotency_key: Option<String>,
}

impl QuotaAuditEventInput {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        recorded_at: BlockHeight,
        event_type: QuotaAuditEventType,
        species_id: SpeciesId,
        year: QuotaYear,
        vessel_id: Option<VesselId>,
        amount_kg: Kilograms,
        reason_code: ReasonCodeId,
        correlation_id: CorrelationId,
        idempotency_key: Option<String>,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            schema_version: AUDIT_CONTRACT_VERSION,
            recorded_at,
            event_type,
            species_id,
            year,
            vessel_id,
            amount_kg,
            reason_code,
            correlation_id,
            idempotency_key,
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for QuotaAuditEventInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != AUDIT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "quota_audit_event_input.schema_version",
                reason: "must match AUDIT_CONTRACT_VERSION",
            });
        }
        if self.recorded_at.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "quota_audit_event_input.recorded_at",
                reason: "must be > 0",
            });
        }
        self.species_id.validate()?;
        self.year.validate()?;
        self.amount_kg.validate()?;
        self.correlation_id.validate()?;
        match self.event_type {
            QuotaAuditEventType::SpeciesQuotaSet => {
                if self.vessel_id.is_some() {
                    return Err(ContractViolation::InvalidValue {
                        field: "quota_audit_event_input.vessel_id",
                        reason: "must be absent for SPECIES_QUOTA_SET",
                    });
                }
            }
            QuotaAuditEventType::VesselQuotaAllocated | QuotaAuditEventType::CatchRecorded => {
                match &self.vessel_id {
                    Some(vessel_id) => vessel_id.validate()?,
                    None => {
                        return Err(ContractViolation::InvalidValue {
                            field: "quota_audit_event_input.vessel_id",
                            reason: "must be present for vessel-scoped events",
                        });
                    }
                }
            }
        }
        if let Some(k) = &self.idempotency_key {
            validate_token("quota_audit_event_input.idempotency_key", k, 96)?;
        }
        Ok(())
    }
}

/// One committed row of the append-only quota audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaAuditEvent {
    pub schema_version: SchemaVersion,
    pub event_id: AuditEventId,
    pub recorded_at: BlockHeight,
    pub event_type: QuotaAuditEventType,
    pub species_id: SpeciesId,
    pub year: QuotaYear,
    pub vessel_id: Option<VesselId>,
    pub amount_kg: Kilograms,
    pub reason_code: ReasonCodeId,
    pub correlation_id: CorrelationId,
    pub payload_hash_sha256: String,
    pub idempotency_key: Option<String>,
}

impl QuotaAuditEvent {
    pub fn from_input_v1(
        event_id: AuditEventId,
        payload_hash_sha256: String,
        input: QuotaAuditEventInput,
    ) -> Result<Self, ContractViolation> {
        input.validate()?;
        let ev = Self {
            schema_version: AUDIT_CONTRACT_VERSION,
            event_id,
            recorded_at: input.recorded_at,
            event_type: input.event_type,
            species_id: input.species_id,
            year: input.year,
            vessel_id: input.vessel_id,
            amount_kg: input.amount_kg,
            reason_code: input.reason_code,
            correlation_id: input.correlation_id,
            payload_hash_sha256,
            idempotency_key: input.idempotency_key,
        };
        ev.validate()?;
        Ok(ev)
    }
}

impl Validate for QuotaAuditEvent {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != AUDIT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "quota_audit_event.schema_version",
                reason: "must match AUDIT_CONTRACT_VERSION",
            });
        }
        self.event_id.validate()?;
        if self.recorded_at.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "quota_audit_event.recorded_at",
                reason: "must be > 0",
            });
        }
        self.species_id.validate()?;
        self.year.validate()?;
        self.amount_kg.validate()?;
        self.correlation_id.validate()?;
        validate_sha256("quota_audit_event.payload_hash_sha256", &self.payload_hash_sha256)?;
        Ok(())
    }
}

fn validate_sha256(field: &'static str, value: &str) -> Result<(), ContractViolation> {
    if value.len() != 64 {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be 64 hex chars",
        });
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be lowercase hex",
        });
    }
    Ok(())
}
