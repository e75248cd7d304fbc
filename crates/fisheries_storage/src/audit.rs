#![forbid(unsafe_code)]

use fisheries_kernel_contracts::audit::{AuditEventId, QuotaAuditEventInput};

use crate::quota::LedgerError;
use crate::repo::AuditTrailRepo;

/// Disciplined append-only writer into the quota audit trail.
#[derive(Debug, Default)]
pub struct AuditTrailRuntime;

impl AuditTrailRuntime {
    pub fn emit<R: AuditTrailRepo>(
        store: &mut R,
        input: QuotaAuditEventInput,
    ) -> Result<AuditEventId, LedgerError> {
        store.append_audit_row(input)
    }
}
