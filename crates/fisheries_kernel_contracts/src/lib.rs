#![forbid(unsafe_code)]

pub mod audit;
pub mod common;
pub mod quota;

pub use common::{BlockHeight, ContractViolation, ReasonCodeId, SchemaVersion, Validate};
