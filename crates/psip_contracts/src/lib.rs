#![forbid(unsafe_code)]

pub mod activity;
pub mod common;
pub mod forms;
pub mod location;
pub mod project;
pub mod validation;

pub use common::{
    ContractViolation, IsoDate, MonotonicTimeNs, ReasonCodeId, SchemaVersion, Validate,
};
