#![forbid(unsafe_code)]

pub mod error;
pub mod identifier;
pub mod runtime;

pub use error::LedgerError;
pub use runtime::LedgerRuntime;
