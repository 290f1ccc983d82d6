#![forbid(unsafe_code)]

pub mod rollup;
pub mod validation;
