//! Core invoice types, access key generation and structural validation.
//!
//! The types mirror the SRI `factura` schema (version 1.1.0) element by
//! element; codes are kept as the raw strings the authority defines.

mod access_key;
mod builder;
mod error;
mod types;
mod validation;

pub use access_key::*;
pub use builder::*;
pub use error::*;
pub use types::*;
pub use validation::*;
