//! # sri-factura
//!
//! Core of the Ecuadorian SRI electronic invoicing scheme: the 49-digit
//! access key (clave de acceso) with its Mod-11 check digit, structural
//! validation of invoices before submission, and the exact `factura` XML
//! layout the SRI web services accept.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! Signing (XAdES) and submission to the SRI are out of scope: callers take
//! the XML text produced here and hand it on.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use sri_factura::core::*;
//! use sri_factura::{InvoiceService, ServiceOptions};
//! use rust_decimal_macros::dec;
//!
//! let invoice = InvoiceBuilder::new(
//!     TaxInfoBuilder::new("Comercial Andina S.A.", "1790012345001", "Av. Amazonas N24-01, Quito")
//!         .numbering("001", "002", "000000123")
//!         .build(),
//!     InvoiceInfoBuilder::new(
//!         NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
//!         BuyerIdType::FinalConsumer,
//!         "CONSUMIDOR FINAL",
//!         "9999999999999",
//!     )
//!     .build(),
//! )
//! .add_line(LineItemBuilder::new("P-001", "Cafe molido 500g", dec!(2), dec!(10.00))
//!     .tax("2", "4", dec!(15))
//!     .build()
//!     .unwrap())
//! .pay_in_full("01")
//! .build()
//! .unwrap();
//!
//! let service = InvoiceService::new(ServiceOptions::default());
//! let xml = service.generate_invoice_xml(&invoice).unwrap();
//! assert!(xml.starts_with("<factura id=\"comprobante\" version=\"1.1.0\">"));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Invoice types, access keys, validation, builders |
//! | `xml` (default) | `factura` XML generation & parsing, [`InvoiceService`] |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "xml")]
pub mod xml;

#[cfg(feature = "xml")]
pub mod service;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;

#[cfg(feature = "xml")]
pub use crate::service::{InvoiceService, ServiceOptions};
