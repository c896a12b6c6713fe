//! SRI `factura` XML generation and parsing.
//!
//! The schema is unqualified: no namespace is declared on any element.
//! Output is UTF-8 and indented; the `<?xml ...?>` declaration is off by
//! default and can be switched on through [`XmlOptions`].
//!
//! # Example
//!
//! ```no_run
//! use sri_factura::core::*;
//! use sri_factura::xml;
//!
//! let invoice: Invoice = todo!(); // build via InvoiceBuilder
//! let text = xml::to_xml(&invoice).unwrap();
//! let back = xml::from_xml(&text).unwrap();
//! ```

mod factura;
pub(crate) mod xml_utils;

use serde::{Deserialize, Serialize};

pub use factura::{check_well_formed, from_xml, to_xml, to_xml_with};

/// Output settings for [`to_xml_with`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlOptions {
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>` as the first line.
    pub declaration: bool,
    /// Spaces per nesting level; 0 writes everything on one line.
    pub indent: usize,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            declaration: false,
            indent: 4,
        }
    }
}

impl XmlOptions {
    pub fn declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }

    pub fn indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }
}
