//! Invoice service: fill the access key, validate, serialize; or parse.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::*;
use crate::xml::{self, XmlOptions};

/// Settings for [`InvoiceService`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceOptions {
    /// XML output settings.
    pub xml: XmlOptions,
    /// Also reject invoices whose totals do not add up (see [`validate_arithmetic`]).
    pub check_arithmetic: bool,
}

impl ServiceOptions {
    pub fn xml(mut self, xml: XmlOptions) -> Self {
        self.xml = xml;
        self
    }

    pub fn check_arithmetic(mut self, check: bool) -> Self {
        self.check_arithmetic = check;
        self
    }
}

/// Sequences access-key generation, validation and XML mapping.
///
/// Holds no per-invoice state: every call works on the invoice it is given,
/// so one service can be shared across threads.
#[derive(Debug, Clone)]
pub struct InvoiceService<S = RandomSecurityCode> {
    options: ServiceOptions,
    codes: S,
}

impl Default for InvoiceService {
    fn default() -> Self {
        Self::new(ServiceOptions::default())
    }
}

impl InvoiceService {
    pub fn new(options: ServiceOptions) -> Self {
        Self {
            options,
            codes: RandomSecurityCode,
        }
    }
}

impl<S: SecurityCodeSource> InvoiceService<S> {
    /// Use `codes` for the security code embedded in generated access keys.
    pub fn with_security_codes(options: ServiceOptions, codes: S) -> Self {
        Self { options, codes }
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Generate an access key for `invoice` without storing it.
    pub fn generate_access_key(&self, invoice: &Invoice) -> Result<String, AccessKeyError> {
        generate_access_key_with(invoice, &self.codes)
    }

    /// Structural validation. A missing invoice is a single violation.
    pub fn validate_invoice_structure(&self, invoice: Option<&Invoice>) -> ValidationResult {
        validate_structure_opt(invoice)
    }

    /// Return a copy of `invoice` with the access key filled in (when it was
    /// blank), after checking it passes validation.
    ///
    /// A key that cannot be generated is not an error here: the key stays
    /// blank and validation reports it as missing.
    pub fn prepare_invoice(&self, invoice: &Invoice) -> Result<Invoice, FacturaError> {
        let invoice = if invoice.tax_info.access_key.trim().is_empty() {
            match self.generate_access_key(invoice) {
                Ok(key) => {
                    debug!(access_key = %key, "generated access key");
                    with_access_key(invoice.clone(), key)
                }
                Err(e) => {
                    warn!(error = %e, "could not generate access key");
                    invoice.clone()
                }
            }
        } else {
            invoice.clone()
        };

        let mut result = validate_structure(&invoice);
        if self.options.check_arithmetic {
            result.errors.extend(validate_arithmetic(&invoice));
        }
        if !result.is_valid() {
            warn!(
                violations = result.errors.len(),
                errors = %result.error_message(),
                "invoice validation failed"
            );
            return Err(FacturaError::Validation(result));
        }

        Ok(invoice)
    }

    /// Fill the access key if blank, validate, then serialize.
    pub fn generate_invoice_xml(&self, invoice: &Invoice) -> Result<String, FacturaError> {
        info!(
            sequential = %invoice.tax_info.sequential,
            "starting XML generation"
        );

        let invoice = self.prepare_invoice(invoice)?;
        let xml = xml::to_xml_with(&invoice, &self.options.xml)?;

        info!(
            sequential = %invoice.tax_info.sequential,
            size = xml.len(),
            "XML generated"
        );
        Ok(xml)
    }

    /// Parse XML into an invoice. The result is not validated; call
    /// [`validate_invoice_structure`](Self::validate_invoice_structure) for that.
    pub fn parse_invoice_xml(&self, xml: &str) -> Result<Invoice, FacturaError> {
        info!("starting XML deserialization");

        if xml.trim().is_empty() {
            return Err(FacturaError::InvalidArgument(
                "XML content cannot be empty".into(),
            ));
        }

        let invoice = xml::from_xml(xml).inspect_err(|e| {
            warn!(error = %e, "XML deserialization failed");
        })?;

        info!(
            sequential = %invoice.tax_info.sequential,
            "XML deserialized"
        );
        Ok(invoice)
    }
}
