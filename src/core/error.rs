use thiserror::Error;

/// Errors that can occur while preparing, serializing or parsing an invoice.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FacturaError {
    /// A required argument was missing or blank.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// One or more structural rules failed. Carries the full report.
    #[error("invalid invoice structure: {}", .0.error_message())]
    Validation(ValidationResult),

    /// The input is not well-formed XML and cannot be interpreted.
    #[error("malformed XML: {0}")]
    MalformedXml(String),

    /// XML generation or mapping error.
    #[error("XML error: {0}")]
    Xml(String),

    /// Builder encountered invalid or missing configuration.
    #[error("builder error: {0}")]
    Builder(String),
}

/// Reasons an access key could not be generated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AccessKeyError {
    /// A required input field is blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The emission date does not match `dd/MM/yyyy`.
    #[error("invalid emission date '{0}', expected dd/MM/yyyy")]
    InvalidDate(String),

    /// A field that feeds the key contains non-digit characters.
    #[error("field {0} must contain only digits")]
    NonNumeric(&'static str),

    /// The security code source produced a value outside 10000000..=99999999.
    #[error("security code {0} is not an 8-digit number")]
    SecurityCodeOutOfRange(u32),
}

/// A single rule violation with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Path to the offending field (e.g. "infoTributaria.ruc", "detalles.detalle[2].cantidad").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of structural validation: every violation found, in section order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Messages in the order they were found.
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }

    /// All messages joined with "; ".
    pub fn error_message(&self) -> String {
        self.messages().join("; ")
    }

    pub(crate) fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError::new(field, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_joins_in_order() {
        let mut result = ValidationResult::default();
        assert!(result.is_valid());
        result.push("a", "Ambiente is required");
        result.push("b", "Ruc is required");
        assert!(!result.is_valid());
        assert_eq!(result.error_message(), "Ambiente is required; Ruc is required");
        assert_eq!(result.errors[1].to_string(), "b: Ruc is required");
    }

    #[test]
    fn validation_error_displays_report() {
        let mut result = ValidationResult::default();
        result.push("detalle[1].cantidad", "Detail 1: Quantity must be greater than 0");
        let err = FacturaError::Validation(result);
        assert_eq!(
            err.to_string(),
            "invalid invoice structure: Detail 1: Quantity must be greater than 0"
        );
    }
}
