//! SRI access key (clave de acceso) generation.
//!
//! Layout, 49 digits, no separators:
//!
//! | Field              | Width |
//! |--------------------|-------|
//! | emission date      | 8 (`ddMMyyyy`) |
//! | document type      | 2 |
//! | RUC                | 13 |
//! | environment        | 1 |
//! | establishment      | 3 |
//! | emission point     | 3 |
//! | sequential         | 9 |
//! | security code      | 8 |
//! | emission type      | 1 |
//! | Mod-11 check digit | 1 |
//!
//! Widths are the caller's responsibility: the generator concatenates
//! whatever it is given and only requires digits.

use chrono::NaiveDate;
use rand::Rng;

use super::error::AccessKeyError;
use super::types::Invoice;

/// Length of a complete access key.
pub const ACCESS_KEY_LEN: usize = 49;

/// Smallest security code; always 8 digits with a non-zero leading digit.
pub const SECURITY_CODE_MIN: u32 = 10_000_000;
/// Largest security code.
pub const SECURITY_CODE_MAX: u32 = 99_999_999;

const SEQUENTIAL_SEPARATORS: &[char] = &['-', '.', '/', ' ', '_'];

/// Source of the 8-digit security code (código numérico) embedded in the key.
///
/// Implementations must return a fresh value per call; the code is never cached.
pub trait SecurityCodeSource: Send + Sync {
    fn security_code(&self) -> u32;
}

/// Uniform draw from `10000000..=99999999` using the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSecurityCode;

impl SecurityCodeSource for RandomSecurityCode {
    fn security_code(&self) -> u32 {
        rand::thread_rng().gen_range(SECURITY_CODE_MIN..=SECURITY_CODE_MAX)
    }
}

/// Always returns the same code. Useful for reproducible keys in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSecurityCode(pub u32);

impl SecurityCodeSource for FixedSecurityCode {
    fn security_code(&self) -> u32 {
        self.0
    }
}

/// Generate an access key with a random security code.
pub fn generate_access_key(invoice: &Invoice) -> Result<String, AccessKeyError> {
    generate_access_key_with(invoice, &RandomSecurityCode)
}

/// Generate an access key drawing the security code from `codes`.
pub fn generate_access_key_with<S>(invoice: &Invoice, codes: &S) -> Result<String, AccessKeyError>
where
    S: SecurityCodeSource + ?Sized,
{
    let tax = &invoice.tax_info;

    let tax_id = required("ruc", &tax.tax_id)?;
    let environment = required("ambiente", &tax.environment)?;
    let establishment = required("estab", &tax.establishment)?;
    let emission_point = required("ptoEmi", &tax.emission_point)?;
    let sequential = required("secuencial", &tax.sequential)?;
    let document_type = required("codDoc", &tax.document_type)?;
    let emission_date = required("fechaEmision", &invoice.invoice_info.emission_date)?;
    let emission_type = required("tipoEmision", &tax.emission_type)?;

    let date = compact_date(emission_date)?;
    let sequential: String = sequential
        .chars()
        .filter(|c| !SEQUENTIAL_SEPARATORS.contains(c))
        .collect();

    let code = codes.security_code();
    if !(SECURITY_CODE_MIN..=SECURITY_CODE_MAX).contains(&code) {
        return Err(AccessKeyError::SecurityCodeOutOfRange(code));
    }
    let code = code.to_string();

    let fields: [(&'static str, &str); 9] = [
        ("fechaEmision", &date),
        ("codDoc", document_type),
        ("ruc", tax_id),
        ("ambiente", environment),
        ("estab", establishment),
        ("ptoEmi", emission_point),
        ("secuencial", &sequential),
        ("codigoNumerico", &code),
        ("tipoEmision", emission_type),
    ];

    let mut key = String::with_capacity(ACCESS_KEY_LEN);
    for (name, value) in fields {
        if !is_digits(value) {
            return Err(AccessKeyError::NonNumeric(name));
        }
        key.push_str(value);
    }

    let check = mod11_check_digit(&key).ok_or(AccessKeyError::NonNumeric("clave"))?;
    key.push(char::from(b'0' + check));
    Ok(key)
}

/// Mod-11 check digit over a string of ASCII digits.
///
/// Weights 2..=7 cycle from the rightmost digit. The result is
/// `11 - sum % 11`, with 11 collapsing to 0 and 10 to 1.
/// Returns `None` for an empty or non-numeric body.
pub fn mod11_check_digit(body: &str) -> Option<u8> {
    if !is_digits(body) {
        return None;
    }

    let mut sum: u32 = 0;
    let mut weight: u32 = 2;
    for b in body.bytes().rev() {
        sum += u32::from(b - b'0') * weight;
        weight = if weight == 7 { 2 } else { weight + 1 };
    }

    match 11 - sum % 11 {
        11 => Some(0),
        10 => Some(1),
        r => Some(r as u8),
    }
}

/// True if `key` is 49 ASCII digits whose last digit is the Mod-11 check
/// digit of the first 48.
pub fn verify_access_key(key: &str) -> bool {
    if key.len() != ACCESS_KEY_LEN || !is_digits(key) {
        return false;
    }
    let (body, check) = key.split_at(ACCESS_KEY_LEN - 1);
    mod11_check_digit(body).is_some_and(|d| check.as_bytes()[0] == b'0' + d)
}

/// Return `invoice` with its access key replaced by `key`.
pub fn with_access_key(mut invoice: Invoice, key: impl Into<String>) -> Invoice {
    invoice.tax_info.access_key = key.into();
    invoice
}

fn required<'a>(name: &'static str, value: &'a str) -> Result<&'a str, AccessKeyError> {
    let value = value.trim();
    if value.is_empty() {
        Err(AccessKeyError::MissingField(name))
    } else {
        Ok(value)
    }
}

/// `dd/MM/yyyy` -> `ddMMyyyy`. Rejects anything not in that exact shape.
fn compact_date(value: &str) -> Result<String, AccessKeyError> {
    let invalid = || AccessKeyError::InvalidDate(value.to_string());
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[2] != b'/' || bytes[5] != b'/' {
        return Err(invalid());
    }
    let date = NaiveDate::parse_from_str(value, "%d/%m/%Y").map_err(|_| invalid())?;
    Ok(date.format("%d%m%Y").to_string())
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice() -> Invoice {
        let mut inv = Invoice::default();
        inv.tax_info.tax_id = "1790012345001".into();
        inv.tax_info.environment = "1".into();
        inv.tax_info.establishment = "001".into();
        inv.tax_info.emission_point = "002".into();
        inv.tax_info.sequential = "000-000-123".into();
        inv.tax_info.emission_type = "1".into();
        inv.invoice_info.emission_date = "10/01/2025".into();
        inv
    }

    #[test]
    fn check_digit_weights_cycle_from_the_right() {
        // 0*2 + 9*3 + 8*4 + 7*5 + 6*6 + 5*7 + 4*2 + 3*3 + 2*4 + 1*5 = 195
        // 195 % 11 = 8, 11 - 8 = 3
        assert_eq!(mod11_check_digit("1234567890"), Some(3));
    }

    #[test]
    fn check_digit_collapses_eleven_and_ten() {
        // sum 0 -> 11 - 0 = 11 -> 0
        assert_eq!(mod11_check_digit("0"), Some(0));
        // 6*2 = 12, 12 % 11 = 1 -> 11 - 1 = 10 -> 1
        assert_eq!(mod11_check_digit("6"), Some(1));
    }

    #[test]
    fn check_digit_rejects_non_digits() {
        assert_eq!(mod11_check_digit(""), None);
        assert_eq!(mod11_check_digit("12a4"), None);
    }

    #[test]
    fn sri_technical_sheet_example() {
        // Example key from the SRI offline technical sheet (21/10/2011, RUC 1792146739001).
        let key = "2110201101179214673900110020010000000011234567813";
        assert_eq!(mod11_check_digit(&key[..48]), Some(3));
        assert!(verify_access_key(key));
        assert!(!verify_access_key("2110201101179214673900110020010000000011234567814"));
        assert!(!verify_access_key("211020110117921467390011002001000000001123456781"));
    }

    #[test]
    fn deterministic_key_with_fixed_code() {
        let key = generate_access_key_with(&invoice(), &FixedSecurityCode(12_345_678)).unwrap();
        assert_eq!(key, "1001202501179001234500110010020000001231234567814");
        assert_eq!(key.len(), ACCESS_KEY_LEN);
        assert!(verify_access_key(&key));
    }

    #[test]
    fn collapsed_check_digits_in_full_keys() {
        let zero = generate_access_key_with(&invoice(), &FixedSecurityCode(10_000_008)).unwrap();
        assert!(zero.ends_with('0'));
        let one = generate_access_key_with(&invoice(), &FixedSecurityCode(10_000_001)).unwrap();
        assert!(one.ends_with('1'));
        assert!(verify_access_key(&zero));
        assert!(verify_access_key(&one));
    }

    #[test]
    fn random_key_is_49_digits() {
        let key = generate_access_key(&invoice()).unwrap();
        assert_eq!(key.len(), 49);
        assert!(key.bytes().all(|b| b.is_ascii_digit()));
        let code: u32 = key[39..47].parse().unwrap();
        assert!((SECURITY_CODE_MIN..=SECURITY_CODE_MAX).contains(&code));
    }

    #[test]
    fn wrong_date_format_fails() {
        let mut inv = invoice();
        inv.invoice_info.emission_date = "2025-01-10".into();
        assert_eq!(
            generate_access_key(&inv),
            Err(AccessKeyError::InvalidDate("2025-01-10".into()))
        );

        inv.invoice_info.emission_date = "1/1/2025".into();
        assert!(matches!(
            generate_access_key(&inv),
            Err(AccessKeyError::InvalidDate(_))
        ));

        inv.invoice_info.emission_date = "31/02/2025".into();
        assert!(matches!(
            generate_access_key(&inv),
            Err(AccessKeyError::InvalidDate(_))
        ));
    }

    #[test]
    fn missing_fields_fail() {
        let mut inv = invoice();
        inv.tax_info.tax_id = "  ".into();
        assert_eq!(
            generate_access_key(&inv),
            Err(AccessKeyError::MissingField("ruc"))
        );

        let mut inv = invoice();
        inv.tax_info.emission_type.clear();
        assert_eq!(
            generate_access_key(&inv),
            Err(AccessKeyError::MissingField("tipoEmision"))
        );
    }

    #[test]
    fn non_numeric_and_out_of_range_code() {
        let mut inv = invoice();
        inv.tax_info.establishment = "0A1".into();
        assert_eq!(
            generate_access_key(&inv),
            Err(AccessKeyError::NonNumeric("estab"))
        );

        assert_eq!(
            generate_access_key_with(&invoice(), &FixedSecurityCode(1234)),
            Err(AccessKeyError::SecurityCodeOutOfRange(1234))
        );
    }

    #[test]
    fn with_access_key_replaces_only_the_key() {
        let inv = invoice();
        let updated = with_access_key(inv.clone(), "123");
        assert_eq!(updated.tax_info.access_key, "123");
        assert_eq!(updated.tax_info.tax_id, inv.tax_info.tax_id);
        assert!(inv.tax_info.access_key.is_empty());
    }
}
