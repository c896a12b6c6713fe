use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::error::{ValidationError, ValidationResult};
use super::types::*;

/// Validate the structure of an invoice before it is submitted.
///
/// Reports every violation found, never just the first: tax identity first,
/// then invoice info, then each line item in order (1-based in messages).
pub fn validate_structure(invoice: &Invoice) -> ValidationResult {
    let mut result = ValidationResult::default();

    validate_tax_info(&invoice.tax_info, &mut result);
    validate_invoice_info(&invoice.invoice_info, &mut result);
    validate_line_items(&invoice.line_items, &mut result);

    result
}

/// Same as [`validate_structure`], reporting a missing invoice as a single violation.
pub fn validate_structure_opt(invoice: Option<&Invoice>) -> ValidationResult {
    match invoice {
        Some(invoice) => validate_structure(invoice),
        None => {
            let mut result = ValidationResult::default();
            result.push("factura", "Invoice cannot be null");
            result
        }
    }
}

fn validate_tax_info(tax: &TaxInfo, result: &mut ValidationResult) {
    let required = [
        ("ambiente", "Ambiente", &tax.environment),
        ("tipoEmision", "TipoEmision", &tax.emission_type),
        ("razonSocial", "RazonSocial", &tax.legal_name),
        ("ruc", "Ruc", &tax.tax_id),
        ("claveAcceso", "ClaveAcceso", &tax.access_key),
        ("estab", "Estab", &tax.establishment),
        ("ptoEmi", "PtoEmi", &tax.emission_point),
        ("secuencial", "Secuencial", &tax.sequential),
        ("dirMatriz", "DirMatriz", &tax.head_office_address),
    ];

    for (tag, label, value) in required {
        if value.trim().is_empty() {
            result.push(format!("infoTributaria.{tag}"), format!("{label} is required"));
        }
    }
}

fn validate_invoice_info(info: &InvoiceInfo, result: &mut ValidationResult) {
    let required = [
        ("fechaEmision", "FechaEmision", &info.emission_date),
        (
            "tipoIdentificacionComprador",
            "TipoIdentificacionComprador",
            &info.buyer_id_type,
        ),
        (
            "razonSocialComprador",
            "RazonSocialComprador",
            &info.buyer_legal_name,
        ),
        (
            "identificacionComprador",
            "IdentificacionComprador",
            &info.buyer_id,
        ),
    ];

    for (tag, label, value) in required {
        if value.trim().is_empty() {
            result.push(format!("infoFactura.{tag}"), format!("{label} is required"));
        }
    }

    if info.total_without_taxes <= Decimal::ZERO {
        result.push(
            "infoFactura.totalSinImpuestos",
            "TotalSinImpuestos must be greater than 0",
        );
    }

    if info.grand_total <= Decimal::ZERO {
        result.push(
            "infoFactura.importeTotal",
            "ImporteTotal must be greater than 0",
        );
    }

    if info.payments.is_empty() {
        result.push("infoFactura.pagos", "At least one payment is required");
    }
}

fn validate_line_items(items: &[LineItem], result: &mut ValidationResult) {
    if items.is_empty() {
        result.push("detalles", "At least one detail item is required");
        return;
    }

    for (i, item) in items.iter().enumerate() {
        validate_line_item(item, i + 1, result);
    }
}

fn validate_line_item(item: &LineItem, n: usize, result: &mut ValidationResult) {
    let path = format!("detalles.detalle[{n}]");

    if item.principal_code.trim().is_empty() {
        result.push(
            format!("{path}.codigoPrincipal"),
            format!("Detail {n}: CodigoPrincipal is required"),
        );
    }
    if item.description.trim().is_empty() {
        result.push(
            format!("{path}.descripcion"),
            format!("Detail {n}: Descripcion is required"),
        );
    }

    let positive = [
        ("cantidad", "Quantity", item.quantity),
        ("precioUnitario", "UnitPrice", item.unit_price),
        (
            "precioTotalSinImpuesto",
            "TotalPriceWithoutTax",
            item.total_without_taxes,
        ),
    ];
    for (tag, label, value) in positive {
        if value <= Decimal::ZERO {
            result.push(
                format!("{path}.{tag}"),
                format!("Detail {n}: {label} must be greater than 0"),
            );
        }
    }

    if item.taxes.is_empty() {
        result.push(
            format!("{path}.impuestos"),
            format!("Detail {n}: At least one tax is required"),
        );
    }
}

/// Check that the monetary aggregates agree with the line items and payments.
///
/// Not part of [`validate_structure`]; totals computed elsewhere may carry
/// rounding the authority accepts. Amounts too large to add or multiply are
/// reported as overflow violations.
pub fn validate_arithmetic(invoice: &Invoice) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let info = &invoice.invoice_info;

    for (i, item) in invoice.line_items.iter().enumerate() {
        let n = i + 1;
        let field = format!("detalles.detalle[{n}].precioTotalSinImpuesto");
        match line_subtotal(item.quantity, item.unit_price, item.discount) {
            Some(expected) if expected == item.total_without_taxes => {}
            Some(expected) => errors.push(ValidationError::new(
                field,
                format!(
                    "Detail {n}: TotalPriceWithoutTax {} does not match quantity * unit price - discount {}",
                    item.total_without_taxes, expected
                ),
            )),
            None => errors.push(ValidationError::new(
                field,
                format!("Detail {n}: amount overflow in quantity * unit price - discount"),
            )),
        }
    }

    match checked_sum(invoice.line_items.iter().map(|l| l.total_without_taxes)) {
        Some(line_total) if line_total == info.total_without_taxes => {}
        Some(line_total) => errors.push(ValidationError::new(
            "infoFactura.totalSinImpuestos",
            format!(
                "TotalSinImpuestos {} does not match sum of line subtotals {}",
                info.total_without_taxes, line_total
            ),
        )),
        None => errors.push(overflow("infoFactura.totalSinImpuestos", "line subtotals")),
    }

    match (sum_line_taxes(&invoice.line_items), sum_tax_totals(&info.tax_totals)) {
        (Some(line_taxes), Some(declared)) => {
            if declared != line_taxes {
                errors.push(ValidationError::new(
                    "infoFactura.totalConImpuestos",
                    "TotalConImpuestos does not match the taxes of the detail items",
                ));
            }
        }
        _ => errors.push(overflow("infoFactura.totalConImpuestos", "tax totals")),
    }

    let expected_total = checked_sum(info.tax_totals.iter().map(|t| t.value))
        .and_then(|taxes| checked_sum([info.total_without_taxes, taxes, info.tip]));
    match expected_total {
        Some(expected) if expected == info.grand_total => {}
        Some(expected) => errors.push(ValidationError::new(
            "infoFactura.importeTotal",
            format!(
                "ImporteTotal {} does not match subtotal + taxes + tip {}",
                info.grand_total, expected
            ),
        )),
        None => errors.push(overflow("infoFactura.importeTotal", "subtotal + taxes + tip")),
    }

    if !info.payments.is_empty() {
        match checked_sum(info.payments.iter().map(|p| p.total)) {
            Some(paid) if paid == info.grand_total => {}
            Some(paid) => errors.push(ValidationError::new(
                "infoFactura.pagos",
                format!(
                    "payments {} do not add up to ImporteTotal {}",
                    paid, info.grand_total
                ),
            )),
            None => errors.push(overflow("infoFactura.pagos", "payments")),
        }
    }

    errors
}

fn overflow(field: &str, what: &str) -> ValidationError {
    ValidationError::new(field, format!("amount overflow in {what}"))
}

type TaxGroups<'a> = BTreeMap<(&'a str, &'a str), (Decimal, Decimal)>;

/// `quantity * unit_price - discount`, or `None` on overflow.
pub(crate) fn line_subtotal(quantity: Decimal, unit_price: Decimal, discount: Decimal) -> Option<Decimal> {
    quantity.checked_mul(unit_price)?.checked_sub(discount)
}

pub(crate) fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

fn add_to_group<'a>(
    groups: &mut TaxGroups<'a>,
    key: (&'a str, &'a str),
    base: Decimal,
    value: Decimal,
) -> Option<()> {
    let entry = groups.entry(key).or_insert((Decimal::ZERO, Decimal::ZERO));
    entry.0 = entry.0.checked_add(base)?;
    entry.1 = entry.1.checked_add(value)?;
    Some(())
}

/// Taxable base and tax value per (code, rate code) across all lines.
/// `None` if a sum overflows.
pub(crate) fn sum_line_taxes(items: &[LineItem]) -> Option<TaxGroups<'_>> {
    let mut groups = TaxGroups::new();
    for tax in items.iter().flat_map(|l| &l.taxes) {
        add_to_group(
            &mut groups,
            (tax.code.as_str(), tax.rate_code.as_str()),
            tax.taxable_base,
            tax.value,
        )?;
    }
    Some(groups)
}

/// Declared tax totals folded per (code, rate code); repeated entries add up.
fn sum_tax_totals(totals: &[TaxTotal]) -> Option<TaxGroups<'_>> {
    let mut groups = TaxGroups::new();
    for t in totals {
        add_to_group(
            &mut groups,
            (t.code.as_str(), t.rate_code.as_str()),
            t.taxable_base,
            t.value,
        )?;
    }
    Some(groups)
}

pub(crate) fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn valid() -> Invoice {
        let mut inv = Invoice::default();
        let tax = &mut inv.tax_info;
        tax.environment = "1".into();
        tax.emission_type = "1".into();
        tax.legal_name = "Comercial Andina S.A.".into();
        tax.tax_id = "1790012345001".into();
        tax.access_key = "1001202501179001234500110010020000001231234567814".into();
        tax.establishment = "001".into();
        tax.emission_point = "002".into();
        tax.sequential = "000000123".into();
        tax.head_office_address = "Av. Amazonas N24-01, Quito".into();

        let info = &mut inv.invoice_info;
        info.emission_date = "10/01/2025".into();
        info.buyer_id_type = "05".into();
        info.buyer_legal_name = "Maria Perez".into();
        info.buyer_id = "1712345678".into();
        info.total_without_taxes = dec!(20.00);
        info.tax_totals = vec![TaxTotal {
            code: "2".into(),
            rate_code: "4".into(),
            additional_discount: None,
            taxable_base: dec!(20.00),
            value: dec!(3.00),
        }];
        info.grand_total = dec!(23.00);
        info.payments = vec![Payment {
            method: "01".into(),
            total: dec!(23.00),
            term: None,
            time_unit: None,
        }];

        inv.line_items = vec![LineItem {
            principal_code: "P-001".into(),
            description: "Cafe molido 500g".into(),
            quantity: dec!(2),
            unit_price: dec!(10.00),
            total_without_taxes: dec!(20.00),
            taxes: vec![LineTax {
                code: "2".into(),
                rate_code: "4".into(),
                rate: dec!(15),
                taxable_base: dec!(20.00),
                value: dec!(3.00),
            }],
            ..Default::default()
        }];
        inv
    }

    #[test]
    fn valid_invoice_has_no_violations() {
        let result = validate_structure(&valid());
        assert!(result.is_valid(), "{}", result.error_message());
        assert!(validate_arithmetic(&valid()).is_empty());
    }

    #[test]
    fn missing_invoice_is_single_violation() {
        let result = validate_structure_opt(None);
        assert_eq!(result.messages(), vec!["Invoice cannot be null"]);
    }

    #[test]
    fn violations_accumulate_in_section_order() {
        let mut inv = valid();
        inv.tax_info.environment.clear();
        inv.tax_info.head_office_address = "   ".into();
        inv.line_items[0].description.clear();

        let result = validate_structure(&inv);
        assert_eq!(
            result.messages(),
            vec![
                "Ambiente is required",
                "DirMatriz is required",
                "Detail 1: Descripcion is required",
            ]
        );
        assert_eq!(result.errors[2].field, "detalles.detalle[1].descripcion");
    }

    #[test]
    fn non_positive_amounts_rejected() {
        let mut inv = valid();
        inv.invoice_info.total_without_taxes = Decimal::ZERO;
        inv.line_items[0].quantity = dec!(-1);

        let result = validate_structure(&inv);
        assert_eq!(
            result.messages(),
            vec![
                "TotalSinImpuestos must be greater than 0",
                "Detail 1: Quantity must be greater than 0",
            ]
        );
    }

    #[test]
    fn empty_collections() {
        let mut inv = valid();
        inv.line_items.clear();
        inv.invoice_info.payments.clear();

        let result = validate_structure(&inv);
        assert_eq!(
            result.messages(),
            vec![
                "At least one payment is required",
                "At least one detail item is required",
            ]
        );
    }

    #[test]
    fn line_without_taxes() {
        let mut inv = valid();
        let mut second = inv.line_items[0].clone();
        second.taxes.clear();
        inv.line_items.push(second);

        let result = validate_structure(&inv);
        assert_eq!(
            result.messages(),
            vec!["Detail 2: At least one tax is required"]
        );
    }

    #[test]
    fn arithmetic_mismatches_reported() {
        let mut inv = valid();
        inv.invoice_info.grand_total = dec!(25.00);
        let errors = validate_arithmetic(&inv);
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["infoFactura.importeTotal", "infoFactura.pagos"]);

        let mut inv = valid();
        inv.invoice_info.tax_totals[0].value = dec!(2.99);
        let errors = validate_arithmetic(&inv);
        assert!(
            errors
                .iter()
                .any(|e| e.field == "infoFactura.totalConImpuestos")
        );
    }

    #[test]
    fn repeated_tax_total_is_not_collapsed() {
        let mut inv = valid();
        let dup = inv.invoice_info.tax_totals[0].clone();
        inv.invoice_info.tax_totals.push(dup);
        inv.invoice_info.grand_total = dec!(26.00);
        inv.invoice_info.payments[0].total = dec!(26.00);

        let errors = validate_arithmetic(&inv);
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["infoFactura.totalConImpuestos"]);
    }

    #[test]
    fn split_tax_total_entries_add_up() {
        let mut inv = valid();
        let mut half = inv.invoice_info.tax_totals[0].clone();
        half.taxable_base = dec!(10.00);
        half.value = dec!(1.50);
        inv.invoice_info.tax_totals = vec![half.clone(), half];
        assert!(validate_arithmetic(&inv).is_empty());
    }

    #[test]
    fn overflowing_amounts_are_violations() {
        let mut inv = valid();
        inv.line_items[0].quantity = Decimal::MAX;
        inv.line_items[0].unit_price = dec!(2);
        assert!(validate_structure(&inv).is_valid());

        let errors = validate_arithmetic(&inv);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "detalles.detalle[1].precioTotalSinImpuesto");
        assert!(errors[0].message.contains("overflow"));

        let mut inv = valid();
        inv.line_items.push(inv.line_items[0].clone());
        inv.line_items[0].total_without_taxes = Decimal::MAX;
        inv.invoice_info.tax_totals[0].value = Decimal::MAX;
        inv.invoice_info.payments.push(inv.invoice_info.payments[0].clone());
        inv.invoice_info.payments[0].total = Decimal::MAX;
        let fields: Vec<_> = validate_arithmetic(&inv)
            .into_iter()
            .filter(|e| e.message.contains("overflow"))
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                "infoFactura.totalSinImpuestos",
                "infoFactura.importeTotal",
                "infoFactura.pagos",
            ]
        );
    }

    #[test]
    fn round_half_up_cases() {
        assert_eq!(round_half_up(dec!(1.005), 2), dec!(1.01));
        assert_eq!(round_half_up(dec!(1.004), 2), dec!(1.00));
        assert_eq!(round_half_up(dec!(2.675), 2), dec!(2.68));
    }
}
