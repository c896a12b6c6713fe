use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::error::FacturaError;
use super::types::*;
use super::validation::{checked_sum, line_subtotal, round_half_up, sum_line_taxes};

/// Builder for a complete invoice.
///
/// `build()` derives the monetary aggregates of `infoFactura` from the
/// line items: subtotal, total discount, tax totals per (code, rate code)
/// and grand total (subtotal + taxes + tip). The access key is left as
/// given; the service fills it in when blank. Totals too large for a
/// `Decimal` are a [`FacturaError::Builder`] error.
///
/// ```
/// use sri_factura::core::*;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let invoice = InvoiceBuilder::new(
///     TaxInfoBuilder::new("Comercial Andina S.A.", "1790012345001", "Av. Amazonas N24-01, Quito")
///         .numbering("001", "002", "000000123")
///         .build(),
///     InvoiceInfoBuilder::new(
///         NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
///         BuyerIdType::Cedula,
///         "Maria Perez",
///         "1712345678",
///     )
///     .build(),
/// )
/// .add_line(LineItemBuilder::new("P-001", "Cafe molido 500g", dec!(2), dec!(10.00))
///     .tax("2", "4", dec!(15))
///     .build()
///     .unwrap())
/// .pay_in_full("01")
/// .build()
/// .unwrap();
///
/// assert_eq!(invoice.invoice_info.grand_total, dec!(23.00));
/// ```
pub struct InvoiceBuilder {
    tax_info: TaxInfo,
    invoice_info: InvoiceInfo,
    line_items: Vec<LineItem>,
    withholdings: Option<Vec<Withholding>>,
    additional_info: Option<Vec<AdditionalField>>,
    full_payment_method: Option<String>,
}

impl InvoiceBuilder {
    pub fn new(tax_info: TaxInfo, invoice_info: InvoiceInfo) -> Self {
        Self {
            tax_info,
            invoice_info,
            line_items: Vec::new(),
            withholdings: None,
            additional_info: None,
            full_payment_method: None,
        }
    }

    pub fn add_line(mut self, line: LineItem) -> Self {
        self.line_items.push(line);
        self
    }

    pub fn add_withholding(mut self, withholding: Withholding) -> Self {
        self.withholdings
            .get_or_insert_with(Vec::new)
            .push(withholding);
        self
    }

    /// Add an `<infoAdicional>` field.
    pub fn additional_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_info
            .get_or_insert_with(Vec::new)
            .push(AdditionalField {
                name: name.into(),
                value: value.into(),
            });
        self
    }

    /// Add a single payment of the whole grand total with the given method,
    /// computed at `build()` time.
    pub fn pay_in_full(mut self, method: impl Into<String>) -> Self {
        self.full_payment_method = Some(method.into());
        self
    }

    pub fn build(self) -> Result<Invoice, FacturaError> {
        if self.line_items.is_empty() {
            return Err(FacturaError::Builder(
                "at least one line item is required".into(),
            ));
        }
        if self.line_items.iter().any(|l| l.taxes.is_empty()) {
            return Err(FacturaError::Builder(
                "every line item needs at least one tax".into(),
            ));
        }

        let overflow = |what: &str| FacturaError::Builder(format!("amount overflow in {what}"));

        let mut info = self.invoice_info;
        info.total_without_taxes = checked_sum(self.line_items.iter().map(|l| l.total_without_taxes))
            .ok_or_else(|| overflow("line subtotals"))?;
        info.total_discount = checked_sum(self.line_items.iter().map(|l| l.discount))
            .ok_or_else(|| overflow("line discounts"))?;
        info.tax_totals = sum_line_taxes(&self.line_items)
            .ok_or_else(|| overflow("line taxes"))?
            .into_iter()
            .map(|((code, rate_code), (base, value))| TaxTotal {
                code: code.to_string(),
                rate_code: rate_code.to_string(),
                additional_discount: None,
                taxable_base: base,
                value,
            })
            .collect();
        let tax_value = checked_sum(info.tax_totals.iter().map(|t| t.value))
            .ok_or_else(|| overflow("tax totals"))?;
        info.grand_total = checked_sum([info.total_without_taxes, tax_value, info.tip])
            .ok_or_else(|| overflow("grand total"))?;

        if let Some(method) = self.full_payment_method {
            info.payments.push(Payment {
                method,
                total: info.grand_total,
                term: None,
                time_unit: None,
            });
        }

        Ok(Invoice {
            tax_info: self.tax_info,
            invoice_info: info,
            line_items: self.line_items,
            withholdings: self.withholdings,
            additional_info: self.additional_info,
            ..Invoice::default()
        })
    }
}

/// Builder for `<infoTributaria>`. Defaults to test environment, normal
/// emission and document type 01 (factura).
pub struct TaxInfoBuilder {
    info: TaxInfo,
}

impl TaxInfoBuilder {
    pub fn new(
        legal_name: impl Into<String>,
        tax_id: impl Into<String>,
        head_office_address: impl Into<String>,
    ) -> Self {
        Self {
            info: TaxInfo {
                environment: Environment::Test.code().to_string(),
                emission_type: EmissionType::Normal.code().to_string(),
                legal_name: legal_name.into(),
                tax_id: tax_id.into(),
                head_office_address: head_office_address.into(),
                ..TaxInfo::default()
            },
        }
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.info.environment = environment.code().to_string();
        self
    }

    pub fn emission_type(mut self, emission_type: EmissionType) -> Self {
        self.info.emission_type = emission_type.code().to_string();
        self
    }

    pub fn document_type(mut self, document_type: DocumentType) -> Self {
        self.info.document_type = document_type.code().to_string();
        self
    }

    pub fn trade_name(mut self, name: impl Into<String>) -> Self {
        self.info.trade_name = Some(name.into());
        self
    }

    /// Establishment, emission point and sequential number.
    pub fn numbering(
        mut self,
        establishment: impl Into<String>,
        emission_point: impl Into<String>,
        sequential: impl Into<String>,
    ) -> Self {
        self.info.establishment = establishment.into();
        self.info.emission_point = emission_point.into();
        self.info.sequential = sequential.into();
        self
    }

    /// Use a pre-computed access key instead of generating one.
    pub fn access_key(mut self, key: impl Into<String>) -> Self {
        self.info.access_key = key.into();
        self
    }

    pub fn build(self) -> TaxInfo {
        self.info
    }
}

/// Builder for `<infoFactura>` identity fields. Totals are filled by
/// [`InvoiceBuilder::build`].
pub struct InvoiceInfoBuilder {
    info: InvoiceInfo,
}

impl InvoiceInfoBuilder {
    pub fn new(
        emission_date: NaiveDate,
        buyer_id_type: BuyerIdType,
        buyer_legal_name: impl Into<String>,
        buyer_id: impl Into<String>,
    ) -> Self {
        Self {
            info: InvoiceInfo {
                emission_date: emission_date.format("%d/%m/%Y").to_string(),
                buyer_id_type: buyer_id_type.code().to_string(),
                buyer_legal_name: buyer_legal_name.into(),
                buyer_id: buyer_id.into(),
                ..InvoiceInfo::default()
            },
        }
    }

    pub fn establishment_address(mut self, address: impl Into<String>) -> Self {
        self.info.establishment_address = Some(address.into());
        self
    }

    pub fn special_taxpayer(mut self, resolution: impl Into<String>) -> Self {
        self.info.special_taxpayer = Some(resolution.into());
        self
    }

    /// `obligadoContabilidad`, written as "SI" / "NO".
    pub fn accounting_required(mut self, required: bool) -> Self {
        self.info.accounting_required = Some(if required { "SI" } else { "NO" }.to_string());
        self
    }

    pub fn remission_guide(mut self, guide: impl Into<String>) -> Self {
        self.info.remission_guide = Some(guide.into());
        self
    }

    pub fn buyer_address(mut self, address: impl Into<String>) -> Self {
        self.info.buyer_address = Some(address.into());
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.info.currency = Some(currency.into());
        self
    }

    pub fn tip(mut self, tip: Decimal) -> Self {
        self.info.tip = tip;
        self
    }

    pub fn withheld(mut self, vat: Decimal, income_tax: Decimal) -> Self {
        self.info.vat_withheld = vat;
        self.info.income_tax_withheld = income_tax;
        self
    }

    pub fn add_payment(mut self, payment: Payment) -> Self {
        self.info.payments.push(payment);
        self
    }

    pub fn build(self) -> InvoiceInfo {
        self.info
    }
}

/// Builder for a `<detalle>`.
///
/// The subtotal is `quantity * unit_price - discount`; each tax added with
/// [`tax`](Self::tax) is levied on that subtotal and rounded half-up to
/// two decimals. `build()` fails with [`FacturaError::Builder`] when an
/// amount overflows.
pub struct LineItemBuilder {
    principal_code: String,
    auxiliary_code: Option<String>,
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    discount: Decimal,
    additional_details: Option<Vec<AdditionalDetail>>,
    taxes: Vec<(String, String, Decimal)>,
}

impl LineItemBuilder {
    pub fn new(
        principal_code: impl Into<String>,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            principal_code: principal_code.into(),
            auxiliary_code: None,
            description: description.into(),
            quantity,
            unit_price,
            discount: Decimal::ZERO,
            additional_details: None,
            taxes: Vec::new(),
        }
    }

    pub fn auxiliary_code(mut self, code: impl Into<String>) -> Self {
        self.auxiliary_code = Some(code.into());
        self
    }

    pub fn discount(mut self, discount: Decimal) -> Self {
        self.discount = discount;
        self
    }

    /// Add a `<detAdicional>` name/value pair.
    pub fn detail(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_details
            .get_or_insert_with(Vec::new)
            .push(AdditionalDetail {
                name: name.into(),
                value: value.into(),
            });
        self
    }

    /// Add a tax by SRI code (e.g. "2" IVA), rate code (e.g. "4") and rate percentage.
    pub fn tax(mut self, code: impl Into<String>, rate_code: impl Into<String>, rate: Decimal) -> Self {
        self.taxes.push((code.into(), rate_code.into(), rate));
        self
    }

    pub fn build(self) -> Result<LineItem, FacturaError> {
        let overflow = || {
            FacturaError::Builder(format!(
                "amount overflow in line item '{}'",
                self.principal_code
            ))
        };

        let subtotal =
            line_subtotal(self.quantity, self.unit_price, self.discount).ok_or_else(overflow)?;
        let mut taxes = Vec::with_capacity(self.taxes.len());
        for (code, rate_code, rate) in self.taxes {
            let value = subtotal
                .checked_mul(rate)
                .and_then(|v| v.checked_div(dec!(100)))
                .ok_or_else(overflow)?;
            taxes.push(LineTax {
                code,
                rate_code,
                rate,
                taxable_base: subtotal,
                value: round_half_up(value, 2),
            });
        }

        Ok(LineItem {
            principal_code: self.principal_code,
            auxiliary_code: self.auxiliary_code,
            description: self.description,
            quantity: self.quantity,
            unit_price: self.unit_price,
            discount: self.discount,
            total_without_taxes: subtotal,
            additional_details: self.additional_details,
            taxes,
        })
    }
}
