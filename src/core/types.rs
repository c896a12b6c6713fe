use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fixed `id` attribute of the `<factura>` root element.
pub const DOCUMENT_ID: &str = "comprobante";

/// Schema version of the factura document (`version` attribute).
pub const DOCUMENT_VERSION: &str = "1.1.0";

/// `<factura>`: the electronic invoice, root of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// `id` attribute, always "comprobante" for documents we produce.
    pub id: String,
    /// `version` attribute (e.g. "1.1.0").
    pub version: String,
    /// `<infoTributaria>`: issuer identity and document numbering.
    pub tax_info: TaxInfo,
    /// `<infoFactura>`: buyer, totals and payments.
    pub invoice_info: InvoiceInfo,
    /// `<detalles>`: line items. Must not be empty.
    pub line_items: Vec<LineItem>,
    /// `<retenciones>`: withholdings, omitted when `None`.
    pub withholdings: Option<Vec<Withholding>>,
    /// `<infoAdicional>`: free-form fields, omitted when `None`.
    pub additional_info: Option<Vec<AdditionalField>>,
}

impl Default for Invoice {
    fn default() -> Self {
        Self {
            id: DOCUMENT_ID.to_string(),
            version: DOCUMENT_VERSION.to_string(),
            tax_info: TaxInfo::default(),
            invoice_info: InvoiceInfo::default(),
            line_items: Vec::new(),
            withholdings: None,
            additional_info: None,
        }
    }
}

/// `<infoTributaria>`: issuer identity and document numbering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxInfo {
    /// `ambiente`: "1" test, "2" production.
    pub environment: String,
    /// `tipoEmision`: "1" normal emission.
    pub emission_type: String,
    /// `razonSocial`: issuer legal name.
    pub legal_name: String,
    /// `nombreComercial`: issuer trade name.
    pub trade_name: Option<String>,
    /// `ruc`: issuer tax id (13 digits).
    pub tax_id: String,
    /// `claveAcceso`: 49-digit access key. Empty until generated.
    pub access_key: String,
    /// `codDoc`: document type ("01" for invoices).
    pub document_type: String,
    /// `estab`: establishment code (3 digits).
    pub establishment: String,
    /// `ptoEmi`: emission point code (3 digits).
    pub emission_point: String,
    /// `secuencial`: document counter (9 digits, separators allowed).
    pub sequential: String,
    /// `dirMatriz`: head office address.
    pub head_office_address: String,
}

impl Default for TaxInfo {
    fn default() -> Self {
        Self {
            environment: String::new(),
            emission_type: String::new(),
            legal_name: String::new(),
            trade_name: None,
            tax_id: String::new(),
            access_key: String::new(),
            document_type: DocumentType::Invoice.code().to_string(),
            establishment: String::new(),
            emission_point: String::new(),
            sequential: String::new(),
            head_office_address: String::new(),
        }
    }
}

/// `<infoFactura>`: emission date, buyer, totals and payments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceInfo {
    /// `fechaEmision`: emission date, strictly `dd/MM/yyyy`.
    pub emission_date: String,
    /// `dirEstablecimiento`: address of the issuing establishment.
    pub establishment_address: Option<String>,
    /// `contribuyenteEspecial`: special taxpayer resolution number.
    pub special_taxpayer: Option<String>,
    /// `obligadoContabilidad`: "SI" / "NO".
    pub accounting_required: Option<String>,
    /// `tipoIdentificacionComprador`: buyer id type code.
    pub buyer_id_type: String,
    /// `guiaRemision`: remission guide number.
    pub remission_guide: Option<String>,
    /// `razonSocialComprador`: buyer legal name.
    pub buyer_legal_name: String,
    /// `identificacionComprador`: buyer tax id.
    pub buyer_id: String,
    /// `direccionComprador`: buyer address.
    pub buyer_address: Option<String>,
    /// `totalSinImpuestos`: subtotal before taxes.
    pub total_without_taxes: Decimal,
    /// `totalDescuento`: total discount.
    pub total_discount: Decimal,
    /// `totalConImpuestos`: one entry per tax code + rate code.
    pub tax_totals: Vec<TaxTotal>,
    /// `propina`: tip.
    pub tip: Decimal,
    /// `importeTotal`: grand total.
    pub grand_total: Decimal,
    /// `moneda`: currency (e.g. "DOLAR").
    pub currency: Option<String>,
    /// `pagos`: payments. Must not be empty.
    pub payments: Vec<Payment>,
    /// `valorRetIva`: VAT withheld.
    pub vat_withheld: Decimal,
    /// `valorRetRenta`: income tax withheld.
    pub income_tax_withheld: Decimal,
}

/// `<totalImpuesto>`: aggregate per tax code and rate code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxTotal {
    pub code: String,
    pub rate_code: String,
    pub additional_discount: Option<Decimal>,
    pub taxable_base: Decimal,
    pub value: Decimal,
}

/// `<pago>`: one payment method and its amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// `formaPago`: payment method code (e.g. "01" cash, "20" other).
    pub method: String,
    pub total: Decimal,
    /// `plazo`: credit term. Signed; the schema does not forbid negatives.
    pub term: Option<i32>,
    /// `unidadTiempo`: unit of the credit term (e.g. "dias").
    pub time_unit: Option<String>,
}

/// `<detalle>`: invoice line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub principal_code: String,
    pub auxiliary_code: Option<String>,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount: Decimal,
    /// `precioTotalSinImpuesto`: line subtotal before taxes.
    pub total_without_taxes: Decimal,
    /// `detallesAdicionales`: name/value pairs written as attributes.
    pub additional_details: Option<Vec<AdditionalDetail>>,
    /// `impuestos`: taxes on this line. Must not be empty.
    pub taxes: Vec<LineTax>,
}

/// `<detAdicional nombre=".." valor=".."/>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalDetail {
    pub name: String,
    pub value: String,
}

/// `<impuesto>` inside a line item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineTax {
    pub code: String,
    pub rate_code: String,
    /// `tarifa`: rate percentage.
    pub rate: Decimal,
    pub taxable_base: Decimal,
    pub value: Decimal,
}

/// `<retencion>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Withholding {
    pub code: String,
    pub rate_code: String,
    pub rate: Decimal,
    pub value: Decimal,
}

/// `<campoAdicional nombre="..">value</campoAdicional>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalField {
    pub name: String,
    pub value: String,
}

/// `ambiente` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    /// `1`: Pruebas.
    Test,
    /// `2`: Producción.
    Production,
}

impl Environment {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Test => "1",
            Self::Production => "2",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(Self::Test),
            "2" => Some(Self::Production),
            _ => None,
        }
    }
}

/// `tipoEmision` codes. Contingency emission was retired by the SRI,
/// only normal emission remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmissionType {
    /// `1`: Emisión normal.
    Normal,
}

impl EmissionType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Normal => "1",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(Self::Normal),
            _ => None,
        }
    }
}

/// `codDoc` values: SRI voucher types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    /// `01`: Factura.
    Invoice,
    /// `03`: Liquidación de compra.
    PurchaseLiquidation,
    /// `04`: Nota de crédito.
    CreditNote,
    /// `05`: Nota de débito.
    DebitNote,
    /// `06`: Guía de remisión.
    RemissionGuide,
    /// `07`: Comprobante de retención.
    WithholdingVoucher,
}

impl DocumentType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invoice => "01",
            Self::PurchaseLiquidation => "03",
            Self::CreditNote => "04",
            Self::DebitNote => "05",
            Self::RemissionGuide => "06",
            Self::WithholdingVoucher => "07",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "01" => Some(Self::Invoice),
            "03" => Some(Self::PurchaseLiquidation),
            "04" => Some(Self::CreditNote),
            "05" => Some(Self::DebitNote),
            "06" => Some(Self::RemissionGuide),
            "07" => Some(Self::WithholdingVoucher),
            _ => None,
        }
    }
}

/// `tipoIdentificacionComprador` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuyerIdType {
    /// `04`: RUC.
    Ruc,
    /// `05`: Cédula.
    Cedula,
    /// `06`: Pasaporte.
    Passport,
    /// `07`: Consumidor final.
    FinalConsumer,
    /// `08`: Identificación del exterior.
    Foreign,
}

impl BuyerIdType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ruc => "04",
            Self::Cedula => "05",
            Self::Passport => "06",
            Self::FinalConsumer => "07",
            Self::Foreign => "08",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "04" => Some(Self::Ruc),
            "05" => Some(Self::Cedula),
            "06" => Some(Self::Passport),
            "07" => Some(Self::FinalConsumer),
            "08" => Some(Self::Foreign),
            _ => None,
        }
    }
}
