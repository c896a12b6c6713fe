use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::XmlOptions;
use super::xml_utils::{XmlResult, XmlWriter};
use crate::core::*;

/// Serialize an invoice to SRI `factura` XML with the default options.
pub fn to_xml(invoice: &Invoice) -> XmlResult {
    to_xml_with(invoice, &XmlOptions::default())
}

/// Serialize an invoice to SRI `factura` XML.
///
/// No namespace is declared anywhere. Elements follow the schema order;
/// optional values that are `None` are left out entirely.
pub fn to_xml_with(invoice: &Invoice, options: &XmlOptions) -> XmlResult {
    let mut w = XmlWriter::new(options)?;

    w.start_element_with_attrs(
        "factura",
        &[("id", &invoice.id), ("version", &invoice.version)],
    )?;

    write_tax_info(&mut w, &invoice.tax_info)?;
    write_invoice_info(&mut w, &invoice.invoice_info)?;

    w.start_element("detalles")?;
    for item in &invoice.line_items {
        write_line_item(&mut w, item)?;
    }
    w.end_element("detalles")?;

    if let Some(withholdings) = &invoice.withholdings {
        w.start_element("retenciones")?;
        for r in withholdings {
            w.start_element("retencion")?;
            w.text_element("codigo", &r.code)?;
            w.text_element("codigoPorcentaje", &r.rate_code)?;
            w.decimal_element("tarifa", r.rate)?;
            w.decimal_element("valor", r.value)?;
            w.end_element("retencion")?;
        }
        w.end_element("retenciones")?;
    }

    if let Some(fields) = &invoice.additional_info {
        w.start_element("infoAdicional")?;
        for field in fields {
            w.text_element_with_attrs("campoAdicional", &field.value, &[("nombre", &field.name)])?;
        }
        w.end_element("infoAdicional")?;
    }

    w.end_element("factura")?;
    w.into_string()
}

fn write_tax_info(w: &mut XmlWriter, tax: &TaxInfo) -> Result<(), FacturaError> {
    w.start_element("infoTributaria")?;
    w.text_element("ambiente", &tax.environment)?;
    w.text_element("tipoEmision", &tax.emission_type)?;
    w.text_element("razonSocial", &tax.legal_name)?;
    w.opt_text_element("nombreComercial", tax.trade_name.as_deref())?;
    w.text_element("ruc", &tax.tax_id)?;
    w.text_element("claveAcceso", &tax.access_key)?;
    w.text_element("codDoc", &tax.document_type)?;
    w.text_element("estab", &tax.establishment)?;
    w.text_element("ptoEmi", &tax.emission_point)?;
    w.text_element("secuencial", &tax.sequential)?;
    w.text_element("dirMatriz", &tax.head_office_address)?;
    w.end_element("infoTributaria")?;
    Ok(())
}

fn write_invoice_info(w: &mut XmlWriter, info: &InvoiceInfo) -> Result<(), FacturaError> {
    w.start_element("infoFactura")?;
    w.text_element("fechaEmision", &info.emission_date)?;
    w.opt_text_element("dirEstablecimiento", info.establishment_address.as_deref())?;
    w.opt_text_element("contribuyenteEspecial", info.special_taxpayer.as_deref())?;
    w.opt_text_element("obligadoContabilidad", info.accounting_required.as_deref())?;
    w.text_element("tipoIdentificacionComprador", &info.buyer_id_type)?;
    w.opt_text_element("guiaRemision", info.remission_guide.as_deref())?;
    w.text_element("razonSocialComprador", &info.buyer_legal_name)?;
    w.text_element("identificacionComprador", &info.buyer_id)?;
    w.opt_text_element("direccionComprador", info.buyer_address.as_deref())?;
    w.decimal_element("totalSinImpuestos", info.total_without_taxes)?;
    w.decimal_element("totalDescuento", info.total_discount)?;

    w.start_element("totalConImpuestos")?;
    for t in &info.tax_totals {
        w.start_element("totalImpuesto")?;
        w.text_element("codigo", &t.code)?;
        w.text_element("codigoPorcentaje", &t.rate_code)?;
        if let Some(discount) = t.additional_discount {
            w.decimal_element("descuentoAdicional", discount)?;
        }
        w.decimal_element("baseImponible", t.taxable_base)?;
        w.decimal_element("valor", t.value)?;
        w.end_element("totalImpuesto")?;
    }
    w.end_element("totalConImpuestos")?;

    w.decimal_element("propina", info.tip)?;
    w.decimal_element("importeTotal", info.grand_total)?;
    w.opt_text_element("moneda", info.currency.as_deref())?;

    w.start_element("pagos")?;
    for p in &info.payments {
        w.start_element("pago")?;
        w.text_element("formaPago", &p.method)?;
        w.decimal_element("total", p.total)?;
        if let Some(term) = p.term {
            w.text_element("plazo", &term.to_string())?;
        }
        w.opt_text_element("unidadTiempo", p.time_unit.as_deref())?;
        w.end_element("pago")?;
    }
    w.end_element("pagos")?;

    w.decimal_element("valorRetIva", info.vat_withheld)?;
    w.decimal_element("valorRetRenta", info.income_tax_withheld)?;
    w.end_element("infoFactura")?;
    Ok(())
}

fn write_line_item(w: &mut XmlWriter, item: &LineItem) -> Result<(), FacturaError> {
    w.start_element("detalle")?;
    w.text_element("codigoPrincipal", &item.principal_code)?;
    w.opt_text_element("codigoAuxiliar", item.auxiliary_code.as_deref())?;
    w.text_element("descripcion", &item.description)?;
    w.decimal_element("cantidad", item.quantity)?;
    w.decimal_element("precioUnitario", item.unit_price)?;
    w.decimal_element("descuento", item.discount)?;
    w.decimal_element("precioTotalSinImpuesto", item.total_without_taxes)?;

    if let Some(details) = &item.additional_details {
        w.start_element("detallesAdicionales")?;
        for d in details {
            w.text_element_with_attrs("detAdicional", "", &[("nombre", &d.name), ("valor", &d.value)])?;
        }
        w.end_element("detallesAdicionales")?;
    }

    w.start_element("impuestos")?;
    for t in &item.taxes {
        w.start_element("impuesto")?;
        w.text_element("codigo", &t.code)?;
        w.text_element("codigoPorcentaje", &t.rate_code)?;
        w.decimal_element("tarifa", t.rate)?;
        w.decimal_element("baseImponible", t.taxable_base)?;
        w.decimal_element("valor", t.value)?;
        w.end_element("impuesto")?;
    }
    w.end_element("impuestos")?;

    w.end_element("detalle")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Confirm that `xml` is well-formed without mapping anything.
///
/// Requires exactly one root element, balanced tags, valid attributes and
/// resolvable entities.
pub fn check_well_formed(xml: &str) -> Result<(), FacturaError> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut roots = 0usize;

    let malformed = |reader: &Reader<&[u8]>, msg: String| {
        FacturaError::MalformedXml(format!("{msg} (at byte {})", reader.buffer_position()))
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
                check_attributes(e).map_err(|m| malformed(&reader, m))?;
            }
            Ok(Event::Empty(ref e)) => {
                if depth == 0 {
                    roots += 1;
                }
                check_attributes(e).map_err(|m| malformed(&reader, m))?;
            }
            Ok(Event::End(_)) => {
                if depth == 0 {
                    return Err(malformed(&reader, "unexpected closing tag".into()));
                }
                depth -= 1;
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| malformed(&reader, err.to_string()))?;
                if depth == 0 && !text.trim().is_empty() {
                    return Err(malformed(&reader, "text outside the root element".into()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(&reader, e.to_string())),
            _ => {}
        }
        if roots > 1 {
            return Err(malformed(&reader, "more than one root element".into()));
        }
    }

    if depth != 0 {
        return Err(FacturaError::MalformedXml(format!(
            "unexpected end of input, {depth} element(s) left open"
        )));
    }
    if roots == 0 {
        return Err(FacturaError::MalformedXml("no root element".into()));
    }
    Ok(())
}

fn check_attributes(e: &BytesStart<'_>) -> Result<(), String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        attr.unescape_value().map_err(|err| err.to_string())?;
    }
    Ok(())
}

/// Parse SRI `factura` XML into an [`Invoice`].
///
/// The input is first checked for well-formedness. Elements that are absent
/// leave the corresponding fields at their defaults; unknown elements are
/// ignored. Values that are present but cannot be read (a non-numeric amount,
/// for example) are an error.
pub fn from_xml(xml: &str) -> Result<Invoice, FacturaError> {
    check_well_formed(xml)?;

    let mut reader = Reader::from_str(xml);
    let mut parsed = ParsedInvoice::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                parsed.open(e)?;
            }
            Ok(Event::Empty(ref e)) => {
                parsed.open(e)?;
                parsed.close()?;
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| FacturaError::Xml(format!("XML text error: {err}")))?;
                parsed.text.push_str(&text);
            }
            Ok(Event::CData(ref e)) => {
                let text = std::str::from_utf8(e)
                    .map_err(|err| FacturaError::Xml(format!("XML CDATA error: {err}")))?;
                parsed.text.push_str(text);
            }
            Ok(Event::End(_)) => {
                parsed.close()?;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FacturaError::MalformedXml(format!("XML parse error: {e}")));
            }
            _ => {}
        }
    }

    if !parsed.seen_root {
        return Err(FacturaError::Xml("no <factura> element found".into()));
    }
    Ok(parsed.invoice)
}

#[derive(Default)]
struct ParsedInvoice {
    invoice: Invoice,
    path: Vec<String>,
    text: String,
    seen_root: bool,
}

impl ParsedInvoice {
    /// Element opened: push it on the path and create collection entries.
    fn open(&mut self, e: &BytesStart<'_>) -> Result<(), FacturaError> {
        let name = std::str::from_utf8(e.name().as_ref())
            .map_err(|err| FacturaError::Xml(format!("invalid element name: {err}")))?
            .to_string();
        let attrs = read_attributes(e)?;
        let attr_opt = |key: &str| {
            attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        let attr = |key: &str| attr_opt(key).unwrap_or_default();

        let inv = &mut self.invoice;
        let parent: Vec<&str> = self.path.iter().map(String::as_str).collect();
        match (parent.as_slice(), name.as_str()) {
            ([], "factura") => {
                self.seen_root = true;
                // Absent root attributes keep the model defaults.
                if let Some(id) = attr_opt("id") {
                    inv.id = id;
                }
                if let Some(version) = attr_opt("version") {
                    inv.version = version;
                }
            }
            ([], other) => {
                return Err(FacturaError::Xml(format!(
                    "unexpected root element <{other}>, expected <factura>"
                )));
            }
            (["factura", "infoFactura", "totalConImpuestos"], "totalImpuesto") => {
                inv.invoice_info.tax_totals.push(TaxTotal::default());
            }
            (["factura", "infoFactura", "pagos"], "pago") => {
                inv.invoice_info.payments.push(Payment::default());
            }
            (["factura", "detalles"], "detalle") => {
                inv.line_items.push(LineItem::default());
            }
            (["factura", "detalles", "detalle"], "detallesAdicionales") => {
                if let Some(line) = inv.line_items.last_mut() {
                    line.additional_details.get_or_insert_with(Vec::new);
                }
            }
            (["factura", "detalles", "detalle", "detallesAdicionales"], "detAdicional") => {
                if let Some(details) = inv
                    .line_items
                    .last_mut()
                    .and_then(|l| l.additional_details.as_mut())
                {
                    details.push(AdditionalDetail {
                        name: attr("nombre"),
                        value: attr("valor"),
                    });
                }
            }
            (["factura", "detalles", "detalle", "impuestos"], "impuesto") => {
                if let Some(line) = inv.line_items.last_mut() {
                    line.taxes.push(LineTax::default());
                }
            }
            (["factura"], "retenciones") => {
                inv.withholdings.get_or_insert_with(Vec::new);
            }
            (["factura", "retenciones"], "retencion") => {
                if let Some(list) = inv.withholdings.as_mut() {
                    list.push(Withholding::default());
                }
            }
            (["factura"], "infoAdicional") => {
                inv.additional_info.get_or_insert_with(Vec::new);
            }
            (["factura", "infoAdicional"], "campoAdicional") => {
                if let Some(fields) = inv.additional_info.as_mut() {
                    fields.push(AdditionalField {
                        name: attr("nombre"),
                        value: String::new(),
                    });
                }
            }
            _ => {}
        }

        self.path.push(name);
        self.text.clear();
        Ok(())
    }

    /// Element closed: assign the collected text to the leaf it belongs to.
    fn close(&mut self) -> Result<(), FacturaError> {
        let text = std::mem::take(&mut self.text);
        let path: Vec<&str> = self.path.iter().map(String::as_str).collect();
        let inv = &mut self.invoice;

        match path.as_slice() {
            ["factura", "infoTributaria", leaf] => assign_tax_info(&mut inv.tax_info, leaf, text),
            ["factura", "infoFactura", leaf] => {
                assign_invoice_info(&mut inv.invoice_info, leaf, text)?
            }
            ["factura", "infoFactura", "totalConImpuestos", "totalImpuesto", leaf] => {
                if let Some(t) = inv.invoice_info.tax_totals.last_mut() {
                    match *leaf {
                        "codigo" => t.code = text,
                        "codigoPorcentaje" => t.rate_code = text,
                        "descuentoAdicional" => {
                            t.additional_discount = Some(parse_decimal(leaf, &text)?)
                        }
                        "baseImponible" => t.taxable_base = parse_decimal(leaf, &text)?,
                        "valor" => t.value = parse_decimal(leaf, &text)?,
                        _ => {}
                    }
                }
            }
            ["factura", "infoFactura", "pagos", "pago", leaf] => {
                if let Some(p) = inv.invoice_info.payments.last_mut() {
                    match *leaf {
                        "formaPago" => p.method = text,
                        "total" => p.total = parse_decimal(leaf, &text)?,
                        "plazo" => {
                            p.term = Some(text.trim().parse().map_err(|_| {
                                FacturaError::Xml(format!("invalid integer '{text}' in <plazo>"))
                            })?)
                        }
                        "unidadTiempo" => p.time_unit = Some(text),
                        _ => {}
                    }
                }
            }
            ["factura", "detalles", "detalle", leaf] => {
                if let Some(line) = inv.line_items.last_mut() {
                    assign_line_item(line, leaf, text)?;
                }
            }
            ["factura", "detalles", "detalle", "impuestos", "impuesto", leaf] => {
                if let Some(t) = inv.line_items.last_mut().and_then(|l| l.taxes.last_mut()) {
                    match *leaf {
                        "codigo" => t.code = text,
                        "codigoPorcentaje" => t.rate_code = text,
                        "tarifa" => t.rate = parse_decimal(leaf, &text)?,
                        "baseImponible" => t.taxable_base = parse_decimal(leaf, &text)?,
                        "valor" => t.value = parse_decimal(leaf, &text)?,
                        _ => {}
                    }
                }
            }
            ["factura", "retenciones", "retencion", leaf] => {
                if let Some(r) = inv.withholdings.as_mut().and_then(|l| l.last_mut()) {
                    match *leaf {
                        "codigo" => r.code = text,
                        "codigoPorcentaje" => r.rate_code = text,
                        "tarifa" => r.rate = parse_decimal(leaf, &text)?,
                        "valor" => r.value = parse_decimal(leaf, &text)?,
                        _ => {}
                    }
                }
            }
            ["factura", "infoAdicional", "campoAdicional"] => {
                if let Some(field) = inv.additional_info.as_mut().and_then(|l| l.last_mut()) {
                    field.value = text;
                }
            }
            _ => {}
        }

        self.path.pop();
        Ok(())
    }
}

fn assign_tax_info(tax: &mut TaxInfo, leaf: &str, text: String) {
    match leaf {
        "ambiente" => tax.environment = text,
        "tipoEmision" => tax.emission_type = text,
        "razonSocial" => tax.legal_name = text,
        "nombreComercial" => tax.trade_name = Some(text),
        "ruc" => tax.tax_id = text,
        "claveAcceso" => tax.access_key = text,
        "codDoc" => tax.document_type = text,
        "estab" => tax.establishment = text,
        "ptoEmi" => tax.emission_point = text,
        "secuencial" => tax.sequential = text,
        "dirMatriz" => tax.head_office_address = text,
        _ => {}
    }
}

fn assign_invoice_info(info: &mut InvoiceInfo, leaf: &str, text: String) -> Result<(), FacturaError> {
    match leaf {
        "fechaEmision" => info.emission_date = text,
        "dirEstablecimiento" => info.establishment_address = Some(text),
        "contribuyenteEspecial" => info.special_taxpayer = Some(text),
        "obligadoContabilidad" => info.accounting_required = Some(text),
        "tipoIdentificacionComprador" => info.buyer_id_type = text,
        "guiaRemision" => info.remission_guide = Some(text),
        "razonSocialComprador" => info.buyer_legal_name = text,
        "identificacionComprador" => info.buyer_id = text,
        "direccionComprador" => info.buyer_address = Some(text),
        "totalSinImpuestos" => info.total_without_taxes = parse_decimal(leaf, &text)?,
        "totalDescuento" => info.total_discount = parse_decimal(leaf, &text)?,
        "propina" => info.tip = parse_decimal(leaf, &text)?,
        "importeTotal" => info.grand_total = parse_decimal(leaf, &text)?,
        "moneda" => info.currency = Some(text),
        "valorRetIva" => info.vat_withheld = parse_decimal(leaf, &text)?,
        "valorRetRenta" => info.income_tax_withheld = parse_decimal(leaf, &text)?,
        _ => {}
    }
    Ok(())
}

fn assign_line_item(line: &mut LineItem, leaf: &str, text: String) -> Result<(), FacturaError> {
    match leaf {
        "codigoPrincipal" => line.principal_code = text,
        "codigoAuxiliar" => line.auxiliary_code = Some(text),
        "descripcion" => line.description = text,
        "cantidad" => line.quantity = parse_decimal(leaf, &text)?,
        "precioUnitario" => line.unit_price = parse_decimal(leaf, &text)?,
        "descuento" => line.discount = parse_decimal(leaf, &text)?,
        "precioTotalSinImpuesto" => line.total_without_taxes = parse_decimal(leaf, &text)?,
        _ => {}
    }
    Ok(())
}

fn parse_decimal(tag: &str, s: &str) -> Result<Decimal, FacturaError> {
    Decimal::from_str(s.trim())
        .map_err(|e| FacturaError::Xml(format!("invalid decimal '{s}' in <{tag}>: {e}")))
}

fn read_attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>, FacturaError> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| FacturaError::Xml(format!("XML attribute error: {err}")))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| FacturaError::Xml(format!("invalid attribute name: {err}")))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| FacturaError::Xml(format!("XML attribute error: {err}")))?
            .into_owned();
        out.push((key, value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formedness() {
        assert!(check_well_formed("<factura><a>1</a></factura>").is_ok());
        assert!(check_well_formed("<?xml version=\"1.0\"?>\n<factura/>").is_ok());

        for bad in [
            "",
            "not xml at all",
            "<factura><a></factura>",
            "<factura>",
            "<factura></factura><factura></factura>",
            "<factura a=\"1\" a=\"2\"></factura>",
            "<factura>&bogus;</factura>",
        ] {
            assert!(
                matches!(check_well_formed(bad), Err(FacturaError::MalformedXml(_))),
                "accepted: {bad:?}"
            );
        }
    }

    #[test]
    fn missing_elements_become_defaults() {
        let inv = from_xml("<factura id=\"comprobante\" version=\"1.1.0\"></factura>").unwrap();
        assert_eq!(inv.version, "1.1.0");
        assert!(inv.tax_info.tax_id.is_empty());
        assert!(inv.line_items.is_empty());
        assert!(inv.withholdings.is_none());
        assert_eq!(inv.invoice_info.grand_total, Decimal::ZERO);
    }

    #[test]
    fn root_without_attributes_keeps_defaults() {
        let inv = from_xml("<factura></factura>").unwrap();
        assert_eq!(inv.id, "comprobante");
        assert_eq!(inv.version, "1.1.0");

        let inv = from_xml("<factura version=\"2.1.0\"/>").unwrap();
        assert_eq!(inv.id, "comprobante");
        assert_eq!(inv.version, "2.1.0");

        // An explicit empty value is kept as given.
        let inv = from_xml("<factura id=\"\" version=\"1.0.0\"></factura>").unwrap();
        assert!(inv.id.is_empty());
    }

    #[test]
    fn self_closing_input_elements() {
        let xml = r#"<factura id="comprobante" version="1.1.0">
  <detalles>
    <detalle>
      <codigoPrincipal>A</codigoPrincipal>
      <detallesAdicionales>
        <detAdicional nombre="lote" valor="L&amp;1"/>
      </detallesAdicionales>
      <impuestos/>
    </detalle>
  </detalles>
  <infoAdicional>
    <campoAdicional nombre="Email"/>
  </infoAdicional>
</factura>"#;
        let inv = from_xml(xml).unwrap();
        let line = &inv.line_items[0];
        assert_eq!(line.principal_code, "A");
        let details = line.additional_details.as_ref().unwrap();
        assert_eq!(details[0].name, "lote");
        assert_eq!(details[0].value, "L&1");
        assert!(line.taxes.is_empty());
        let fields = inv.additional_info.unwrap();
        assert_eq!(fields[0].name, "Email");
        assert_eq!(fields[0].value, "");
    }

    #[test]
    fn wrong_root_and_bad_values_fail() {
        assert!(matches!(
            from_xml("<notaCredito></notaCredito>"),
            Err(FacturaError::Xml(_))
        ));
        assert!(matches!(
            from_xml("<factura><infoFactura><importeTotal>abc</importeTotal></infoFactura></factura>"),
            Err(FacturaError::Xml(_))
        ));
        assert!(matches!(
            from_xml("<factura><detalles>"),
            Err(FacturaError::MalformedXml(_))
        ));
    }
}
