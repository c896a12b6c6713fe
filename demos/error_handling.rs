use sri_factura::core::*;
use sri_factura::InvoiceService;

fn main() {
    let service = InvoiceService::default();

    // An empty invoice: every required field is reported at once
    let result = service.validate_invoice_structure(Some(&Invoice::default()));
    println!("{} violation(s):", result.errors.len());
    for err in &result.errors {
        println!("  {err}");
    }

    // A bad emission date cannot produce an access key
    let mut invoice = Invoice::default();
    invoice.invoice_info.emission_date = "2025-01-10".into();
    match service.generate_access_key(&invoice) {
        Ok(key) => println!("key: {key}"),
        Err(e) => println!("access key error: {e}"),
    }

    // Parsing distinguishes empty input, broken XML and the wrong document
    for input in ["", "<factura><detalles></factura>", "<notaCredito/>"] {
        match service.parse_invoice_xml(input) {
            Ok(_) => println!("{input:?}: parsed"),
            Err(FacturaError::InvalidArgument(msg)) => println!("{input:?}: invalid argument: {msg}"),
            Err(FacturaError::MalformedXml(msg)) => println!("{input:?}: malformed: {msg}"),
            Err(e) => println!("{input:?}: {e}"),
        }
    }

    println!(
        "published key verifies: {}",
        verify_access_key("2110201101179214673900110020010000000011234567813")
    );
}
