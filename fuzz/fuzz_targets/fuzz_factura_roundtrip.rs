#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Parse → serialize → parse must not panic, and the second parse must
        // reproduce the first.
        if let Ok(invoice) = sri_factura::xml::from_xml(s) {
            if let Ok(xml2) = sri_factura::xml::to_xml(&invoice) {
                let again = sri_factura::xml::from_xml(&xml2).expect("re-parse of own output");
                assert_eq!(again, invoice);
            }
        }
    }
});
