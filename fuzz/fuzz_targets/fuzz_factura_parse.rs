#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(invoice) = sri_factura::xml::from_xml(s) {
            let _ = sri_factura::validate_structure(&invoice);
            let _ = sri_factura::validate_arithmetic(&invoice);
        }
    }
});
