#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = sri_factura::mod11_check_digit(s);
        if sri_factura::verify_access_key(s) {
            assert_eq!(s.len(), sri_factura::ACCESS_KEY_LEN);
        }
    }
});
