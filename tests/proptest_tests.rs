//! Property-based tests for access keys, validation and the XML mapping.
//!
//! Run with: `cargo test --test proptest_tests`

#![cfg(feature = "xml")]

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sri_factura::core::*;
use sri_factura::xml;
use sri_factura::{InvoiceService, ServiceOptions};

fn invoice_with(
    date: NaiveDate,
    ruc: &str,
    estab: &str,
    point: &str,
    seq: &str,
    lines: &[(Decimal, Decimal)],
) -> Invoice {
    let mut builder = InvoiceBuilder::new(
        TaxInfoBuilder::new("Comercial Andina S.A.", ruc, "Av. Amazonas N24-01, Quito")
            .numbering(estab, point, seq)
            .build(),
        InvoiceInfoBuilder::new(
            date,
            BuyerIdType::FinalConsumer,
            "CONSUMIDOR FINAL",
            "9999999999999",
        )
        .build(),
    );
    for (i, (qty, price)) in lines.iter().enumerate() {
        builder = builder.add_line(
            LineItemBuilder::new(format!("P-{i}"), format!("Item {i}"), *qty, *price)
                .tax("2", "4", dec!(15))
                .build()
                .unwrap(),
        );
    }
    builder.pay_in_full("01").build().unwrap()
}

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

/// Positive amounts with up to two decimals.
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000, 0u32..=2).prop_map(|(n, scale)| Decimal::new(n, scale))
}

fn text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 .,&<>'\"ñÁ-]{0,24}"
}

proptest! {
    #[test]
    fn well_formed_fields_give_a_verifiable_key(
        date in date_strategy(),
        ruc in "[0-9]{13}",
        estab in "[0-9]{3}",
        point in "[0-9]{3}",
        seq in "[0-9]{9}",
        code in SECURITY_CODE_MIN..=SECURITY_CODE_MAX,
    ) {
        let inv = invoice_with(date, &ruc, &estab, &point, &seq, &[(dec!(1), dec!(1))]);
        let key = generate_access_key_with(&inv, &FixedSecurityCode(code)).unwrap();

        prop_assert_eq!(key.len(), ACCESS_KEY_LEN);
        prop_assert!(key.bytes().all(|b| b.is_ascii_digit()));
        prop_assert!(verify_access_key(&key));
        prop_assert_eq!(&key[0..8], date.format("%d%m%Y").to_string());
        prop_assert_eq!(&key[10..23], ruc.as_str());
        prop_assert_eq!(&key[39..47], code.to_string());
    }

    #[test]
    fn appended_check_digit_always_verifies(body in "[0-9]{48}") {
        let digit = mod11_check_digit(&body).unwrap();
        prop_assert!(digit <= 9);
        let key = format!("{body}{digit}");
        prop_assert!(verify_access_key(&key));
    }

    #[test]
    fn wrong_check_digit_is_rejected(body in "[0-9]{48}", bump in 1u8..=9) {
        let digit = mod11_check_digit(&body).unwrap();
        let key = format!("{body}{}", (digit + bump) % 10);
        prop_assert!(!verify_access_key(&key));
    }

    #[test]
    fn random_security_codes_stay_in_range(_n in 0..64u8) {
        let code = RandomSecurityCode.security_code();
        prop_assert!((SECURITY_CODE_MIN..=SECURITY_CODE_MAX).contains(&code));
    }

    #[test]
    fn built_invoices_validate_and_serialize(
        date in date_strategy(),
        lines in prop::collection::vec((amount(), amount()), 1..8),
    ) {
        let inv = invoice_with(date, "1790012345001", "001", "002", "000000123", &lines);
        prop_assert!(validate_arithmetic(&inv).is_empty());

        let svc = InvoiceService::new(ServiceOptions::default());
        let prepared = svc.prepare_invoice(&inv).unwrap();
        prop_assert!(validate_structure(&prepared).is_valid());

        let xml = svc.generate_invoice_xml(&inv).unwrap();
        xml::check_well_formed(&xml).unwrap();
    }

    #[test]
    fn xml_round_trip(
        legal_name in text(),
        description in text(),
        note in text(),
        trade_name in prop::option::of(text()),
        lines in prop::collection::vec((amount(), amount()), 1..5),
        tip in amount(),
    ) {
        let mut inv = invoice_with(
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            "1790012345001", "001", "002", "000000123", &lines,
        );
        inv.tax_info.legal_name = legal_name;
        inv.tax_info.trade_name = trade_name;
        inv.line_items[0].description = description;
        inv.invoice_info.tip = tip;
        inv.additional_info = Some(vec![AdditionalField { name: "Nota".into(), value: note }]);

        let xml = xml::to_xml(&inv).unwrap();
        let back = xml::from_xml(&xml).unwrap();
        prop_assert_eq!(back, inv);
    }
}
