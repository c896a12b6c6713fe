use chrono::NaiveDate;
use rust_decimal_macros::dec;
use sri_factura::core::*;
use sri_factura::{InvoiceService, ServiceOptions};

fn main() {
    // A consumer invoice from a Quito coffee shop
    let invoice = InvoiceBuilder::new(
        TaxInfoBuilder::new(
            "Comercial Andina S.A.",
            "1790012345001",
            "Av. Amazonas N24-01, Quito",
        )
        .trade_name("Cafe Andino")
        .numbering("001", "002", "000000123")
        .build(),
        InvoiceInfoBuilder::new(
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            BuyerIdType::Cedula,
            "Maria Perez",
            "1712345678",
        )
        .accounting_required(true)
        .buyer_address("Calle Larga 5-12, Cuenca")
        .currency("DOLAR")
        .build(),
    )
    .add_line(
        LineItemBuilder::new("P-001", "Cafe molido 500g", dec!(2), dec!(10.00))
            .auxiliary_code("7861234500012")
            .detail("lote", "L-77")
            .tax("2", "4", dec!(15))
            .build()
            .expect("line item"),
    )
    .add_line(
        LineItemBuilder::new("P-002", "Azucar 1kg", dec!(1), dec!(1.25))
            .tax("2", "0", dec!(0))
            .build()
            .expect("line item"),
    )
    .additional_field("Email", "maria@example.com")
    .pay_in_full("01")
    .build()
    .expect("invoice should build");

    println!("Subtotal:    {}", invoice.invoice_info.total_without_taxes);
    println!("Grand total: {}", invoice.invoice_info.grand_total);

    let service = InvoiceService::new(ServiceOptions::default());
    let prepared = service
        .prepare_invoice(&invoice)
        .expect("invoice should validate");
    println!("Access key:  {}", prepared.tax_info.access_key);

    let xml = sri_factura::xml::to_xml(&prepared).expect("XML generation");
    println!("\n{xml}");
}
