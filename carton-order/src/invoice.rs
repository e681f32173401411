use std::sync::Arc;

use chrono::Utc;

use carton_core::blob::BlobStore;
use carton_core::{FulfillError, FulfillResult};

use crate::models::{Invoice, Order};
use crate::repository::{InvoiceRepository, OrderRepository};

/// Renders an order into an invoice document, persists it to blob storage
/// and upserts the invoice record. Safe to call repeatedly: the blob path
/// is derived from the order id and the record is keyed by invoice number,
/// so re-generation overwrites instead of duplicating.
pub struct InvoiceGenerator {
    orders: Arc<dyn OrderRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    blobs: Arc<dyn BlobStore>,
}

impl InvoiceGenerator {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            orders,
            invoices,
            blobs,
        }
    }

    /// Generate (or re-generate) the invoice for an order and return the
    /// document URL.
    pub async fn generate(&self, order_id: &str) -> FulfillResult<String> {
        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or_else(|| FulfillError::not_found(format!("order {order_id}")))?;

        let issued_at = Utc::now();
        let html = render_invoice_html(&order, issued_at);
        let path = invoice_path(&order.id);

        let url = self
            .blobs
            .put(&path, html.into_bytes(), "text/html")
            .await?;

        let invoice = Invoice {
            number: order.id.clone(),
            total_cents: order.total_cents,
            currency: order.currency.clone(),
            issued_at,
            document_url: url.clone(),
        };
        self.invoices.upsert(&invoice).await?;
        self.orders.set_invoice_url(&order.id, &url).await?;

        tracing::info!(order_id = %order.id, url = %url, "invoice generated");
        Ok(url)
    }
}

/// Deterministic blob path for an order's invoice.
pub fn invoice_path(order_id: &str) -> String {
    format!("invoices/{order_id}.html")
}

/// Minor units to a decimal string, e.g. 13000 -> "130.00".
pub fn format_cents(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, (cents % 100).abs())
}

/// Render the invoice document: header, invoice number, issue date,
/// customer, line-item table and total.
pub fn render_invoice_html(order: &Order, issued_at: chrono::DateTime<Utc>) -> String {
    let mut rows = String::new();
    for item in &order.items {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            item.name,
            item.quantity,
            format_cents(item.unit_price_cents),
            format_cents(item.line_total_cents),
        ));
    }

    let address = &order.shipping_address;
    format!(
        "<html><body>\n\
         <h1>Invoice</h1>\n\
         <p>Invoice number: {number}</p>\n\
         <p>Issued: {issued}</p>\n\
         <p>Customer: {customer}</p>\n\
         <p>Ship to: {street}, {city}, {region} {postal}, {country}</p>\n\
         <table>\n\
         <tr><th>Item</th><th>Qty</th><th>Unit price</th><th>Line total</th></tr>\n\
         {rows}\
         </table>\n\
         <p>Total: {total} {currency}</p>\n\
         </body></html>\n",
        number = order.id,
        issued = issued_at.to_rfc3339(),
        customer = address.name,
        street = address.street1,
        city = address.city,
        region = address.region,
        postal = address.postal_code,
        country = address.country,
        rows = rows,
        total = format_cents(order.total_cents),
        currency = order.currency,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CartItem, OrderItem, OrderStatus, PaymentStatus};
    use carton_core::carrier::Address;

    fn sample_order() -> Order {
        let id = "ORD-1700000000000-ABCD1234".to_string();
        let items = vec![
            OrderItem::from_cart_item(
                &id,
                &CartItem {
                    product_id: "sku-1".into(),
                    name: "Mug".into(),
                    unit_price_cents: 5000,
                    quantity: 2,
                },
                "USD",
            ),
            OrderItem::from_cart_item(
                &id,
                &CartItem {
                    product_id: "sku-2".into(),
                    name: "Poster".into(),
                    unit_price_cents: 3000,
                    quantity: 1,
                },
                "USD",
            ),
        ];
        let total = items.iter().map(|i| i.line_total_cents).sum();
        Order {
            id,
            user_id: "user-1".into(),
            items,
            currency: "USD".into(),
            total_cents: total,
            status: OrderStatus::Processing,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            shipping_address: Address {
                name: "Ada Lovelace".into(),
                street1: "1 Analytical Way".into(),
                street2: None,
                city: "London".into(),
                region: "LDN".into(),
                postal_code: "E1 6AN".into(),
                country: "GB".into(),
                phone: None,
            },
            delivery_option: None,
            payment_method: "card".into(),
            invoice_url: None,
            tracking_number: None,
            delivered_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_invoice_path_is_deterministic() {
        assert_eq!(invoice_path("ORD-1-X"), "invoices/ORD-1-X.html");
        assert_eq!(invoice_path("ORD-1-X"), invoice_path("ORD-1-X"));
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(13000), "130.00");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(199), "1.99");
    }

    #[test]
    fn test_render_contains_lines_and_total() {
        let order = sample_order();
        let html = render_invoice_html(&order, Utc::now());
        assert!(html.contains(&order.id));
        assert!(html.contains("Mug"));
        assert!(html.contains("Poster"));
        assert!(html.contains("Ada Lovelace"));
        assert!(html.contains("130.00 USD"));
    }
}
