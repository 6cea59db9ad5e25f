//! Order and price-query validation.
//!
//! Pure checks shared by the HTTP handlers and the store implementations:
//! an order needs a known, priced product, a positive quantity and usable
//! contact details. A price query only needs a known product and contact
//! details.

use serde::Deserialize;

use crate::models::ProductRecord;

/// Customer request to buy a priced product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub product_id: i64,
    #[serde(alias = "name")]
    pub customer_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// Customer request for a quote on a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub product_id: i64,
    #[serde(alias = "name")]
    pub customer_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Why an order or price query was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderError {
    /// No product with this id in the current catalog.
    NotFound(i64),
    /// The product has no listed price and can only be queried.
    QueryOnly(i64),
    InvalidQuantity(i64),
    InvalidContact(String),
    /// The admin notification failed and delivery is required.
    NotificationFailed(String),
    Storage(String),
}

impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderError::NotFound(id) => write!(f, "product not found: {}", id),
            OrderError::QueryOnly(id) => write!(
                f,
                "product {} has no listed price; submit a price query instead",
                id
            ),
            OrderError::InvalidQuantity(q) => write!(f, "quantity must be at least 1, got {}", q),
            OrderError::InvalidContact(msg) => write!(f, "invalid contact details: {}", msg),
            OrderError::NotificationFailed(msg) => write!(f, "notification failed: {}", msg),
            OrderError::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl std::error::Error for OrderError {}

/// Price breakdown for an accepted order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderQuote {
    pub unit_price: f64,
    pub quantity: i64,
    pub total: f64,
}

/// Validates an order against the product it references and prices it.
pub fn quote_order(
    product: Option<&ProductRecord>,
    req: &OrderRequest,
) -> Result<OrderQuote, OrderError> {
    let product = product.ok_or(OrderError::NotFound(req.product_id))?;
    let unit_price = match product.price {
        Some(p) if !product.is_query_only => p,
        _ => return Err(OrderError::QueryOnly(product.id)),
    };
    if req.quantity < 1 {
        return Err(OrderError::InvalidQuantity(req.quantity));
    }
    validate_contact(&req.customer_name, &req.email)?;

    Ok(OrderQuote {
        unit_price,
        quantity: req.quantity,
        total: round_cents(unit_price * req.quantity as f64),
    })
}

/// Validates a price query. Any existing product may be queried.
pub fn validate_query(
    product: Option<&ProductRecord>,
    req: &QueryRequest,
) -> Result<(), OrderError> {
    product.ok_or(OrderError::NotFound(req.product_id))?;
    validate_contact(&req.customer_name, &req.email)
}

fn validate_contact(name: &str, email: &str) -> Result<(), OrderError> {
    if name.trim().is_empty() {
        return Err(OrderError::InvalidContact(
            "customer name must not be empty".to_string(),
        ));
    }
    if !is_plausible_email(email) {
        return Err(OrderError::InvalidContact(format!(
            "'{}' is not an email address",
            email.trim()
        )));
    }
    Ok(())
}

/// Loose shape check: one `@`, non-empty local part, dotted domain, no spaces.
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewProduct, DEFAULT_IMAGE};

    fn product(id: i64, price: Option<f64>) -> ProductRecord {
        ProductRecord::from_new(
            id,
            0,
            NewProduct::new("HP 44A Black Toner", price, None, DEFAULT_IMAGE),
            0,
        )
    }

    fn order(quantity: i64) -> OrderRequest {
        OrderRequest {
            product_id: 7,
            customer_name: "Thandi".to_string(),
            email: "thandi@example.co.za".to_string(),
            phone: None,
            quantity,
        }
    }

    #[test]
    fn total_is_price_times_quantity() {
        let q = quote_order(Some(&product(7, Some(250.0))), &order(3)).unwrap();
        assert_eq!(q.unit_price, 250.0);
        assert_eq!(q.quantity, 3);
        assert_eq!(q.total, 750.0);
    }

    #[test]
    fn total_is_rounded_to_cents() {
        let q = quote_order(Some(&product(7, Some(19.99))), &order(3)).unwrap();
        assert_eq!(q.total, 59.97);
    }

    #[test]
    fn unknown_product_is_rejected() {
        assert_eq!(quote_order(None, &order(1)), Err(OrderError::NotFound(7)));
    }

    #[test]
    fn query_only_product_cannot_be_ordered() {
        assert_eq!(
            quote_order(Some(&product(7, None)), &order(1)),
            Err(OrderError::QueryOnly(7))
        );
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert_eq!(
            quote_order(Some(&product(7, Some(10.0))), &order(0)),
            Err(OrderError::InvalidQuantity(0))
        );
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut req = order(1);
        req.customer_name = "   ".to_string();
        let err = quote_order(Some(&product(7, Some(10.0))), &req).unwrap_err();
        assert!(matches!(err, OrderError::InvalidContact(_)));
    }

    #[test]
    fn query_allowed_for_unpriced_product() {
        let req = QueryRequest {
            product_id: 7,
            customer_name: "Sipho".to_string(),
            email: "sipho@example.com".to_string(),
            phone: Some("+27 82 000 0000".to_string()),
            message: None,
        };
        assert!(validate_query(Some(&product(7, None)), &req).is_ok());
        assert_eq!(validate_query(None, &req), Err(OrderError::NotFound(7)));
    }

    #[test]
    fn email_shape_check() {
        assert!(is_plausible_email("a@b.co"));
        assert!(is_plausible_email("  orders@shop.example.com "));
        assert!(!is_plausible_email("no-at-sign.com"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("@b.com"));
        assert!(!is_plausible_email("a b@c.com"));
        assert!(!is_plausible_email("a@@b.com"));
        assert!(!is_plausible_email("a@b.com."));
    }

    #[test]
    fn order_request_accepts_camel_case_and_defaults_quantity() {
        let req: OrderRequest = serde_json::from_str(
            r#"{"productId": 3, "name": "Lerato", "email": "l@example.com"}"#,
        )
        .unwrap();
        assert_eq!(req.product_id, 3);
        assert_eq!(req.customer_name, "Lerato");
        assert_eq!(req.quantity, 1);
    }
}
