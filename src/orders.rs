//! Order placement and price-query submission.
//!
//! Both flows look the product up in the current catalog, validate the
//! request, persist it, then notify the shop admin and the customer. A
//! failed notification is logged and reported in the receipt; it only fails
//! the request when `notify.required` is set, in which case the stored
//! record is marked `notify_failed` and the customer is not mailed.

use serde::Serialize;
use uuid::Uuid;

use cartridge_shop_core::models::{OrderRecord, ProductRecord, QueryRecord, RequestStatus};
use cartridge_shop_core::orders::{
    quote_order, validate_query, OrderError, OrderRequest, QueryRequest,
};
use cartridge_shop_core::store::ShopStore;

use crate::notify::{self, Delivery, Mailer};

#[derive(Debug, Clone, Serialize)]
pub struct OrderReceipt {
    pub order: OrderRecord,
    pub admin_notified: bool,
    pub customer_notified: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryReceipt {
    pub query: QueryRecord,
    pub admin_notified: bool,
    pub customer_notified: bool,
}

fn storage(e: anyhow::Error) -> OrderError {
    OrderError::Storage(format!("{:#}", e))
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn lookup(store: &dyn ShopStore, id: i64) -> Result<Option<ProductRecord>, OrderError> {
    store.get_product(id).await.map_err(storage)
}

pub async fn place_order(
    store: &dyn ShopStore,
    mailer: &Mailer,
    req: OrderRequest,
) -> Result<OrderReceipt, OrderError> {
    let product = lookup(store, req.product_id).await?;
    let quote = quote_order(product.as_ref(), &req)?;
    let product = product.ok_or(OrderError::NotFound(req.product_id))?;

    let mut order = OrderRecord {
        id: Uuid::new_v4().to_string(),
        product_id: product.id,
        product_name: product.name,
        product_code: product.code,
        unit_price: quote.unit_price,
        quantity: quote.quantity,
        total: quote.total,
        customer_name: req.customer_name.trim().to_string(),
        email: req.email.trim().to_string(),
        phone: clean_optional(req.phone),
        status: RequestStatus::Received,
        created_at: chrono::Utc::now().timestamp(),
    };
    store.insert_order(&order).await.map_err(storage)?;

    let (subject, text) = notify::order_admin_message(&order);
    let admin = mailer.notify_admin(subject, text).await;
    if let Delivery::Failed { reason } = &admin {
        if mailer.required() {
            order.status = RequestStatus::NotifyFailed;
            store.insert_order(&order).await.map_err(storage)?;
            return Err(OrderError::NotificationFailed(reason.clone()));
        }
    }

    let (subject, text) = notify::order_customer_message(&order);
    let customer = mailer.notify_customer(&order.email, subject, text).await;

    tracing::info!(
        order = %order.id,
        product = order.product_id,
        quantity = order.quantity,
        total = order.total,
        "order placed"
    );

    Ok(OrderReceipt {
        order,
        admin_notified: admin.is_delivered(),
        customer_notified: customer.is_delivered(),
    })
}

pub async fn submit_query(
    store: &dyn ShopStore,
    mailer: &Mailer,
    req: QueryRequest,
) -> Result<QueryReceipt, OrderError> {
    let product = lookup(store, req.product_id).await?;
    validate_query(product.as_ref(), &req)?;
    let product = product.ok_or(OrderError::NotFound(req.product_id))?;

    let mut query = QueryRecord {
        id: Uuid::new_v4().to_string(),
        product_id: product.id,
        product_name: product.name,
        product_code: product.code,
        customer_name: req.customer_name.trim().to_string(),
        email: req.email.trim().to_string(),
        phone: clean_optional(req.phone),
        message: clean_optional(req.message),
        status: RequestStatus::Received,
        created_at: chrono::Utc::now().timestamp(),
    };
    store.insert_query(&query).await.map_err(storage)?;

    let (subject, text) = notify::query_admin_message(&query);
    let admin = mailer.notify_admin(subject, text).await;
    if let Delivery::Failed { reason } = &admin {
        if mailer.required() {
            query.status = RequestStatus::NotifyFailed;
            store.insert_query(&query).await.map_err(storage)?;
            return Err(OrderError::NotificationFailed(reason.clone()));
        }
    }

    let (subject, text) = notify::query_customer_message(&query);
    let customer = mailer.notify_customer(&query.email, subject, text).await;

    tracing::info!(query = %query.id, product = query.product_id, "price query received");

    Ok(QueryReceipt {
        query,
        admin_notified: admin.is_delivered(),
        customer_notified: customer.is_delivered(),
    })
}
