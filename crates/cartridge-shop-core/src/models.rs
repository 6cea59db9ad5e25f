//! Core data models used throughout Cartridge Shop.
//!
//! These types represent the catalog records produced by the import
//! pipeline and the order and price-query records created by customers.

use serde::Serialize;

/// Placeholder image shared by every imported product. The source document
/// carries no per-product imagery.
pub const DEFAULT_IMAGE: &str = "default.jpg";

/// A catalog record emitted by the normalizer, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Option<f64>,
    pub image: String,
    pub code: Option<String>,
    pub is_query_only: bool,
}

impl NewProduct {
    /// Builds a record whose query-only flag is derived from `price`.
    pub fn new(
        name: impl Into<String>,
        price: Option<f64>,
        code: Option<String>,
        image: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            description: name.clone(),
            name,
            is_query_only: price.is_none(),
            price,
            image: image.into(),
            code,
        }
    }

    /// The identity tuple compared across import runs.
    pub fn identity(&self) -> (String, Option<String>, Option<f64>, bool) {
        (
            self.name.clone(),
            self.code.clone(),
            self.price,
            self.is_query_only,
        )
    }
}

/// A persisted catalog record.
///
/// `id` is a storage identifier reassigned on every import run; `position`
/// is the record's index in the source document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: i64,
    pub position: i64,
    pub name: String,
    pub description: String,
    pub price: Option<f64>,
    pub image: String,
    pub code: Option<String>,
    pub is_query_only: bool,
    pub imported_at: i64,
}

impl ProductRecord {
    pub fn from_new(id: i64, position: i64, product: NewProduct, imported_at: i64) -> Self {
        Self {
            id,
            position,
            name: product.name,
            description: product.description,
            price: product.price,
            image: product.image,
            code: product.code,
            is_query_only: product.is_query_only,
            imported_at,
        }
    }

    /// A product can be ordered directly only when it has a listed price.
    pub fn is_orderable(&self) -> bool {
        !self.is_query_only && self.price.is_some()
    }

    /// Case-insensitive substring match on name or code.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self
                .code
                .as_deref()
                .map(|c| c.to_lowercase().contains(&needle))
                .unwrap_or(false)
    }
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Substring to look for in the name or code.
    pub search: Option<String>,
    /// Only return priced, directly orderable records.
    pub orderable_only: bool,
}

impl ProductFilter {
    pub fn orderable() -> Self {
        Self {
            search: None,
            orderable_only: true,
        }
    }

    pub fn accepts(&self, product: &ProductRecord) -> bool {
        if self.orderable_only && !product.is_orderable() {
            return false;
        }
        match &self.search {
            Some(s) => product.matches(s),
            None => true,
        }
    }
}

/// Lifecycle state of an order or price query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Received,
    NotifyFailed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Received => "received",
            RequestStatus::NotifyFailed => "notify_failed",
        }
    }
}

/// A placed order. Product fields are a snapshot taken at order time, since
/// product ids do not survive a re-import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub id: String,
    pub product_id: i64,
    pub product_name: String,
    pub product_code: Option<String>,
    pub unit_price: f64,
    pub quantity: i64,
    pub total: f64,
    pub customer_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: RequestStatus,
    pub created_at: i64,
}

/// A price-query request for a product without a listed price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRecord {
    pub id: String,
    pub product_id: i64,
    pub product_name: String,
    pub product_code: Option<String>,
    pub customer_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub created_at: i64,
}

/// History entry for one import run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportRun {
    pub source: String,
    pub source_hash: String,
    pub lines_seen: i64,
    pub imported: i64,
    pub skipped: i64,
    pub started_at: i64,
    pub finished_at: i64,
}
