//! Storage abstraction for Cartridge Shop.
//!
//! The [`ShopStore`] trait defines every storage operation the import
//! pipeline and the order handlers need, so they can run against SQLite in
//! production and [`memory::InMemoryStore`] in tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{ImportRun, NewProduct, OrderRecord, ProductFilter, ProductRecord, QueryRecord};

/// Catalog size broken down by orderability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub total: i64,
    pub orderable: i64,
    pub query_only: i64,
}

/// Abstract storage backend for Cartridge Shop.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`replace_catalog`](ShopStore::replace_catalog) | Swap the whole catalog for a new record set |
/// | [`list_products`](ShopStore::list_products) | Filtered catalog listing in document order |
/// | [`get_product`](ShopStore::get_product) | Look up one record by id |
/// | [`count_products`](ShopStore::count_products) | Catalog size |
/// | [`insert_order`](ShopStore::insert_order) | Persist an order; the same id again replaces it |
/// | [`insert_query`](ShopStore::insert_query) | Persist a price query; the same id again replaces it |
/// | [`record_import`](ShopStore::record_import) | Append an import history entry |
/// | [`recent_imports`](ShopStore::recent_imports) | Newest import history entries |
#[async_trait]
pub trait ShopStore: Send + Sync {
    /// Replace every catalog record with `products`, in order.
    ///
    /// Implementations should make the swap atomic where the backend allows
    /// it. Returns the number of records stored.
    async fn replace_catalog(&self, products: &[NewProduct]) -> Result<usize>;

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductRecord>>;

    async fn get_product(&self, id: i64) -> Result<Option<ProductRecord>>;

    async fn count_products(&self) -> Result<CatalogCounts>;

    async fn insert_order(&self, order: &OrderRecord) -> Result<()>;

    async fn insert_query(&self, query: &QueryRecord) -> Result<()>;

    async fn record_import(&self, run: &ImportRun) -> Result<()>;

    /// Newest first.
    async fn recent_imports(&self, limit: i64) -> Result<Vec<ImportRun>>;
}
