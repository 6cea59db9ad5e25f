//! In-memory [`ShopStore`] implementation for tests.
//!
//! Uses `Vec`s behind `std::sync::RwLock`. The catalog swap happens under a
//! single write lock, so readers see either the old or the new catalog.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ImportRun, NewProduct, OrderRecord, ProductFilter, ProductRecord, QueryRecord};

use super::{CatalogCounts, ShopStore};

struct Catalog {
    products: Vec<ProductRecord>,
    next_id: i64,
}

/// In-memory store for tests.
pub struct InMemoryStore {
    catalog: RwLock<Catalog>,
    orders: RwLock<Vec<OrderRecord>>,
    queries: RwLock<Vec<QueryRecord>>,
    imports: RwLock<Vec<ImportRun>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            catalog: RwLock::new(Catalog {
                products: Vec::new(),
                next_id: 1,
            }),
            orders: RwLock::new(Vec::new()),
            queries: RwLock::new(Vec::new()),
            imports: RwLock::new(Vec::new()),
        }
    }

    pub fn orders(&self) -> Vec<OrderRecord> {
        self.orders.read().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<QueryRecord> {
        self.queries.read().unwrap().clone()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShopStore for InMemoryStore {
    async fn replace_catalog(&self, products: &[NewProduct]) -> Result<usize> {
        let now = chrono::Utc::now().timestamp();
        let mut catalog = self.catalog.write().unwrap();
        let first_id = catalog.next_id;
        catalog.products = products
            .iter()
            .enumerate()
            .map(|(i, p)| ProductRecord::from_new(first_id + i as i64, i as i64, p.clone(), now))
            .collect();
        catalog.next_id = first_id + products.len() as i64;
        Ok(products.len())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductRecord>> {
        let catalog = self.catalog.read().unwrap();
        Ok(catalog
            .products
            .iter()
            .filter(|p| filter.accepts(p))
            .cloned()
            .collect())
    }

    async fn get_product(&self, id: i64) -> Result<Option<ProductRecord>> {
        let catalog = self.catalog.read().unwrap();
        Ok(catalog.products.iter().find(|p| p.id == id).cloned())
    }

    async fn count_products(&self) -> Result<CatalogCounts> {
        let catalog = self.catalog.read().unwrap();
        let total = catalog.products.len() as i64;
        let orderable = catalog.products.iter().filter(|p| p.is_orderable()).count() as i64;
        Ok(CatalogCounts {
            total,
            orderable,
            query_only: total - orderable,
        })
    }

    async fn insert_order(&self, order: &OrderRecord) -> Result<()> {
        let mut orders = self.orders.write().unwrap();
        match orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order.clone(),
            None => orders.push(order.clone()),
        }
        Ok(())
    }

    async fn insert_query(&self, query: &QueryRecord) -> Result<()> {
        let mut queries = self.queries.write().unwrap();
        match queries.iter_mut().find(|q| q.id == query.id) {
            Some(existing) => *existing = query.clone(),
            None => queries.push(query.clone()),
        }
        Ok(())
    }

    async fn record_import(&self, run: &ImportRun) -> Result<()> {
        self.imports.write().unwrap().push(run.clone());
        Ok(())
    }

    async fn recent_imports(&self, limit: i64) -> Result<Vec<ImportRun>> {
        let imports = self.imports.read().unwrap();
        Ok(imports
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
