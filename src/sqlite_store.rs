//! SQLite-backed [`ShopStore`] implementation.
//!
//! The catalog swap runs inside one transaction: existing products are
//! deleted and the new set inserted before commit, so readers on other
//! connections see either the previous catalog or the new one, never an
//! empty table.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use cartridge_shop_core::models::{
    ImportRun, NewProduct, OrderRecord, ProductFilter, ProductRecord, QueryRecord,
};
use cartridge_shop_core::store::{CatalogCounts, ShopStore};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

const PRODUCT_COLUMNS: &str =
    "id, position, name, description, price, image, code, is_query_only, imported_at";

fn product_from_row(row: &SqliteRow) -> ProductRecord {
    ProductRecord {
        id: row.get("id"),
        position: row.get("position"),
        name: row.get("name"),
        description: row.get("description"),
        price: row.get("price"),
        image: row.get("image"),
        code: row.get("code"),
        is_query_only: row.get("is_query_only"),
        imported_at: row.get("imported_at"),
    }
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[async_trait]
impl ShopStore for SqliteStore {
    async fn replace_catalog(&self, products: &[NewProduct]) -> Result<usize> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM products").execute(&mut *tx).await?;

        for (position, product) in products.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO products (position, name, description, price, image, code, is_query_only, imported_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(position as i64)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(&product.image)
            .bind(&product.code)
            .bind(product.is_query_only)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(products.len())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductRecord>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut sql = format!("SELECT {} FROM products WHERE 1 = 1", PRODUCT_COLUMNS);
        if filter.orderable_only {
            sql.push_str(" AND is_query_only = 0 AND price IS NOT NULL");
        }
        if search.is_some() {
            sql.push_str(
                " AND (LOWER(name) LIKE ? ESCAPE '\\' OR LOWER(COALESCE(code, '')) LIKE ? ESCAPE '\\')",
            );
        }
        sql.push_str(" ORDER BY position ASC");

        let mut query = sqlx::query(&sql);
        if let Some(s) = search {
            let pattern = like_pattern(s);
            query = query.bind(pattern.clone()).bind(pattern);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(product_from_row).collect())
    }

    async fn get_product(&self, id: i64) -> Result<Option<ProductRecord>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(product_from_row))
    }

    async fn count_products(&self) -> Result<CatalogCounts> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, COALESCE(SUM(CASE WHEN is_query_only = 0 THEN 1 ELSE 0 END), 0) AS orderable FROM products",
        )
        .fetch_one(&self.pool)
        .await?;
        let total: i64 = row.get("total");
        let orderable: i64 = row.get("orderable");
        Ok(CatalogCounts {
            total,
            orderable,
            query_only: total - orderable,
        })
    }

    async fn insert_order(&self, order: &OrderRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, product_id, product_name, product_code, unit_price, quantity,
                                total, customer_name, email, phone, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET status = excluded.status
            "#,
        )
        .bind(&order.id)
        .bind(order.product_id)
        .bind(&order.product_name)
        .bind(&order.product_code)
        .bind(order.unit_price)
        .bind(order.quantity)
        .bind(order.total)
        .bind(&order.customer_name)
        .bind(&order.email)
        .bind(&order.phone)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_query(&self, query: &QueryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO price_queries (id, product_id, product_name, product_code, customer_name,
                                       email, phone, message, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET status = excluded.status
            "#,
        )
        .bind(&query.id)
        .bind(query.product_id)
        .bind(&query.product_name)
        .bind(&query.product_code)
        .bind(&query.customer_name)
        .bind(&query.email)
        .bind(&query.phone)
        .bind(&query.message)
        .bind(query.status.as_str())
        .bind(query.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_import(&self, run: &ImportRun) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO import_runs (source, source_hash, lines_seen, imported, skipped, started_at, finished_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run.source)
        .bind(&run.source_hash)
        .bind(run.lines_seen)
        .bind(run.imported)
        .bind(run.skipped)
        .bind(run.started_at)
        .bind(run.finished_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_imports(&self, limit: i64) -> Result<Vec<ImportRun>> {
        let rows = sqlx::query(
            r#"
            SELECT source, source_hash, lines_seen, imported, skipped, started_at, finished_at
            FROM import_runs ORDER BY id DESC LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ImportRun {
                source: row.get("source"),
                source_hash: row.get("source_hash"),
                lines_seen: row.get("lines_seen"),
                imported: row.get("imported"),
                skipped: row.get("skipped"),
                started_at: row.get("started_at"),
                finished_at: row.get("finished_at"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::migrate;
    use cartridge_shop_core::models::{RequestStatus, DEFAULT_IMAGE};
    use tempfile::TempDir;

    async fn store(tmp: &TempDir) -> SqliteStore {
        let pool = db::connect_path(&tmp.path().join("shop.sqlite"))
            .await
            .unwrap();
        migrate::ensure_schema(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn catalog() -> Vec<NewProduct> {
        vec![
            NewProduct::new("HP 44A Black Toner () -", Some(250.0), Some("CF244A".into()), DEFAULT_IMAGE),
            NewProduct::new("Canon 445XL", None, None, DEFAULT_IMAGE),
            NewProduct::new("100% black_ink refill", Some(80.0), None, DEFAULT_IMAGE),
        ]
    }

    #[tokio::test]
    async fn replace_round_trips_in_document_order() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        assert_eq!(store.replace_catalog(&catalog()).await.unwrap(), 3);

        let all = store.list_products(&ProductFilter::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["HP 44A Black Toner () -", "Canon 445XL", "100% black_ink refill"]);
        assert!(all[1].is_query_only);
        assert_eq!(all[1].price, None);
        assert_eq!(all[0].code.as_deref(), Some("CF244A"));

        let fetched = store.get_product(all[0].id).await.unwrap().unwrap();
        assert_eq!(fetched, all[0]);
    }

    #[tokio::test]
    async fn second_replace_drops_old_records_and_ids() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        store.replace_catalog(&catalog()).await.unwrap();
        let old = store.list_products(&ProductFilter::default()).await.unwrap();

        store.replace_catalog(&catalog()[..1]).await.unwrap();
        let new = store.list_products(&ProductFilter::default()).await.unwrap();
        assert_eq!(new.len(), 1);
        assert!(store.get_product(old[0].id).await.unwrap().is_none());
        assert_ne!(new[0].id, old[0].id);
    }

    #[tokio::test]
    async fn search_matches_name_or_code_and_escapes_wildcards() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        store.replace_catalog(&catalog()).await.unwrap();

        let by_code = ProductFilter {
            search: Some("cf244".into()),
            orderable_only: true,
        };
        assert_eq!(store.list_products(&by_code).await.unwrap().len(), 1);

        let literal = ProductFilter {
            search: Some("100%".into()),
            orderable_only: false,
        };
        let hits = store.list_products(&literal).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "100% black_ink refill");

        let underscore = ProductFilter {
            search: Some("k_i".into()),
            orderable_only: false,
        };
        assert_eq!(store.list_products(&underscore).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn orderable_only_hides_query_only_records() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        store.replace_catalog(&catalog()).await.unwrap();
        let listed = store.list_products(&ProductFilter::orderable()).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|p| p.price.is_some()));

        let counts = store.count_products().await.unwrap();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.orderable, 2);
        assert_eq!(counts.query_only, 1);
    }

    #[tokio::test]
    async fn order_status_update_uses_same_row() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        let mut order = OrderRecord {
            id: "order-1".into(),
            product_id: 1,
            product_name: "HP 44A".into(),
            product_code: Some("CF244A".into()),
            unit_price: 250.0,
            quantity: 2,
            total: 500.0,
            customer_name: "Thandi".into(),
            email: "t@example.com".into(),
            phone: None,
            status: RequestStatus::Received,
            created_at: 1,
        };
        store.insert_order(&order).await.unwrap();
        order.status = RequestStatus::NotifyFailed;
        store.insert_order(&order).await.unwrap();

        let (count, status): (i64, String) =
            sqlx::query_as("SELECT COUNT(*), MAX(status) FROM orders")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(count, 1);
        assert_eq!(status, "notify_failed");
    }
}
