//! Shop overview for `shop stats`.
//!
//! Prints catalog size split by orderability, order and price-query totals,
//! and the most recent import runs.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use cartridge_shop_core::models::ImportRun;
use cartridge_shop_core::store::ShopStore;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

const RECENT_IMPORTS: i64 = 5;

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::ensure_schema(&pool).await?;
    let store = SqliteStore::new(pool.clone());

    let counts = store.count_products().await?;
    let imports = store.recent_imports(RECENT_IMPORTS).await?;

    let orders = order_summary(&pool).await?;

    let query_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM price_queries")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Cartridge Shop — Stats");
    println!("======================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Products:    {}", counts.total);
    println!("    orderable:   {}", counts.orderable);
    println!("    query-only:  {}", counts.query_only);
    println!();
    println!(
        "  Orders:      {} ({} total)",
        orders.accepted,
        crate::notify::format_rand(orders.value)
    );
    if orders.failed > 0 {
        println!("    notify failed: {} (not in total)", orders.failed);
    }
    println!("  Queries:     {}", query_count);

    if !imports.is_empty() {
        println!();
        println!("  Recent imports:");
        println!(
            "  {:<32} {:>6} {:>9} {:>8}   {}",
            "SOURCE", "LINES", "IMPORTED", "SKIPPED", "WHEN"
        );
        println!("  {}", "-".repeat(76));
        for run in &imports {
            print_import(run);
        }
    }

    println!();

    store.close().await;
    Ok(())
}

/// Orders split by outcome. `value` sums accepted orders only.
#[derive(Debug, PartialEq)]
struct OrderSummary {
    accepted: i64,
    failed: i64,
    value: f64,
}

async fn order_summary(pool: &SqlitePool) -> Result<OrderSummary> {
    let row = sqlx::query(
        "SELECT
            COALESCE(SUM(CASE WHEN status = 'notify_failed' THEN 0 ELSE 1 END), 0) AS accepted,
            COALESCE(SUM(CASE WHEN status = 'notify_failed' THEN 1 ELSE 0 END), 0) AS failed,
            COALESCE(SUM(CASE WHEN status = 'notify_failed' THEN 0.0 ELSE total END), 0.0) AS value
         FROM orders",
    )
    .fetch_one(pool)
    .await?;
    Ok(OrderSummary {
        accepted: row.get("accepted"),
        failed: row.get("failed"),
        value: row.get("value"),
    })
}

fn print_import(run: &ImportRun) {
    println!(
        "  {:<32} {:>6} {:>9} {:>8}   {}",
        truncate(&run.source, 32),
        run.lines_seen,
        run.imported,
        run.skipped,
        format_ts_relative(run.finished_at)
    );
}

/// Keeps the tail of long paths, which is the part that tells them apart.
fn truncate(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count <= width {
        return s.to_string();
    }
    let tail: String = s.chars().skip(count - (width - 1)).collect();
    format!("…{}", tail)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;
    if delta < 0 {
        return format_ts_iso(ts);
    }
    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartridge_shop_core::models::{OrderRecord, RequestStatus};
    use tempfile::TempDir;

    fn order(id: &str, total: f64, status: RequestStatus) -> OrderRecord {
        OrderRecord {
            id: id.into(),
            product_id: 1,
            product_name: "HP 44A Black Toner".into(),
            product_code: Some("CF244A".into()),
            unit_price: total,
            quantity: 1,
            total,
            customer_name: "Thandi".into(),
            email: "thandi@example.com".into(),
            phone: None,
            status,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn order_value_excludes_failed_orders() {
        let tmp = TempDir::new().unwrap();
        let pool = db::connect_path(&tmp.path().join("shop.sqlite")).await.unwrap();
        migrate::ensure_schema(&pool).await.unwrap();
        let store = SqliteStore::new(pool.clone());

        assert_eq!(
            order_summary(&pool).await.unwrap(),
            OrderSummary { accepted: 0, failed: 0, value: 0.0 }
        );

        store.insert_order(&order("a", 250.0, RequestStatus::Received)).await.unwrap();
        store.insert_order(&order("b", 1250.0, RequestStatus::Received)).await.unwrap();
        store.insert_order(&order("c", 999.0, RequestStatus::NotifyFailed)).await.unwrap();

        assert_eq!(
            order_summary(&pool).await.unwrap(),
            OrderSummary { accepted: 2, failed: 1, value: 1500.0 }
        );
        store.close().await;
    }

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn long_sources_keep_their_tail() {
        let s = truncate("/srv/shop/data/catalog/CARTRIDGE LIST FOR ZWIITA.docx", 20);
        assert_eq!(s.chars().count(), 20);
        assert!(s.ends_with("ZWIITA.docx"));
        assert_eq!(truncate("list.docx", 20), "list.docx");
    }

    #[test]
    fn recent_timestamps_are_relative() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_ts_relative(now), "just now");
        assert_eq!(format_ts_relative(now - 7200), "2 hours ago");
        assert_eq!(format_ts_relative(0), "1970-01-01 00:00");
    }
}
