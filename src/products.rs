//! `shop products`: print the current catalog.

use anyhow::Result;

use cartridge_shop_core::models::{ProductFilter, ProductRecord};
use cartridge_shop_core::store::ShopStore;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::notify::format_rand;
use crate::sqlite_store::SqliteStore;

pub async fn run_products(config: &Config, search: Option<String>, all: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::ensure_schema(&pool).await?;
    let store = SqliteStore::new(pool);

    let filter = ProductFilter {
        search: search.filter(|s| !s.trim().is_empty()),
        orderable_only: !all,
    };
    let products = store.list_products(&filter).await?;
    store.close().await;

    if products.is_empty() {
        println!("No products found.");
        return Ok(());
    }

    println!("{:>5}  {:<12} {:>12}  {}", "ID", "CODE", "PRICE", "NAME");
    println!("{}", "-".repeat(72));
    for p in &products {
        println!("{}", format_row(p));
    }
    println!();
    println!("{} product(s)", products.len());

    Ok(())
}

fn format_row(p: &ProductRecord) -> String {
    let price = match p.price {
        Some(price) => format_rand(price),
        None => "on request".to_string(),
    };
    format!(
        "{:>5}  {:<12} {:>12}  {}",
        p.id,
        p.code.as_deref().unwrap_or("-"),
        price,
        p.name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartridge_shop_core::models::{NewProduct, DEFAULT_IMAGE};

    #[test]
    fn rows_show_price_or_request_marker() {
        let priced = ProductRecord::from_new(
            3,
            0,
            NewProduct::new("HP 44A Black Toner", Some(250.0), Some("CF244A".into()), DEFAULT_IMAGE),
            0,
        );
        let row = format_row(&priced);
        assert!(row.contains("CF244A"));
        assert!(row.contains("R250.00"));
        assert!(row.ends_with("HP 44A Black Toner"));

        let unpriced = ProductRecord::from_new(
            4,
            1,
            NewProduct::new("Canon 445XL", None, None, DEFAULT_IMAGE),
            0,
        );
        let row = format_row(&unpriced);
        assert!(row.contains("on request"));
        assert!(row.contains(" - "));
    }
}
