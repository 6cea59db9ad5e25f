//! # Cartridge Shop
//!
//! Backend for a small printer-cartridge storefront. The supplier's price
//! list arrives as a loosely formatted document; the import pipeline turns
//! it into a product catalog, and the HTTP server sells from that catalog.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌────────────┐   ┌──────────┐
//! │ Price list  │──▶│  Extractor  │──▶│ Normalizer │──▶│  SQLite  │
//! │ DOCX/PDF/TXT│   │   (lines)   │   │  (records) │   │ catalog  │
//! └─────────────┘   └─────────────┘   └────────────┘   └────┬─────┘
//!                                                           │
//!                                   ┌───────────────────────┤
//!                                   ▼                       ▼
//!                              ┌──────────┐           ┌───────────┐
//!                              │   CLI    │           │   HTTP    │──▶ notifier
//!                              │  (shop)  │           │ storefront│
//!                              └──────────┘           └───────────┘
//! ```
//!
//! The normalizer, the domain types and the store trait live in
//! `cartridge-shop-core`, which has no I/O dependencies.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`extract`] | Document → lines |
//! | [`import`] | Import pipeline |
//! | [`sqlite_store`] | SQLite `ShopStore` |
//! | [`notify`] | Order and price-query notifications |
//! | [`orders`] | Order placement and price queries |
//! | [`products`] | `shop products` |
//! | [`stats`] | `shop stats` |
//! | [`server`] | Storefront HTTP server |

pub mod config;
pub mod db;
pub mod extract;
pub mod import;
pub mod migrate;
pub mod notify;
pub mod orders;
pub mod products;
pub mod server;
pub mod sqlite_store;
pub mod stats;
