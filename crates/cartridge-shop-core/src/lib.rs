//! # Cartridge Shop Core
//!
//! Runtime-agnostic logic for Cartridge Shop: product and order models, the
//! catalog line normalizer, order validation rules, and the store abstraction.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or HTTP code. The
//! `cartridge-shop` package wires it to SQLite, document extraction, email
//! delivery and the axum API.

pub mod models;
pub mod normalize;
pub mod orders;
pub mod store;
