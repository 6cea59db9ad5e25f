//! Storefront HTTP server.
//!
//! Serves the product catalog to the browser front-end, accepts orders and
//! price queries, and lets an administrator trigger a catalog re-import.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/products` | Catalog listing; `?q=` searches, `?all=true` includes query-only items |
//! | `GET`  | `/api/products/{id}` | One product |
//! | `POST` | `/api/orders` | Place an order for a priced product |
//! | `POST` | `/api/queries` | Ask for the price of a product |
//! | `POST` | `/api/import` | Re-import the catalog from the configured source |
//!
//! When `[server].static_dir` is set, every other path is served from that
//! directory, so the storefront pages and product images live beside the API.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "query_only", "message": "product 7 has no price; submit a price query instead" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `query_only` (409),
//! `source_unavailable` (404), `extraction_failed` (422),
//! `notification_failed` (502), `persistence_failed` (500), `internal` (500).

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use cartridge_shop_core::models::{ProductFilter, ProductRecord};
use cartridge_shop_core::orders::{OrderError, OrderRequest, QueryRequest};
use cartridge_shop_core::store::ShopStore;

use crate::config::Config;
use crate::db;
use crate::import::{self, ImportError, ImportReport};
use crate::migrate;
use crate::notify::Mailer;
use crate::orders::{self, OrderReceipt, QueryReceipt};
use crate::sqlite_store::SqliteStore;

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<dyn ShopStore>,
    mailer: Mailer,
    /// Held for the duration of an HTTP-triggered import.
    import_lock: Arc<Mutex<()>>,
}

/// Starts the server on `[server].bind` backed by the configured SQLite
/// database. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::ensure_schema(&pool).await?;
    let store: Arc<dyn ShopStore> = Arc::new(SqliteStore::new(pool));
    let mailer = Mailer::from_config(&config.notify)?;
    run_server_with_store(config, store, mailer).await
}

/// Starts the server with an explicit store and mailer.
pub async fn run_server_with_store(
    config: &Config,
    store: Arc<dyn ShopStore>,
    mailer: Mailer,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let provider = mailer.provider().to_string();
    let app = router(config, store, mailer);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, notify = %provider, "storefront listening");
    println!("Shop server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the application router.
pub fn router(config: &Config, store: Arc<dyn ShopStore>, mailer: Mailer) -> Router {
    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        mailer,
        import_lock: Arc::new(Mutex::new(())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/health", get(handle_health))
        .route("/api/products", get(handle_list_products))
        .route("/api/products/{id}", get(handle_get_product))
        .route("/api/orders", post(handle_place_order))
        .route("/api/queries", post(handle_submit_query))
        .route("/api/import", post(handle_import))
        .with_state(state);

    if let Some(dir) = &config.server.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, "{}", self.message);
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::NOT_FOUND, "not_found", message)
}

fn internal(err: anyhow::Error) -> AppError {
    AppError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal",
        format!("{:#}", err),
    )
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::NotFound(_) => not_found(message),
            OrderError::QueryOnly(_) => AppError::new(StatusCode::CONFLICT, "query_only", message),
            OrderError::InvalidQuantity(_) | OrderError::InvalidContact(_) => bad_request(message),
            OrderError::NotificationFailed(_) => {
                AppError::new(StatusCode::BAD_GATEWAY, "notification_failed", message)
            }
            OrderError::Storage(_) => AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                message,
            ),
        }
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        let status = match err {
            ImportError::SourceUnavailable(_) => StatusCode::NOT_FOUND,
            ImportError::ExtractionFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ImportError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError::new(status, err.code(), err.to_string())
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| bad_request(rejection.body_text()))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/products ============

#[derive(Debug, Default, Deserialize)]
struct ProductsParams {
    q: Option<String>,
    #[serde(default)]
    all: bool,
}

/// Returns a bare JSON array, which is what the storefront page iterates.
async fn handle_list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductsParams>,
) -> Result<Json<Vec<ProductRecord>>, AppError> {
    let filter = ProductFilter {
        search: params.q.filter(|q| !q.trim().is_empty()),
        orderable_only: !params.all,
    };
    let products = state.store.list_products(&filter).await.map_err(internal)?;
    Ok(Json(products))
}

// ============ GET /api/products/{id} ============

async fn handle_get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProductRecord>, AppError> {
    state
        .store
        .get_product(id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found(format!("product {} not found", id)))
}

// ============ POST /api/orders ============

async fn handle_place_order(
    State(state): State<AppState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderReceipt>), AppError> {
    let req = json_body(payload)?;
    let receipt = orders::place_order(state.store.as_ref(), &state.mailer, req).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

// ============ POST /api/queries ============

async fn handle_submit_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<QueryReceipt>), AppError> {
    let req = json_body(payload)?;
    let receipt = orders::submit_query(state.store.as_ref(), &state.mailer, req).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

// ============ POST /api/import ============

async fn handle_import(State(state): State<AppState>) -> Result<Json<ImportReport>, AppError> {
    let _guard = state.import_lock.lock().await;
    let catalog = &state.config.catalog;
    let report =
        import::import_catalog(state.store.as_ref(), catalog, &catalog.source, false).await?;
    Ok(Json(report))
}
