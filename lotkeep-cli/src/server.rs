use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;

use lotkeep_core::client::Dealership;
use lotkeep_core::config::CoordinatorConfig;
use lotkeep_core::sweeper::{SweepStatus, SweeperHealth};
use lotkeep_core::types::{Sale, Vehicle, VehicleId};

use crate::handlers::*;

pub type AppState = Arc<Dealership>;

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    pub storage: String,
    pub config: CoordinatorConfig,
    pub max_concurrent_requests: usize,
    pub seed: bool,
}

pub async fn run(opts: ServeOptions) -> Result<(), Box<dyn std::error::Error>> {
    let dealership = Arc::new(create_dealership(&opts.storage, opts.config));

    if opts.seed {
        let added = dealership.seed_demo_catalog()?;
        if added == 0 {
            tracing::info!("Inventory already stocked, skipping demo seed");
        }
    }

    dealership.sweeper().start()?;

    let app = router(dealership.clone(), opts.max_concurrent_requests);
    let addr = format!("{}:{}", opts.host, opts.port);

    tracing::info!(
        ttl_secs = opts.config.ttl.as_secs(),
        sweep_interval_secs = opts.config.sweep_interval.as_secs(),
        "🚗 lotkeep server starting on http://{}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    dealership.sweeper().stop().await;
    tracing::info!("Server stopped");
    Ok(())
}

pub fn router(state: AppState, max_concurrent_requests: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/vehicles", get(list_vehicles))
        .route("/vehicles/{id}", get(get_vehicle))
        .route("/reservations", post(reserve))
        .route("/reservations/{id}", get(get_reservation))
        .route("/reservations/{id}/cancel", post(cancel_reservation))
        .route("/reservations/{id}/checkout", post(checkout))
        .route("/clients/{client_id}/reservations", get(list_client_reservations))
        .route("/clients/{client_id}/checkout", post(checkout_all))
        .route("/clients/{client_id}/clear", post(clear_client))
        .route("/sales", get(list_sales))
        .route("/sweep", post(sweep))
        .route("/sweep/status", get(sweep_status))
        .layer(CorsLayer::permissive())
        .layer(ConcurrencyLimitLayer::new(max_concurrent_requests.max(1)))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn ok<T: serde::Serialize>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::ok(data))))
}

// ─── Handlers ───────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let sweeper = state.sweeper().health();
    let status = match sweeper {
        SweeperHealth::Healthy => "ok",
        SweeperHealth::Degraded { .. } => "degraded",
    };
    ok(HealthResponse {
        status: status.to_string(),
        available_vehicles: state.available_vehicles()?.len(),
        sweeper,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn list_vehicles(
    State(state): State<AppState>,
    Query(query): Query<VehicleQuery>,
) -> ApiResult<Vec<Vehicle>> {
    if query.all {
        ok(state.vehicles()?)
    } else {
        ok(state.available_vehicles()?)
    }
}

async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<VehicleId>,
) -> ApiResult<Vehicle> {
    ok(state.vehicle(id)?)
}

async fn reserve(
    State(state): State<AppState>,
    Json(req): Json<ReserveRequest>,
) -> ApiResult<ReservationResponse> {
    req.validate().map_err(ApiError::bad_request)?;

    let reservation = state.reserve(req.vehicle_id, &req.client_id)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ReservationResponse::new(
            reservation,
            state.config().ttl_ms(),
        ))),
    ))
}

async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ReservationResponse> {
    let reservation = state.reservation(&id)?;
    ok(ReservationResponse::new(reservation, state.config().ttl_ms()))
}

async fn cancel_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ReservationResponse> {
    let reservation = state.cancel(&id)?;
    ok(ReservationResponse::new(reservation, state.config().ttl_ms()))
}

async fn checkout(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<Sale> {
    let (sale_type, client_tier) = req.validate().map_err(ApiError::bad_request)?;

    let sale = state.checkout(&id, &req.seller_id, sale_type, client_tier)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(sale))))
}

async fn list_client_reservations(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> ApiResult<Vec<ReservationResponse>> {
    let ttl_ms = state.config().ttl_ms();
    let reservations = state
        .list_by_client(&client_id)?
        .into_iter()
        .map(|r| ReservationResponse::new(r, ttl_ms))
        .collect();
    ok(reservations)
}

async fn checkout_all(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<CheckoutAllResponse> {
    let (sale_type, client_tier) = req.validate().map_err(ApiError::bad_request)?;

    let summary = state.checkout_all(&client_id, &req.seller_id, sale_type, client_tier)?;
    ok(CheckoutAllResponse {
        sales: summary.sales,
        released: summary.released,
        failed: summary.failed,
        total_price: summary.total_price,
    })
}

async fn clear_client(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> ApiResult<ClearResponse> {
    let cancelled = state.clear_client(&client_id)?;
    tracing::info!(client_id = %client_id, cancelled, "Client reservations cleared");
    ok(ClearResponse {
        client_id,
        cancelled,
    })
}

async fn list_sales(State(state): State<AppState>) -> ApiResult<Vec<Sale>> {
    ok(state.sales()?)
}

async fn sweep(State(state): State<AppState>) -> ApiResult<SweepResponse> {
    let released = state.sweep_once()?;
    ok(SweepResponse { released })
}

async fn sweep_status(State(state): State<AppState>) -> ApiResult<SweepStatus> {
    ok(state.sweeper().status())
}

// ─── Storage Backend Selection ──────────────────────────────────────────────

pub fn create_dealership(storage: &str, config: CoordinatorConfig) -> Dealership {
    if storage == "memory" {
        tracing::info!("💾 Storage backend: in-memory (state will not persist)");
        Dealership::in_memory(config)
    } else if let Some(path) = storage.strip_prefix("sqlite:") {
        #[cfg(feature = "sqlite")]
        {
            tracing::info!("💾 Storage backend: SQLite ({})", path);
            match Dealership::with_sqlite(path, config) {
                Ok(dealership) => dealership,
                Err(e) => {
                    tracing::error!("Failed to open SQLite: {}. Falling back to in-memory.", e);
                    Dealership::in_memory(config)
                }
            }
        }
        #[cfg(not(feature = "sqlite"))]
        {
            tracing::error!(
                "SQLite storage requested but `sqlite` feature is not enabled. \
                 Rebuild with: cargo build --features sqlite"
            );
            tracing::warn!("Falling back to in-memory storage.");
            let _ = path;
            Dealership::in_memory(config)
        }
    } else {
        tracing::error!(
            "Unknown storage backend: '{}'. Use 'memory' or 'sqlite:<path>'", storage
        );
        tracing::warn!("Falling back to in-memory storage.");
        Dealership::in_memory(config)
    }
}

/// Why a one-shot command could not open the store it was pointed at.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend '{0}' keeps nothing between runs; use 'sqlite:<path>'")]
    NotPersistent(String),
    #[error("unknown storage backend '{0}'. Use 'sqlite:<path>'")]
    Unknown(String),
    #[cfg(not(feature = "sqlite"))]
    #[error("SQLite storage requested but the `sqlite` feature is not enabled")]
    SqliteDisabled,
    #[cfg(feature = "sqlite")]
    #[error("failed to open SQLite at '{path}': {source}")]
    Open {
        path: String,
        source: lotkeep_core::error::StoreError,
    },
}

/// Open a persistent store for a one-shot command. Unlike `create_dealership`
/// there is no in-memory fallback: work done on a throwaway store is lost.
pub fn open_persistent(storage: &str, config: CoordinatorConfig) -> Result<Dealership, StorageError> {
    if storage == "memory" {
        return Err(StorageError::NotPersistent(storage.to_string()));
    }
    let Some(path) = storage.strip_prefix("sqlite:") else {
        return Err(StorageError::Unknown(storage.to_string()));
    };

    #[cfg(feature = "sqlite")]
    {
        tracing::info!("💾 Storage backend: SQLite ({})", path);
        Dealership::with_sqlite(path, config).map_err(|source| StorageError::Open {
            path: path.to_string(),
            source,
        })
    }
    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (path, config);
        Err(StorageError::SqliteDisabled)
    }
}
