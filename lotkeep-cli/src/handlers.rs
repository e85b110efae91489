use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use lotkeep_core::error::ReservationError;
use lotkeep_core::sweeper::SweeperHealth;
use lotkeep_core::types::{ClientTier, Reservation, Sale, SaleType, VehicleId};

// ─── Validation Helpers ─────────────────────────────────────────────────────

pub fn parse_sale_type(sale_type: &str) -> Result<SaleType, String> {
    SaleType::parse(sale_type).ok_or_else(|| {
        format!(
            "Invalid sale_type '{}'. Must be one of: SALE, PURCHASE, VENDA, COMPRA",
            sale_type
        )
    })
}

pub fn parse_client_tier(client_tier: &str) -> Result<ClientTier, String> {
    ClientTier::parse(client_tier).ok_or_else(|| {
        format!(
            "Invalid client_tier '{}'. Must be one of: STANDARD, VIP, COMUM",
            client_tier
        )
    })
}

// ─── Request Types ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ReserveRequest {
    pub vehicle_id: VehicleId,
    pub client_id: String,
}

impl ReserveRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.client_id.trim().is_empty() {
            return Err("client_id is required".to_string());
        }
        Ok(())
    }
}

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub seller_id: String,
    pub sale_type: String,
    #[serde(default)]
    pub client_tier: Option<String>,
}

impl CheckoutRequest {
    /// Check required fields and parse the enums at the boundary.
    pub fn validate(&self) -> Result<(SaleType, Option<ClientTier>), String> {
        if self.seller_id.trim().is_empty() {
            return Err("seller_id is required".to_string());
        }
        let sale_type = parse_sale_type(&self.sale_type)?;
        let client_tier = self
            .client_tier
            .as_deref()
            .map(parse_client_tier)
            .transpose()?;
        Ok((sale_type, client_tier))
    }
}

#[derive(Deserialize, Default)]
pub struct VehicleQuery {
    /// Include reserved and sold vehicles
    #[serde(default)]
    pub all: bool,
}

// ─── Response Types ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[derive(Serialize)]
pub struct ReservationResponse {
    pub id: String,
    pub vehicle_id: VehicleId,
    pub client_id: String,
    pub created_at: u64,
    pub expires_at: u64,
}

impl ReservationResponse {
    pub fn new(reservation: Reservation, ttl_ms: u64) -> Self {
        Self {
            expires_at: reservation.expires_at(ttl_ms),
            id: reservation.id,
            vehicle_id: reservation.vehicle_id,
            client_id: reservation.client_id,
            created_at: reservation.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct CheckoutAllResponse {
    pub sales: Vec<Sale>,
    pub released: usize,
    pub failed: usize,
    pub total_price: f64,
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub client_id: String,
    pub cancelled: usize,
}

#[derive(Serialize)]
pub struct SweepResponse {
    pub released: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub available_vehicles: usize,
    pub sweeper: SweeperHealth,
    pub version: String,
}

// ─── Errors ─────────────────────────────────────────────────────────────────

/// A failed request: status code plus the message carried in the envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }
}

impl From<ReservationError> for ApiError {
    fn from(err: ReservationError) -> Self {
        let status = match &err {
            ReservationError::VehicleNotFound(_) | ReservationError::ReservationNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ReservationError::VehicleUnavailable(_)
            | ReservationError::AlreadyReservedByClient { .. } => StatusCode::CONFLICT,
            ReservationError::ReservationExpired(_) => StatusCode::GONE,
            ReservationError::Store(e) => {
                tracing::error!(error = %e, "Storage failure");
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::err(self.message))).into_response()
    }
}
