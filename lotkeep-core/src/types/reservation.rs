use nanoid::nanoid;
use serde::{Deserialize, Serialize};

use super::{ClientTier, ReservationId, SaleId, SaleType, VehicleId};

/// A temporary, single-owner hold on a vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique reservation ID
    pub id: ReservationId,
    /// The held vehicle
    pub vehicle_id: VehicleId,
    /// Client holding the vehicle
    pub client_id: String,
    /// When the hold was taken (epoch millis)
    pub created_at: u64,
}

impl Reservation {
    pub fn new(id: ReservationId, vehicle_id: VehicleId, client_id: String, now: u64) -> Self {
        Self {
            id,
            vehicle_id,
            client_id,
            created_at: now,
        }
    }

    /// Creates a reservation with a freshly generated ID.
    pub fn generate(vehicle_id: VehicleId, client_id: &str, now: u64) -> Self {
        Self::new(
            format!("res_{}", nanoid!(12)),
            vehicle_id,
            client_id.to_string(),
            now,
        )
    }

    /// Age in milliseconds at `now`. Clock skew backwards counts as zero.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    /// A reservation whose age reached the TTL is eligible for release.
    pub fn is_expired(&self, now: u64, ttl_ms: u64) -> bool {
        self.age_ms(now) >= ttl_ms
    }

    /// When the hold lapses
    pub fn expires_at(&self, ttl_ms: u64) -> u64 {
        self.created_at.saturating_add(ttl_ms)
    }
}

/// An append-only record of a committed checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub vehicle_id: VehicleId,
    pub client_id: String,
    pub seller_id: String,
    pub sale_type: SaleType,
    /// Tier the price was computed for
    pub client_tier: ClientTier,
    pub final_price: f64,
    /// Commit time (epoch millis)
    pub timestamp: u64,
}

impl Sale {
    pub fn generate(
        reservation: &Reservation,
        seller_id: &str,
        sale_type: SaleType,
        client_tier: ClientTier,
        final_price: f64,
        now: u64,
    ) -> Self {
        Self {
            id: format!("sale_{}", nanoid!(12)),
            vehicle_id: reservation.vehicle_id,
            client_id: reservation.client_id.clone(),
            seller_id: seller_id.to_string(),
            sale_type,
            client_tier,
            final_price,
            timestamp: now,
        }
    }
}

/// Outcome of a batch checkout over every reservation a client holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSummary {
    /// Committed sales
    pub sales: Vec<Sale>,
    /// Items released instead of sold (expired or lost to a concurrent path)
    pub released: usize,
    /// Items skipped because a storage call failed; their rows are untouched
    pub failed: usize,
    /// Sum of committed final prices
    pub total_price: f64,
}
