//! Converts a live reservation into a sale.

use std::sync::Arc;

use crate::config::CoordinatorConfig;
use crate::error::{ReservationError, Result};
use crate::infrastructure::{ClientDirectory, SaleLedger};
use crate::pricing::PricingPolicy;
use crate::reservation::{ReleaseOutcome, ReservationManager};
use crate::types::{CheckoutSummary, ClientTier, Sale, SaleType, VehicleState};

pub struct CheckoutCoordinator {
    manager: Arc<ReservationManager>,
    ledger: Arc<dyn SaleLedger>,
    directory: Option<Arc<dyn ClientDirectory>>,
    config: CoordinatorConfig,
}

impl CheckoutCoordinator {
    pub fn new(
        manager: Arc<ReservationManager>,
        ledger: Arc<dyn SaleLedger>,
        directory: Option<Arc<dyn ClientDirectory>>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            manager,
            ledger,
            directory,
            config,
        }
    }

    /// Finalize one reservation.
    ///
    /// `client_tier = None` falls back to the client directory, then to
    /// `Standard`.
    pub fn checkout(
        &self,
        reservation_id: &str,
        seller_id: &str,
        sale_type: SaleType,
        client_tier: Option<ClientTier>,
    ) -> Result<Sale> {
        let reservation = self.manager.get(reservation_id)?;
        let vehicle_id = reservation.vehicle_id;

        let lock = self.manager.locks().for_vehicle(vehicle_id);
        let _guard = lock.lock();

        // Re-read under the guard: a cancel, sweep or concurrent checkout may
        // have resolved it between the lookup and here.
        let reservation = self
            .manager
            .reservations()
            .get(reservation_id)?
            .ok_or_else(|| ReservationError::ReservationNotFound(reservation_id.to_string()))?;

        let now = self.manager.clock().now_ms();
        if reservation.is_expired(now, self.config.ttl_ms()) {
            let outcome = self.manager.release_locked(&reservation)?;
            tracing::info!(
                reservation_id,
                vehicle_id,
                age_ms = reservation.age_ms(now),
                released = outcome == ReleaseOutcome::Released,
                "Checkout on expired reservation"
            );
            return Err(ReservationError::ReservationExpired(reservation_id.to_string()));
        }

        let Some(vehicle) = self.manager.inventory().get(vehicle_id)? else {
            self.manager.reservations().remove(reservation_id)?;
            return Err(ReservationError::VehicleNotFound(vehicle_id));
        };

        if let Err(lost) = self
            .manager
            .transition(vehicle_id, VehicleState::Reserved, VehicleState::Sold)?
        {
            // A live row over a vehicle that is not Reserved is an orphan
            self.manager.reservations().remove(reservation_id)?;
            tracing::warn!(reservation_id, vehicle_id, "Reserved vehicle moved under a live reservation");
            return Err(lost.into_unavailable());
        }

        let tier = self.resolve_tier(&reservation.client_id, client_tier);
        let final_price = PricingPolicy::final_price(&vehicle, tier);
        let sale = Sale::generate(&reservation, seller_id, sale_type, tier, final_price, now);

        let sale = match self.ledger.record(sale) {
            Ok(sale) => sale,
            Err(e) => {
                self.manager
                    .rollback(vehicle_id, VehicleState::Sold, VehicleState::Reserved);
                return Err(e.into());
            }
        };
        self.manager.reservations().remove(reservation_id)?;

        tracing::info!(
            sale_id = %sale.id,
            reservation_id,
            vehicle_id,
            client_id = %sale.client_id,
            seller_id,
            final_price = sale.final_price,
            "Vehicle sold"
        );
        Ok(sale)
    }

    /// Check out every reservation `client_id` holds. Each item is its own
    /// transaction; partial success is a normal outcome.
    pub fn checkout_all(
        &self,
        client_id: &str,
        seller_id: &str,
        sale_type: SaleType,
        client_tier: Option<ClientTier>,
    ) -> Result<CheckoutSummary> {
        let tier = self.resolve_tier(client_id, client_tier);
        let mut summary = CheckoutSummary::default();

        for reservation in self.manager.list_by_client(client_id)? {
            match self.checkout(&reservation.id, seller_id, sale_type, Some(tier)) {
                Ok(sale) => {
                    summary.total_price += sale.final_price;
                    summary.sales.push(sale);
                }
                Err(ReservationError::ReservationExpired(_))
                | Err(ReservationError::VehicleUnavailable(_))
                | Err(ReservationError::VehicleNotFound(_)) => {
                    summary.released += 1;
                }
                // Resolved elsewhere while we iterated
                Err(ReservationError::ReservationNotFound(_)) => {}
                Err(e) => {
                    tracing::warn!(
                        reservation_id = %reservation.id,
                        client_id,
                        error = %e,
                        "Batch checkout item failed"
                    );
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            client_id,
            sold = summary.sales.len(),
            released = summary.released,
            failed = summary.failed,
            total_price = summary.total_price,
            "Batch checkout finished"
        );
        Ok(summary)
    }

    pub fn resolve_tier(&self, client_id: &str, requested: Option<ClientTier>) -> ClientTier {
        requested
            .or_else(|| self.directory.as_ref().and_then(|d| d.tier_for(client_id)))
            .unwrap_or_default()
    }
}
