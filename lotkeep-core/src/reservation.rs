//! Reservation lifecycle: add-to-cart, cancel, and the shared release path
//! used by the expiry sweeper and by checkout of a stale hold.

use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{ReservationError, Result, StoreError, TransitionLost};
use crate::infrastructure::{InventoryStore, ReservationTable};
use crate::locks::VehicleLocks;
use crate::types::{Reservation, VehicleId, VehicleState};

/// How a release attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// This call moved the vehicle back to `Available` and deleted the row
    Released,
    /// Another path (cancel, checkout, a previous sweep) got there first
    AlreadyResolved,
}

pub struct ReservationManager {
    inventory: Arc<dyn InventoryStore>,
    reservations: Arc<dyn ReservationTable>,
    locks: Arc<VehicleLocks>,
    clock: Arc<dyn Clock>,
}

impl ReservationManager {
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        reservations: Arc<dyn ReservationTable>,
        locks: Arc<VehicleLocks>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inventory,
            reservations,
            locks,
            clock,
        }
    }

    /// Hold `vehicle_id` for `client_id`.
    pub fn reserve(&self, vehicle_id: VehicleId, client_id: &str) -> Result<Reservation> {
        // Vehicles are never removed, so an unknown id can be rejected before
        // a guard is allocated for it.
        if self.inventory.get(vehicle_id)?.is_none() {
            return Err(ReservationError::VehicleNotFound(vehicle_id));
        }

        let lock = self.locks.for_vehicle(vehicle_id);
        let _guard = lock.lock();

        // Ownership is checked ahead of availability: a vehicle this client
        // holds is always Reserved, so the other order would never report it.
        if let Some(existing) = self.reservations.get_by_vehicle(vehicle_id)? {
            if existing.client_id == client_id {
                return Err(ReservationError::AlreadyReservedByClient {
                    client_id: client_id.to_string(),
                    vehicle_id,
                });
            }
        }

        let vehicle = self
            .inventory
            .get(vehicle_id)?
            .ok_or(ReservationError::VehicleNotFound(vehicle_id))?;
        if !vehicle.is_available() {
            return Err(ReservationError::VehicleUnavailable(vehicle_id));
        }

        self.transition(vehicle_id, VehicleState::Available, VehicleState::Reserved)?
            .map_err(TransitionLost::into_unavailable)?;

        let reservation = Reservation::generate(vehicle_id, client_id, self.clock.now_ms());
        match self.reservations.insert(reservation.clone()) {
            Ok(true) => {
                tracing::info!(
                    reservation_id = %reservation.id,
                    vehicle_id,
                    client_id,
                    "Vehicle reserved"
                );
                Ok(reservation)
            }
            Ok(false) => {
                // A stray row exists for a vehicle that was Available; leave it
                // for cancel or the sweeper and undo our transition.
                self.rollback(vehicle_id, VehicleState::Reserved, VehicleState::Available);
                tracing::warn!(vehicle_id, "Reservation row already present for available vehicle");
                Err(ReservationError::VehicleUnavailable(vehicle_id))
            }
            Err(e) => {
                self.rollback(vehicle_id, VehicleState::Reserved, VehicleState::Available);
                Err(e.into())
            }
        }
    }

    /// Delete a reservation and make its vehicle available again.
    pub fn cancel(&self, reservation_id: &str) -> Result<Reservation> {
        let reservation = self.get(reservation_id)?;
        let lock = self.locks.for_vehicle(reservation.vehicle_id);
        let _guard = lock.lock();

        let removed = self
            .reservations
            .remove(reservation_id)?
            .ok_or_else(|| ReservationError::ReservationNotFound(reservation_id.to_string()))?;

        if !self
            .inventory
            .try_set_state(removed.vehicle_id, VehicleState::Reserved, VehicleState::Available)?
        {
            tracing::debug!(
                vehicle_id = removed.vehicle_id,
                "Cancelled reservation whose vehicle was no longer reserved"
            );
        }

        tracing::info!(
            reservation_id,
            vehicle_id = removed.vehicle_id,
            client_id = %removed.client_id,
            "Reservation cancelled"
        );
        Ok(removed)
    }

    pub fn get(&self, reservation_id: &str) -> Result<Reservation> {
        self.reservations
            .get(reservation_id)?
            .ok_or_else(|| ReservationError::ReservationNotFound(reservation_id.to_string()))
    }

    pub fn list_by_client(&self, client_id: &str) -> Result<Vec<Reservation>> {
        Ok(self.reservations.list_by_client(client_id)?)
    }

    /// Every active reservation
    pub fn list_all(&self) -> Result<Vec<Reservation>> {
        Ok(self.reservations.list_all()?)
    }

    /// Cancel everything `client_id` holds. Each item is resolved on its own;
    /// items resolved concurrently by another path are skipped.
    pub fn clear_client(&self, client_id: &str) -> Result<usize> {
        let mut cleared = 0;
        for reservation in self.reservations.list_by_client(client_id)? {
            match self.cancel(&reservation.id) {
                Ok(_) => cleared += 1,
                Err(ReservationError::ReservationNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(cleared)
    }

    /// Release a reservation if its row is still the live hold on the vehicle.
    ///
    /// Runs under the vehicle guard and re-reads the row, so a stale snapshot
    /// can never release a newer reservation on the same vehicle.
    pub fn release(&self, reservation: &Reservation) -> std::result::Result<ReleaseOutcome, StoreError> {
        let lock = self.locks.for_vehicle(reservation.vehicle_id);
        let _guard = lock.lock();
        self.release_locked(reservation)
    }

    /// `release` for callers already holding the vehicle guard.
    pub(crate) fn release_locked(
        &self,
        reservation: &Reservation,
    ) -> std::result::Result<ReleaseOutcome, StoreError> {
        match self.reservations.get(&reservation.id)? {
            Some(live) if live.vehicle_id == reservation.vehicle_id => {}
            _ => return Ok(ReleaseOutcome::AlreadyResolved),
        }

        let released = self.inventory.try_set_state(
            reservation.vehicle_id,
            VehicleState::Reserved,
            VehicleState::Available,
        )?;
        // The row goes either way: a row whose vehicle is not Reserved is an orphan
        self.reservations.remove(&reservation.id)?;

        if released {
            Ok(ReleaseOutcome::Released)
        } else {
            Ok(ReleaseOutcome::AlreadyResolved)
        }
    }

    pub(crate) fn locks(&self) -> &VehicleLocks {
        &self.locks
    }

    pub(crate) fn inventory(&self) -> &dyn InventoryStore {
        self.inventory.as_ref()
    }

    pub(crate) fn reservations(&self) -> &dyn ReservationTable {
        self.reservations.as_ref()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Compare-and-set with the lost-race case kept apart from store failures.
    pub(crate) fn transition(
        &self,
        vehicle_id: VehicleId,
        expected: VehicleState,
        new: VehicleState,
    ) -> std::result::Result<std::result::Result<(), TransitionLost>, StoreError> {
        if self.inventory.try_set_state(vehicle_id, expected, new)? {
            Ok(Ok(()))
        } else {
            Ok(Err(TransitionLost { vehicle_id }))
        }
    }

    pub(crate) fn rollback(&self, vehicle_id: VehicleId, from: VehicleState, to: VehicleState) {
        match self.inventory.try_set_state(vehicle_id, from, to) {
            Ok(true) => {}
            Ok(false) => tracing::warn!(vehicle_id, %from, %to, "Rollback found vehicle in unexpected state"),
            Err(e) => tracing::error!(vehicle_id, error = %e, "Rollback failed"),
        }
    }
}
