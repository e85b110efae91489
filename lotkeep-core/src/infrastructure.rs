use crate::error::StoreError;
use crate::types::{ClientTier, NewVehicle, Reservation, Sale, Vehicle, VehicleId, VehicleState};

pub type StoreResult<T> = Result<T, StoreError>;

/// Exclusive owner of each vehicle's availability state.
pub trait InventoryStore: Send + Sync {
    /// Fetch a vehicle snapshot
    fn get(&self, id: VehicleId) -> StoreResult<Option<Vehicle>>;

    /// Atomically move `id` from `expected` to `new`.
    /// Returns false, with no side effect, when the current state differs
    /// or the vehicle is unknown.
    fn try_set_state(
        &self,
        id: VehicleId,
        expected: VehicleState,
        new: VehicleState,
    ) -> StoreResult<bool>;

    /// Every vehicle, in id order
    fn list(&self) -> StoreResult<Vec<Vehicle>>;

    /// Add a vehicle to the catalog as `Available`
    fn insert(&self, vehicle: NewVehicle) -> StoreResult<Vehicle>;
}

/// Active reservations keyed by vehicle, at most one per vehicle.
pub trait ReservationTable: Send + Sync {
    /// Insert a row. Returns false when the vehicle already holds one.
    fn insert(&self, reservation: Reservation) -> StoreResult<bool>;

    fn get(&self, id: &str) -> StoreResult<Option<Reservation>>;

    fn get_by_vehicle(&self, vehicle_id: VehicleId) -> StoreResult<Option<Reservation>>;

    /// Delete a row, returning it if it was still present
    fn remove(&self, id: &str) -> StoreResult<Option<Reservation>>;

    fn list_by_client(&self, client_id: &str) -> StoreResult<Vec<Reservation>>;

    fn list_all(&self) -> StoreResult<Vec<Reservation>>;
}

/// Append-only sale history.
pub trait SaleLedger: Send + Sync {
    fn record(&self, sale: Sale) -> StoreResult<Sale>;

    fn list(&self) -> StoreResult<Vec<Sale>>;

    fn count_for_vehicle(&self, vehicle_id: VehicleId) -> StoreResult<usize>;
}

/// A catalog row as seen by a backend that only tracks a boolean flag.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogVehicle {
    pub id: VehicleId,
    pub attributes: NewVehicle,
    pub available: bool,
}

/// Catalog that only knows a boolean availability flag.
/// Wrapped by [`crate::infrastructure_catalog::CatalogInventory`] to serve as an `InventoryStore`.
pub trait VehicleCatalog: Send + Sync {
    fn get_vehicle(&self, id: VehicleId) -> StoreResult<Option<CatalogVehicle>>;

    fn set_availability(&self, id: VehicleId, available: bool) -> StoreResult<CatalogVehicle>;

    fn list_vehicles(&self) -> StoreResult<Vec<CatalogVehicle>>;

    fn add_vehicle(&self, vehicle: NewVehicle) -> StoreResult<CatalogVehicle>;
}

/// Resolves pricing tiers for clients. Optional collaborator.
pub trait ClientDirectory: Send + Sync {
    fn tier_for(&self, client_id: &str) -> Option<ClientTier>;
}
