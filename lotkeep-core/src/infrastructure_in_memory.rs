use crate::infrastructure::{
    CatalogVehicle, ClientDirectory, InventoryStore, ReservationTable, SaleLedger, StoreResult,
    VehicleCatalog,
};
use crate::error::StoreError;
use crate::types::{ClientTier, NewVehicle, Reservation, ReservationId, Sale, Vehicle, VehicleId, VehicleState};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const RESERVATION_SHARDS: usize = 16;

// ─── Inventory ──────────────────────────────────────────────────────────────

pub struct InMemoryInventory {
    // Structural map; each vehicle carries its own lock for transitions
    vehicles: RwLock<BTreeMap<VehicleId, Arc<Mutex<Vehicle>>>>,
    next_id: AtomicU64,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self {
            vehicles: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn slot(&self, id: VehicleId) -> Option<Arc<Mutex<Vehicle>>> {
        self.vehicles.read().get(&id).cloned()
    }
}

impl Default for InMemoryInventory {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryStore for InMemoryInventory {
    fn get(&self, id: VehicleId) -> StoreResult<Option<Vehicle>> {
        Ok(self.slot(id).map(|v| v.lock().clone()))
    }

    fn try_set_state(
        &self,
        id: VehicleId,
        expected: VehicleState,
        new: VehicleState,
    ) -> StoreResult<bool> {
        let Some(slot) = self.slot(id) else {
            return Ok(false);
        };
        let mut vehicle = slot.lock();
        if vehicle.state != expected {
            return Ok(false);
        }
        vehicle.state = new;
        Ok(true)
    }

    fn list(&self) -> StoreResult<Vec<Vehicle>> {
        Ok(self
            .vehicles
            .read()
            .values()
            .map(|v| v.lock().clone())
            .collect())
    }

    fn insert(&self, vehicle: NewVehicle) -> StoreResult<Vehicle> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let vehicle = Vehicle::from_new(id, vehicle, VehicleState::Available);
        self.vehicles
            .write()
            .insert(id, Arc::new(Mutex::new(vehicle.clone())));
        Ok(vehicle)
    }
}

// ─── Reservations ───────────────────────────────────────────────────────────

/// Reservation rows sharded by vehicle id, so inserts and deletes on
/// different vehicles rarely touch the same lock.
pub struct InMemoryReservationTable {
    shards: Vec<RwLock<HashMap<VehicleId, Reservation>>>,
    // Reservation ID -> vehicle ID
    index: RwLock<HashMap<ReservationId, VehicleId>>,
}

impl InMemoryReservationTable {
    pub fn new() -> Self {
        Self {
            shards: (0..RESERVATION_SHARDS)
                .map(|_| RwLock::new(HashMap::new()))
                .collect(),
            index: RwLock::new(HashMap::new()),
        }
    }

    fn shard(&self, vehicle_id: VehicleId) -> &RwLock<HashMap<VehicleId, Reservation>> {
        &self.shards[(vehicle_id as usize) % RESERVATION_SHARDS]
    }
}

impl Default for InMemoryReservationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ReservationTable for InMemoryReservationTable {
    fn insert(&self, reservation: Reservation) -> StoreResult<bool> {
        // Lock order is always shard, then index
        let mut shard = self.shard(reservation.vehicle_id).write();
        if shard.contains_key(&reservation.vehicle_id) {
            return Ok(false);
        }
        self.index
            .write()
            .insert(reservation.id.clone(), reservation.vehicle_id);
        shard.insert(reservation.vehicle_id, reservation);
        Ok(true)
    }

    fn get(&self, id: &str) -> StoreResult<Option<Reservation>> {
        let Some(vehicle_id) = self.index.read().get(id).copied() else {
            return Ok(None);
        };
        Ok(self
            .shard(vehicle_id)
            .read()
            .get(&vehicle_id)
            .filter(|r| r.id == id)
            .cloned())
    }

    fn get_by_vehicle(&self, vehicle_id: VehicleId) -> StoreResult<Option<Reservation>> {
        Ok(self.shard(vehicle_id).read().get(&vehicle_id).cloned())
    }

    fn remove(&self, id: &str) -> StoreResult<Option<Reservation>> {
        let Some(vehicle_id) = self.index.read().get(id).copied() else {
            return Ok(None);
        };
        let mut shard = self.shard(vehicle_id).write();
        match shard.get(&vehicle_id) {
            Some(existing) if existing.id == id => {
                let removed = shard.remove(&vehicle_id);
                self.index.write().remove(id);
                Ok(removed)
            }
            _ => Ok(None),
        }
    }

    fn list_by_client(&self, client_id: &str) -> StoreResult<Vec<Reservation>> {
        Ok(self
            .shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .values()
                    .filter(|r| r.client_id == client_id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect())
    }

    fn list_all(&self) -> StoreResult<Vec<Reservation>> {
        Ok(self
            .shards
            .iter()
            .flat_map(|shard| shard.read().values().cloned().collect::<Vec<_>>())
            .collect())
    }
}

// ─── Sales ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemorySaleLedger {
    sales: RwLock<Vec<Sale>>,
}

impl InMemorySaleLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaleLedger for InMemorySaleLedger {
    fn record(&self, sale: Sale) -> StoreResult<Sale> {
        self.sales.write().push(sale.clone());
        Ok(sale)
    }

    fn list(&self) -> StoreResult<Vec<Sale>> {
        Ok(self.sales.read().clone())
    }

    fn count_for_vehicle(&self, vehicle_id: VehicleId) -> StoreResult<usize> {
        Ok(self
            .sales
            .read()
            .iter()
            .filter(|s| s.vehicle_id == vehicle_id)
            .count())
    }
}

// ─── Boolean catalog ────────────────────────────────────────────────────────

/// A catalog that, like the legacy schema, only stores `available: bool`.
pub struct InMemoryCatalog {
    rows: RwLock<BTreeMap<VehicleId, CatalogVehicle>>,
    next_id: AtomicU64,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl VehicleCatalog for InMemoryCatalog {
    fn get_vehicle(&self, id: VehicleId) -> StoreResult<Option<CatalogVehicle>> {
        Ok(self.rows.read().get(&id).cloned())
    }

    fn set_availability(&self, id: VehicleId, available: bool) -> StoreResult<CatalogVehicle> {
        let mut rows = self.rows.write();
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::Backend(format!("vehicle {} missing from catalog", id)))?;
        row.available = available;
        Ok(row.clone())
    }

    fn list_vehicles(&self) -> StoreResult<Vec<CatalogVehicle>> {
        Ok(self.rows.read().values().cloned().collect())
    }

    fn add_vehicle(&self, vehicle: NewVehicle) -> StoreResult<CatalogVehicle> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = CatalogVehicle {
            id,
            attributes: vehicle,
            available: true,
        };
        self.rows.write().insert(id, row.clone());
        Ok(row)
    }
}

// ─── Client tiers ───────────────────────────────────────────────────────────

/// Fixed client-to-tier mapping.
#[derive(Default)]
pub struct StaticClientDirectory {
    tiers: HashMap<String, ClientTier>,
}

impl StaticClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tier(mut self, client_id: impl Into<String>, tier: ClientTier) -> Self {
        self.tiers.insert(client_id.into(), tier);
        self
    }
}

impl ClientDirectory for StaticClientDirectory {
    fn tier_for(&self, client_id: &str) -> Option<ClientTier> {
        self.tiers.get(client_id).copied()
    }
}
