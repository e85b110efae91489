//! Composition root: builds the stores once and wires every coordinator
//! component around them. The CLI server holds one `Arc<Dealership>`.

use std::sync::Arc;

use crate::checkout::CheckoutCoordinator;
use crate::clock::{Clock, SystemClock};
use crate::config::CoordinatorConfig;
use crate::error::{ReservationError, Result};
use crate::infrastructure::{ClientDirectory, InventoryStore, ReservationTable, SaleLedger};
use crate::infrastructure_in_memory::{InMemoryInventory, InMemoryReservationTable, InMemorySaleLedger};
use crate::locks::VehicleLocks;
use crate::reservation::ReservationManager;
use crate::sweeper::ExpirySweeper;
use crate::types::*;

/// Storage and collaborators a `Dealership` is assembled from.
pub struct DealershipParts {
    pub inventory: Arc<dyn InventoryStore>,
    pub reservations: Arc<dyn ReservationTable>,
    pub ledger: Arc<dyn SaleLedger>,
    pub directory: Option<Arc<dyn ClientDirectory>>,
    pub clock: Arc<dyn Clock>,
}

impl DealershipParts {
    pub fn in_memory() -> Self {
        Self {
            inventory: Arc::new(InMemoryInventory::new()),
            reservations: Arc::new(InMemoryReservationTable::new()),
            ledger: Arc::new(InMemorySaleLedger::new()),
            directory: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn ClientDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }
}

/// The reservation/checkout service for one inventory.
pub struct Dealership {
    config: CoordinatorConfig,
    inventory: Arc<dyn InventoryStore>,
    ledger: Arc<dyn SaleLedger>,
    reservations: Arc<ReservationManager>,
    checkout: CheckoutCoordinator,
    sweeper: Arc<ExpirySweeper>,
}

impl Dealership {
    pub fn from_parts(config: CoordinatorConfig, parts: DealershipParts) -> Self {
        let locks = Arc::new(VehicleLocks::new());
        let manager = Arc::new(ReservationManager::new(
            parts.inventory.clone(),
            parts.reservations,
            locks,
            parts.clock,
        ));
        let checkout = CheckoutCoordinator::new(
            manager.clone(),
            parts.ledger.clone(),
            parts.directory,
            config,
        );
        let sweeper = Arc::new(ExpirySweeper::new(manager.clone(), config));

        Self {
            config,
            inventory: parts.inventory,
            ledger: parts.ledger,
            reservations: manager,
            checkout,
            sweeper,
        }
    }

    /// Everything in memory, wall-clock time.
    pub fn in_memory(config: CoordinatorConfig) -> Self {
        Self::from_parts(config, DealershipParts::in_memory())
    }

    /// Everything in memory with an injected clock.
    pub fn with_clock(config: CoordinatorConfig, clock: Arc<dyn Clock>) -> Self {
        Self::from_parts(config, DealershipParts::in_memory().with_clock(clock))
    }

    /// Inventory, reservations and sales persisted in one SQLite database.
    #[cfg(feature = "sqlite")]
    pub fn with_sqlite(path: &str, config: CoordinatorConfig) -> std::result::Result<Self, crate::error::StoreError> {
        let store = Arc::new(crate::infrastructure_sqlite::SqliteStore::open(path)?);
        let parts = DealershipParts {
            inventory: store.clone(),
            reservations: store.clone(),
            ledger: store,
            directory: None,
            clock: Arc::new(SystemClock),
        };
        Ok(Self::from_parts(config, parts))
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    // ─── Reservations ───────────────────────────────────────────────────────

    pub fn reserve(&self, vehicle_id: VehicleId, client_id: &str) -> Result<Reservation> {
        self.reservations.reserve(vehicle_id, client_id)
    }

    pub fn cancel(&self, reservation_id: &str) -> Result<Reservation> {
        self.reservations.cancel(reservation_id)
    }

    pub fn reservation(&self, reservation_id: &str) -> Result<Reservation> {
        self.reservations.get(reservation_id)
    }

    pub fn list_by_client(&self, client_id: &str) -> Result<Vec<Reservation>> {
        self.reservations.list_by_client(client_id)
    }

    pub fn clear_client(&self, client_id: &str) -> Result<usize> {
        self.reservations.clear_client(client_id)
    }

    // ─── Checkout ───────────────────────────────────────────────────────────

    pub fn checkout(
        &self,
        reservation_id: &str,
        seller_id: &str,
        sale_type: SaleType,
        client_tier: Option<ClientTier>,
    ) -> Result<Sale> {
        self.checkout
            .checkout(reservation_id, seller_id, sale_type, client_tier)
    }

    pub fn checkout_all(
        &self,
        client_id: &str,
        seller_id: &str,
        sale_type: SaleType,
        client_tier: Option<ClientTier>,
    ) -> Result<CheckoutSummary> {
        self.checkout
            .checkout_all(client_id, seller_id, sale_type, client_tier)
    }

    // ─── Sweeper ────────────────────────────────────────────────────────────

    pub fn sweeper(&self) -> &Arc<ExpirySweeper> {
        &self.sweeper
    }

    pub fn sweep_once(&self) -> Result<usize> {
        Ok(self.sweeper.sweep_once()?)
    }

    // ─── Read side ──────────────────────────────────────────────────────────

    pub fn vehicle(&self, id: VehicleId) -> Result<Vehicle> {
        self.inventory
            .get(id)?
            .ok_or(ReservationError::VehicleNotFound(id))
    }

    pub fn vehicles(&self) -> Result<Vec<Vehicle>> {
        Ok(self.inventory.list()?)
    }

    pub fn available_vehicles(&self) -> Result<Vec<Vehicle>> {
        Ok(self
            .inventory
            .list()?
            .into_iter()
            .filter(Vehicle::is_available)
            .collect())
    }

    pub fn sales(&self) -> Result<Vec<Sale>> {
        Ok(self.ledger.list()?)
    }

    pub fn add_vehicle(&self, vehicle: NewVehicle) -> Result<Vehicle> {
        let vehicle = self.inventory.insert(vehicle)?;
        tracing::debug!(vehicle_id = vehicle.id, model = %vehicle.model, "Vehicle added");
        Ok(vehicle)
    }

    /// Stock an empty inventory with the demo lot. Does nothing when the
    /// inventory already has vehicles; returns how many were added.
    pub fn seed_demo_catalog(&self) -> Result<usize> {
        if !self.inventory.list()?.is_empty() {
            return Ok(0);
        }
        let lot = demo_catalog();
        let count = lot.len();
        for vehicle in lot {
            self.inventory.insert(vehicle)?;
        }
        tracing::info!(count, "Demo catalog seeded");
        Ok(count)
    }
}

/// The demo lot used by `--seed`.
pub fn demo_catalog() -> Vec<NewVehicle> {
    vec![
        NewVehicle::new(2023, 85_000.0, "Branco", "Honda Civic"),
        NewVehicle::new(2022, 120_000.0, "Preto", "Toyota Corolla"),
        NewVehicle::new(2024, 95_000.0, "Prata", "Hyundai HB20"),
        NewVehicle::new(2023, 110_000.0, "Azul", "Volkswagen Jetta"),
        NewVehicle::new(2022, 75_000.0, "Vermelho", "Chevrolet Onix"),
        NewVehicle::new(2023, 130_000.0, "Cinza", "Nissan Sentra"),
        NewVehicle::new(2024, 98_000.0, "Branco", "Ford Ka"),
        NewVehicle::new(2022, 140_000.0, "Preto", "Jeep Compass"),
    ]
}
