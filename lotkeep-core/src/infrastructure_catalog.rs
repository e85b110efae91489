//! `InventoryStore` over a catalog that only records `available: bool`.
//!
//! The boolean cannot tell `Reserved` from `Sold`, so the adapter keeps the
//! three-state value in memory and mirrors `Available <=> true` to the catalog
//! inside the same per-vehicle critical section. Vehicles first seen as
//! unavailable are treated as `Sold`: no reservation can exist for them yet.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use crate::infrastructure::{CatalogVehicle, InventoryStore, StoreResult, VehicleCatalog};
use crate::types::{NewVehicle, Vehicle, VehicleId, VehicleState};

pub struct CatalogInventory<C: VehicleCatalog> {
    catalog: C,
    states: RwLock<HashMap<VehicleId, Arc<Mutex<VehicleState>>>>,
}

impl<C: VehicleCatalog> CatalogInventory<C> {
    pub fn new(catalog: C) -> Self {
        Self {
            catalog,
            states: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    fn initial_state(row: &CatalogVehicle) -> VehicleState {
        if row.available {
            VehicleState::Available
        } else {
            VehicleState::Sold
        }
    }

    fn slot(&self, row: &CatalogVehicle) -> Arc<Mutex<VehicleState>> {
        if let Some(slot) = self.states.read().get(&row.id) {
            return slot.clone();
        }
        self.states
            .write()
            .entry(row.id)
            .or_insert_with(|| Arc::new(Mutex::new(Self::initial_state(row))))
            .clone()
    }

    fn to_vehicle(&self, row: CatalogVehicle) -> Vehicle {
        let state = *self.slot(&row).lock();
        Vehicle::from_new(row.id, row.attributes, state)
    }
}

impl<C: VehicleCatalog> InventoryStore for CatalogInventory<C> {
    fn get(&self, id: VehicleId) -> StoreResult<Option<Vehicle>> {
        Ok(self.catalog.get_vehicle(id)?.map(|row| self.to_vehicle(row)))
    }

    fn try_set_state(
        &self,
        id: VehicleId,
        expected: VehicleState,
        new: VehicleState,
    ) -> StoreResult<bool> {
        let Some(row) = self.catalog.get_vehicle(id)? else {
            return Ok(false);
        };
        let slot = self.slot(&row);
        let mut state = slot.lock();
        if *state != expected {
            return Ok(false);
        }
        let available = new == VehicleState::Available;
        if available != (expected == VehicleState::Available) {
            self.catalog.set_availability(id, available)?;
        }
        *state = new;
        Ok(true)
    }

    fn list(&self) -> StoreResult<Vec<Vehicle>> {
        Ok(self
            .catalog
            .list_vehicles()?
            .into_iter()
            .map(|row| self.to_vehicle(row))
            .collect())
    }

    fn insert(&self, vehicle: NewVehicle) -> StoreResult<Vehicle> {
        let row = self.catalog.add_vehicle(vehicle)?;
        Ok(self.to_vehicle(row))
    }
}
