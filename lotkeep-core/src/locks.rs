use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::VehicleId;

/// Per-vehicle guards pairing a state transition with its reservation-row
/// mutation. Guards for different vehicles never contend.
#[derive(Default)]
pub struct VehicleLocks {
    locks: RwLock<HashMap<VehicleId, Arc<Mutex<()>>>>,
}

impl VehicleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The guard for `vehicle_id`, created on first use.
    pub fn for_vehicle(&self, vehicle_id: VehicleId) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().get(&vehicle_id) {
            return lock.clone();
        }
        self.locks
            .write()
            .entry(vehicle_id)
            .or_default()
            .clone()
    }

    /// Number of vehicles that have been guarded at least once
    pub fn len(&self) -> usize {
        self.locks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.read().is_empty()
    }
}
