#[cfg(test)]
mod tests {
    use crate::client::{Dealership, DealershipParts};
    use crate::clock::{Clock, ManualClock};
    use crate::config::CoordinatorConfig;
    use crate::error::{StoreError, SweeperError};
    use crate::infrastructure::{InventoryStore, ReservationTable, StoreResult};
    use crate::infrastructure_in_memory::{InMemoryInventory, InMemoryReservationTable};
    use crate::locks::VehicleLocks;
    use crate::reservation::{ReleaseOutcome, ReservationManager};
    use crate::sweeper::SweeperHealth;
    use crate::types::{NewVehicle, Reservation, VehicleId, VehicleState};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn setup(ttl_secs: u64, interval_secs: u64) -> (Dealership, ManualClock) {
        let clock = ManualClock::new(10_000);
        let config = CoordinatorConfig::from_secs(ttl_secs, interval_secs).unwrap();
        let d = Dealership::with_clock(config, Arc::new(clock.clone()));
        for i in 0..4 {
            d.add_vehicle(NewVehicle::new(2020 + i, 50_000.0, "Cinza", format!("Model {}", i)))
                .unwrap();
        }
        (d, clock)
    }

    #[test]
    fn test_sweep_releases_only_expired() {
        let (d, clock) = setup(60, 60);
        d.reserve(1, "alice").unwrap();
        d.reserve(2, "bob").unwrap();
        clock.advance(Duration::from_secs(40));
        d.reserve(3, "carol").unwrap();
        clock.advance(Duration::from_secs(20));

        // 1 and 2 are exactly 60s old, 3 is 20s old
        assert_eq!(d.sweep_once().unwrap(), 2);
        assert_eq!(d.vehicle(1).unwrap().state, VehicleState::Available);
        assert_eq!(d.vehicle(2).unwrap().state, VehicleState::Available);
        assert_eq!(d.vehicle(3).unwrap().state, VehicleState::Reserved);
        assert_eq!(d.list_by_client("carol").unwrap().len(), 1);
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let (d, clock) = setup(60, 60);
        d.reserve(1, "alice").unwrap();
        d.reserve(2, "alice").unwrap();
        clock.advance(Duration::from_secs(61));

        assert_eq!(d.sweep_once().unwrap(), 2);
        assert_eq!(d.sweep_once().unwrap(), 0);
        assert_eq!(d.available_vehicles().unwrap().len(), 4);
    }

    #[test]
    fn test_sweep_on_empty_table() {
        let (d, _) = setup(60, 60);
        assert_eq!(d.sweep_once().unwrap(), 0);
        assert_eq!(d.sweeper().status().sweeps, 1);
    }

    #[test]
    fn test_status_reports_independent_interval_and_ttl() {
        let (d, clock) = setup(300, 15);
        d.reserve(1, "alice").unwrap();
        clock.advance(Duration::from_secs(301));
        d.sweep_once().unwrap();

        let status = d.sweeper().status();
        assert_eq!(status.interval_secs, 15);
        assert_eq!(status.ttl_secs, 300);
        assert!(!status.running);
        assert_eq!(status.health, SweeperHealth::Healthy);
        assert_eq!(status.last_released, 1);
        assert_eq!(status.total_released, 1);
        assert_eq!(status.last_sweep_at, Some(clock.now_ms()));
    }

    #[test]
    fn test_stale_snapshot_never_releases_newer_reservation() {
        let clock = ManualClock::new(0);
        let inventory = Arc::new(InMemoryInventory::new());
        inventory
            .insert(NewVehicle::new(2023, 1.0, "Azul", "Ka"))
            .unwrap();
        let manager = ReservationManager::new(
            inventory.clone(),
            Arc::new(InMemoryReservationTable::new()),
            Arc::new(VehicleLocks::new()),
            Arc::new(clock.clone()),
        );

        let stale = manager.reserve(1, "alice").unwrap();
        manager.cancel(&stale.id).unwrap();
        let fresh = manager.reserve(1, "bob").unwrap();

        assert_eq!(manager.release(&stale).unwrap(), ReleaseOutcome::AlreadyResolved);
        assert_eq!(inventory.get(1).unwrap().unwrap().state, VehicleState::Reserved);
        assert_eq!(manager.get(&fresh.id).unwrap(), fresh);
    }

    /// Reservation table whose deletes can be made to fail.
    struct FlakyTable {
        inner: InMemoryReservationTable,
        fail_removes: AtomicBool,
    }

    impl ReservationTable for FlakyTable {
        fn insert(&self, reservation: Reservation) -> StoreResult<bool> {
            self.inner.insert(reservation)
        }
        fn get(&self, id: &str) -> StoreResult<Option<Reservation>> {
            self.inner.get(id)
        }
        fn get_by_vehicle(&self, vehicle_id: VehicleId) -> StoreResult<Option<Reservation>> {
            self.inner.get_by_vehicle(vehicle_id)
        }
        fn remove(&self, id: &str) -> StoreResult<Option<Reservation>> {
            if self.fail_removes.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("connection refused".into()));
            }
            self.inner.remove(id)
        }
        fn list_by_client(&self, client_id: &str) -> StoreResult<Vec<Reservation>> {
            self.inner.list_by_client(client_id)
        }
        fn list_all(&self) -> StoreResult<Vec<Reservation>> {
            self.inner.list_all()
        }
    }

    #[test]
    fn test_store_failure_degrades_health_then_recovers() {
        let clock = ManualClock::new(0);
        let table = Arc::new(FlakyTable {
            inner: InMemoryReservationTable::new(),
            fail_removes: AtomicBool::new(false),
        });
        let mut parts = DealershipParts::in_memory().with_clock(Arc::new(clock.clone()));
        parts.reservations = table.clone() as Arc<dyn ReservationTable>;
        let d = Dealership::from_parts(CoordinatorConfig::from_secs(60, 60).unwrap(), parts);
        d.add_vehicle(NewVehicle::new(2023, 1.0, "Azul", "Ka")).unwrap();

        d.reserve(1, "alice").unwrap();
        clock.advance(Duration::from_secs(61));
        table.fail_removes.store(true, Ordering::SeqCst);

        // The scan itself completes; the failed row is reported, not fatal
        assert_eq!(d.sweep_once().unwrap(), 0);
        assert!(matches!(d.sweeper().health(), SweeperHealth::Degraded { .. }));

        table.fail_removes.store(false, Ordering::SeqCst);
        // The vehicle went back to Available before the failed delete; the
        // orphan row is cleaned up without counting as a second release.
        assert_eq!(d.sweep_once().unwrap(), 0);
        assert_eq!(d.sweeper().health(), SweeperHealth::Healthy);
        assert!(d.list_by_client("alice").unwrap().is_empty());
        assert_eq!(d.vehicle(1).unwrap().state, VehicleState::Available);
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let (d, _) = setup(60, 60);
        assert_eq!(d.sweeper().start(), Err(SweeperError::NoRuntime));
        assert!(!d.sweeper().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_loop_releases_on_tick() {
        let (d, clock) = setup(60, 30);
        d.reserve(1, "alice").unwrap();
        clock.advance(Duration::from_secs(61));

        d.sweeper().start().unwrap();
        // Starting again is a no-op
        d.sweeper().start().unwrap();
        assert!(d.sweeper().is_running());

        // Nothing happens before the first interval elapses
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(d.vehicle(1).unwrap().state, VehicleState::Reserved);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(d.vehicle(1).unwrap().state, VehicleState::Available);
        assert_eq!(d.sweeper().status().sweeps, 1);

        d.sweeper().stop().await;
        assert!(!d.sweeper().is_running());
    }

    /// Holds `list_all` until the test lets it go.
    struct GatedTable {
        inner: InMemoryReservationTable,
        entered: parking_lot::Mutex<mpsc::Sender<()>>,
        release: parking_lot::Mutex<mpsc::Receiver<()>>,
    }

    impl ReservationTable for GatedTable {
        fn insert(&self, reservation: Reservation) -> StoreResult<bool> {
            self.inner.insert(reservation)
        }
        fn get(&self, id: &str) -> StoreResult<Option<Reservation>> {
            self.inner.get(id)
        }
        fn get_by_vehicle(&self, vehicle_id: VehicleId) -> StoreResult<Option<Reservation>> {
            self.inner.get_by_vehicle(vehicle_id)
        }
        fn remove(&self, id: &str) -> StoreResult<Option<Reservation>> {
            self.inner.remove(id)
        }
        fn list_by_client(&self, client_id: &str) -> StoreResult<Vec<Reservation>> {
            self.inner.list_by_client(client_id)
        }
        fn list_all(&self) -> StoreResult<Vec<Reservation>> {
            let _ = self.entered.lock().send(());
            let _ = self.release.lock().recv_timeout(Duration::from_secs(10));
            self.inner.list_all()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_slow_store_does_not_stall_runtime_worker() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let mut parts = DealershipParts::in_memory();
        parts.reservations = Arc::new(GatedTable {
            inner: InMemoryReservationTable::new(),
            entered: parking_lot::Mutex::new(entered_tx),
            release: parking_lot::Mutex::new(release_rx),
        });
        let d = Dealership::from_parts(CoordinatorConfig::from_secs(60, 1).unwrap(), parts);

        d.sweeper().start().unwrap();
        tokio::task::spawn_blocking(move || entered_rx.recv_timeout(Duration::from_secs(10)))
            .await
            .unwrap()
            .unwrap();

        // The sweep is parked inside the store; the only worker must still run tasks
        let answer = tokio::time::timeout(Duration::from_secs(2), tokio::spawn(async { 42 }))
            .await
            .expect("worker thread is blocked by the sweep")
            .unwrap();
        assert_eq!(answer, 42);

        release_tx.send(()).unwrap();
        drop(release_tx);
        d.sweeper().stop().await;
        assert!(d.sweeper().status().sweeps >= 1);
    }
}
