#[cfg(test)]
mod tests {
    use crate::infrastructure::{InventoryStore, ReservationTable, SaleLedger, VehicleCatalog};
    use crate::infrastructure_catalog::CatalogInventory;
    use crate::infrastructure_in_memory::{
        InMemoryCatalog, InMemoryInventory, InMemoryReservationTable, InMemorySaleLedger,
    };
    use crate::types::{ClientTier, NewVehicle, Reservation, Sale, SaleType, VehicleState};

    fn civic() -> NewVehicle {
        NewVehicle::new(2023, 85_000.0, "Branco", "Honda Civic")
    }

    #[test]
    fn test_in_memory_inventory_compare_and_set() {
        let store = InMemoryInventory::new();
        let vehicle = store.insert(civic()).unwrap();
        assert_eq!(vehicle.id, 1);
        assert_eq!(vehicle.state, VehicleState::Available);

        assert!(store
            .try_set_state(1, VehicleState::Available, VehicleState::Reserved)
            .unwrap());
        // Expected state no longer matches: no side effect
        assert!(!store
            .try_set_state(1, VehicleState::Available, VehicleState::Sold)
            .unwrap());
        assert_eq!(store.get(1).unwrap().unwrap().state, VehicleState::Reserved);

        assert!(!store
            .try_set_state(42, VehicleState::Available, VehicleState::Reserved)
            .unwrap());
        assert!(store.get(42).unwrap().is_none());
    }

    #[test]
    fn test_in_memory_inventory_lists_in_id_order() {
        let store = InMemoryInventory::new();
        for _ in 0..3 {
            store.insert(civic()).unwrap();
        }
        let ids: Vec<_> = store.list().unwrap().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_reservation_table_one_row_per_vehicle() {
        let table = InMemoryReservationTable::new();
        let first = Reservation::new("res_a".into(), 7, "alice".into(), 1000);
        let second = Reservation::new("res_b".into(), 7, "bob".into(), 1001);

        assert!(table.insert(first.clone()).unwrap());
        assert!(!table.insert(second).unwrap());

        assert_eq!(table.get("res_a").unwrap(), Some(first.clone()));
        assert_eq!(table.get("res_b").unwrap(), None);
        assert_eq!(table.get_by_vehicle(7).unwrap(), Some(first));
    }

    #[test]
    fn test_reservation_table_remove() {
        let table = InMemoryReservationTable::new();
        table
            .insert(Reservation::new("res_a".into(), 3, "alice".into(), 1000))
            .unwrap();
        table
            .insert(Reservation::new("res_b".into(), 19, "alice".into(), 1000))
            .unwrap();
        table
            .insert(Reservation::new("res_c".into(), 4, "bob".into(), 1000))
            .unwrap();

        assert_eq!(table.list_all().unwrap().len(), 3);
        assert_eq!(table.list_by_client("alice").unwrap().len(), 2);

        assert!(table.remove("res_a").unwrap().is_some());
        assert!(table.remove("res_a").unwrap().is_none());
        assert!(table.get_by_vehicle(3).unwrap().is_none());
        assert_eq!(table.list_by_client("alice").unwrap().len(), 1);

        // The vehicle slot is free again
        assert!(table
            .insert(Reservation::new("res_d".into(), 3, "carol".into(), 2000))
            .unwrap());
    }

    #[test]
    fn test_sale_ledger_append_only() {
        let ledger = InMemorySaleLedger::new();
        let reservation = Reservation::new("res_a".into(), 5, "alice".into(), 1000);
        let sale = Sale::generate(&reservation, "seller", SaleType::Sale, ClientTier::Vip, 1.0, 2000);

        let recorded = ledger.record(sale.clone()).unwrap();
        assert_eq!(recorded, sale);
        assert_eq!(ledger.list().unwrap().len(), 1);
        assert_eq!(ledger.count_for_vehicle(5).unwrap(), 1);
        assert_eq!(ledger.count_for_vehicle(6).unwrap(), 0);
    }

    #[test]
    fn test_catalog_inventory_mirrors_boolean() {
        let inventory = CatalogInventory::new(InMemoryCatalog::new());
        let vehicle = inventory.insert(civic()).unwrap();
        assert_eq!(vehicle.state, VehicleState::Available);

        assert!(inventory
            .try_set_state(vehicle.id, VehicleState::Available, VehicleState::Reserved)
            .unwrap());
        assert!(!inventory.catalog().get_vehicle(vehicle.id).unwrap().unwrap().available);
        assert_eq!(inventory.get(vehicle.id).unwrap().unwrap().state, VehicleState::Reserved);

        // Reserved -> Sold keeps the flag false; only the overlay changes
        assert!(inventory
            .try_set_state(vehicle.id, VehicleState::Reserved, VehicleState::Sold)
            .unwrap());
        assert!(!inventory.catalog().get_vehicle(vehicle.id).unwrap().unwrap().available);
        assert!(!inventory
            .try_set_state(vehicle.id, VehicleState::Reserved, VehicleState::Available)
            .unwrap());
        assert_eq!(inventory.get(vehicle.id).unwrap().unwrap().state, VehicleState::Sold);
    }

    #[test]
    fn test_catalog_inventory_unavailable_rows_start_sold() {
        let catalog = InMemoryCatalog::new();
        let row = catalog.add_vehicle(civic()).unwrap();
        catalog.set_availability(row.id, false).unwrap();

        let inventory = CatalogInventory::new(catalog);
        assert_eq!(inventory.get(row.id).unwrap().unwrap().state, VehicleState::Sold);
        assert!(!inventory
            .try_set_state(row.id, VehicleState::Available, VehicleState::Reserved)
            .unwrap());
    }

    #[cfg(feature = "sqlite")]
    mod sqlite {
        use super::civic;
        use crate::infrastructure::{InventoryStore, ReservationTable, SaleLedger};
        use crate::client::{Dealership, DealershipParts};
        use crate::clock::ManualClock;
        use crate::config::CoordinatorConfig;
        use crate::error::ReservationError;
        use crate::infrastructure_sqlite::SqliteStore;
        use crate::types::{ClientTier, Reservation, Sale, SaleType, VehicleState};
        use std::sync::Arc;
        use std::time::Duration;

        fn sqlite_dealership() -> (Dealership, Arc<SqliteStore>, ManualClock) {
            let store = Arc::new(SqliteStore::open_in_memory().unwrap());
            let clock = ManualClock::new(1_000_000);
            let parts = DealershipParts {
                inventory: store.clone(),
                reservations: store.clone(),
                ledger: store.clone(),
                directory: None,
                clock: Arc::new(clock.clone()),
            };
            let d = Dealership::from_parts(CoordinatorConfig::from_secs(60, 60).unwrap(), parts);
            d.seed_demo_catalog().unwrap();
            (d, store, clock)
        }

        /// Every Reserved vehicle has exactly one row, every Sold vehicle one sale.
        fn assert_consistent(d: &Dealership, store: &SqliteStore) {
            let rows = store.list_all().unwrap();
            let sales = SaleLedger::list(store).unwrap();
            for vehicle in d.vehicles().unwrap() {
                let held = rows.iter().filter(|r| r.vehicle_id == vehicle.id).count();
                let sold = sales.iter().filter(|s| s.vehicle_id == vehicle.id).count();
                match vehicle.state {
                    VehicleState::Available => assert_eq!((held, sold), (0, 0), "vehicle {}", vehicle.id),
                    VehicleState::Reserved => assert_eq!((held, sold), (1, 0), "vehicle {}", vehicle.id),
                    VehicleState::Sold => assert_eq!((held, sold), (0, 1), "vehicle {}", vehicle.id),
                }
            }
        }

        #[test]
        fn test_sqlite_compare_and_set() {
            let store = SqliteStore::open_in_memory().unwrap();
            let vehicle = InventoryStore::insert(&store, civic()).unwrap();

            assert!(store
                .try_set_state(vehicle.id, VehicleState::Available, VehicleState::Reserved)
                .unwrap());
            assert!(!store
                .try_set_state(vehicle.id, VehicleState::Available, VehicleState::Reserved)
                .unwrap());
            let loaded = InventoryStore::get(&store, vehicle.id).unwrap().unwrap();
            assert_eq!(loaded.state, VehicleState::Reserved);
            assert_eq!(loaded.color, "Branco");
        }

        #[test]
        fn test_sqlite_reservation_unique_per_vehicle() {
            let store = SqliteStore::open_in_memory().unwrap();
            let vehicle = InventoryStore::insert(&store, civic()).unwrap();
            let first = Reservation::new("res_a".into(), vehicle.id, "alice".into(), 1000);

            assert!(ReservationTable::insert(&store, first.clone()).unwrap());
            assert!(!ReservationTable::insert(
                &store,
                Reservation::new("res_b".into(), vehicle.id, "bob".into(), 1001)
            )
            .unwrap());
            assert_eq!(store.get_by_vehicle(vehicle.id).unwrap(), Some(first.clone()));
            assert_eq!(store.list_by_client("alice").unwrap(), vec![first]);

            assert!(store.remove("res_a").unwrap().is_some());
            assert!(store.remove("res_a").unwrap().is_none());
            assert!(store.list_all().unwrap().is_empty());
        }

        #[test]
        fn test_sqlite_sale_round_trip() {
            let store = SqliteStore::open_in_memory().unwrap();
            let vehicle = InventoryStore::insert(&store, civic()).unwrap();
            let reservation = Reservation::new("res_a".into(), vehicle.id, "alice".into(), 1000);
            let sale = Sale::generate(&reservation, "seller", SaleType::Purchase, ClientTier::Vip, 76_950.0, 2000);

            store.record(sale.clone()).unwrap();
            assert_eq!(SaleLedger::list(&store).unwrap(), vec![sale]);
            assert_eq!(store.count_for_vehicle(vehicle.id).unwrap(), 1);
        }

        #[test]
        fn test_sqlite_dealership_reserve_checkout_sweep() {
            let (d, store, clock) = sqlite_dealership();

            let civic = d.reserve(1, "alice").unwrap();
            let corolla = d.reserve(2, "alice").unwrap();
            d.reserve(3, "bob").unwrap();
            assert!(matches!(d.reserve(1, "bob"), Err(ReservationError::VehicleUnavailable(1))));
            assert_consistent(&d, &store);

            let sale = d
                .checkout(&civic.id, "seller-1", SaleType::Sale, Some(ClientTier::Vip))
                .unwrap();
            assert_eq!(sale.final_price, 72_675.0);
            d.cancel(&corolla.id).unwrap();
            assert_consistent(&d, &store);

            clock.advance(Duration::from_secs(60));
            assert_eq!(d.sweep_once().unwrap(), 1);
            assert_eq!(d.vehicle(3).unwrap().state, VehicleState::Available);
            assert_eq!(d.vehicle(1).unwrap().state, VehicleState::Sold);
            assert_consistent(&d, &store);
        }

        #[test]
        fn test_sqlite_unique_index_rejects_second_row() {
            let (d, store, _) = sqlite_dealership();

            // A stray row on an Available vehicle: the unique index refuses the
            // new hold and the state transition is rolled back.
            assert!(ReservationTable::insert(
                &*store,
                Reservation::new("res_stray".into(), 4, "ghost".into(), 0)
            )
            .unwrap());
            assert!(matches!(d.reserve(4, "alice"), Err(ReservationError::VehicleUnavailable(4))));
            assert_eq!(d.vehicle(4).unwrap().state, VehicleState::Available);
            assert!(d.list_by_client("alice").unwrap().is_empty());
        }

        #[test]
        fn test_sqlite_concurrent_reservers_one_winner() {
            let (d, store, _) = sqlite_dealership();

            let winners = std::thread::scope(|s| {
                let handles: Vec<_> = (0..8)
                    .map(|t| {
                        let d = &d;
                        s.spawn(move || d.reserve(5, &format!("client-{}", t)).is_ok())
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap())
                    .filter(|won| *won)
                    .count()
            });
            assert_eq!(winners, 1);
            assert_consistent(&d, &store);
        }
    }
}
