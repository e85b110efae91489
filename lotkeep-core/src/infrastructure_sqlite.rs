//! SQLite-backed inventory, reservation table and sale ledger.
//! Provides persistent state across server restarts.
//!
//! Enable with the `sqlite` feature flag:
//! ```toml
//! lotkeep-core = { path = "../lotkeep-core", features = ["sqlite"] }
//! ```

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::infrastructure::{InventoryStore, ReservationTable, SaleLedger, StoreResult};
use crate::types::*;

const VEHICLE_COLUMNS: &str = "id, year, base_price, color, model, state";
const RESERVATION_COLUMNS: &str = "id, vehicle_id, client_id, created_at";
const SALE_COLUMNS: &str =
    "id, vehicle_id, client_id, seller_id, sale_type, client_tier, final_price, timestamp";

/// A persistent store backed by one SQLite database.
///
/// Uses WAL mode for concurrent read performance. The compare-and-set is a
/// single conditional `UPDATE`, so it stays atomic even against other
/// processes sharing the file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at the given path.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// A private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        // Enable WAL mode for better concurrent read performance
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS vehicles (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                year        INTEGER NOT NULL,
                base_price  REAL NOT NULL,
                color       TEXT NOT NULL,
                model       TEXT NOT NULL,
                state       TEXT NOT NULL DEFAULT 'Available'
            );
            CREATE INDEX IF NOT EXISTS idx_vehicles_state ON vehicles(state);

            CREATE TABLE IF NOT EXISTS reservations (
                id          TEXT PRIMARY KEY,
                vehicle_id  INTEGER NOT NULL REFERENCES vehicles(id),
                client_id   TEXT NOT NULL,
                created_at  INTEGER NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_reservations_vehicle ON reservations(vehicle_id);
            CREATE INDEX IF NOT EXISTS idx_reservations_client ON reservations(client_id);

            CREATE TABLE IF NOT EXISTS sales (
                id          TEXT PRIMARY KEY,
                vehicle_id  INTEGER NOT NULL REFERENCES vehicles(id),
                client_id   TEXT NOT NULL,
                seller_id   TEXT NOT NULL,
                sale_type   TEXT NOT NULL,
                client_tier TEXT NOT NULL,
                final_price REAL NOT NULL,
                timestamp   INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sales_vehicle ON sales(vehicle_id);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn row_to_vehicle(row: &rusqlite::Row) -> rusqlite::Result<(Vehicle, String)> {
        let state_str: String = row.get(5)?;
        Ok((
            Vehicle {
                id: row.get(0)?,
                year: row.get(1)?,
                base_price: row.get(2)?,
                color: row.get(3)?,
                model: row.get(4)?,
                state: VehicleState::Available,
            },
            state_str,
        ))
    }

    fn decode_vehicle((mut vehicle, state): (Vehicle, String)) -> StoreResult<Vehicle> {
        vehicle.state = VehicleState::from_str_opt(&state).ok_or_else(|| {
            StoreError::CorruptRow(format!("vehicle {} has unknown state '{}'", vehicle.id, state))
        })?;
        Ok(vehicle)
    }

    fn row_to_reservation(row: &rusqlite::Row) -> rusqlite::Result<Reservation> {
        Ok(Reservation {
            id: row.get(0)?,
            vehicle_id: row.get(1)?,
            client_id: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn row_to_sale(row: &rusqlite::Row) -> rusqlite::Result<(Sale, String, String)> {
        let sale_type: String = row.get(4)?;
        let client_tier: String = row.get(5)?;
        Ok((
            Sale {
                id: row.get(0)?,
                vehicle_id: row.get(1)?,
                client_id: row.get(2)?,
                seller_id: row.get(3)?,
                sale_type: SaleType::Sale,
                client_tier: ClientTier::Standard,
                final_price: row.get(6)?,
                timestamp: row.get(7)?,
            },
            sale_type,
            client_tier,
        ))
    }

    fn decode_sale((mut sale, sale_type, client_tier): (Sale, String, String)) -> StoreResult<Sale> {
        sale.sale_type = SaleType::parse(&sale_type).ok_or_else(|| {
            StoreError::CorruptRow(format!("sale {} has unknown type '{}'", sale.id, sale_type))
        })?;
        sale.client_tier = ClientTier::parse(&client_tier).ok_or_else(|| {
            StoreError::CorruptRow(format!("sale {} has unknown tier '{}'", sale.id, client_tier))
        })?;
        Ok(sale)
    }
}

impl InventoryStore for SqliteStore {
    fn get(&self, id: VehicleId) -> StoreResult<Option<Vehicle>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM vehicles WHERE id = ?1", VEHICLE_COLUMNS),
                params![id],
                Self::row_to_vehicle,
            )
            .optional()?;
        row.map(Self::decode_vehicle).transpose()
    }

    fn try_set_state(
        &self,
        id: VehicleId,
        expected: VehicleState,
        new: VehicleState,
    ) -> StoreResult<bool> {
        let rows = self.conn.lock().execute(
            "UPDATE vehicles SET state = ?1 WHERE id = ?2 AND state = ?3",
            params![new.as_str(), id, expected.as_str()],
        )?;
        Ok(rows > 0)
    }

    fn list(&self) -> StoreResult<Vec<Vehicle>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM vehicles ORDER BY id",
            VEHICLE_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], Self::row_to_vehicle)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(Self::decode_vehicle).collect()
    }

    fn insert(&self, vehicle: NewVehicle) -> StoreResult<Vehicle> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO vehicles (year, base_price, color, model, state) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                vehicle.year,
                vehicle.base_price,
                vehicle.color,
                vehicle.model,
                VehicleState::Available.as_str(),
            ],
        )?;
        let id = conn.last_insert_rowid() as VehicleId;
        Ok(Vehicle::from_new(id, vehicle, VehicleState::Available))
    }
}

impl ReservationTable for SqliteStore {
    fn insert(&self, reservation: Reservation) -> StoreResult<bool> {
        // The unique index on vehicle_id turns a second hold into a no-op
        let rows = self.conn.lock().execute(
            "INSERT OR IGNORE INTO reservations (id, vehicle_id, client_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                reservation.id,
                reservation.vehicle_id,
                reservation.client_id,
                reservation.created_at,
            ],
        )?;
        Ok(rows > 0)
    }

    fn get(&self, id: &str) -> StoreResult<Option<Reservation>> {
        Ok(self
            .conn
            .lock()
            .query_row(
                &format!("SELECT {} FROM reservations WHERE id = ?1", RESERVATION_COLUMNS),
                params![id],
                Self::row_to_reservation,
            )
            .optional()?)
    }

    fn get_by_vehicle(&self, vehicle_id: VehicleId) -> StoreResult<Option<Reservation>> {
        Ok(self
            .conn
            .lock()
            .query_row(
                &format!(
                    "SELECT {} FROM reservations WHERE vehicle_id = ?1",
                    RESERVATION_COLUMNS
                ),
                params![vehicle_id],
                Self::row_to_reservation,
            )
            .optional()?)
    }

    fn remove(&self, id: &str) -> StoreResult<Option<Reservation>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let existing = tx
            .query_row(
                &format!("SELECT {} FROM reservations WHERE id = ?1", RESERVATION_COLUMNS),
                params![id],
                Self::row_to_reservation,
            )
            .optional()?;
        if existing.is_some() {
            tx.execute("DELETE FROM reservations WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(existing)
    }

    fn list_by_client(&self, client_id: &str) -> StoreResult<Vec<Reservation>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reservations WHERE client_id = ?1 ORDER BY created_at",
            RESERVATION_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![client_id], Self::row_to_reservation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn list_all(&self) -> StoreResult<Vec<Reservation>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reservations ORDER BY created_at",
            RESERVATION_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], Self::row_to_reservation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl SaleLedger for SqliteStore {
    fn record(&self, sale: Sale) -> StoreResult<Sale> {
        self.conn.lock().execute(
            &format!(
                "INSERT INTO sales ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                SALE_COLUMNS
            ),
            params![
                sale.id,
                sale.vehicle_id,
                sale.client_id,
                sale.seller_id,
                sale.sale_type.as_str(),
                sale.client_tier.as_str(),
                sale.final_price,
                sale.timestamp,
            ],
        )?;
        Ok(sale)
    }

    fn list(&self) -> StoreResult<Vec<Sale>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sales ORDER BY timestamp",
            SALE_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], Self::row_to_sale)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(Self::decode_sale).collect()
    }

    fn count_for_vehicle(&self, vehicle_id: VehicleId) -> StoreResult<usize> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM sales WHERE vehicle_id = ?1",
            params![vehicle_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
