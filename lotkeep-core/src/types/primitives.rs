use serde::{Deserialize, Serialize};

/// Catalog identifier of a vehicle.
pub type VehicleId = u64;
/// Opaque reservation identifier (`res_...`).
pub type ReservationId = String;
/// Opaque sale identifier (`sale_...`).
pub type SaleId = String;

/// Availability of a single vehicle in the inventory.
/// Only the inventory store may change it, and only through compare-and-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleState {
    /// Free to be reserved
    Available,
    /// Held by exactly one reservation
    Reserved,
    /// Terminal: a sale references it
    Sold,
}

impl VehicleState {
    /// Stable storage representation
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleState::Available => "Available",
            VehicleState::Reserved => "Reserved",
            VehicleState::Sold => "Sold",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "Available" => Some(VehicleState::Available),
            "Reserved" => Some(VehicleState::Reserved),
            "Sold" => Some(VehicleState::Sold),
            _ => None,
        }
    }
}

impl std::fmt::Display for VehicleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who initiated the sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaleType {
    /// Closed by a seller on the client's behalf
    Sale,
    /// Self-service purchase by the client
    Purchase,
}

impl SaleType {
    /// Parses the boundary representation. Accepts the legacy
    /// `VENDA` / `COMPRA` labels as well.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SALE" | "VENDA" => Some(SaleType::Sale),
            "PURCHASE" | "COMPRA" => Some(SaleType::Purchase),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SaleType::Sale => "SALE",
            SaleType::Purchase => "PURCHASE",
        }
    }
}

impl std::fmt::Display for SaleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pricing tier of a client. Defaults to `Standard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClientTier {
    #[default]
    Standard,
    Vip,
}

impl ClientTier {
    /// Case-insensitive parse. Empty input is the default tier.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "" | "STANDARD" | "COMUM" => Some(ClientTier::Standard),
            "VIP" => Some(ClientTier::Vip),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClientTier::Standard => "STANDARD",
            ClientTier::Vip => "VIP",
        }
    }
}

impl std::fmt::Display for ClientTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive attributes of a vehicle before it enters the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVehicle {
    pub year: u16,
    pub base_price: f64,
    pub color: String,
    pub model: String,
}

impl NewVehicle {
    pub fn new(year: u16, base_price: f64, color: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            year,
            base_price,
            color: color.into(),
            model: model.into(),
        }
    }
}

/// A vehicle in the inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub year: u16,
    /// List price before discounts
    pub base_price: f64,
    pub color: String,
    pub model: String,
    pub state: VehicleState,
}

impl Vehicle {
    pub fn from_new(id: VehicleId, new: NewVehicle, state: VehicleState) -> Self {
        Self {
            id,
            year: new.year,
            base_price: new.base_price,
            color: new.color,
            model: new.model,
            state,
        }
    }

    pub fn is_available(&self) -> bool {
        self.state == VehicleState::Available
    }
}
