//! # lotkeep-core
//!
//! Reservation and checkout coordinator for a dealership inventory.
//! A vehicle added to a cart is held for a fixed TTL, released by a
//! background sweeper if it lapses, and converted into a sale on checkout.
//! Every transition goes through an atomic compare-and-set on the vehicle's
//! state, guarded per vehicle.

pub mod checkout;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod infrastructure;
#[path = "infrastructure_catalog.rs"]
pub mod infrastructure_catalog;
#[path = "infrastructure_in_memory.rs"]
pub mod infrastructure_in_memory;
#[cfg(feature = "sqlite")]
#[path = "infrastructure_sqlite.rs"]
pub mod infrastructure_sqlite;
pub mod locks;
pub mod pricing;
pub mod reservation;
pub mod sweeper;
pub mod types;

#[cfg(test)]
mod sweeper_test;
#[cfg(test)]
#[path = "infrastructure_test.rs"]
mod infrastructure_test;
