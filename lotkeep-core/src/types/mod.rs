mod primitives;
mod reservation;

pub use primitives::*;
pub use reservation::*;
