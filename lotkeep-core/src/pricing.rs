use crate::types::{ClientTier, Vehicle};

/// Discount multiplier for white vehicles
pub const WHITE_DISCOUNT: f64 = 0.95;
/// Discount multiplier for VIP clients
pub const VIP_DISCOUNT: f64 = 0.90;

// Catalog colors are recorded in Portuguese as often as in English
const WHITE_COLORS: &[&str] = &["white", "branco"];

/// Final price computed at commit time. Discounts stack multiplicatively,
/// color first, then tier.
pub struct PricingPolicy;

impl PricingPolicy {
    pub fn final_price(vehicle: &Vehicle, tier: ClientTier) -> f64 {
        let mut price = vehicle.base_price;
        if Self::is_white(&vehicle.color) {
            price *= WHITE_DISCOUNT;
        }
        if tier == ClientTier::Vip {
            price *= VIP_DISCOUNT;
        }
        round_cents(price)
    }

    pub fn is_white(color: &str) -> bool {
        let color = color.trim();
        WHITE_COLORS.iter().any(|w| w.eq_ignore_ascii_case(color))
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
