use serde::{Deserialize, Serialize};

/// Tenant-wide rate table consumed by the quote engine. Supplied by the
/// configuration collaborator and treated as read-mostly input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Base rate applied per unit of saleable area.
    pub base_rate_per_area: i64,
    /// Additional rate per floor per unit of area.
    pub floor_rise_per_floor: i64,
    /// Fixed amenity charge per unit.
    pub amenities: i64,
    /// Fixed parking charge, applied only when parking is included.
    pub parking: i64,
    pub gst_rate: f64,
    pub stamp_duty_rate: f64,
    pub registration_fee: i64,
    /// Discounts above this per-area amount require explicit approval.
    pub max_discount_per_area: i64,
    /// Hard ceiling on the per-area discount an operator may even request.
    pub discount_ceiling_per_area: i64,
    /// Fixed token amount collected at booking, recorded as a paid milestone.
    pub booking_amount: i64,
    pub quote_validity_days: i64,
    pub block_validity_hours: i64,
}

impl PricingConfig {
    /// Reference policy used by demos and as a seed for new projects.
    pub fn standard() -> Self {
        Self {
            base_rate_per_area: 8_500,
            floor_rise_per_floor: 50,
            amenities: 500_000,
            parking: 300_000,
            gst_rate: 0.05,
            stamp_duty_rate: 0.07,
            registration_fee: 30_000,
            max_discount_per_area: 200,
            discount_ceiling_per_area: 500,
            booking_amount: 200_000,
            quote_validity_days: 7,
            block_validity_hours: 24,
        }
    }
}
