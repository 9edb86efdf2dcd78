/// Assumed average urban speed. A policy constant, not a measurement.
pub const AVERAGE_SPEED_KMH: f64 = 30.0;

/// Estimated travel time in whole minutes, truncated toward zero.
pub fn eta_minutes(distance_km: f64) -> u32 {
    (distance_km / AVERAGE_SPEED_KMH * 60.0) as u32
}
