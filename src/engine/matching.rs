use crate::engine::eta::eta_minutes;
use crate::geo::haversine_km;
use crate::models::driver::{Driver, DriverStatus};
use crate::models::request::{RequestStatus, RideRequest};

#[derive(Debug, Clone)]
pub struct RankedDriver {
    pub driver: Driver,
    pub distance_km: f64,
}

#[derive(Debug, Clone)]
pub struct RankedRequest {
    pub request: RideRequest,
    pub distance_km: f64,
    pub eta_minutes: u32,
}

/// Available drivers ordered by distance from the request origin,
/// nearest first. The final pick stays with a human operator; this is a
/// read-only view.
pub fn rank_drivers_for_request(request: &RideRequest, drivers: &[Driver]) -> Vec<RankedDriver> {
    let mut ranked: Vec<RankedDriver> = drivers
        .iter()
        .filter(|driver| driver.status == DriverStatus::Available)
        .map(|driver| RankedDriver {
            distance_km: haversine_km(&driver.location, &request.origin),
            driver: driver.clone(),
        })
        .collect();

    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked
}

/// Pending requests ordered by distance from the driver, nearest first,
/// each with a raw ETA (the dispatch buffer is added at claim time).
pub fn rank_requests_for_driver(driver: &Driver, requests: &[RideRequest]) -> Vec<RankedRequest> {
    let mut ranked: Vec<RankedRequest> = requests
        .iter()
        .filter(|request| request.status == RequestStatus::Pending)
        .map(|request| {
            let distance_km = haversine_km(&driver.location, &request.origin);
            RankedRequest {
                request: request.clone(),
                distance_km,
                eta_minutes: eta_minutes(distance_km),
            }
        })
        .collect();

    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked
}
