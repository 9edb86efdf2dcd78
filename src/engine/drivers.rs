//! Driver registry operations. A driver record is created implicitly the
//! first time its id saves a profile and persists indefinitely; there is
//! no deletion path.

use chrono::Utc;
use tracing::info;

use crate::error::DispatchError;
use crate::geo::GeoPoint;
use crate::models::driver::{Driver, DriverStatus};
use crate::state::DispatchState;

#[derive(Debug, Clone)]
pub struct DriverProfile {
    pub id: String,
    pub name: String,
    pub car_number: String,
    pub location: GeoPoint,
    pub status: DriverStatus,
}

pub fn save_profile(
    state: &DispatchState,
    profile: DriverProfile,
) -> Result<Driver, DispatchError> {
    if profile.id.trim().is_empty() {
        return Err(DispatchError::BadRequest(
            "driver id cannot be empty".to_string(),
        ));
    }

    if profile.car_number.trim().is_empty() {
        return Err(DispatchError::BadRequest(
            "car number cannot be empty".to_string(),
        ));
    }

    let driver = Driver {
        id: profile.id,
        name: profile.name,
        car_number: profile.car_number,
        location: profile.location,
        status: profile.status,
        updated_at: Utc::now(),
    };

    let committed = state.drivers.put(driver.id.clone(), driver)?;
    info!(driver_id = %committed.record.id, "driver profile saved");
    Ok(committed.record)
}

pub fn update_location(
    state: &DispatchState,
    driver_id: &str,
    location: GeoPoint,
) -> Result<Driver, DispatchError> {
    let snapshot = state
        .drivers
        .get(driver_id)
        .ok_or_else(|| DispatchError::NotFound(format!("driver {driver_id} not found")))?;

    let mut driver = snapshot.record;
    driver.location = location;
    driver.updated_at = Utc::now();

    Ok(state.drivers.put(driver.id.clone(), driver)?.record)
}

pub fn update_status(
    state: &DispatchState,
    driver_id: &str,
    status: DriverStatus,
) -> Result<Driver, DispatchError> {
    let snapshot = state
        .drivers
        .get(driver_id)
        .ok_or_else(|| DispatchError::NotFound(format!("driver {driver_id} not found")))?;

    let mut driver = snapshot.record;
    driver.status = status;
    driver.updated_at = Utc::now();

    Ok(state.drivers.put(driver.id.clone(), driver)?.record)
}
