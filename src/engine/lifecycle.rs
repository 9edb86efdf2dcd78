//! The request state machine: pending → assigned → arrived → departed →
//! completed, never skipping and never reversing. Every transition
//! re-reads the persisted record immediately before a conditional write;
//! a lost race surfaces as `Conflict` and the caller decides what to do
//! with fresh data.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::eta::eta_minutes;
use crate::error::DispatchError;
use crate::geo::{GeoPoint, haversine_km};
use crate::models::driver::DriverStatus;
use crate::models::request::{RequestStatus, RideRequest};
use crate::state::DispatchState;

/// Fixed allowance added to every ETA for the driver to get moving.
pub const DISPATCH_BUFFER_MINUTES: u32 = 3;

/// Front-desk input for a new request.
#[derive(Debug, Clone, Default)]
pub struct NewRequest {
    pub origin: GeoPoint,
    pub destination: Option<String>,
    pub passenger_name: Option<String>,
    pub notes: Option<String>,
}

pub fn create_request(
    state: &DispatchState,
    new: NewRequest,
) -> Result<RideRequest, DispatchError> {
    let request = RideRequest {
        id: Uuid::new_v4(),
        origin: new.origin,
        destination: new.destination,
        passenger_name: new.passenger_name,
        notes: new.notes,
        status: RequestStatus::Pending,
        assigned_driver: None,
        driver_name: None,
        car_number: None,
        estimated_arrival_minutes: None,
        created_at: Utc::now(),
        assigned_at: None,
        arrived_at: None,
        departed_at: None,
        completed_at: None,
    };

    state.requests.put(request.id, request.clone())?;
    info!(request_id = %request.id, "request created");
    Ok(request)
}

/// Assign a pending request to `driver_id`. The request must still be
/// pending in the store at commit time; two drivers racing here get one
/// success and one `Conflict`.
pub fn claim_request(
    state: &DispatchState,
    request_id: Uuid,
    driver_id: &str,
) -> Result<RideRequest, DispatchError> {
    let driver = state
        .drivers
        .get(driver_id)
        .ok_or_else(|| DispatchError::NotFound(format!("driver {driver_id} not found")))?
        .record;

    let snapshot = state
        .requests
        .get(&request_id)
        .ok_or_else(|| DispatchError::NotFound(format!("request {request_id} not found")))?;

    if snapshot.record.status != RequestStatus::Pending {
        warn!(
            request_id = %request_id,
            driver_id,
            status = %snapshot.record.status,
            "claim rejected, request no longer pending"
        );
        return Err(DispatchError::Conflict(format!(
            "request {request_id} is {}, not pending",
            snapshot.record.status
        )));
    }

    let distance_km = haversine_km(&driver.location, &snapshot.record.origin);
    let mut updated = snapshot.record.clone();
    updated.status = RequestStatus::Assigned;
    updated.assigned_driver = Some(driver.id.clone());
    updated.driver_name = Some(driver.name.clone());
    updated.car_number = Some(driver.car_number.clone());
    updated.estimated_arrival_minutes = Some(eta_minutes(distance_km) + DISPATCH_BUFFER_MINUTES);
    updated.assigned_at = Some(Utc::now());

    let committed = state
        .requests
        .compare_and_swap(&request_id, snapshot.version, updated)?;

    if state.policy.auto_busy_on_claim {
        // Re-read the driver record; the pre-claim copy may be stale.
        if let Some(latest) = state.drivers.get(driver_id) {
            let mut busy = latest.record;
            busy.status = DriverStatus::Busy;
            busy.updated_at = Utc::now();
            state.drivers.put(busy.id.clone(), busy)?;
        }
    }

    info!(
        request_id = %request_id,
        driver_id = %driver.id,
        distance_km,
        eta_minutes = committed.record.estimated_arrival_minutes,
        "request claimed"
    );

    Ok(committed.record)
}

pub fn mark_arrived(
    state: &DispatchState,
    request_id: Uuid,
    driver_id: &str,
) -> Result<RideRequest, DispatchError> {
    advance(state, request_id, driver_id, RequestStatus::Assigned, |request, now| {
        request.status = RequestStatus::Arrived;
        request.arrived_at = Some(now);
    })
}

pub fn mark_departed(
    state: &DispatchState,
    request_id: Uuid,
    driver_id: &str,
) -> Result<RideRequest, DispatchError> {
    advance(state, request_id, driver_id, RequestStatus::Arrived, |request, now| {
        request.status = RequestStatus::Departed;
        request.departed_at = Some(now);
    })
}

/// Close out the ride and return the driver to the available pool.
pub fn mark_completed(
    state: &DispatchState,
    request_id: Uuid,
    driver_id: &str,
) -> Result<RideRequest, DispatchError> {
    let completed = advance(state, request_id, driver_id, RequestStatus::Departed, |request, now| {
        request.status = RequestStatus::Completed;
        request.completed_at = Some(now);
    })?;

    match state.drivers.get(driver_id) {
        Some(latest) => {
            let mut driver = latest.record;
            driver.status = DriverStatus::Available;
            driver.updated_at = Utc::now();
            state.drivers.put(driver.id.clone(), driver)?;
        }
        None => warn!(driver_id, "request completed but driver record is gone"),
    }

    Ok(completed)
}

/// Shared precondition check and conditional commit for the
/// single-assignee transitions. Only the assigned driver may advance a
/// request, and only from the expected prior stage.
fn advance(
    state: &DispatchState,
    request_id: Uuid,
    driver_id: &str,
    expected: RequestStatus,
    apply: impl FnOnce(&mut RideRequest, DateTime<Utc>),
) -> Result<RideRequest, DispatchError> {
    let snapshot = state
        .requests
        .get(&request_id)
        .ok_or_else(|| DispatchError::NotFound(format!("request {request_id} not found")))?;

    let current = &snapshot.record;
    if current.status != expected || current.assigned_driver.as_deref() != Some(driver_id) {
        warn!(
            request_id = %request_id,
            driver_id,
            status = %current.status,
            expected = %expected,
            "transition rejected"
        );
        return Err(DispatchError::Conflict(format!(
            "request {request_id} is {} and assigned to {:?}, expected {expected} held by {driver_id}",
            current.status, current.assigned_driver
        )));
    }

    let mut updated = current.clone();
    apply(&mut updated, Utc::now());
    let next = updated.status;

    let committed = state
        .requests
        .compare_and_swap(&request_id, snapshot.version, updated)?;

    info!(request_id = %request_id, driver_id, status = %next, "request advanced");
    Ok(committed.record)
}

/// Pending requests, oldest first. The driver page polls this.
pub fn pending_requests(state: &DispatchState) -> Vec<RideRequest> {
    let mut pending: Vec<RideRequest> = state
        .requests
        .snapshot()
        .into_values()
        .filter(|request| request.status == RequestStatus::Pending)
        .collect();
    pending.sort_by_key(|request| request.created_at);
    pending
}

/// The request this driver is currently working, if any. A driver holds
/// at most one non-terminal assignment at a time in practice; ties go to
/// the oldest.
pub fn active_request_for_driver(state: &DispatchState, driver_id: &str) -> Option<RideRequest> {
    state
        .requests
        .snapshot()
        .into_values()
        .filter(|request| {
            request.assigned_driver.as_deref() == Some(driver_id)
                && matches!(
                    request.status,
                    RequestStatus::Assigned | RequestStatus::Arrived | RequestStatus::Departed
                )
        })
        .min_by_key(|request| request.created_at)
}

/// Administrative bulk clear of the request store.
pub fn clear_all_requests(state: &DispatchState) -> Result<(), DispatchError> {
    state.requests.clear_all()?;
    info!("all requests cleared");
    Ok(())
}
