//! Read-only snapshots for the display collaborator: the front-desk
//! request board, the driver roster, and the sidebar counters.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::driver::DriverStatus;
use crate::models::request::{RequestStatus, RideRequest};
use crate::state::DispatchState;

#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    pub id: Uuid,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub driver_name: Option<String>,
    pub car_number: Option<String>,
    pub estimated_arrival_minutes: Option<u32>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub departed_at: Option<DateTime<Utc>>,
}

impl From<RideRequest> for RequestView {
    fn from(request: RideRequest) -> Self {
        Self {
            id: request.id,
            status: request.status,
            created_at: request.created_at,
            driver_name: request.driver_name,
            car_number: request.car_number,
            estimated_arrival_minutes: request.estimated_arrival_minutes,
            arrived_at: request.arrived_at,
            departed_at: request.departed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverView {
    pub id: String,
    pub name: String,
    pub car_number: String,
    pub location: GeoPoint,
    pub status: DriverStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub available_drivers: usize,
    pub active_drivers: usize,
    pub pending_requests: usize,
    pub assigned_requests: usize,
}

/// Non-terminal requests for the front desk: arrived cars first, then
/// en-route, then still waiting; oldest first within a band.
pub fn request_board(state: &DispatchState) -> Vec<RequestView> {
    let mut active: Vec<RideRequest> = state
        .requests
        .snapshot()
        .into_values()
        .filter(|request| {
            matches!(
                request.status,
                RequestStatus::Pending | RequestStatus::Assigned | RequestStatus::Arrived
            )
        })
        .collect();

    active.sort_by_key(|request| (band(request.status), request.created_at));
    active.into_iter().map(RequestView::from).collect()
}

fn band(status: RequestStatus) -> u8 {
    match status {
        RequestStatus::Arrived => 0,
        RequestStatus::Assigned => 1,
        _ => 2,
    }
}

pub fn driver_board(state: &DispatchState) -> Vec<DriverView> {
    let mut board: Vec<DriverView> = state
        .drivers
        .snapshot()
        .into_values()
        .map(|driver| DriverView {
            id: driver.id,
            name: driver.name,
            car_number: driver.car_number,
            location: driver.location,
            status: driver.status,
        })
        .collect();
    board.sort_by(|a, b| a.id.cmp(&b.id));
    board
}

/// Sidebar counters. An "active" driver is an available one currently
/// holding a request that has not completed.
pub fn stats(state: &DispatchState) -> DispatchStats {
    let drivers = state.drivers.snapshot();
    let requests = state.requests.snapshot();

    let active_ids: HashSet<&str> = requests
        .values()
        .filter(|request| {
            matches!(
                request.status,
                RequestStatus::Assigned | RequestStatus::Arrived | RequestStatus::Departed
            )
        })
        .filter_map(|request| request.assigned_driver.as_deref())
        .collect();

    DispatchStats {
        available_drivers: drivers
            .values()
            .filter(|driver| driver.status == DriverStatus::Available)
            .count(),
        active_drivers: active_ids
            .into_iter()
            .filter(|id| {
                drivers
                    .get(*id)
                    .is_some_and(|driver| driver.status == DriverStatus::Available)
            })
            .count(),
        pending_requests: requests
            .values()
            .filter(|request| request.status == RequestStatus::Pending)
            .count(),
        assigned_requests: requests
            .values()
            .filter(|request| request.status == RequestStatus::Assigned)
            .count(),
    }
}
