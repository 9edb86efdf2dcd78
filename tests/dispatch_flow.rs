use std::sync::Arc;
use std::thread;

use taxi_dispatch::config::{Config, DispatchPolicy};
use taxi_dispatch::engine::drivers::{DriverProfile, save_profile, update_status};
use taxi_dispatch::engine::lifecycle::{
    NewRequest, active_request_for_driver, claim_request, clear_all_requests, create_request,
    mark_arrived, mark_completed, mark_departed, pending_requests,
};
use taxi_dispatch::engine::matching::rank_drivers_for_request;
use taxi_dispatch::error::DispatchError;
use taxi_dispatch::geo::GeoPoint;
use taxi_dispatch::models::driver::{Driver, DriverStatus};
use taxi_dispatch::models::request::{RequestStatus, RideRequest};
use taxi_dispatch::state::DispatchState;
use uuid::Uuid;

fn setup() -> DispatchState {
    init_tracing();
    DispatchState::in_memory(DispatchPolicy::default())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn point(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint { lat, lon }
}

fn register_driver(state: &DispatchState, id: &str, lat: f64, lon: f64) -> Driver {
    save_profile(
        state,
        DriverProfile {
            id: id.to_string(),
            name: format!("driver {id}"),
            car_number: format!("shinagawa {id}"),
            location: point(lat, lon),
            status: DriverStatus::Available,
        },
    )
    .unwrap()
}

fn call_taxi(state: &DispatchState, lat: f64, lon: f64) -> RideRequest {
    create_request(
        state,
        NewRequest {
            origin: point(lat, lon),
            destination: Some("front desk".to_string()),
            ..Default::default()
        },
    )
    .unwrap()
}

#[test]
fn no_drivers_means_empty_ranking_and_failed_claims() {
    let state = setup();
    let request = call_taxi(&state, 35.0, 139.0);

    let ranked = rank_drivers_for_request(&request, &[]);
    assert!(ranked.is_empty());

    // claiming with a driver id nobody registered
    let no_driver = claim_request(&state, request.id, "ghost");
    assert!(matches!(no_driver, Err(DispatchError::NotFound(_))));

    // claiming a request id that was never created
    register_driver(&state, "d1", 35.009, 139.0);
    let no_request = claim_request(&state, Uuid::new_v4(), "d1");
    assert!(matches!(no_request, Err(DispatchError::NotFound(_))));
}

#[test]
fn concurrent_claims_assign_exactly_one_driver() {
    let state = Arc::new(setup());
    register_driver(&state, "d1", 35.009, 139.0);
    register_driver(&state, "d2", 35.045, 139.0);
    let request = call_taxi(&state, 35.0, 139.0);

    let handles: Vec<_> = ["d1", "d2"]
        .into_iter()
        .map(|driver_id| {
            let state = Arc::clone(&state);
            let request_id = request.id;
            thread::spawn(move || claim_request(&state, request_id, driver_id))
        })
        .collect();

    let results: Vec<Result<RideRequest, DispatchError>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    let won: Vec<&RideRequest> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(DispatchError::Conflict(_))))
        .count();

    assert_eq!(won.len(), 1);
    assert_eq!(conflicts, 1);

    let stored = state.requests.get(&request.id).unwrap().record;
    assert_eq!(stored.status, RequestStatus::Assigned);
    assert_eq!(stored.assigned_driver, won[0].assigned_driver);
    assert!(pending_requests(&state).is_empty());
}

#[test]
fn departing_before_arriving_is_rejected() {
    let state = setup();
    register_driver(&state, "d1", 35.009, 139.0);
    let request = call_taxi(&state, 35.0, 139.0);
    claim_request(&state, request.id, "d1").unwrap();

    let skipped = mark_departed(&state, request.id, "d1");
    assert!(matches!(skipped, Err(DispatchError::Conflict(_))));

    let stored = state.requests.get(&request.id).unwrap().record;
    assert_eq!(stored.status, RequestStatus::Assigned);
    assert!(stored.departed_at.is_none());
}

#[test]
fn full_ride_sets_ordered_timestamps_and_frees_the_driver() {
    let state = setup();
    register_driver(&state, "d1", 35.009, 139.0);
    let request = call_taxi(&state, 35.0, 139.0);

    let claimed = claim_request(&state, request.id, "d1").unwrap();
    assert_eq!(claimed.status, RequestStatus::Assigned);
    assert_eq!(active_request_for_driver(&state, "d1").unwrap().id, request.id);

    // operator flips the toggle while working the ride
    update_status(&state, "d1", DriverStatus::Busy).unwrap();

    let arrived = mark_arrived(&state, request.id, "d1").unwrap();
    assert_eq!(arrived.status, RequestStatus::Arrived);

    let departed = mark_departed(&state, request.id, "d1").unwrap();
    assert_eq!(departed.status, RequestStatus::Departed);

    let completed = mark_completed(&state, request.id, "d1").unwrap();
    assert_eq!(completed.status, RequestStatus::Completed);

    let created_at = completed.created_at;
    let assigned_at = completed.assigned_at.unwrap();
    let arrived_at = completed.arrived_at.unwrap();
    let departed_at = completed.departed_at.unwrap();
    let completed_at = completed.completed_at.unwrap();
    assert!(created_at <= assigned_at);
    assert!(assigned_at <= arrived_at);
    assert!(arrived_at <= departed_at);
    assert!(departed_at <= completed_at);

    let driver = state.drivers.get("d1").unwrap().record;
    assert_eq!(driver.status, DriverStatus::Available);
    assert!(active_request_for_driver(&state, "d1").is_none());
}

#[test]
fn observed_statuses_never_skip_or_reverse() {
    let state = setup();
    register_driver(&state, "d1", 35.009, 139.0);
    let request = call_taxi(&state, 35.0, 139.0);

    let mut observed = vec![state.requests.get(&request.id).unwrap().record.status];
    claim_request(&state, request.id, "d1").unwrap();
    observed.push(state.requests.get(&request.id).unwrap().record.status);
    mark_arrived(&state, request.id, "d1").unwrap();
    observed.push(state.requests.get(&request.id).unwrap().record.status);
    mark_departed(&state, request.id, "d1").unwrap();
    observed.push(state.requests.get(&request.id).unwrap().record.status);
    mark_completed(&state, request.id, "d1").unwrap();
    observed.push(state.requests.get(&request.id).unwrap().record.status);

    assert_eq!(
        observed,
        [
            RequestStatus::Pending,
            RequestStatus::Assigned,
            RequestStatus::Arrived,
            RequestStatus::Departed,
            RequestStatus::Completed,
        ]
    );
    assert!(observed.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn clear_all_requests_leaves_drivers_alone() {
    let state = setup();
    register_driver(&state, "d1", 35.009, 139.0);
    call_taxi(&state, 35.0, 139.0);
    call_taxi(&state, 35.0, 139.0);

    clear_all_requests(&state).unwrap();

    assert!(state.requests.is_empty());
    assert!(pending_requests(&state).is_empty());
    assert_eq!(state.drivers.len(), 1);
}

#[test]
fn state_survives_reopen_from_disk() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        data_dir: dir.path().to_path_buf(),
        log_level: "info".to_string(),
        policy: DispatchPolicy::default(),
    };

    let request_id = {
        let state = DispatchState::open(&config).unwrap();
        register_driver(&state, "d1", 35.009, 139.0);
        let request = call_taxi(&state, 35.0, 139.0);
        claim_request(&state, request.id, "d1").unwrap();
        request.id
    };

    let reopened = DispatchState::open(&config).unwrap();
    let stored = reopened.requests.get(&request_id).unwrap().record;
    assert_eq!(stored.status, RequestStatus::Assigned);
    assert_eq!(stored.assigned_driver.as_deref(), Some("d1"));
    assert_eq!(stored.car_number.as_deref(), Some("shinagawa d1"));

    // version tokens survive the reload
    let versioned = reopened.requests.get(&request_id).unwrap();
    assert_eq!(versioned.version, 2);

    let driver = reopened.drivers.get("d1").unwrap().record;
    assert_eq!(driver.status, DriverStatus::Available);
}
