use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// Lifecycle stage of a ride request. The derived ordering matches the
/// only legal walk: pending < assigned < arrived < departed < completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Assigned,
    Arrived,
    Departed,
    Completed,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Assigned => "assigned",
            RequestStatus::Arrived => "arrived",
            RequestStatus::Departed => "departed",
            RequestStatus::Completed => "completed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideRequest {
    pub id: Uuid,
    pub origin: GeoPoint,
    pub destination: Option<String>,
    pub passenger_name: Option<String>,
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub assigned_driver: Option<String>,
    pub driver_name: Option<String>,
    pub car_number: Option<String>,
    pub estimated_arrival_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub departed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}
