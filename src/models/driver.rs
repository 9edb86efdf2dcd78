use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Operator-controlled availability toggle. A driver working a request
/// stays `Available` unless the auto-busy policy is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverStatus {
    Available,
    Busy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub car_number: String,
    pub location: GeoPoint,
    pub status: DriverStatus,
    pub updated_at: DateTime<Utc>,
}
