use uuid::Uuid;

use crate::config::{Config, DispatchPolicy};
use crate::error::DispatchError;
use crate::models::driver::Driver;
use crate::models::request::RideRequest;
use crate::store::JsonStore;

/// The two shared stores every actor coordinates through, plus the
/// deployment policy. No actor holds an authoritative copy of anything
/// in here; reads are disposable snapshots.
pub struct DispatchState {
    pub requests: JsonStore<Uuid, RideRequest>,
    pub drivers: JsonStore<String, Driver>,
    pub policy: DispatchPolicy,
}

impl DispatchState {
    pub fn open(config: &Config) -> Result<Self, DispatchError> {
        Ok(Self {
            requests: JsonStore::open(config.data_dir.join("requests.json"))?,
            drivers: JsonStore::open(config.data_dir.join("drivers.json"))?,
            policy: config.policy,
        })
    }

    pub fn in_memory(policy: DispatchPolicy) -> Self {
        Self {
            requests: JsonStore::in_memory(),
            drivers: JsonStore::in_memory(),
            policy,
        }
    }
}
