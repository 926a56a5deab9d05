//! Run-scoped shared repository.
//!
//! A small keyed store for values several unrelated components need but that
//! do not belong on a graph edge, e.g. the number of apartments derived once by
//! the building. It is created empty with each simulator and cleared when the
//! run ends. Entries are not part of convergence: anything stored here is
//! expected to be stable for the whole run.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use ef_core::Tag;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("Shared repository has no entry for {key}")]
    Missing { key: String },

    #[error("Shared repository entry {key} does not hold a {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Well-known keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RepositoryKey {
    NumberOfApartments,
    SetHeatingTemperatureForBuilding,
    SetCoolingTemperatureForBuilding,
    WaterMassFlowRateOfHeatingDistributionSystem,
    WaterMassFlowRateOfHeatGenerator,
    MaxThermalBuildingDemand,
    SetHeatingTemperatureForWaterStorage,
    SetCoolingTemperatureForWaterStorage,
    HeatingSystem,
    Location,
    ResultScenarioName,
    Predictive,
    PredictionHorizon,
    PvIncluded,
    PvPeakPower,
    SmartDevicesIncluded,
    BatteryIncluded,
    MaximumBatteryCapacity,
    MinimumBatteryCapacity,
    MaximalChargingPower,
    MaximalDischargingPower,
    BatteryEfficiency,
    InverterEfficiency,
    /// Escape hatch for keys private to a pair of components.
    Custom(String),
}

impl fmt::Display for RepositoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryKey::Custom(name) => write!(f, "Custom({name})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Keyed store of arbitrary `'static` values.
#[derive(Default)]
pub struct SharedRepository {
    entries: HashMap<RepositoryKey, Box<dyn Any + Send>>,
    dynamic: HashMap<Tag, BTreeMap<i32, Box<dyn Any + Send>>>,
}

impl fmt::Debug for SharedRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&RepositoryKey> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("SharedRepository")
            .field("keys", &keys)
            .field("dynamic_tags", &self.dynamic.len())
            .finish()
    }
}

impl SharedRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry.
    pub fn set<T: Any + Send>(&mut self, key: RepositoryKey, value: T) {
        self.entries.insert(key, Box::new(value));
    }

    /// Borrow an entry. Missing keys and wrong types are errors.
    pub fn get<T: Any>(&self, key: &RepositoryKey) -> RepositoryResult<&T> {
        let entry = self.entries.get(key).ok_or_else(|| RepositoryError::Missing {
            key: key.to_string(),
        })?;
        entry
            .downcast_ref::<T>()
            .ok_or_else(|| RepositoryError::TypeMismatch {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn exists(&self, key: &RepositoryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove an entry; removing a missing key is an error.
    pub fn delete(&mut self, key: &RepositoryKey) -> RepositoryResult<()> {
        self.entries
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::Missing {
                key: key.to_string(),
            })
    }

    /// Entry published by a dynamically wired device of class `tag` with
    /// weight `weight`.
    pub fn set_dynamic_entry<T: Any + Send>(&mut self, tag: Tag, weight: i32, value: T) {
        self.dynamic
            .entry(tag)
            .or_default()
            .insert(weight, Box::new(value));
    }

    /// `None` when nothing is stored or the type does not match.
    pub fn get_dynamic_entry<T: Any>(&self, tag: Tag, weight: i32) -> Option<&T> {
        self.dynamic
            .get(&tag)
            .and_then(|m| m.get(&weight))
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Weights stored under `tag`, ascending.
    pub fn dynamic_weights(&self, tag: Tag) -> Vec<i32> {
        self.dynamic
            .get(&tag)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn delete_dynamic_entry(&mut self, tag: Tag, weight: i32) -> bool {
        self.dynamic
            .get_mut(&tag)
            .is_some_and(|m| m.remove(&weight).is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.dynamic.values().map(BTreeMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dynamic.clear();
    }
}
