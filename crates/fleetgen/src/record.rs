//! # Parent and Child Records
//!
//! This module defines the record model shared by the generator, the cache and
//! the wire protocol.
//!
//! - [`ParentRecord`] - an editable brand/model entry with a stable
//!   [`RecordId`]
//! - [`ChildRecord`] - an immutable, category-specific detail record produced
//!   by a generation run
//! - [`Category`] - the tag that decides which [`ChildRecord`] variant a
//!   parent produces
//!
//! Cache lookups are keyed by [`RecordId`] only. Two parents with identical
//! field values but different identities never share generated children.

use core::fmt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a [`ParentRecord`].
///
/// Assigned once at creation and carried unchanged over the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Returns a fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Vehicle category of a parent record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Passenger,
    Truck,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passenger => f.write_str("passenger"),
            Self::Truck => f.write_str("truck"),
        }
    }
}

/// A brand/model entry that drives child generation.
///
/// Every field except the identity may be edited after creation. Changing
/// [`ParentRecord::category`] changes the shape of its children, so callers
/// are expected to invalidate the generator's cache entry when they do so.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParentRecord {
    id: RecordId,
    pub brand: String,
    pub model: String,
    pub horsepower: u32,
    pub max_speed: u32,
    pub category: Category,
}

impl ParentRecord {
    /// Creates a record with a freshly assigned identity.
    pub fn new(
        brand: impl Into<String>,
        model: impl Into<String>,
        horsepower: u32,
        max_speed: u32,
        category: Category,
    ) -> Self {
        Self {
            id: RecordId::new(),
            brand: brand.into(),
            model: model.into(),
            horsepower,
            max_speed,
            category,
        }
    }

    pub const fn id(&self) -> RecordId {
        self.id
    }
}

/// Details of a generated passenger car.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassengerDetails {
    registration_code: String,
    multimedia_name: String,
    airbag_count: u8,
}

impl PassengerDetails {
    pub(crate) const fn new(
        registration_code: String,
        multimedia_name: String,
        airbag_count: u8,
    ) -> Self {
        Self {
            registration_code,
            multimedia_name,
            airbag_count,
        }
    }

    pub fn registration_code(&self) -> &str {
        &self.registration_code
    }

    pub fn multimedia_name(&self) -> &str {
        &self.multimedia_name
    }

    pub const fn airbag_count(&self) -> u8 {
        self.airbag_count
    }
}

/// Details of a generated truck.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TruckDetails {
    registration_code: String,
    wheel_count: u8,
    body_volume: f64,
}

impl TruckDetails {
    pub(crate) const fn new(registration_code: String, wheel_count: u8, body_volume: f64) -> Self {
        Self {
            registration_code,
            wheel_count,
            body_volume,
        }
    }

    pub fn registration_code(&self) -> &str {
        &self.registration_code
    }

    pub const fn wheel_count(&self) -> u8 {
        self.wheel_count
    }

    /// Body volume in cubic meters, rounded to one decimal place.
    pub const fn body_volume(&self) -> f64 {
        self.body_volume
    }
}

/// A generated, category-specific detail record belonging to one parent.
///
/// Child records are only built by the factory and expose read-only
/// accessors, so their category and contents never change after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ChildRecord {
    Passenger(PassengerDetails),
    Truck(TruckDetails),
}

impl ChildRecord {
    pub const fn category(&self) -> Category {
        match self {
            Self::Passenger(_) => Category::Passenger,
            Self::Truck(_) => Category::Truck,
        }
    }

    pub fn registration_code(&self) -> &str {
        match self {
            Self::Passenger(details) => details.registration_code(),
            Self::Truck(details) => details.registration_code(),
        }
    }
}
