//! Tunable parameters of the world model.

use crate::error::{Result, WorldError};
use serde::{Deserialize, Serialize};

/// Default longitudinal sampling step of lane geometry, in m.
pub const DEFAULT_SAMPLING_RATE: f64 = 1.0;

/// Intersections with a smaller area than this are ignored, in m^2.
pub const DEFAULT_AREA_EPSILON: f64 = 1e-3;

/// Sector angles closer than this are considered equal, in rad.
pub const DEFAULT_ANGLE_EPSILON: f64 = 1e-9;

/// Parameters of a [World](crate::World).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// The longitudinal distance between lane geometry samples, in m.
    pub sampling_rate: f64,
    /// Minimum area of a junction lane overlap, in m^2.
    pub intersection_area_epsilon: f64,
    /// Tolerance used by the sector filter, in rad.
    pub angle_epsilon: f64,
    /// What to do with a lane overlap that falls outside its lane.
    pub out_of_range_policy: OutOfRangePolicy,
    /// Version stamp written into every ground truth snapshot.
    pub interface_version: InterfaceVersion,
}

/// Handling of a committed lane overlap outside the lane's valid s-range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangePolicy {
    /// Clamp the overlap to the lane and keep the assignment.
    Clamp,
    /// Discard the assignment.
    Drop,
}

/// A semantic version of the ground truth schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Default for InterfaceVersion {
    fn default() -> Self {
        Self {
            major: 3,
            minor: 0,
            patch: 0,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            sampling_rate: DEFAULT_SAMPLING_RATE,
            intersection_area_epsilon: DEFAULT_AREA_EPSILON,
            angle_epsilon: DEFAULT_ANGLE_EPSILON,
            out_of_range_policy: OutOfRangePolicy::Clamp,
            interface_version: InterfaceVersion::default(),
        }
    }
}

impl WorldConfig {
    /// Parses and validates a configuration from a JSON document.
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that all parameters are usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.sampling_rate.is_finite() && self.sampling_rate > 0.0) {
            return Err(WorldError::InvalidConfig {
                reason: format!("sampling rate must be positive, got {}", self.sampling_rate),
            });
        }
        if !(self.intersection_area_epsilon >= 0.0) {
            return Err(WorldError::InvalidConfig {
                reason: "intersection area epsilon must not be negative".into(),
            });
        }
        if !(self.angle_epsilon >= 0.0) {
            return Err(WorldError::InvalidConfig {
                reason: "angle epsilon must not be negative".into(),
            });
        }
        Ok(())
    }
}
