//! Traffic signs, traffic lights and road markings placed along roads.

use crate::math::Point2d;
use crate::{LaneId, RoadId};
use serde::{Deserialize, Serialize};

/// The state of a traffic light.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightState {
    #[default]
    Off,
    Red,
    RedAmber,
    Amber,
    Green,
}

/// Where a signal sits along its road.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalPlacement {
    /// The authoring-time id.
    pub name: String,
    pub road: RoadId,
    pub s: f64,
    pub t: f64,
    pub position: Point2d,
    /// The world heading of the signal face, in rad.
    pub heading: f64,
    /// The lanes the signal applies to.
    pub lanes: Vec<LaneId>,
}

/// A traffic sign.
#[derive(Clone, Debug)]
pub struct TrafficSign {
    pub placement: SignalPlacement,
    /// The sign code from the authoring catalogue.
    pub code: String,
    /// The value shown on the sign, such as a speed limit.
    pub value: Option<f64>,
}

/// A traffic light whose state is set from outside the world model.
#[derive(Clone, Debug)]
pub struct TrafficLight {
    pub placement: SignalPlacement,
    state: LightState,
}

impl TrafficLight {
    pub(crate) fn new(placement: SignalPlacement) -> Self {
        Self {
            placement,
            state: LightState::Off,
        }
    }

    pub fn state(&self) -> LightState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: LightState) {
        self.state = state;
    }
}

/// A marking painted on the road surface, such as a stop line.
#[derive(Clone, Debug)]
pub struct RoadMarking {
    pub placement: SignalPlacement,
    pub code: String,
}
