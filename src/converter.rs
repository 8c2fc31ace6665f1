//! Turns a [RoadNetworkDescription] into a discretized [RoadNetwork].
//!
//! Import runs in four passes: the topology is built and linked, every lane is sampled
//! into geometry joints, junction intersections are computed from the sampled lane
//! polygons, and finally signals are placed onto the lanes they apply to.

use crate::config::WorldConfig;
use crate::description::{RoadNetworkDescription, SignalDescription, SignalKind};
use crate::error::Result;
use crate::math::Point2d;
use crate::network::{RoadMarking, RoadNetwork, SignalPlacement, TrafficLight, TrafficSign};
use crate::{LaneId, RoadId};
use log::{debug, warn};

mod intersection;
mod sampling;
mod topology;

/// Builds the complete road network.
pub(crate) fn build_network(
    desc: &RoadNetworkDescription,
    config: &WorldConfig,
) -> Result<RoadNetwork> {
    let mut network = RoadNetwork::new();
    topology::build_topology(desc, &mut network)?;
    sampling::convert_roads(&mut network, config.sampling_rate)?;
    intersection::convert_intersections(&mut network, config.intersection_area_epsilon);
    place_signals(desc, &mut network)?;
    Ok(network)
}

/// The pose of a point at (s, t) relative to a road's reference line.
///
/// Returns the world position, the heading of the reference line and the elevation.
pub(crate) fn reference_pose(
    network: &RoadNetwork,
    road: RoadId,
    s: f64,
    t: f64,
) -> Option<(Point2d, f64, f64)> {
    let road = network.road(road)?;
    let sample = road.reference_line().sample(s.clamp(0.0, road.length()))?;
    let elevation = road.elevation().y_and_dy_or_zero(s).0;
    Some((sample.offset(t), sample.heading, elevation))
}

fn place_signals(desc: &RoadNetworkDescription, network: &mut RoadNetwork) -> Result<()> {
    let mut count = 0;
    for road_desc in &desc.roads {
        let road = topology::road_id(network, &road_desc.id)?;
        for signal in &road_desc.signals {
            let Some((position, heading, _)) = reference_pose(network, road, signal.s, signal.t)
            else {
                warn!(
                    "Signal '{}' at s = {} lies outside the geometry of road '{}'",
                    signal.id, signal.s, road_desc.id
                );
                continue;
            };
            let placement = SignalPlacement {
                name: signal.id.clone(),
                road,
                s: signal.s,
                t: signal.t,
                position,
                heading: heading + signal.hdg,
                lanes: signal_lanes(network, road, signal),
            };
            match &signal.kind {
                SignalKind::TrafficSign { code } => {
                    network.add_sign(TrafficSign {
                        placement,
                        code: code.clone(),
                        value: signal.value,
                    });
                }
                SignalKind::TrafficLight => {
                    network.add_traffic_light(TrafficLight::new(placement));
                }
                SignalKind::RoadMarking { code } => {
                    network.add_road_marking(RoadMarking {
                        placement,
                        code: code.clone(),
                    });
                }
            }
            count += 1;
        }
    }
    debug!("Placed {} signals", count);
    Ok(())
}

/// The lanes a signal applies to: its validity list, or every lane on its side of the road.
fn signal_lanes(network: &RoadNetwork, road: RoadId, signal: &SignalDescription) -> Vec<LaneId> {
    let Some(section) = network.section_at(road, signal.s) else {
        return vec![];
    };
    match &signal.validity {
        Some(ids) => ids
            .iter()
            .filter_map(|id| network.lane_in_section(section, *id))
            .collect(),
        None => {
            let side = if signal.t >= 0.0 { 1 } else { -1 };
            network
                .section(section)
                .map(|s| s.lanes())
                .unwrap_or_default()
                .iter()
                .copied()
                .filter(|id| {
                    network
                        .lane(*id)
                        .map_or(false, |l| l.signed_id().signum() == side)
                })
                .collect()
        }
    }
}
