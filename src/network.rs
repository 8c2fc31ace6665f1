//! The road network graph.
//!
//! All entities live in arenas owned by [RoadNetwork] and refer to each other by key.
//! Topology is fixed once import has finished; only lane assignments and traffic light
//! states change afterwards.

pub use assignment::{Assignment, LaneAssignments, LaneOverlap};
pub use boundary::{
    BoundaryPoint, BoundarySide, LaneBoundary, RoadMarkColor, RoadMarkType, RoadMarkWeight,
};
pub use junction::{Connection, IntersectingConnectionRank, IntersectionInfo, Junction};
pub use lane::{Lane, LaneElement, LaneGeometryJoint, LaneType};
pub use road::{Road, RoadLink};
pub use section::Section;
pub use signal::{LightState, RoadMarking, SignalPlacement, TrafficLight, TrafficSign};

pub(crate) use lane::LinkRejection;
pub(crate) use road::AlreadyLinked;

use crate::{
    BoundaryId, JunctionId, LaneId, MarkingId, RoadId, SectionId, SignId, TrafficLightId,
};
use slotmap::SlotMap;
use std::collections::HashMap;

mod assignment;
mod boundary;
mod junction;
mod lane;
mod road;
mod section;
mod signal;

/// The discretized road network.
#[derive(Clone, Debug, Default)]
pub struct RoadNetwork {
    roads: SlotMap<RoadId, Road>,
    sections: SlotMap<SectionId, Section>,
    lanes: SlotMap<LaneId, Lane>,
    boundaries: SlotMap<BoundaryId, LaneBoundary>,
    junctions: SlotMap<JunctionId, Junction>,
    signs: SlotMap<SignId, TrafficSign>,
    lights: SlotMap<TrafficLightId, TrafficLight>,
    markings: SlotMap<MarkingId, RoadMarking>,
    /// Authoring-time road ids.
    road_names: HashMap<String, RoadId>,
    /// Authoring-time junction ids.
    junction_names: HashMap<String, JunctionId>,
    /// Authoring-time lane indices within each section.
    lane_index: HashMap<(SectionId, i32), LaneId>,
}

impl RoadNetwork {
    /// Creates an empty network.
    pub fn new() -> Self {
        Default::default()
    }

    pub fn road(&self, id: RoadId) -> Option<&Road> {
        self.roads.get(id)
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(id)
    }

    pub fn lane(&self, id: LaneId) -> Option<&Lane> {
        self.lanes.get(id)
    }

    pub fn boundary(&self, id: BoundaryId) -> Option<&LaneBoundary> {
        self.boundaries.get(id)
    }

    pub fn junction(&self, id: JunctionId) -> Option<&Junction> {
        self.junctions.get(id)
    }

    pub fn sign(&self, id: SignId) -> Option<&TrafficSign> {
        self.signs.get(id)
    }

    pub fn traffic_light(&self, id: TrafficLightId) -> Option<&TrafficLight> {
        self.lights.get(id)
    }

    pub fn road_marking(&self, id: MarkingId) -> Option<&RoadMarking> {
        self.markings.get(id)
    }

    /// Returns an iterator over all the roads in the network.
    pub fn roads(&self) -> impl Iterator<Item = &Road> {
        self.roads.values()
    }

    /// Returns an iterator over all the lanes in the network.
    pub fn lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.values()
    }

    pub fn boundaries(&self) -> impl Iterator<Item = &LaneBoundary> {
        self.boundaries.values()
    }

    pub fn junctions(&self) -> impl Iterator<Item = &Junction> {
        self.junctions.values()
    }

    pub fn signs(&self) -> impl Iterator<Item = (SignId, &TrafficSign)> {
        self.signs.iter()
    }

    pub fn traffic_lights(&self) -> impl Iterator<Item = (TrafficLightId, &TrafficLight)> {
        self.lights.iter()
    }

    pub fn road_markings(&self) -> impl Iterator<Item = (MarkingId, &RoadMarking)> {
        self.markings.iter()
    }

    /// Finds a road by its authoring-time id.
    pub fn road_by_name(&self, name: &str) -> Option<RoadId> {
        self.road_names.get(name).copied()
    }

    /// Finds a junction by its authoring-time id.
    pub fn junction_by_name(&self, name: &str) -> Option<JunctionId> {
        self.junction_names.get(name).copied()
    }

    /// Finds the section of a road containing `s`.
    pub fn section_at(&self, road: RoadId, s: f64) -> Option<SectionId> {
        let s = s.max(0.0);
        self.roads
            .get(road)?
            .sections()
            .iter()
            .copied()
            .find(|id| self.sections[*id].covers(s))
    }

    /// Finds a lane of a section by its authoring-time index.
    pub fn lane_in_section(&self, section: SectionId, signed_id: i32) -> Option<LaneId> {
        self.lane_index.get(&(section, signed_id)).copied()
    }

    /// Finds the lane with the authoring-time index on the named road at `s`.
    pub fn lane_by_name(&self, road: &str, signed_id: i32, s: f64) -> Option<LaneId> {
        let road = self.road_by_name(road)?;
        let section = self.section_at(road, s)?;
        self.lane_in_section(section, signed_id)
    }

    /// The number of lanes, excluding the centre lane, of a road at `s`.
    pub fn number_of_lanes(&self, road: RoadId, s: f64) -> usize {
        self.section_at(road, s)
            .and_then(|id| self.sections.get(id))
            .map_or(0, |section| section.lanes().len())
    }

    /// The lanes of a road at `s` whose type is one of `lane_types`, from left to right.
    pub fn lanes_of_type_at(&self, road: RoadId, s: f64, lane_types: &[LaneType]) -> Vec<LaneId> {
        let Some(section) = self.section_at(road, s).and_then(|id| self.sections.get(id)) else {
            return vec![];
        };
        section
            .lanes()
            .iter()
            .copied()
            .filter(|id| {
                self.lanes
                    .get(*id)
                    .map_or(false, |lane| lane_types.contains(&lane.lane_type()))
            })
            .collect()
    }

    /// The road that the lane belongs to.
    pub fn road_of_lane(&self, lane: LaneId) -> Option<&Road> {
        self.lanes.get(lane).and_then(|l| self.roads.get(l.road()))
    }

    pub(crate) fn road_mut(&mut self, id: RoadId) -> Option<&mut Road> {
        self.roads.get_mut(id)
    }

    pub(crate) fn section_mut(&mut self, id: SectionId) -> Option<&mut Section> {
        self.sections.get_mut(id)
    }

    pub(crate) fn lane_mut(&mut self, id: LaneId) -> Option<&mut Lane> {
        self.lanes.get_mut(id)
    }

    pub(crate) fn boundary_mut(&mut self, id: BoundaryId) -> Option<&mut LaneBoundary> {
        self.boundaries.get_mut(id)
    }

    pub(crate) fn junction_mut(&mut self, id: JunctionId) -> Option<&mut Junction> {
        self.junctions.get_mut(id)
    }

    pub(crate) fn traffic_light_mut(&mut self, id: TrafficLightId) -> Option<&mut TrafficLight> {
        self.lights.get_mut(id)
    }

    pub(crate) fn lanes_mut(&mut self) -> impl Iterator<Item = &mut Lane> {
        self.lanes.values_mut()
    }

    /// Adds a road, returning `None` if the name is taken.
    pub(crate) fn add_road(&mut self, make: impl FnOnce(RoadId) -> Road) -> Option<RoadId> {
        let id = self.roads.insert_with_key(make);
        let name = self.roads[id].name().to_owned();
        if self.road_names.contains_key(&name) {
            self.roads.remove(id);
            return None;
        }
        self.road_names.insert(name, id);
        Some(id)
    }

    pub(crate) fn add_section(&mut self, make: impl FnOnce(SectionId) -> Section) -> SectionId {
        let id = self.sections.insert_with_key(make);
        let road = self.sections[id].road();
        if let Some(road) = self.roads.get_mut(road) {
            road.add_section(id);
        }
        id
    }

    pub(crate) fn add_lane(&mut self, make: impl FnOnce(LaneId) -> Lane) -> LaneId {
        let id = self.lanes.insert_with_key(make);
        let lane = &self.lanes[id];
        self.lane_index.insert((lane.section(), lane.signed_id()), id);
        id
    }

    pub(crate) fn add_boundary(
        &mut self,
        make: impl FnOnce(BoundaryId) -> LaneBoundary,
    ) -> BoundaryId {
        self.boundaries.insert_with_key(make)
    }

    pub(crate) fn add_junction(&mut self, name: &str) -> JunctionId {
        let id = self
            .junctions
            .insert_with_key(|id| Junction::new(id, name.to_owned()));
        self.junction_names.insert(name.to_owned(), id);
        id
    }

    pub(crate) fn add_sign(&mut self, sign: TrafficSign) -> SignId {
        let lanes = sign.placement.lanes.clone();
        let id = self.signs.insert(sign);
        for lane in lanes {
            if let Some(lane) = self.lanes.get_mut(lane) {
                lane.add_sign(id);
            }
        }
        id
    }

    pub(crate) fn add_traffic_light(&mut self, light: TrafficLight) -> TrafficLightId {
        let lanes = light.placement.lanes.clone();
        let id = self.lights.insert(light);
        for lane in lanes {
            if let Some(lane) = self.lanes.get_mut(lane) {
                lane.add_traffic_light(id);
            }
        }
        id
    }

    pub(crate) fn add_road_marking(&mut self, marking: RoadMarking) -> MarkingId {
        let lanes = marking.placement.lanes.clone();
        let id = self.markings.insert(marking);
        for lane in lanes {
            if let Some(lane) = self.lanes.get_mut(lane) {
                lane.add_road_marking(id);
            }
        }
        id
    }

    /// Makes `left` and `right` each other's neighbours.
    ///
    /// The lane nearer the reference line owns the boundary between two lanes on the
    /// same side of the road, and the outer lane receives a copy of its ids.
    /// Lanes either side of the reference line share the centre boundaries instead.
    pub(crate) fn link_neighbours(&mut self, left: LaneId, right: LaneId) {
        let Some([l, r]) = self.lanes.get_disjoint_mut([left, right]) else {
            return;
        };
        l.set_right(right);
        r.set_left(left);
        match (l.signed_id(), r.signed_id()) {
            (a, b) if a < 0 && b < 0 => *r.left_boundaries_mut() = l.right_boundaries().to_vec(),
            (a, b) if a > 0 && b > 0 => *l.right_boundaries_mut() = r.left_boundaries().to_vec(),
            _ => {}
        }
    }

    /// Clears the live assignments of every lane.
    pub(crate) fn clear_moving_assignments(&mut self) {
        for lane in self.lanes.values_mut() {
            lane.assignments_mut().clear_moving();
        }
    }
}
