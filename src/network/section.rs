use super::road::{set_once, AlreadyLinked};
use crate::util::Interval;
use crate::{BoundaryId, LaneId, RoadId, SectionId};

/// A longitudinal slice of a road with a fixed set of lanes.
#[derive(Clone, Debug)]
pub struct Section {
    id: SectionId,
    road: RoadId,
    /// The s-offsets covered by the section.
    range: Interval<f64>,
    /// Lanes ordered from left to right, excluding the centre lane.
    lanes: Vec<LaneId>,
    /// Boundaries along the reference line.
    centre_boundaries: Vec<BoundaryId>,
    next: Option<SectionId>,
    previous: Option<SectionId>,
}

impl Section {
    pub(crate) fn new(id: SectionId, road: RoadId, range: Interval<f64>) -> Self {
        Self {
            id,
            road,
            range,
            lanes: vec![],
            centre_boundaries: vec![],
            next: None,
            previous: None,
        }
    }

    pub fn id(&self) -> SectionId {
        self.id
    }

    pub fn road(&self) -> RoadId {
        self.road
    }

    pub fn range(&self) -> Interval<f64> {
        self.range
    }

    pub fn lanes(&self) -> &[LaneId] {
        &self.lanes
    }

    pub fn centre_boundaries(&self) -> &[BoundaryId] {
        &self.centre_boundaries
    }

    pub fn next(&self) -> Option<SectionId> {
        self.next
    }

    pub fn previous(&self) -> Option<SectionId> {
        self.previous
    }

    /// Whether the section contains `s`.
    /// The end is only included for the last section of a road.
    pub fn covers(&self, s: f64) -> bool {
        if self.next.is_none() {
            self.range.contains(s)
        } else {
            self.range.min <= s && s < self.range.max
        }
    }

    /// Whether the section overlaps the s-offsets from `start` to `end`.
    /// Either end of the road counts as inside.
    pub fn covers_interval(&self, start: f64, end: f64) -> bool {
        let before_end = if self.next.is_none() {
            start <= self.range.max
        } else {
            start < self.range.max
        };
        let after_start = if self.previous.is_none() {
            end >= self.range.min
        } else {
            end > self.range.min
        };
        before_end && after_start
    }

    pub(crate) fn set_lanes(&mut self, lanes: Vec<LaneId>) {
        self.lanes = lanes;
    }

    pub(crate) fn add_centre_boundary(&mut self, boundary: BoundaryId) {
        self.centre_boundaries.push(boundary);
    }

    pub(crate) fn set_next(&mut self, section: SectionId) -> Result<(), AlreadyLinked> {
        set_once(&mut self.next, section)
    }

    pub(crate) fn set_previous(&mut self, section: SectionId) -> Result<(), AlreadyLinked> {
        set_once(&mut self.previous, section)
    }
}
