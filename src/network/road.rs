use crate::description::ContactPoint;
use crate::math::{PiecewiseCubic, ReferenceLine};
use crate::util::Interval;
use crate::{JunctionId, RoadId, SectionId};

/// The element at one end of a road.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoadLink {
    Road { road: RoadId, contact: ContactPoint },
    Junction(JunctionId),
}

/// A road with its reference line and ordered sections.
#[derive(Clone, Debug)]
pub struct Road {
    id: RoadId,
    /// The authoring-time id.
    name: String,
    length: f64,
    /// The junction this road connects through, if any.
    junction: Option<JunctionId>,
    reference_line: ReferenceLine,
    lane_offset: PiecewiseCubic,
    elevation: PiecewiseCubic,
    /// Sections ordered by s.
    sections: Vec<SectionId>,
    predecessor: Option<RoadLink>,
    successor: Option<RoadLink>,
}

/// Returned when a road end is linked twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct AlreadyLinked;

impl Road {
    pub(crate) fn new(
        id: RoadId,
        name: String,
        length: f64,
        reference_line: ReferenceLine,
        lane_offset: PiecewiseCubic,
        elevation: PiecewiseCubic,
    ) -> Self {
        Self {
            id,
            name,
            length,
            junction: None,
            reference_line,
            lane_offset,
            elevation,
            sections: vec![],
            predecessor: None,
            successor: None,
        }
    }

    pub fn id(&self) -> RoadId {
        self.id
    }

    /// The authoring-time id of the road.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The length of the road, in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn range(&self) -> Interval<f64> {
        Interval::new(0.0, self.length)
    }

    pub fn junction(&self) -> Option<JunctionId> {
        self.junction
    }

    pub fn reference_line(&self) -> &ReferenceLine {
        &self.reference_line
    }

    pub fn lane_offset(&self) -> &PiecewiseCubic {
        &self.lane_offset
    }

    pub fn elevation(&self) -> &PiecewiseCubic {
        &self.elevation
    }

    pub fn sections(&self) -> &[SectionId] {
        &self.sections
    }

    pub fn predecessor(&self) -> Option<RoadLink> {
        self.predecessor
    }

    pub fn successor(&self) -> Option<RoadLink> {
        self.successor
    }

    /// The link at the given end of the road.
    pub fn link_at(&self, contact: ContactPoint) -> Option<RoadLink> {
        match contact {
            ContactPoint::Start => self.predecessor,
            ContactPoint::End => self.successor,
        }
    }

    pub(crate) fn set_junction(&mut self, junction: JunctionId) {
        self.junction = Some(junction);
    }

    pub(crate) fn add_section(&mut self, section: SectionId) {
        self.sections.push(section);
    }

    pub(crate) fn set_predecessor(&mut self, link: RoadLink) -> Result<(), AlreadyLinked> {
        set_once(&mut self.predecessor, link)
    }

    pub(crate) fn set_successor(&mut self, link: RoadLink) -> Result<(), AlreadyLinked> {
        set_once(&mut self.successor, link)
    }
}

/// Sets a link that may only be set once.
pub(crate) fn set_once<T>(slot: &mut Option<T>, value: T) -> Result<(), AlreadyLinked> {
    if slot.is_some() {
        return Err(AlreadyLinked);
    }
    *slot = Some(value);
    Ok(())
}
