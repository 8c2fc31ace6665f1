//! Builds the road network graph from a description, without any sampled geometry.

use crate::description::{
    ContactPoint, LaneDescription, PolynomialDescription, RoadDescription, RoadLinkDescription,
    RoadNetworkDescription, SectionDescription,
};
use crate::error::{Result, WorldError};
use crate::math::{CubicFn, GeometrySegment, PiecewiseCubic, Point2d, ReferenceLine};
use crate::network::{
    Connection, Lane, LaneBoundary, LinkRejection, Road, RoadLink, RoadNetwork, Section,
};
use crate::util::Interval;
use crate::{LaneId, RoadId, SectionId};
use log::debug;

fn piecewise(polys: &[PolynomialDescription]) -> PiecewiseCubic {
    PiecewiseCubic::new(
        polys
            .iter()
            .map(|p| CubicFn::new(p.s, p.a, p.b, p.c, p.d))
            .collect(),
    )
}

/// Adds all roads, sections, lanes, boundaries and junctions, and links them together.
pub(crate) fn build_topology(
    desc: &RoadNetworkDescription,
    network: &mut RoadNetwork,
) -> Result<()> {
    for road in &desc.roads {
        add_road(network, road)?;
    }
    for junction in &desc.junctions {
        network.add_junction(&junction.id);
    }
    for road in &desc.roads {
        link_road(network, road)?;
    }
    for junction in &desc.junctions {
        let junction_id = network.junction_by_name(&junction.id).ok_or_else(|| {
            WorldError::UnknownJunction {
                junction: junction.id.clone(),
            }
        })?;
        for conn in &junction.connections {
            let incoming = road_id(network, &conn.incoming_road)?;
            let connecting = road_id(network, &conn.connecting_road)?;
            if let Some(road) = network.road_mut(connecting) {
                road.set_junction(junction_id);
            }
            if let Some(junction) = network.junction_mut(junction_id) {
                junction.add_connection(Connection {
                    incoming,
                    connecting,
                    contact: conn.contact_point,
                });
            }
            link_connection_lanes(
                network,
                junction_id,
                incoming,
                connecting,
                conn.contact_point,
                &conn.lane_links,
            )?;
        }
        for priority in &junction.priorities {
            let high = road_id(network, &priority.high)?;
            let low = road_id(network, &priority.low)?;
            if let Some(junction) = network.junction_mut(junction_id) {
                junction.add_priority(high, low);
            }
        }
    }
    for road in &desc.roads {
        if let Some(junction) = &road.junction {
            let junction_id = network.junction_by_name(junction).ok_or_else(|| {
                WorldError::UnknownJunction {
                    junction: junction.clone(),
                }
            })?;
            let road_id = road_id(network, &road.id)?;
            if let Some(road) = network.road_mut(road_id) {
                road.set_junction(junction_id);
            }
        }
    }
    debug!(
        "Built topology with {} roads and {} junctions",
        desc.roads.len(),
        desc.junctions.len()
    );
    Ok(())
}

pub(super) fn road_id(network: &RoadNetwork, name: &str) -> Result<RoadId> {
    network.road_by_name(name).ok_or_else(|| WorldError::UnknownRoad {
        road: name.to_owned(),
    })
}

/// Adds a road with its sections, lanes and boundaries.
fn add_road(network: &mut RoadNetwork, desc: &RoadDescription) -> Result<()> {
    if !(desc.length.is_finite() && desc.length > 0.0) {
        return Err(WorldError::InvalidGeometry {
            road: desc.id.clone(),
            s: 0.0,
            reason: format!("road length {} is not positive", desc.length),
        });
    }
    if desc.geometries.is_empty() {
        return Err(WorldError::NoGeometry {
            road: desc.id.clone(),
        });
    }
    let mut segments = Vec::with_capacity(desc.geometries.len());
    for g in &desc.geometries {
        if !(g.length.is_finite() && g.length > 0.0) || !g.s.is_finite() {
            return Err(WorldError::InvalidGeometry {
                road: desc.id.clone(),
                s: g.s,
                reason: format!("geometry length {} is not positive", g.length),
            });
        }
        segments.push(GeometrySegment {
            s: g.s,
            origin: Point2d::new(g.x, g.y),
            hdg: g.hdg,
            length: g.length,
            shape: g.shape,
        });
    }

    let road_id = network
        .add_road(|id| {
            Road::new(
                id,
                desc.id.clone(),
                desc.length,
                ReferenceLine::new(segments),
                piecewise(&desc.lane_offsets),
                piecewise(&desc.elevations),
            )
        })
        .ok_or_else(|| WorldError::DuplicateRoad {
            road: desc.id.clone(),
        })?;

    let mut sections = desc.sections.iter().collect::<Vec<_>>();
    sections.sort_by(|a, b| a.s.total_cmp(&b.s));

    let mut previous: Option<SectionId> = None;
    for (idx, section) in sections.iter().enumerate() {
        let end = sections.get(idx + 1).map_or(desc.length, |next| next.s);
        let range = Interval::new(section.s, end);
        let section_id = add_section(network, road_id, &desc.id, section, range)?;
        if let Some(previous) = previous {
            let next_set = network
                .section_mut(previous)
                .map_or(false, |s| s.set_next(section_id).is_ok());
            let previous_set = network
                .section_mut(section_id)
                .map_or(false, |s| s.set_previous(previous).is_ok());
            if !(next_set && previous_set) {
                return Err(WorldError::DuplicateSuccessor {
                    road: desc.id.clone(),
                });
            }
        }
        previous = Some(section_id);
    }
    Ok(())
}

/// Adds a section, its lanes, their boundaries and neighbour relations.
fn add_section(
    network: &mut RoadNetwork,
    road_id: RoadId,
    road_name: &str,
    desc: &SectionDescription,
    range: Interval<f64>,
) -> Result<SectionId> {
    if desc.lanes.is_empty() {
        return Err(WorldError::EmptySection {
            road: road_name.to_owned(),
            s: desc.s,
        });
    }
    let section_id = network.add_section(|id| Section::new(id, road_id, range));

    let mut lanes = desc.lanes.iter().collect::<Vec<_>>();
    lanes.sort_by(|a, b| b.id.cmp(&a.id));

    let mut lane_ids = vec![];
    for lane in &lanes {
        let boundaries = add_boundaries(network, lane, range);
        if lane.id == 0 {
            for boundary in boundaries {
                if let Some(section) = network.section_mut(section_id) {
                    section.add_centre_boundary(boundary);
                }
            }
            continue;
        }
        let lane_id = network.add_lane(|id| {
            Lane::new(
                id,
                road_id,
                section_id,
                lane.id,
                lane.lane_type,
                piecewise(&lane.widths),
            )
        });
        if let Some(l) = network.lane_mut(lane_id) {
            if lane.id > 0 {
                l.left_boundaries_mut().extend(boundaries);
            } else {
                l.right_boundaries_mut().extend(boundaries);
            }
        }
        lane_ids.push(lane_id);
    }

    // The lanes next to the reference line share its boundaries
    let centre = network
        .section(section_id)
        .map(|s| s.centre_boundaries().to_vec())
        .unwrap_or_default();
    for &lane_id in &lane_ids {
        if let Some(lane) = network.lane_mut(lane_id) {
            match lane.signed_id() {
                -1 => *lane.left_boundaries_mut() = centre.clone(),
                1 => *lane.right_boundaries_mut() = centre.clone(),
                _ => {}
            }
        }
    }

    for pair in lane_ids.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        let adjacent = match (network.lane(left), network.lane(right)) {
            (Some(l), Some(r)) => {
                let (a, b) = (l.signed_id(), r.signed_id());
                a - b == 1 || (a == 1 && b == -1)
            }
            _ => false,
        };
        if adjacent {
            network.link_neighbours(left, right);
        }
    }

    if let Some(section) = network.section_mut(section_id) {
        section.set_lanes(lane_ids);
    }
    Ok(section_id)
}

/// Creates one boundary per painted line of each road mark of a lane.
fn add_boundaries(
    network: &mut RoadNetwork,
    lane: &LaneDescription,
    section: Interval<f64>,
) -> Vec<crate::BoundaryId> {
    let mut marks = lane.road_marks.clone();
    marks.sort_by(|a, b| a.s_offset.total_cmp(&b.s_offset));
    let mut ids = vec![];
    for (idx, mark) in marks.iter().enumerate() {
        let start = section.min + mark.s_offset;
        let end = marks
            .get(idx + 1)
            .map_or(section.max, |next| section.min + next.s_offset);
        if start >= section.max || end <= start {
            continue;
        }
        for (kind, side) in mark.kind.lines() {
            let id = network.add_boundary(|id| {
                LaneBoundary::new(
                    id,
                    kind,
                    mark.color,
                    mark.weight.width(),
                    Interval::new(start, end),
                    side,
                )
            });
            ids.push(id);
        }
    }
    ids
}

fn resolve_link(network: &RoadNetwork, link: &RoadLinkDescription) -> Result<RoadLink> {
    Ok(match link {
        RoadLinkDescription::Road { id, contact } => RoadLink::Road {
            road: road_id(network, id)?,
            contact: *contact,
        },
        RoadLinkDescription::Junction { id } => RoadLink::Junction(
            network
                .junction_by_name(id)
                .ok_or_else(|| WorldError::UnknownJunction {
                    junction: id.clone(),
                })?,
        ),
    })
}

/// The first or last section of a road.
fn end_section(network: &RoadNetwork, road: RoadId, contact: ContactPoint) -> Option<SectionId> {
    let sections = network.road(road)?.sections();
    match contact {
        ContactPoint::Start => sections.first().copied(),
        ContactPoint::End => sections.last().copied(),
    }
}

/// Sets the road links and the lane links they imply.
fn link_road(network: &mut RoadNetwork, desc: &RoadDescription) -> Result<()> {
    let road = road_id(network, &desc.id)?;
    if let Some(link) = &desc.predecessor {
        let link = resolve_link(network, link)?;
        network
            .road_mut(road)
            .map(|r| r.set_predecessor(link))
            .transpose()
            .map_err(|_| WorldError::DuplicatePredecessor {
                road: desc.id.clone(),
            })?;
    }
    if let Some(link) = &desc.successor {
        let link = resolve_link(network, link)?;
        network
            .road_mut(road)
            .map(|r| r.set_successor(link))
            .transpose()
            .map_err(|_| WorldError::DuplicateSuccessor {
                road: desc.id.clone(),
            })?;
    }

    let mut sections = desc.sections.iter().collect::<Vec<_>>();
    sections.sort_by(|a, b| a.s.total_cmp(&b.s));
    let section_ids = network
        .road(road)
        .map(|r| r.sections().to_vec())
        .unwrap_or_default();

    for (idx, (section, &section_id)) in sections.iter().zip(&section_ids).enumerate() {
        for lane in section.lanes.iter().filter(|l| l.id != 0) {
            let Some(lane_id) = network.lane_in_section(section_id, lane.id) else {
                continue;
            };
            if let Some(successor) = lane.successor {
                let target = match section_ids.get(idx + 1) {
                    Some(&next) => network.lane_in_section(next, successor),
                    None => match network.road(road).and_then(|r| r.successor()) {
                        Some(RoadLink::Road { road: other, contact }) => {
                            end_section(network, other, contact)
                                .and_then(|s| network.lane_in_section(s, successor))
                        }
                        _ => None,
                    },
                };
                if let Some(target) = target {
                    add_lane_link(network, &desc.id, lane_id, target, true)?;
                }
            }
            if let Some(predecessor) = lane.predecessor {
                let target = match idx.checked_sub(1).and_then(|i| section_ids.get(i)) {
                    Some(&previous) => network.lane_in_section(previous, predecessor),
                    None => match network.road(road).and_then(|r| r.predecessor()) {
                        Some(RoadLink::Road { road: other, contact }) => {
                            end_section(network, other, contact)
                                .and_then(|s| network.lane_in_section(s, predecessor))
                        }
                        _ => None,
                    },
                };
                if let Some(target) = target {
                    add_lane_link(network, &desc.id, lane_id, target, false)?;
                }
            }
        }
    }
    Ok(())
}

/// Links the incoming road's lanes to the lanes of a connecting road.
fn link_connection_lanes(
    network: &mut RoadNetwork,
    junction: crate::JunctionId,
    incoming: RoadId,
    connecting: RoadId,
    contact: ContactPoint,
    lane_links: &[(i32, i32)],
) -> Result<()> {
    let Some(incoming_road) = network.road(incoming) else {
        return Ok(());
    };
    let incoming_name = incoming_road.name().to_owned();
    let towards_junction = if incoming_road.successor() == Some(RoadLink::Junction(junction)) {
        Some(ContactPoint::End)
    } else if incoming_road.predecessor() == Some(RoadLink::Junction(junction)) {
        Some(ContactPoint::Start)
    } else {
        None
    };
    let Some(incoming_end) = towards_junction else {
        return Ok(());
    };
    let (Some(from_section), Some(to_section)) = (
        end_section(network, incoming, incoming_end),
        end_section(network, connecting, contact),
    ) else {
        return Ok(());
    };
    for &(from, to) in lane_links {
        let from_lane = network
            .lane_in_section(from_section, from)
            .ok_or_else(|| WorldError::UnknownLane {
                road: incoming_name.clone(),
                lane: from,
            })?;
        let to_lane = network
            .lane_in_section(to_section, to)
            .ok_or_else(|| WorldError::UnknownLane {
                road: network
                    .road(connecting)
                    .map(|r| r.name().to_owned())
                    .unwrap_or_default(),
                lane: to,
            })?;
        add_lane_link(
            network,
            &incoming_name,
            from_lane,
            to_lane,
            incoming_end == ContactPoint::End,
        )?;
    }
    Ok(())
}

fn add_lane_link(
    network: &mut RoadNetwork,
    road_name: &str,
    from: LaneId,
    to: LaneId,
    as_successor: bool,
) -> Result<()> {
    let from_signed = network.lane(from).map_or(0, |l| l.signed_id());
    let to_signed = network.lane(to).map_or(0, |l| l.signed_id());
    let Some(lane) = network.lane_mut(from) else {
        return Ok(());
    };
    let result = if as_successor {
        lane.add_next(to)
    } else {
        lane.add_previous(to)
    };
    result.map_err(|rejection| match rejection {
        LinkRejection::SelfReference => WorldError::SelfReferentialLink {
            road: road_name.to_owned(),
            lane: from_signed,
        },
        LinkRejection::Duplicate => WorldError::DuplicateLaneLink {
            road: road_name.to_owned(),
            lane: from_signed,
            target: to_signed,
        },
    })
}
