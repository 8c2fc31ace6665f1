//! Samples the continuous road description into lane geometry joints and boundary points.

use crate::error::Result;
use crate::math::ReferenceSample;
use crate::network::{BoundaryPoint, LaneGeometryJoint, RoadNetwork};
use crate::util::Interval;
use crate::{BoundaryId, LaneId, RoadId, SectionId};
use log::{debug, warn};

/// Two sample offsets closer than this are treated as the same sample, in m.
const SAMPLE_TOLERANCE: f64 = 1e-9;

/// Samples every road of the network at the given longitudinal step.
pub(crate) fn convert_roads(network: &mut RoadNetwork, sampling_rate: f64) -> Result<()> {
    let roads = network.roads().map(|r| r.id()).collect::<Vec<_>>();
    for road in roads {
        let sections = network
            .road(road)
            .map(|r| r.sections().to_vec())
            .unwrap_or_default();
        for section in sections {
            convert_section(network, road, section, sampling_rate)?;
        }
    }
    for lane in network.lanes_mut() {
        lane.build_elements();
    }
    debug!("Sampled {} lanes", network.lanes().count());
    Ok(())
}

/// The s-offsets at which a section is sampled.
///
/// Every road mark start and every geometry start and end inside the section is an
/// exact sample. In between, samples are `sampling_rate` apart, counted from the
/// start of each piece.
pub(crate) fn sample_offsets(
    section: Interval<f64>,
    mark_starts: &[f64],
    geometries: &[Interval<f64>],
    sampling_rate: f64,
) -> Vec<f64> {
    let mut cuts = vec![section.min, section.max];
    cuts.extend(
        mark_starts
            .iter()
            .copied()
            .filter(|s| *s > section.min && *s < section.max),
    );
    cuts.sort_by(f64::total_cmp);
    cuts.dedup_by(|a, b| (*a - *b).abs() < SAMPLE_TOLERANCE);

    let mut offsets = vec![];
    for chunk in cuts.windows(2) {
        let chunk = Interval::new(chunk[0], chunk[1]);
        for geometry in geometries {
            let start = chunk.min.max(geometry.min);
            let end = chunk.max.min(geometry.max);
            if end - start < SAMPLE_TOLERANCE {
                continue;
            }
            let count = ((end - start) / sampling_rate - SAMPLE_TOLERANCE).ceil().max(1.0) as usize;
            offsets.extend((0..count).map(|i| start + i as f64 * sampling_rate));
            offsets.push(end);
        }
    }
    offsets.sort_by(f64::total_cmp);
    offsets.dedup_by(|a, b| (*a - *b).abs() < SAMPLE_TOLERANCE);
    offsets
}

/// Lateral position of a lane edge, and its rate of change along the road.
#[derive(Clone, Copy)]
struct Edge {
    t: f64,
    dt: f64,
}

fn convert_section(
    network: &mut RoadNetwork,
    road_id: RoadId,
    section_id: SectionId,
    sampling_rate: f64,
) -> Result<()> {
    let (Some(road), Some(section)) = (network.road(road_id), network.section(section_id)) else {
        return Ok(());
    };
    let range = section.range();

    // Lanes grouped by side, ordered outwards from the reference line
    let mut left = vec![];
    let mut right = vec![];
    for lane in section.lanes().iter().filter_map(|id| network.lane(*id)) {
        let lane_id = lane.id();
        if lane.signed_id() > 0 {
            left.push((lane.signed_id(), lane_id));
        } else {
            right.push((lane.signed_id(), lane_id));
        }
    }
    left.sort_by_key(|(id, _)| *id);
    right.sort_by_key(|(id, _)| -*id);

    let boundary_of = |ids: &[BoundaryId]| {
        ids.iter()
            .filter_map(|id| network.boundary(*id))
            .map(|b| b.range().min)
            .collect::<Vec<_>>()
    };
    let mut mark_starts = boundary_of(section.centre_boundaries());
    for lane in section.lanes().iter().filter_map(|id| network.lane(*id)) {
        mark_starts.extend(boundary_of(lane.left_boundaries()));
        mark_starts.extend(boundary_of(lane.right_boundaries()));
    }

    let geometries = road
        .reference_line()
        .segments()
        .iter()
        .map(|g| g.range())
        .collect::<Vec<_>>();
    let offsets = sample_offsets(range, &mark_starts, &geometries, sampling_rate);
    if offsets.is_empty() {
        warn!(
            "Section at s = {} on road '{}' is not covered by any geometry",
            range.min,
            road.name()
        );
        return Ok(());
    }

    let mut missing_width = vec![];
    let mut joints: Vec<(LaneId, LaneGeometryJoint)> = vec![];
    let mut points: Vec<(BoundaryId, BoundaryPoint)> = vec![];

    for s in offsets {
        let Some(reference) = road.reference_line().sample(s) else {
            continue;
        };
        let (offset, d_offset) = road.lane_offset().y_and_dy_or_zero(s);
        let elevation = road.elevation().y_and_dy_or_zero(s).0;
        let ds = s - range.min;

        // The centre lane only carries the centre line markings
        let heading = reference.heading + d_offset.atan();
        for &id in section.centre_boundaries() {
            if let Some(b) = network.boundary(id).filter(|b| b.range().contains(s)) {
                let t = offset + b.lateral_shift();
                points.push((id, boundary_point(&reference, t, heading, s)));
            }
        }

        for (side, lanes) in [(1.0, &left), (-1.0, &right)] {
            let mut inner = Edge {
                t: offset,
                dt: d_offset,
            };
            for &(signed_id, lane_id) in lanes.iter() {
                let Some(lane) = network.lane(lane_id) else {
                    continue;
                };
                let (width, d_width) = match lane.widths().y_and_dy(ds) {
                    Some(w) => w,
                    None => {
                        if !missing_width.contains(&lane_id) {
                            warn!(
                                "Lane {} on road '{}' has no width at s = {}, using zero width",
                                signed_id,
                                road.name(),
                                s
                            );
                            missing_width.push(lane_id);
                        }
                        (0.0, 0.0)
                    }
                };
                let outer = Edge {
                    t: inner.t + side * width,
                    dt: inner.dt + side * d_width,
                };
                let mid = Edge {
                    t: 0.5 * (inner.t + outer.t),
                    dt: 0.5 * (inner.dt + outer.dt),
                };
                let (left_edge, right_edge) = if side > 0.0 {
                    (outer, inner)
                } else {
                    (inner, outer)
                };
                let joint = LaneGeometryJoint {
                    s,
                    left: reference.offset(left_edge.t),
                    centre: reference.offset(mid.t),
                    right: reference.offset(right_edge.t),
                    curvature: offset_curvature(reference.curvature, mid.t),
                    heading: reference.heading + mid.dt.atan(),
                    elevation,
                };
                joints.push((lane_id, joint));

                let own = if side > 0.0 {
                    lane.left_boundaries()
                } else {
                    lane.right_boundaries()
                };
                for &id in own {
                    if let Some(b) = network.boundary(id).filter(|b| b.range().contains(s)) {
                        let heading = reference.heading + outer.dt.atan();
                        let t = outer.t + b.lateral_shift();
                        points.push((id, boundary_point(&reference, t, heading, s)));
                    }
                }
                inner = outer;
            }
        }
    }

    for (lane_id, joint) in joints {
        if let Some(lane) = network.lane_mut(lane_id) {
            lane.add_joint(joint);
        }
    }
    for (id, point) in points {
        if let Some(boundary) = network.boundary_mut(id) {
            boundary.add_point(point);
        }
    }
    Ok(())
}

fn boundary_point(reference: &ReferenceSample, t: f64, heading: f64, s: f64) -> BoundaryPoint {
    BoundaryPoint {
        s,
        point: reference.offset(t),
        heading,
    }
}

/// The curvature of a curve offset laterally by `t` from a curve with curvature `k`.
fn offset_curvature(k: f64, t: f64) -> f64 {
    let scale = 1.0 - k * t;
    if scale.abs() < 1e-9 {
        k
    } else {
        k / scale
    }
}
