//! The objects currently overlapping a lane.

use crate::object::{ObjectId, ObjectKind};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How far an object reaches onto a lane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneOverlap {
    /// The smallest s-offset of the object on the lane, in m.
    pub s_min: f64,
    /// The largest s-offset of the object on the lane, in m.
    pub s_max: f64,
    /// The smallest distance between the object and the left edge of the lane, in m.
    pub min_delta_left: f64,
    /// The smallest distance between the object and the right edge of the lane, in m.
    pub min_delta_right: f64,
}

impl Default for LaneOverlap {
    fn default() -> Self {
        Self {
            s_min: f64::MAX,
            s_max: 0.0,
            min_delta_left: f64::MAX,
            min_delta_right: f64::MAX,
        }
    }
}

impl LaneOverlap {
    /// Includes a point at (s, t) of a lane with the given half width.
    ///
    /// Points with a non-finite coordinate are ignored.
    pub fn include(&mut self, s: f64, t: f64, half_width: f64) {
        if !s.is_finite() || !t.is_finite() || !half_width.is_finite() {
            return;
        }
        if s < self.s_min {
            self.s_min = s;
        }
        if s > self.s_max {
            self.s_max = s;
        }
        self.min_delta_left = (half_width - t).clamp(0.0, self.min_delta_left);
        self.min_delta_right = (half_width + t).clamp(0.0, self.min_delta_right);
    }
}

/// An object assigned to a lane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Assignment {
    pub object: ObjectId,
    pub kind: ObjectKind,
    pub overlap: LaneOverlap,
}

/// Index orderings of the assignments.
#[derive(Clone, Debug)]
struct Orderings {
    /// Ascending by `s_min`, then `s_max`.
    downstream: Vec<usize>,
    /// Descending by `s_max`, then `s_min`.
    upstream: Vec<usize>,
}

/// The objects overlapping a lane, with orderings that are sorted on first read after an insert.
#[derive(Clone, Debug, Default)]
pub struct LaneAssignments {
    entries: Vec<Assignment>,
    /// Empty while the orderings are stale.
    sorted: OnceCell<Orderings>,
}

impl LaneAssignments {
    /// Adds an object to the lane.
    pub(crate) fn insert(&mut self, object: ObjectId, kind: ObjectKind, overlap: LaneOverlap) {
        self.entries.push(Assignment {
            object,
            kind,
            overlap,
        });
        self.sorted.take();
    }

    /// Removes every assignment.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.sorted.take();
    }

    /// Removes every moving object, keeping the stationary ones.
    pub(crate) fn clear_moving(&mut self) {
        self.entries.retain(|a| a.kind == ObjectKind::Stationary);
        self.sorted.take();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the orderings still need sorting.
    pub fn is_dirty(&self) -> bool {
        self.sorted.get().is_none()
    }

    /// Iterates over the assignments in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Assignment> + '_ {
        self.entries.iter()
    }

    /// Iterates over the assignments in the order they are met travelling along the lane.
    pub fn downstream(&self) -> impl Iterator<Item = &Assignment> + '_ {
        self.orderings().downstream.iter().map(|i| &self.entries[*i])
    }

    /// Iterates over the assignments in the order they are met travelling against the lane.
    pub fn upstream(&self) -> impl Iterator<Item = &Assignment> + '_ {
        self.orderings().upstream.iter().map(|i| &self.entries[*i])
    }

    /// The ordering for the given direction of travel.
    pub fn ordered(&self, in_lane_direction: bool) -> Box<dyn Iterator<Item = &Assignment> + '_> {
        if in_lane_direction {
            Box::new(self.downstream())
        } else {
            Box::new(self.upstream())
        }
    }

    fn orderings(&self) -> &Orderings {
        self.sorted.get_or_init(|| {
            let entries = &self.entries;
            let mut downstream = (0..entries.len()).collect::<Vec<_>>();
            downstream.sort_by(|a, b| {
                let (a, b) = (&entries[*a].overlap, &entries[*b].overlap);
                cmp(a.s_min, b.s_min).then(cmp(a.s_max, b.s_max))
            });
            let mut upstream = (0..entries.len()).collect::<Vec<_>>();
            upstream.sort_by(|a, b| {
                let (a, b) = (&entries[*a].overlap, &entries[*b].overlap);
                cmp(b.s_max, a.s_max).then(cmp(b.s_min, a.s_min))
            });
            Orderings {
                downstream,
                upstream,
            }
        })
    }
}

fn cmp(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}
