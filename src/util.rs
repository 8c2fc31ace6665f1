//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

use cgmath::num_traits::Float;
use serde::{Deserialize, Serialize};

/// A closed interval on the real number line, typically a range of s-offsets.
#[derive(Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

impl<T> Interval<T> {
    /// Creates a new interval.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: PartialOrd> Interval<T> {
    /// Returns true if the two closed intervals share at least one value.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.max >= other.min && other.max >= self.min
    }

    /// Returns true if this interval contains the value.
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

impl<T: std::ops::Sub<T, Output = T> + Copy> Interval<T> {
    /// Gets the magnitude of the interval.
    pub fn length(&self) -> T {
        self.max - self.min
    }
}

impl<T: Float> Interval<T> {
    /// An interval containing nothing, which becomes a single value once extended.
    pub fn empty() -> Self {
        Self {
            min: T::infinity(),
            max: T::neg_infinity(),
        }
    }

    /// Returns true if no value has been added to the interval.
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Grows the interval so that it contains `value`.
    pub fn extend(&mut self, value: T) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// The smallest interval containing both intervals.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Restricts both ends of this interval to lie within `bounds`.
    pub fn clamp_to(&self, bounds: &Self) -> Self {
        Self {
            min: self.min.max(bounds.min).min(bounds.max),
            max: self.max.max(bounds.min).min(bounds.max),
        }
    }

    pub fn lerp(&self, t: T) -> T {
        self.min + t * (self.max - self.min)
    }
}

impl<T: Debug> Debug for Interval<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}
