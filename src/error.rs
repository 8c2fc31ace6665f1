//! Error types raised while importing a road network or reading and writing JSON.
//!
//! Runtime queries never fail with these errors; they report misses with
//! `Option` or explicit invalid values instead.

use thiserror::Error;

/// A [std::result::Result] specialised to [WorldError].
pub type Result<T> = std::result::Result<T, WorldError>;

/// Errors that abort scenario import, or a conversion to or from JSON.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("Road '{road}' has more than one successor")]
    DuplicateSuccessor { road: String },

    #[error("Road '{road}' has more than one predecessor")]
    DuplicatePredecessor { road: String },

    #[error("Lane {lane} on road '{road}' links to itself")]
    SelfReferentialLink { road: String, lane: i32 },

    #[error("Lane {lane} on road '{road}' is linked twice to lane {target}")]
    DuplicateLaneLink { road: String, lane: i32, target: i32 },

    #[error("Section at s = {s} on road '{road}' has no lanes")]
    EmptySection { road: String, s: f64 },

    #[error("Road '{road}' has no reference line geometry")]
    NoGeometry { road: String },

    #[error("Road '{road}' has an invalid geometry at s = {s}: {reason}")]
    InvalidGeometry { road: String, s: f64, reason: String },

    #[error("Unknown road '{road}'")]
    UnknownRoad { road: String },

    #[error("Unknown lane {lane} on road '{road}'")]
    UnknownLane { road: String, lane: i32 },

    #[error("Unknown junction '{junction}'")]
    UnknownJunction { junction: String },

    #[error("Duplicate road id '{road}'")]
    DuplicateRoad { road: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
