//! Error types for shape construction and scene lookups.
//!
//! Intersection tests never fail: they answer `None` for "no contact".
//! These errors cover the constructors and lookups where a caller hands
//! us malformed input.

use thiserror::Error;

/// Errors raised while building shapes or resolving shape references.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollideError {
    #[error("polygon needs at least 3 points, got {count}")]
    TooFewPoints { count: usize },

    #[error("polygon point {index} is not finite")]
    NonFinitePoint { index: usize },

    #[error("polygon point {index} repeats an earlier point")]
    RepeatedPoint { index: usize },

    #[error("polygon points are collinear")]
    CollinearPoints,

    #[error("heightfield grid must be at least 2x2, got {cols}x{rows}")]
    HeightfieldTooSmall { cols: usize, rows: usize },

    #[error("heightfield expects {expected} samples, got {actual}")]
    HeightfieldSampleCount { expected: usize, actual: usize },

    #[error("shape index {index} out of range for node with {len} shapes")]
    ShapeIndexOutOfRange { index: usize, len: usize },

    #[error("effective normal {0:?} cannot be normalized")]
    DegenerateNormal(glam::Vec3),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = CollideError::TooFewPoints { count: 2 };
        assert_eq!(err.to_string(), "polygon needs at least 3 points, got 2");

        let err = CollideError::ShapeIndexOutOfRange { index: 4, len: 1 };
        assert!(err.to_string().contains("index 4"));
    }
}
