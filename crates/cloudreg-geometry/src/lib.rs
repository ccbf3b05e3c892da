#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Axis-aligned bounding boxes.
pub mod aabb;

/// Homogeneous 4x4 transform helpers.
pub mod linalg;

/// Points with optional normals.
pub mod point;

pub use aabb::AaBox;
pub use point::Point;

/// Error types for the geometry primitives.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// Two operands of different dimensionality were compared.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality expected by the receiver.
        expected: usize,
        /// Dimensionality of the offending operand.
        actual: usize,
    },

    /// A box bound update would cross the opposite bound.
    #[error("bound update on axis {axis} would cross the opposite bound ({value} vs {limit})")]
    InvalidBounds {
        /// Axis of the rejected update.
        axis: usize,
        /// Value that was requested.
        value: f64,
        /// Opposite bound that would be crossed.
        limit: f64,
    },

    /// An axis index outside `0..dim` was used.
    #[error("axis {axis} is out of range for dimension {dim}")]
    AxisOutOfRange {
        /// Requested axis.
        axis: usize,
        /// Dimensionality of the receiver.
        dim: usize,
    },

    /// A box was constructed with zero dimensions.
    #[error("box dimension must be positive")]
    ZeroDimension,

    /// A transform could not be applied or inverted.
    #[error("singular or non-finite transform")]
    SingularTransform,
}
