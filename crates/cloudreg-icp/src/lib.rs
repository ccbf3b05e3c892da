#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod icp_plane;
pub use icp_plane::*;

mod ops;

use cloudreg_geometry::GeometryError;

/// Error types for the registration engine.
#[derive(Debug, thiserror::Error)]
pub enum IcpError {
    /// A geometric precondition failed (dimension or transform).
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// A cloud with no points was supplied.
    #[error("point cloud is empty")]
    EmptyCloud,

    /// Point-to-plane registration needs normals on every point.
    #[error("point clouds must carry per-point normals")]
    MissingNormals,

    /// The per-iteration sample bound was zero.
    #[error("per-iteration sample size must be positive")]
    ZeroSampleSize,

    /// Outlier rejection discarded every correspondence.
    #[error("outlier rejection left no correspondences")]
    NoInliers,

    /// The 6x6 normal-equations system has no solution.
    #[error("normal-equations system is singular")]
    SingularSystem,
}
