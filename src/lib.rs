//! Tracker reconstruction algorithms for a double-beta-decay detector:
//! pre-clustering of drift-cell hits and extrapolation of fitted
//! trajectories to the detector boundary surfaces.
//!
//! The crate is a library component of a larger event-processing pipeline.
//! Raw calibrated hits go through the [`PreClusterizer`], an external
//! fitting stage turns clusters into [`TrajectoryPattern`]s, and the
//! [`VertexExtrapolator`] attaches boundary vertices to the resulting
//! particle tracks.

mod clustering;
mod extrapolation;
mod geometry;
mod hit;
mod trajectory;
mod vertex;

pub use clustering::{ClusterOutput, ClusteringSetup, PreClusterizer};
pub use extrapolation::{FittedTrajectory, UsableSurfaces, VertexExtrapolator};
pub use geometry::{BoundarySet, DetectorGeometry, SIDE_BACK, SIDE_FRONT};
pub use hit::{CellAddress, TrackerHit};
pub use trajectory::{Helix3, Line3, TrajectoryPattern};
pub use vertex::{ParticleTrack, Vertex, VertexCategory};
