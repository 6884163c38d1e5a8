//! Polymesh - polygon mesh topology kernel
//!
//! This crate provides:
//! - [`bmesh`] - Vertices, edges, loops and faces linked by disk, radial and
//!   face cycles, with selection state and validation
//! - [`ops`] - Topological operators (split, dissolve, delete, triangulate,
//!   extrude, make face, windings, duplicate, smoothing)
//! - [`snapshot`] - Binary snapshot codec used for undo

pub mod bmesh;
pub mod error;
pub mod ops;
pub mod snapshot;

pub use bmesh::*;
pub use error::{MeshError, MeshResult};
pub use snapshot::{Snapshot, SnapshotError};
