//! Topological operators.
//!
//! Each operator borrows the mesh for one edit, checks its inputs before
//! mutating anything it cannot finish, and returns a small result record.

mod delete;
mod dissolve;
mod duplicate;
mod extrude;
mod make_face;
mod smooth;
mod split;
mod triangulate;
mod winding;

pub use delete::{DeleteSummary, delete_selected};
pub use dissolve::{DissolveResult, dissolve_vertex};
pub use duplicate::{DuplicateMap, duplicate, duplicate_selected};
pub use extrude::{ExtrudeResult, extrude_vertex};
pub use make_face::{MakeFaceReport, make_face_from_selection};
pub use smooth::{translate, vertex_smooth};
pub use split::{split_edge_multi, split_selected_edges};
pub use triangulate::{triangulate, triangulate_all};
pub use winding::{fix_windings, reverse_edges};
