//! Engine data structures: skeletons, skinned meshes, textures and transforms.
//!
//! - `skeleton` holds posed joints
//! - `skinned_mesh` contains weighted submeshes, CPU skinning and the mesh node tree
//! - `geometry` derives normals and tangents from triangle lists
//! - `physics` drives node transforms from rigid bodies
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `transform` holds per-node placement and its instance-buffer layout
//! - `vertex` defines the vertex buffer layouts

pub mod geometry;
pub mod physics;
pub mod skeleton;
pub mod skinned_mesh;
pub mod texture;
pub mod transform;
pub mod vertex;
