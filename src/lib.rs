//! skinpost-ngin
//!
//! CPU skinning of joint-weighted meshes and a scene renderer that draws them
//! off-screen, runs a separable ping-pong blur over the result and presents it.
//! Runs natively and on the web.
//!
//! High-level modules
//! - `camera`: camera, projection, uniforms and screen-to-world unprojection
//! - `config`: renderer and mesh generation settings
//! - `context`: GPU and window context shared by all flows
//! - `data_structures`: skeletons, skinned meshes, textures and transforms
//! - `error`: errors callers branch on
//! - `flow`: high level flow control and the event loop
//! - `pipelines`: scene, sky, blur and present render pipelines
//! - `post_process`: blur schedule, ping-pong colour buffers and uniforms
//! - `render`: frame composition and the frame stage state machine
//! - `resources`: procedural meshes and textures
//! - `skybox`: cube-mapped sky drawn behind the scene
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod pipelines;
pub mod post_process;
pub mod render;
pub mod resources;
pub mod skybox;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use winit::event::WindowEvent;
pub use wgpu::*;
