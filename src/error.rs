//! Error types of the renderer and the skinning data.
//!
//! Resource creation and the driver loop report through `anyhow`; the types
//! here exist where callers need to branch on the failure.

use std::fmt;

/// Why a [`crate::render::SceneRenderer`] never became ready.
#[derive(Debug)]
pub enum InitError {
    /// The surface reported a zero width or height.
    ZeroSizedTarget,
    /// The requested off-screen target exceeds the device limit.
    TargetTooLarge { width: u32, height: u32, max: u32 },
    /// A render target format can't be rendered to and sampled from.
    UnsupportedFormat(wgpu::TextureFormat),
    /// The scene texture could not be created.
    Texture(anyhow::Error),
    /// Shader or pipeline creation was rejected by device validation.
    Pipeline(wgpu::Error),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::ZeroSizedTarget => f.write_str("render target has a zero-sized extent"),
            InitError::TargetTooLarge { width, height, max } => write!(
                f,
                "render target {}x{} exceeds the maximum texture dimension {}",
                width, height, max
            ),
            InitError::UnsupportedFormat(format) => {
                write!(f, "texture format {:?} is not usable as a render target", format)
            }
            InitError::Texture(e) => write!(f, "scene texture unavailable: {}", e),
            InitError::Pipeline(e) => write!(f, "render pipelines are invalid: {}", e),
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InitError::Texture(e) => Some(&**e),
            InitError::Pipeline(e) => Some(e),
            _ => None,
        }
    }
}

/// Per-frame failures of the render pipeline.
#[derive(Debug)]
pub enum FrameError {
    /// The renderer failed initialization; no GPU work is issued.
    NotReady,
    /// A frame stage was entered out of order.
    OutOfOrder {
        from: crate::render::FrameStage,
        to: crate::render::FrameStage,
    },
    Surface(wgpu::SurfaceError),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::NotReady => f.write_str("renderer is not initialized"),
            FrameError::OutOfOrder { from, to } => {
                write!(f, "illegal frame stage transition {:?} -> {:?}", from, to)
            }
            FrameError::Surface(e) => write!(f, "surface error: {}", e),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameError::Surface(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::SurfaceError> for FrameError {
    fn from(e: wgpu::SurfaceError) -> Self {
        FrameError::Surface(e)
    }
}

/// Malformed skinning data, reported by [`crate::data_structures::skinned_mesh::SubMesh::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkinError {
    WeightSpanOutOfRange {
        vertex: usize,
        end: usize,
        weights: usize,
    },
    JointOutOfRange {
        weight: usize,
        joint: usize,
        joints: usize,
    },
    IndexOutOfRange {
        index: u32,
        vertices: usize,
    },
}

impl fmt::Display for SkinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkinError::WeightSpanOutOfRange {
                vertex,
                end,
                weights,
            } => write!(
                f,
                "vertex {} references weights up to {} but only {} exist",
                vertex, end, weights
            ),
            SkinError::JointOutOfRange {
                weight,
                joint,
                joints,
            } => write!(
                f,
                "weight {} references joint {} but the skeleton has {} joints",
                weight, joint, joints
            ),
            SkinError::IndexOutOfRange { index, vertices } => write!(
                f,
                "index {} is out of range for {} vertices",
                index, vertices
            ),
        }
    }
}

impl std::error::Error for SkinError {}
