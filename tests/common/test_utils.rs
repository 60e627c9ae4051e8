use skinpost_ngin::{
    Matrix4, Vector3,
    data_structures::{
        skeleton::{Joint, Skeleton},
        skinned_mesh::{SkinVertex, SubMesh, VertexWeightSpan, Weight},
    },
};

/// A root joint at the origin and a child joint two units up.
pub fn two_joint_skeleton() -> Skeleton {
    Skeleton::new(vec![
        Joint::new("root", None, Matrix4::from_scale(1.0)),
        Joint::new(
            "spine",
            Some(0),
            Matrix4::from_translation(Vector3::new(0.0, 2.0, 0.0)),
        ),
    ])
}

/// Bind-pose corner positions of [`quad_submesh`].
pub const QUAD_CORNERS: [[f32; 3]; 4] = [
    [-0.5, -0.5, 0.25],
    [0.5, -0.5, 0.25],
    [0.5, 0.5, 0.25],
    [-0.5, 0.5, 0.25],
];

/// A quad whose vertices each carry one full weight on `joint`.
pub fn quad_submesh(joint: usize, target: usize) -> SubMesh {
    let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
    SubMesh {
        vertices: (0..4)
            .map(|i| SkinVertex {
                tex_coords: uvs[i],
                span: VertexWeightSpan::new(i, 1),
            })
            .collect(),
        weights: QUAD_CORNERS
            .iter()
            .map(|corner| Weight::new(joint, *corner, 1.0))
            .collect(),
        indices: vec![0, 1, 2, 0, 2, 3],
        target,
    }
}

/// A quad whose vertices split their weight evenly between joints 0 and 1.
pub fn blended_quad_submesh(target: usize) -> SubMesh {
    let mut submesh = quad_submesh(0, target);
    submesh.weights = QUAD_CORNERS
        .iter()
        .flat_map(|corner| [Weight::new(0, *corner, 0.5), Weight::new(1, *corner, 0.5)])
        .collect();
    for (i, vertex) in submesh.vertices.iter_mut().enumerate() {
        vertex.span = VertexWeightSpan::new(2 * i, 2);
    }
    submesh
}

/// Device and queue of any adapter, without a window or surface.
#[cfg(feature = "integration-tests")]
pub async fn headless_device() -> (wgpu::Device, wgpu::Queue) {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .expect("integration tests need a GPU adapter");
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Test Device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
        })
        .await
        .expect("Failed to create a test device")
}

/// An sRGB texture the present pass can draw into.
#[cfg(feature = "integration-tests")]
pub fn offscreen_target(device: &wgpu::Device, size: [u32; 2]) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Target"),
        size: wgpu::Extent3d {
            width: size[0],
            height: size[1],
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}
