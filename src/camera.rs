//! Camera, projection and the matching GPU uniform.
//!
//! Besides the usual view/projection matrices this module can map screen
//! coordinates back into the world ([`unproject`], [`mouse_direction`]) and
//! provides the fixed orthographic setup used by the full-screen passes
//! ([`orthographic_quad`]).

use cgmath::{InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3, perspective};
use wgpu::util::DeviceExt;

/// Maps OpenGL clip space (z in -1..1) to the wgpu convention (z in 0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_FRAC_PI_2: f32 = std::f32::consts::FRAC_PI_2 - 0.0001;

/// A free-look camera described by its position and two angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        let pitch: Rad<f32> = pitch.into();
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: Rad(pitch.0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2)),
        }
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
    }

    /// The view matrix.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
    }
}

/// Perspective projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if height == 0 {
            log::warn!("Ignoring projection resize to zero height");
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Projection of the full-screen passes: the [-1, 1] quad covers the viewport.
pub fn orthographic_quad() -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * cgmath::ortho(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0)
}

/// Camera data as laid out in the scene shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    // vec4 for the 16 byte alignment of uniforms
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

/// The camera together with its uniform buffer and bind group.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub projection: Projection,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, camera: Camera, projection: Projection) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, &projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = uniform_layout(device, "camera_bind_group_layout");

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            projection,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Recomputes the uniform from camera and projection and uploads it.
    pub fn write(&mut self, queue: &wgpu::Queue) {
        self.uniform.update_view_proj(&self.camera, &self.projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

/// Layout of a single uniform buffer at binding 0, visible to both stages.
pub fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some(label),
    })
}

/// Maps a window position back into world space.
///
/// `screen` is (x, y) in pixels with the origin at the top left and z the
/// depth in [0, 1] (0 = near plane). Returns `None` if `view * proj` is not
/// invertible.
pub fn unproject(
    screen: Vector3<f32>,
    viewport: (f32, f32),
    view: &Matrix4<f32>,
    proj: &Matrix4<f32>,
) -> Option<Vector3<f32>> {
    let inverse = (proj * view).invert()?;
    let ndc = cgmath::Vector4::new(
        2.0 * screen.x / viewport.0 - 1.0,
        1.0 - 2.0 * screen.y / viewport.1,
        screen.z,
        1.0,
    );
    let world = inverse * ndc;
    if world.w.abs() <= f32::EPSILON {
        return None;
    }
    Some(world.truncate() / world.w)
}

/// Unit ray from the near to the far plane through the pixel under the mouse.
pub fn mouse_direction(
    mouse: (f32, f32),
    viewport: (f32, f32),
    view: &Matrix4<f32>,
    proj: &Matrix4<f32>,
) -> Option<Vector3<f32>> {
    let near = unproject(Vector3::new(mouse.0, mouse.1, 0.0), viewport, view, proj)?;
    let far = unproject(Vector3::new(mouse.0, mouse.1, 1.0), viewport, view, proj)?;
    let direction = far - near;
    (direction.magnitude2() > 0.0).then(|| direction.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking_down_z() -> (Matrix4<f32>, Matrix4<f32>) {
        let camera = Camera::new((0.0, 0.0, 0.0), cgmath::Deg(-90.0), cgmath::Deg(0.0));
        let projection = Projection::new(800, 600, cgmath::Deg(45.0), 1.0, 100.0);
        (camera.calc_matrix(), projection.calc_matrix())
    }

    fn close(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).magnitude() < 1e-3
    }

    #[test]
    fn yaw_minus_ninety_looks_down_negative_z() {
        let camera = Camera::new((0.0, 0.0, 0.0), cgmath::Deg(-90.0), cgmath::Deg(0.0));
        assert!(close(camera.forward(), Vector3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn pitch_is_clamped() {
        let camera = Camera::new((0.0, 0.0, 0.0), cgmath::Deg(0.0), cgmath::Deg(120.0));
        assert!(camera.pitch.0 < std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn screen_centre_unprojects_onto_view_axis() {
        let (view, proj) = looking_down_z();
        let near = unproject(Vector3::new(400.0, 300.0, 0.0), (800.0, 600.0), &view, &proj).unwrap();
        assert!(close(near, Vector3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn mouse_in_centre_points_forward() {
        let (view, proj) = looking_down_z();
        let dir = mouse_direction((400.0, 300.0), (800.0, 600.0), &view, &proj).unwrap();
        assert!(close(dir, Vector3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn mouse_top_left_points_up_and_left() {
        let (view, proj) = looking_down_z();
        let dir = mouse_direction((0.0, 0.0), (800.0, 600.0), &view, &proj).unwrap();
        assert!(dir.x < 0.0 && dir.y > 0.0 && dir.z < 0.0);
    }

    #[test]
    fn orthographic_quad_keeps_corners() {
        let corner = orthographic_quad() * cgmath::Vector4::new(1.0, -1.0, 0.0, 1.0);
        assert!(close(corner.truncate(), Vector3::new(1.0, -1.0, 0.5)));
    }
}
