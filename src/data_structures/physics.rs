//! Rigid bodies that drive the transform of a mesh node.

use cgmath::{InnerSpace, SquareMatrix, Zero};
use instant::Duration;

use crate::data_structures::{skinned_mesh::MeshNode, transform::Transform};

/// Linear and angular state of a rigid body.
///
/// An inverse mass of zero makes the body immovable; a zero inverse inertia
/// tensor keeps it from rotating.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsEntity {
    pub position: cgmath::Vector3<f32>,
    pub linear_velocity: cgmath::Vector3<f32>,
    pub force: cgmath::Vector3<f32>,
    pub inv_mass: f32,

    pub orientation: cgmath::Quaternion<f32>,
    pub angular_velocity: cgmath::Vector3<f32>,
    pub torque: cgmath::Vector3<f32>,
    pub inv_inertia: cgmath::Matrix3<f32>,
}

impl Default for PhysicsEntity {
    fn default() -> Self {
        Self::new(
            cgmath::Quaternion::new(1.0, 0.0, 0.0, 0.0),
            cgmath::Vector3::zero(),
        )
    }
}

impl PhysicsEntity {
    /// A static body at `position`.
    pub fn new(orientation: cgmath::Quaternion<f32>, position: cgmath::Vector3<f32>) -> Self {
        Self {
            position,
            linear_velocity: cgmath::Vector3::zero(),
            force: cgmath::Vector3::zero(),
            inv_mass: 0.0,
            orientation,
            angular_velocity: cgmath::Vector3::zero(),
            torque: cgmath::Vector3::zero(),
            inv_inertia: cgmath::Matrix3::zero(),
        }
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.inv_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
        self
    }

    /// Inertia tensor of a solid sphere.
    pub fn with_sphere_inertia(mut self, mass: f32, radius: f32) -> Self {
        let i = 0.4 * mass * radius * radius;
        self.inv_inertia = if i > 0.0 {
            cgmath::Matrix3::from_value(1.0 / i)
        } else {
            cgmath::Matrix3::zero()
        };
        self
    }

    pub fn apply_force(&mut self, force: cgmath::Vector3<f32>) {
        self.force += force;
    }

    pub fn apply_torque(&mut self, torque: cgmath::Vector3<f32>) {
        self.torque += torque;
    }

    /// Orientation and position as a node transform.
    pub fn build_transform(&self) -> Transform {
        Transform::from_position_rotation(self.position, self.orientation)
    }

    /// Advances the body by `dt` and clears the accumulated force and torque.
    ///
    /// Velocities are integrated before positions (semi-implicit Euler). If a
    /// `target` is given its local transform follows the body.
    pub fn update(&mut self, dt: Duration, target: Option<&mut MeshNode>) {
        let dt = dt.as_secs_f32();

        self.linear_velocity += self.force * (self.inv_mass * dt);
        self.position += self.linear_velocity * dt;

        self.angular_velocity += self.inv_inertia * self.torque * dt;
        let spin = cgmath::Quaternion::from_sv(0.0, self.angular_velocity) * self.orientation;
        let orientation = self.orientation + spin * (0.5 * dt);
        if orientation.magnitude2() > 0.0 {
            self.orientation = orientation.normalize();
        }

        self.force = cgmath::Vector3::zero();
        self.torque = cgmath::Vector3::zero();

        if let Some(node) = target {
            node.set_local_transform(self.build_transform());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_body_ignores_force() {
        let mut body = PhysicsEntity::default();
        body.apply_force(cgmath::Vector3::new(10.0, 0.0, 0.0));
        body.update(Duration::from_secs(1), None);
        assert_eq!(body.position, cgmath::Vector3::zero());
        assert_eq!(body.force, cgmath::Vector3::zero());
    }

    #[test]
    fn velocity_is_integrated_before_position() {
        let mut body = PhysicsEntity::default().with_mass(2.0);
        body.apply_force(cgmath::Vector3::new(4.0, 0.0, 0.0));
        body.update(Duration::from_secs(1), None);
        assert_eq!(body.linear_velocity, cgmath::Vector3::new(2.0, 0.0, 0.0));
        assert_eq!(body.position, cgmath::Vector3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn update_moves_target_node() {
        let mut node = MeshNode::new();
        let mut body = PhysicsEntity::default().with_mass(1.0);
        body.linear_velocity = cgmath::Vector3::new(0.0, 0.0, -1.0);
        body.update(Duration::from_millis(500), Some(&mut node));
        assert_eq!(node.local.position, cgmath::Vector3::new(0.0, 0.0, -0.5));
    }

    #[test]
    fn torque_spins_body() {
        let mut body = PhysicsEntity::default().with_sphere_inertia(1.0, 1.0);
        body.apply_torque(cgmath::Vector3::new(0.0, 1.0, 0.0));
        body.update(Duration::from_millis(100), None);
        assert!(body.angular_velocity.y > 0.0);
        assert!((body.orientation.magnitude() - 1.0).abs() < 1e-5);
        assert!(body.orientation.v.y > 0.0);
    }
}
