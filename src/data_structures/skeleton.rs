//! Posed skeletons.
//!
//! A [`Skeleton`] is the output of the animation system for one frame: every
//! joint already carries its final world transform. Skinning only reads it.

use cgmath::SquareMatrix;

/// A single joint of a posed skeleton.
#[derive(Clone, Debug, PartialEq)]
pub struct Joint {
    pub name: String,
    pub parent: Option<usize>,
    /// World transform of the joint in the current pose.
    pub transform: cgmath::Matrix4<f32>,
}

impl Joint {
    pub fn new(name: impl Into<String>, parent: Option<usize>, transform: cgmath::Matrix4<f32>) -> Self {
        Self {
            name: name.into(),
            parent,
            transform,
        }
    }
}

/// Ordered joints, indexed by joint id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Skeleton {
    pub joints: Vec<Joint>,
}

impl Skeleton {
    pub fn new(joints: Vec<Joint>) -> Self {
        Self { joints }
    }

    /// A flat skeleton of `count` root joints, all at the identity transform.
    pub fn identity(count: usize) -> Self {
        let joints = (0..count)
            .map(|i| Joint::new(format!("joint_{i}"), None, cgmath::Matrix4::identity()))
            .collect();
        Self { joints }
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn joint(&self, idx: usize) -> Option<&Joint> {
        self.joints.get(idx)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Overwrites the world transform of joint `idx`.
    ///
    /// Returns `false` and leaves the skeleton untouched if `idx` is out of range.
    pub fn set_transform(&mut self, idx: usize, transform: cgmath::Matrix4<f32>) -> bool {
        match self.joints.get_mut(idx) {
            Some(joint) => {
                joint.transform = transform;
                true
            }
            None => {
                log::warn!(
                    "Tried to pose joint {} but the skeleton only has {} joints.",
                    idx,
                    self.joints.len()
                );
                false
            }
        }
    }
}
