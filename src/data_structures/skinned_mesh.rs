//! Joint-weighted meshes and CPU skinning.
//!
//! A [`SkinnedMesh`] owns the immutable bind-pose data of its submeshes and a
//! [`MeshNode`] tree whose children receive the skinned output. Every frame
//! the caller poses a [`Skeleton`], calls [`SkinnedMesh::skin`] and later
//! [`BufferWriter::write_to_buffers`] to push the new vertex data to the GPU.
//!
//! # Layout
//!
//! Each vertex references a contiguous [`VertexWeightSpan`] of its submesh's
//! weight array. A [`Weight`] stores an offset position in the local space of
//! one joint, so the skinned position of a vertex is
//!
//! ```text
//! sum over weights w: (joints[w.joint_index].transform * w.position) * w.value
//! ```
//!
//! The root node of a skinned mesh has no geometry of its own. It only groups
//! the submesh targets.

use std::ops::Range;

use cgmath::{InnerSpace, Zero};
use log::{debug, error, warn};
use wgpu::util::DeviceExt;

use crate::{
    config::MeshConfig,
    data_structures::{
        geometry::{generate_normals, generate_tangents},
        skeleton::Skeleton,
        transform::Transform,
        vertex::slot,
    },
    error::SkinError,
    flow::BufferWriter,
    render::StageContext,
};

/// A joint-local offset position and its influence on one vertex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weight {
    pub joint_index: usize,
    pub position: cgmath::Vector3<f32>,
    pub value: f32,
}

impl Weight {
    pub fn new(joint_index: usize, position: impl Into<cgmath::Vector3<f32>>, value: f32) -> Self {
        Self {
            joint_index,
            position: position.into(),
            value,
        }
    }
}

/// A contiguous run of entries in a submesh's weight array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VertexWeightSpan {
    pub start: usize,
    pub count: usize,
}

impl VertexWeightSpan {
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    /// Saturates instead of overflowing; [`SubMesh::validate`] rejects such spans.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start.saturating_add(self.count)
    }
}

/// Bind-pose vertex of a submesh. Its position only exists through its weights.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SkinVertex {
    pub tex_coords: [f32; 2],
    pub span: VertexWeightSpan,
}

/// Immutable skinning input for one target mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubMesh {
    pub vertices: Vec<SkinVertex>,
    pub weights: Vec<Weight>,
    pub indices: Vec<u32>,
    /// Index of the child of the skinned mesh's root that receives the output.
    pub target: usize,
}

impl SubMesh {
    /// Checks that every span, joint and index reference is in range.
    ///
    /// Skinning itself trusts its input; loaders call this once.
    pub fn validate(&self, joint_count: usize) -> Result<(), SkinError> {
        for (vertex, v) in self.vertices.iter().enumerate() {
            match v.span.start.checked_add(v.span.count) {
                Some(end) if end <= self.weights.len() => (),
                end => {
                    return Err(SkinError::WeightSpanOutOfRange {
                        vertex,
                        end: end.unwrap_or(usize::MAX),
                        weights: self.weights.len(),
                    });
                }
            }
        }
        for (weight, w) in self.weights.iter().enumerate() {
            if w.joint_index >= joint_count {
                return Err(SkinError::JointOutOfRange {
                    weight,
                    joint: w.joint_index,
                    joints: joint_count,
                });
            }
        }
        if let Some(&index) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.vertices.len())
        {
            return Err(SkinError::IndexOutOfRange {
                index,
                vertices: self.vertices.len(),
            });
        }
        Ok(())
    }
}

/// The weighted sum of all joint-transformed weight positions of `vertex`.
///
/// A vertex without weights ends up at the origin.
///
/// # Panics
///
/// If the span or a joint index is out of range. See [`SubMesh::validate`].
pub fn skin_vertex(vertex: &SkinVertex, weights: &[Weight], skeleton: &Skeleton) -> [f32; 3] {
    weights[vertex.span.range()]
        .iter()
        .fold(cgmath::Vector3::zero(), |acc, weight| {
            let joint = &skeleton.joints[weight.joint_index];
            let moved = joint.transform * weight.position.extend(1.0);
            acc + moved.truncate() * weight.value
        })
        .into()
}

/// GPU side of a [`MeshGeometry`]: one buffer per attribute stream.
#[derive(Debug)]
pub struct MeshBuffers {
    pub positions: wgpu::Buffer,
    pub tex_coords: wgpu::Buffer,
    pub normals: wgpu::Buffer,
    pub tangents: wgpu::Buffer,
    pub indices: Option<wgpu::Buffer>,
    /// Single-instance buffer holding the node's world transform.
    pub transform: wgpu::Buffer,
}

/// CPU vertex arrays of a drawable mesh plus their optional GPU copies.
///
/// All per-vertex arrays have the same length. After `upload` the GPU buffers
/// keep their size for the lifetime of the geometry.
#[derive(Debug, Default)]
pub struct MeshGeometry {
    pub positions: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub buffers: Option<MeshBuffers>,
    pub texture: Option<wgpu::BindGroup>,
    dirty: bool,
    transform_dirty: bool,
}

impl MeshGeometry {
    /// Builds a mesh and derives its normals and tangents as `config` asks.
    pub fn new(
        positions: Vec<[f32; 3]>,
        tex_coords: Vec<[f32; 2]>,
        indices: Vec<u32>,
        config: MeshConfig,
    ) -> Self {
        let vertex_count = positions.len();
        let mut geometry = Self {
            positions,
            tex_coords,
            normals: vec![[0.0; 3]; vertex_count],
            tangents: vec![[0.0; 3]; vertex_count],
            indices,
            ..Default::default()
        };
        geometry.tex_coords.resize(vertex_count, [0.0; 2]);
        geometry.regenerate(config);
        geometry
    }

    /// An all-zero mesh with room for `vertex_count` vertices.
    pub fn with_vertex_count(vertex_count: usize, indices: Vec<u32>) -> Self {
        Self {
            positions: vec![[0.0; 3]; vertex_count],
            tex_coords: vec![[0.0; 2]; vertex_count],
            normals: vec![[0.0; 3]; vertex_count],
            tangents: vec![[0.0; 3]; vertex_count],
            indices,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether the CPU arrays changed since the last upload.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn set_texture(&mut self, texture: wgpu::BindGroup) {
        self.texture = Some(texture);
    }

    /// Recomputes normals and tangents from the current positions.
    pub fn regenerate(&mut self, config: MeshConfig) {
        if config.generate_normals {
            self.normals = generate_normals(&self.positions, &self.indices);
        }
        if config.generate_tangents {
            self.tangents = generate_tangents(&self.positions, &self.tex_coords, &self.indices);
        }
    }

    /// Creates the GPU buffers, sized to the current arrays.
    ///
    /// Empty geometry gets no buffers and is never drawn.
    pub fn upload(&mut self, device: &wgpu::Device, label: &str, world: &Transform) {
        if self.is_empty() {
            debug!("Skipping upload of empty geometry {}", label);
            return;
        }
        let usage = wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST;
        let init = |name: &str, contents: &[u8], usage| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} {} Buffer", label, name)),
                contents,
                usage,
            })
        };
        let indices = (!self.indices.is_empty()).then(|| {
            init(
                "Index",
                bytemuck::cast_slice(&self.indices),
                wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            )
        });
        self.buffers = Some(MeshBuffers {
            positions: init("Position", bytemuck::cast_slice(&self.positions), usage),
            tex_coords: init("TexCoord", bytemuck::cast_slice(&self.tex_coords), usage),
            normals: init("Normal", bytemuck::cast_slice(&self.normals), usage),
            tangents: init("Tangent", bytemuck::cast_slice(&self.tangents), usage),
            indices,
            transform: init("Transform", bytemuck::cast_slice(&[world.to_raw()]), usage),
        });
        self.dirty = false;
        self.transform_dirty = false;
    }

    /// Overwrites the existing GPU buffers with the CPU arrays.
    ///
    /// Buffers are never reallocated: an array that outgrew its buffer is
    /// skipped and reported.
    pub fn rebuffer(&mut self, queue: &wgpu::Queue) {
        let Some(buffers) = &self.buffers else {
            if !self.is_empty() {
                warn!("Tried to rebuffer geometry that was never uploaded");
            }
            return;
        };
        write_within(queue, &buffers.positions, bytemuck::cast_slice(&self.positions), "positions");
        write_within(queue, &buffers.tex_coords, bytemuck::cast_slice(&self.tex_coords), "tex coords");
        write_within(queue, &buffers.normals, bytemuck::cast_slice(&self.normals), "normals");
        write_within(queue, &buffers.tangents, bytemuck::cast_slice(&self.tangents), "tangents");
        if let Some(index_buffer) = &buffers.indices {
            write_within(queue, index_buffer, bytemuck::cast_slice(&self.indices), "indices");
        }
        self.dirty = false;
    }

    fn write_transform(&mut self, queue: &wgpu::Queue, world: &Transform) {
        if let Some(buffers) = &self.buffers {
            queue.write_buffer(&buffers.transform, 0, bytemuck::cast_slice(&[world.to_raw()]));
            self.transform_dirty = false;
        }
    }

    fn draw(&self, stage: &StageContext<'_>, render_pass: &mut wgpu::RenderPass<'_>) {
        let Some(buffers) = &self.buffers else {
            return;
        };
        if !stage.stage.draws_geometry() {
            warn!("Skipping geometry drawn outside the scene pass ({:?})", stage.stage);
            return;
        }
        if self.dirty {
            warn!("Drawing geometry whose CPU data has not been written to its buffers");
        }
        let texture = self.texture.as_ref().unwrap_or(stage.texture);
        render_pass.set_bind_group(0, texture, &[]);
        render_pass.set_bind_group(1, stage.camera, &[]);
        render_pass.set_vertex_buffer(slot::POSITION, buffers.positions.slice(..));
        render_pass.set_vertex_buffer(slot::TEX_COORD, buffers.tex_coords.slice(..));
        render_pass.set_vertex_buffer(slot::NORMAL, buffers.normals.slice(..));
        render_pass.set_vertex_buffer(slot::TANGENT, buffers.tangents.slice(..));
        render_pass.set_vertex_buffer(slot::TRANSFORM, buffers.transform.slice(..));
        match &buffers.indices {
            Some(index_buffer) => {
                render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..self.indices.len() as u32, 0, 0..1);
            }
            None => render_pass.draw(0..self.vertex_count() as u32, 0..1),
        }
    }
}

fn write_within(queue: &wgpu::Queue, buffer: &wgpu::Buffer, bytes: &[u8], what: &str) {
    if bytes.len() as wgpu::BufferAddress > buffer.size() {
        error!(
            "Skipping upload of {}: {} bytes do not fit into a {} byte buffer",
            what,
            bytes.len(),
            buffer.size()
        );
        return;
    }
    queue.write_buffer(buffer, 0, bytes);
}

/// A node of a mesh hierarchy.
///
/// Nodes without geometry only group their children. Drawing visits the
/// children first and the node's own geometry last.
#[derive(Debug, Default)]
pub struct MeshNode {
    pub geometry: Option<MeshGeometry>,
    pub children: Vec<MeshNode>,
    pub local: Transform,
    pub world: Transform,
}

impl MeshNode {
    /// An empty grouping node.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_geometry(geometry: MeshGeometry) -> Self {
        Self {
            geometry: Some(geometry),
            ..Default::default()
        }
    }

    /// Appends `child` and returns its index.
    pub fn add_child(&mut self, child: MeshNode) -> usize {
        self.children.push(child);
        self.children.len() - 1
    }

    pub fn child(&self, idx: usize) -> Option<&MeshNode> {
        self.children.get(idx)
    }

    pub fn child_mut(&mut self, idx: usize) -> Option<&mut MeshNode> {
        self.children.get_mut(idx)
    }

    pub fn set_local_transform(&mut self, local: Transform) {
        self.local = local;
    }

    /// Recomputes `world = parent * local` for this node and all descendants.
    pub fn update_world_transforms(&mut self, parent: &Transform) {
        self.world = parent * &self.local;
        if let Some(geometry) = self.geometry.as_mut() {
            geometry.transform_dirty = true;
        }
        let world = self.world;
        for child in self.children.iter_mut() {
            child.update_world_transforms(&world);
        }
    }

    /// Calls `f` for every node in draw order: children before their parent.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a MeshNode)) {
        for child in &self.children {
            child.visit(f);
        }
        f(self);
    }

    /// The non-empty geometries of this tree in the order they are drawn.
    pub fn collect_drawables(&self) -> Vec<&MeshGeometry> {
        let mut drawables = Vec::new();
        self.visit(&mut |node| {
            if let Some(geometry) = node.geometry.as_ref().filter(|g| !g.is_empty()) {
                drawables.push(geometry);
            }
        });
        drawables
    }

    /// Whether any geometry of this tree still has to be written to the GPU.
    pub fn is_dirty(&self) -> bool {
        self.geometry.as_ref().is_some_and(|g| g.dirty) || self.children.iter().any(|c| c.is_dirty())
    }

    /// Creates GPU buffers for every geometry of the tree.
    pub fn upload(&mut self, device: &wgpu::Device, label: &str) {
        for (i, child) in self.children.iter_mut().enumerate() {
            child.upload(device, &format!("{label}/{i}"));
        }
        let world = self.world;
        if let Some(geometry) = self.geometry.as_mut() {
            geometry.upload(device, label, &world);
        }
    }

    /// Records the draw calls of the whole tree into `render_pass`.
    pub fn draw(&self, stage: &StageContext<'_>, render_pass: &mut wgpu::RenderPass<'_>) {
        for child in &self.children {
            child.draw(stage, render_pass);
        }
        if let Some(geometry) = &self.geometry {
            geometry.draw(stage, render_pass);
        }
    }
}

impl BufferWriter for MeshNode {
    /// Writes dirty vertex data and changed world transforms to the GPU.
    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        for child in self.children.iter_mut() {
            child.write_to_buffers(queue);
        }
        let world = self.world;
        if let Some(geometry) = self.geometry.as_mut() {
            if geometry.dirty {
                geometry.rebuffer(queue);
            }
            if geometry.transform_dirty {
                geometry.write_transform(queue, &world);
            }
        }
    }
}

/// A joint-weighted mesh and the node tree its submeshes are skinned into.
#[derive(Debug)]
pub struct SkinnedMesh {
    pub submeshes: Vec<SubMesh>,
    pub root: MeshNode,
    pub config: MeshConfig,
}

impl SkinnedMesh {
    /// Creates one root child per submesh target, sized to that submesh.
    ///
    /// Children that no submesh targets stay empty.
    pub fn new(submeshes: Vec<SubMesh>, config: MeshConfig) -> Self {
        let child_count = submeshes.iter().map(|s| s.target + 1).max().unwrap_or(0);
        let mut root = MeshNode::new();
        root.children = (0..child_count).map(|_| MeshNode::new()).collect();
        for submesh in &submeshes {
            let mut geometry =
                MeshGeometry::with_vertex_count(submesh.vertices.len(), submesh.indices.clone());
            geometry.tex_coords = submesh.vertices.iter().map(|v| v.tex_coords).collect();
            if root.children[submesh.target].geometry.is_some() {
                warn!(
                    "Two submeshes target child {}, the later one wins",
                    submesh.target
                );
            }
            root.children[submesh.target].geometry = Some(geometry);
        }
        Self {
            submeshes,
            root,
            config,
        }
    }

    /// Builds the mesh and skins it once into `skeleton`'s pose.
    pub fn posed(submeshes: Vec<SubMesh>, config: MeshConfig, skeleton: &Skeleton) -> Self {
        let mut mesh = Self::new(submeshes, config);
        mesh.skin(skeleton);
        mesh
    }

    /// Checks every submesh against a skeleton of `joint_count` joints.
    pub fn validate(&self, joint_count: usize) -> Result<(), SkinError> {
        self.submeshes
            .iter()
            .try_for_each(|submesh| submesh.validate(joint_count))
    }

    /// Skins every submesh into its target using the joints of `skeleton`.
    ///
    /// Texture coordinates are copied, positions recomputed, normals and
    /// tangents regenerated as [`MeshConfig`] asks, and each target is marked
    /// dirty. Nothing is sent to the GPU; see [`BufferWriter::write_to_buffers`].
    ///
    /// # Panics
    ///
    /// If a submesh targets a child that doesn't exist, or references a weight
    /// or joint out of range.
    pub fn skin(&mut self, skeleton: &Skeleton) {
        for submesh in &self.submeshes {
            let target = &mut self.root.children[submesh.target];
            let geometry = target
                .geometry
                .get_or_insert_with(|| MeshGeometry::with_vertex_count(0, submesh.indices.clone()));

            let vertex_count = submesh.vertices.len();
            if geometry.vertex_count() != vertex_count {
                if geometry.buffers.is_some() {
                    warn!(
                        "Submesh for child {} has {} vertices but its geometry was uploaded with {}",
                        submesh.target,
                        vertex_count,
                        geometry.vertex_count()
                    );
                }
                geometry.positions.resize(vertex_count, [0.0; 3]);
                geometry.tex_coords.resize(vertex_count, [0.0; 2]);
                geometry.normals.resize(vertex_count, [0.0; 3]);
                geometry.tangents.resize(vertex_count, [0.0; 3]);
            }

            for (j, vertex) in submesh.vertices.iter().enumerate() {
                geometry.tex_coords[j] = vertex.tex_coords;
                geometry.positions[j] = skin_vertex(vertex, &submesh.weights, skeleton);
            }

            geometry.regenerate(self.config);
            geometry.mark_dirty();
        }
    }

    /// [`skin`](Self::skin) followed by [`write_to_buffers`](BufferWriter::write_to_buffers).
    pub fn skin_and_upload(&mut self, skeleton: &Skeleton, queue: &wgpu::Queue) {
        self.skin(skeleton);
        self.write_to_buffers(queue);
    }

    pub fn upload(&mut self, device: &wgpu::Device) {
        self.root.upload(device, "Skinned Mesh");
    }

    pub fn draw(&self, stage: &StageContext<'_>, render_pass: &mut wgpu::RenderPass<'_>) {
        self.root.draw(stage, render_pass);
    }

    /// The skinned output of child `target`, if it has any geometry.
    pub fn target(&self, target: usize) -> Option<&MeshGeometry> {
        self.root.child(target)?.geometry.as_ref()
    }

    /// Length of the longest normal across all targets. Mostly for diagnostics.
    pub fn max_normal_length(&self) -> f32 {
        self.root
            .collect_drawables()
            .iter()
            .flat_map(|g| g.normals.iter())
            .map(|n| cgmath::Vector3::from(*n).magnitude())
            .fold(0.0, f32::max)
    }
}

impl BufferWriter for SkinnedMesh {
    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        self.root.write_to_buffers(queue);
    }
}

#[cfg(test)]
mod tests {
    use cgmath::SquareMatrix;

    use super::*;
    use crate::data_structures::skeleton::Joint;

    fn single_weight_vertex(start: usize, uv: [f32; 2]) -> SkinVertex {
        SkinVertex {
            tex_coords: uv,
            span: VertexWeightSpan::new(start, 1),
        }
    }

    fn triangle_submesh(target: usize) -> SubMesh {
        SubMesh {
            vertices: vec![
                single_weight_vertex(0, [0.0, 0.0]),
                single_weight_vertex(1, [1.0, 0.0]),
                single_weight_vertex(2, [0.0, 1.0]),
            ],
            weights: vec![
                Weight::new(0, [0.0, 0.0, 0.0], 1.0),
                Weight::new(0, [1.0, 0.0, 0.0], 1.0),
                Weight::new(0, [0.0, 1.0, 0.0], 1.0),
            ],
            indices: vec![0, 1, 2],
            target,
        }
    }

    #[test]
    fn blends_two_joints() {
        let skeleton = Skeleton::new(vec![
            Joint::new("a", None, cgmath::Matrix4::identity()),
            Joint::new(
                "b",
                Some(0),
                cgmath::Matrix4::from_translation(cgmath::Vector3::new(0.0, 2.0, 0.0)),
            ),
        ]);
        let weights = vec![
            Weight::new(0, [1.0, 0.0, 0.0], 0.5),
            Weight::new(1, [1.0, 0.0, 0.0], 0.5),
        ];
        let vertex = SkinVertex {
            tex_coords: [0.0, 0.0],
            span: VertexWeightSpan::new(0, 2),
        };
        assert_eq!(skin_vertex(&vertex, &weights, &skeleton), [1.0, 1.0, 0.0]);
    }

    #[test]
    fn vertex_without_weights_sits_at_origin() {
        let vertex = SkinVertex::default();
        assert_eq!(skin_vertex(&vertex, &[], &Skeleton::default()), [0.0; 3]);
    }

    #[test]
    fn skin_copies_uvs_and_marks_target_dirty() {
        let mut mesh = SkinnedMesh::new(vec![triangle_submesh(0)], MeshConfig::default());
        assert!(!mesh.root.is_dirty());

        mesh.skin(&Skeleton::identity(1));

        let target = mesh.target(0).unwrap();
        assert!(target.is_dirty());
        assert_eq!(target.tex_coords[1], [1.0, 0.0]);
        assert_eq!(target.positions[2], [0.0, 1.0, 0.0]);
        assert_eq!(target.normals[0], [0.0, 0.0, 1.0]);
        assert_eq!(target.tangents[0], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn positions_only_config_leaves_normals_alone() {
        let mut mesh = SkinnedMesh::new(vec![triangle_submesh(0)], MeshConfig::positions_only());
        mesh.skin(&Skeleton::identity(1));
        assert_eq!(mesh.target(0).unwrap().normals, vec![[0.0; 3]; 3]);
    }

    #[test]
    fn root_has_no_geometry() {
        let mesh = SkinnedMesh::new(vec![triangle_submesh(1)], MeshConfig::default());
        assert!(mesh.root.geometry.is_none());
        assert_eq!(mesh.root.children.len(), 2);
        assert!(mesh.target(0).is_none());
        assert!(mesh.target(1).is_some());
    }

    #[test]
    #[should_panic]
    fn missing_target_child_panics() {
        let mut mesh = SkinnedMesh::new(vec![triangle_submesh(0)], MeshConfig::default());
        mesh.root.children.clear();
        mesh.skin(&Skeleton::identity(1));
    }

    #[test]
    fn overflowing_weight_span_is_rejected() {
        let submesh = SubMesh {
            vertices: vec![SkinVertex {
                tex_coords: [0.0, 0.0],
                span: VertexWeightSpan::new(usize::MAX, 2),
            }],
            weights: vec![Weight::new(0, [0.0, 0.0, 0.0], 1.0)],
            indices: vec![],
            target: 0,
        };
        assert_eq!(
            submesh.validate(1),
            Err(SkinError::WeightSpanOutOfRange {
                vertex: 0,
                end: usize::MAX,
                weights: 1
            })
        );
        assert_eq!(submesh.vertices[0].span.range(), usize::MAX..usize::MAX);
    }

    #[test]
    fn validate_reports_bad_references() {
        let mut submesh = triangle_submesh(0);
        assert_eq!(submesh.validate(1), Ok(()));
        assert_eq!(
            submesh.validate(0),
            Err(SkinError::JointOutOfRange {
                weight: 0,
                joint: 0,
                joints: 0
            })
        );

        submesh.vertices[2].span = VertexWeightSpan::new(2, 2);
        assert_eq!(
            submesh.validate(1),
            Err(SkinError::WeightSpanOutOfRange {
                vertex: 2,
                end: 4,
                weights: 3
            })
        );

        let mut submesh = triangle_submesh(0);
        submesh.indices.push(7);
        assert_eq!(
            submesh.validate(1),
            Err(SkinError::IndexOutOfRange {
                index: 7,
                vertices: 3
            })
        );
    }

    #[test]
    fn children_are_visited_before_parent() {
        let mut root = MeshNode::with_geometry(MeshGeometry::with_vertex_count(1, vec![]));
        root.add_child(MeshNode::with_geometry(MeshGeometry::with_vertex_count(2, vec![])));
        root.add_child(MeshNode::new());

        let counts: Vec<_> = root
            .collect_drawables()
            .iter()
            .map(|g| g.vertex_count())
            .collect();
        assert_eq!(counts, vec![2, 1]);
    }

    #[test]
    fn world_transforms_propagate() {
        let mut root = MeshNode::new();
        root.local = Transform::from(cgmath::Vector3::new(1.0, 0.0, 0.0));
        let mut child = MeshNode::new();
        child.local = Transform::from(cgmath::Vector3::new(0.0, 2.0, 0.0));
        root.add_child(child);

        root.update_world_transforms(&Transform::default());

        assert_eq!(
            root.children[0].world.position,
            cgmath::Vector3::new(1.0, 2.0, 0.0)
        );
    }
}
