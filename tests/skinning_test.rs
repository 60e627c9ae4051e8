use skinpost_ngin::{
    config::MeshConfig,
    data_structures::{
        skeleton::Skeleton,
        skinned_mesh::{SkinVertex, SkinnedMesh, VertexWeightSpan, skin_vertex},
    },
};

use crate::common::test_utils::{
    QUAD_CORNERS, blended_quad_submesh, quad_submesh, two_joint_skeleton,
};

mod common;

#[test]
fn identity_pose_reproduces_bind_pose_exactly() {
    let mut mesh = SkinnedMesh::new(vec![quad_submesh(1, 0)], MeshConfig::positions_only());
    mesh.skin(&Skeleton::identity(2));

    let target = mesh.target(0).unwrap();
    assert_eq!(target.positions, QUAD_CORNERS.to_vec());
    assert_eq!(target.tex_coords[2], [1.0, 0.0]);
}

#[test]
fn blended_weights_move_halfway() {
    let mut mesh = SkinnedMesh::new(vec![blended_quad_submesh(0)], MeshConfig::default());
    mesh.validate(2).unwrap();
    mesh.skin(&two_joint_skeleton());

    let target = mesh.target(0).unwrap();
    for (skinned, corner) in target.positions.iter().zip(QUAD_CORNERS) {
        assert_eq!(*skinned, [corner[0], corner[1] + 1.0, corner[2]]);
    }
    // still a flat quad facing +Z
    assert!(target.normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));
}

#[test]
fn moving_a_joint_reskins_only_its_vertices() {
    let mut mesh = SkinnedMesh::new(
        vec![quad_submesh(0, 0), quad_submesh(1, 1)],
        MeshConfig::positions_only(),
    );
    let mut skeleton = Skeleton::identity(2);
    mesh.skin(&skeleton);

    assert!(skeleton.set_transform(
        1,
        skinpost_ngin::Matrix4::from_translation(skinpost_ngin::Vector3::new(3.0, 0.0, 0.0)),
    ));
    mesh.skin(&skeleton);

    assert_eq!(mesh.target(0).unwrap().positions, QUAD_CORNERS.to_vec());
    assert_eq!(mesh.target(1).unwrap().positions[0], [2.5, -0.5, 0.25]);
}

#[test]
fn vertex_without_weights_collapses_to_origin() {
    let vertex = SkinVertex {
        tex_coords: [0.5, 0.5],
        span: VertexWeightSpan::new(0, 0),
    };
    let submesh = quad_submesh(0, 0);
    assert_eq!(
        skin_vertex(&vertex, &submesh.weights, &two_joint_skeleton()),
        [0.0, 0.0, 0.0]
    );
}

#[test]
fn skinning_rejects_unknown_joints_before_it_runs() {
    let mesh = SkinnedMesh::new(vec![quad_submesh(1, 0)], MeshConfig::default());
    assert!(mesh.validate(1).is_err());
    assert!(mesh.validate(2).is_ok());
}

#[test]
fn root_groups_submesh_targets() {
    let mesh = SkinnedMesh::posed(
        vec![quad_submesh(0, 0), quad_submesh(0, 2)],
        MeshConfig::default(),
        &Skeleton::identity(1),
    );
    assert!(mesh.root.geometry.is_none());
    assert_eq!(mesh.root.children.len(), 3);
    assert_eq!(mesh.root.collect_drawables().len(), 3);
    assert!(mesh.root.is_dirty());
    assert!(mesh.max_normal_length() <= 1.0 + 1e-6);
}
