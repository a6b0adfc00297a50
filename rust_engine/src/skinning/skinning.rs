//! 线性混合蒙皮内核

use glam::{Mat4, Vec3A};

use super::SkinRange;
use crate::influence::{BoneIndex, InfluenceStreams, InfluenceView};
use crate::stream::VertexStreams;

/// 对一个区间执行蒙皮
///
/// 位置：Σ wᵢ·(Mᵢ·p)；法线/切线只用矩阵的线性部分，结果归一化，切线 w 保持不变。
/// 没有任何影响的顶点保持绑定姿势。
pub fn skin_range(
    range: &mut SkinRange<'_>,
    bind: &VertexStreams,
    influences: InfluenceStreams<'_>,
    bone_matrices: &[Mat4],
) {
    match influences {
        InfluenceStreams::Small(view) => skin_range_with(range, bind, view, bone_matrices),
        InfluenceStreams::Wide(view) => skin_range_with(range, bind, view, bone_matrices),
    }
}

fn skin_range_with<I: BoneIndex>(
    range: &mut SkinRange<'_>,
    bind: &VertexStreams,
    view: InfluenceView<'_, I>,
    bone_matrices: &[Mat4],
) {
    let capacity = bind.vertex_count().min(view.vertex_count());
    debug_assert!(
        range.end() <= capacity,
        "skin range {}..{} exceeds {} vertices",
        range.start,
        range.end(),
        capacity
    );
    let end = range.end().min(capacity);
    if range.start >= end {
        return;
    }

    let src_normals = bind.normals.as_deref().unwrap_or(&[]);
    let src_tangents = bind.tangents.as_deref().unwrap_or(&[]);
    let skin_positions = !range.positions.is_empty();
    let skin_normals = !range.normals.is_empty() && !src_normals.is_empty();
    let skin_tangents = !range.tangents.is_empty() && !src_tangents.is_empty();

    for vertex in range.start..end {
        let local = vertex - range.start;

        let mut position = Vec3A::ZERO;
        let mut normal = Vec3A::ZERO;
        let mut tangent = Vec3A::ZERO;
        let mut influenced = false;

        for (bone, weight) in view.vertex(vertex) {
            influenced = true;
            let m = get_matrix(bone_matrices, bone);
            if skin_positions {
                position += m.transform_point3a(bind.positions[vertex]) * weight;
            }
            if skin_normals {
                normal += m.transform_vector3a(src_normals[vertex]) * weight;
            }
            if skin_tangents {
                let t = Vec3A::from(src_tangents[vertex].truncate());
                tangent += m.transform_vector3a(t) * weight;
            }
        }

        if !influenced {
            position = bind.positions[vertex];
            if skin_normals {
                normal = src_normals[vertex];
            }
            if skin_tangents {
                tangent = Vec3A::from(src_tangents[vertex].truncate());
            }
        }

        if skin_positions {
            range.positions[local] = position;
        }
        if skin_normals {
            range.normals[local] = normal.normalize_or_zero();
        }
        if skin_tangents {
            let w = src_tangents[vertex].w;
            range.tangents[local] = tangent.normalize_or_zero().extend(w);
        }
    }
}

fn get_matrix(matrices: &[Mat4], index: usize) -> &Mat4 {
    const IDENTITY: Mat4 = Mat4::IDENTITY;
    matrices.get(index).unwrap_or(&IDENTITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::influence::InfluenceCodec;
    use crate::skinning::split_ranges;
    use crate::stream::{AttributeMask, OutputStreams};
    use glam::{Quat, Vec3, Vec4};

    fn bind_streams() -> VertexStreams {
        let mut bind = VertexStreams::new(vec![
            Vec3A::new(1.0, 0.0, 0.0),
            Vec3A::new(0.0, 1.0, 0.0),
            Vec3A::new(0.0, 0.0, 1.0),
        ]);
        bind.normals = Some(vec![Vec3A::Z; 3]);
        bind.tangents = Some(vec![Vec4::new(1.0, 0.0, 0.0, -1.0); 3]);
        bind
    }

    fn codec(weights: &[f32], indices: &[u16], stride: usize, bones: usize) -> InfluenceCodec {
        let vertex_count = weights.len() / stride;
        let mut codec = InfluenceCodec::allocate(vertex_count, stride, bones).unwrap();
        codec
            .fill(
                0..vertex_count,
                stride,
                crate::influence::SourceInfluences {
                    weights,
                    indices,
                    stride,
                },
                &[],
                None,
            )
            .unwrap();
        codec
    }

    fn run(bind: &VertexStreams, codec: &InfluenceCodec, matrices: &[Mat4]) -> OutputStreams {
        let mask = AttributeMask::SKINNED;
        let mut out = OutputStreams::allocate(bind.vertex_count(), mask).unwrap();
        for mut range in split_ranges(&mut out, 2) {
            skin_range(&mut range, bind, codec.view(), matrices);
        }
        out
    }

    #[test]
    fn test_identity_reproduces_bind_pose() {
        let bind = bind_streams();
        let codec = codec(&[1.0, 0.0, 0.6, 0.4, 1.0, 0.0], &[0, 0, 0, 1, 1, 0], 2, 2);
        let out = run(&bind, &codec, &[Mat4::IDENTITY; 2]);

        for v in 0..3 {
            assert!((out.positions[v] - bind.positions[v]).length() < 1e-6);
            assert!((out.normals[v] - Vec3A::Z).length() < 1e-6);
            assert!((out.tangents[v] - Vec4::new(1.0, 0.0, 0.0, -1.0)).length() < 1e-6);
        }
    }

    #[test]
    fn test_blend_translation() {
        let bind = bind_streams();
        let codec = codec(&[0.5, 0.5, 0.5, 0.5, 0.5, 0.5], &[0, 1, 0, 1, 0, 1], 2, 2);
        let matrices = [Mat4::IDENTITY, Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0))];
        let out = run(&bind, &codec, &matrices);
        assert!((out.positions[0] - Vec3A::new(2.0, 0.0, 0.0)).length() < 1e-6);
        // 纯平移不改变法线
        assert!((out.normals[0] - Vec3A::Z).length() < 1e-6);
    }

    #[test]
    fn test_rotation_keeps_tangent_sign() {
        let bind = bind_streams();
        let codec = codec(&[1.0, 1.0, 1.0], &[0, 0, 0], 1, 1);
        let rot = Mat4::from_quat(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let out = run(&bind, &codec, &[rot]);

        assert!((out.positions[0] - Vec3A::new(0.0, 1.0, 0.0)).length() < 1e-5);
        assert!((out.tangents[0].truncate() - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);
        assert_eq!(out.tangents[0].w, -1.0);
    }

    #[test]
    fn test_missing_bone_uses_identity() {
        let bind = bind_streams();
        let codec = codec(&[1.0, 1.0, 1.0], &[1, 1, 1], 1, 2);
        // 只提供一个矩阵，骨骼 1 缺失
        let out = run(&bind, &codec, &[Mat4::from_translation(Vec3::X)]);
        assert!((out.positions[1] - bind.positions[1]).length() < 1e-6);
    }
}
