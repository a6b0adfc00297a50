//! 主姿势骨骼重映射与布料顶点对应表
//!
//! 两者都只在姿势构建时计算一次，运行期只读。

mod cloth;

pub use cloth::{build_cloth_lookup, ClothMiss, ClothSection};

use glam::Mat4;

use crate::{Result, SkinError};

/// 把组件骨骼 → 主姿势骨骼的映射转为无符号索引表
///
/// 宿主用负数（-1）表示“无对应骨骼”，记为 `None`；只有被顶点引用时才是错误，
/// 由 `InfluenceCodec::fill` 检查。
pub fn build_bone_remap(
    local_bone_map: &[i32],
    leader_bone_count: usize,
) -> Result<Vec<Option<u16>>> {
    if local_bone_map.is_empty() {
        return Err(SkinError::UnsupportedTopology(
            "leader bone map is empty".to_string(),
        ));
    }

    local_bone_map
        .iter()
        .enumerate()
        .map(|(bone, &leader)| {
            if leader < 0 {
                return Ok(None);
            }
            if leader as usize >= leader_bone_count {
                return Err(SkinError::UnsupportedTopology(format!(
                    "bone {} maps to leader bone {} (leader has {} bones)",
                    bone, leader, leader_bone_count
                )));
            }
            u16::try_from(leader).map(Some).map_err(|_| {
                SkinError::UnsupportedTopology(format!("leader bone {} exceeds 16 bits", leader))
            })
        })
        .collect()
}

/// 把逆绑定矩阵重排到主姿势骨骼空间
///
/// 没有被映射到的主骨骼使用单位矩阵；多个骨骼映射到同一主骨骼时取第一个。
/// 无对应主骨骼的网格骨骼被跳过。
pub fn remap_inverse_bind(
    remap: &[Option<u16>],
    ref_inverse_bind: &[Mat4],
    leader_bone_count: usize,
) -> Result<Vec<Mat4>> {
    if remap.len() != ref_inverse_bind.len() {
        return Err(SkinError::BoneCountMismatch {
            expected: remap.len(),
            host: leader_bone_count,
            inverse_bind: ref_inverse_bind.len(),
        });
    }

    let mut out = vec![Mat4::IDENTITY; leader_bone_count];
    let mut assigned = vec![false; leader_bone_count];
    for (leader, inverse_bind) in remap.iter().zip(ref_inverse_bind) {
        let Some(leader) = leader.map(usize::from) else {
            continue;
        };
        if leader >= leader_bone_count {
            return Err(SkinError::UnsupportedTopology(format!(
                "leader bone {} out of range ({} bones)",
                leader, leader_bone_count
            )));
        }
        if !assigned[leader] {
            assigned[leader] = true;
            out[leader] = *inverse_bind;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_build_bone_remap() {
        assert_eq!(
            build_bone_remap(&[2, 0, 1], 3).unwrap(),
            vec![Some(2), Some(0), Some(1)]
        );
    }

    #[test]
    fn test_build_bone_remap_keeps_unmapped() {
        assert_eq!(build_bone_remap(&[0, 3, -1], 4).unwrap(), vec![Some(0), Some(3), None]);
    }

    #[test]
    fn test_build_bone_remap_rejects_bad_maps() {
        let err = build_bone_remap(&[0, 5], 2).unwrap_err();
        assert!(matches!(err, SkinError::UnsupportedTopology(_)));
        assert!(build_bone_remap(&[], 2).is_err());
    }

    #[test]
    fn test_remap_inverse_bind() {
        let a = Mat4::from_translation(Vec3::X);
        let b = Mat4::from_translation(Vec3::Y);
        let c = Mat4::from_translation(Vec3::Z);
        let out = remap_inverse_bind(&[Some(3), Some(1), Some(3)], &[a, b, c], 4).unwrap();
        assert_eq!(out[0], Mat4::IDENTITY);
        assert_eq!(out[1], b);
        assert_eq!(out[2], Mat4::IDENTITY);
        // 重复映射取第一个
        assert_eq!(out[3], a);
    }

    #[test]
    fn test_remap_inverse_bind_skips_unmapped() {
        let a = Mat4::from_translation(Vec3::X);
        let b = Mat4::from_translation(Vec3::Y);
        let out = remap_inverse_bind(&[None, Some(0)], &[a, b], 2).unwrap();
        assert_eq!(out[0], b);
        assert_eq!(out[1], Mat4::IDENTITY);
    }
}
