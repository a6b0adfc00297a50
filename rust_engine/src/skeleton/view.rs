//! 蒙皮矩阵缓冲

use std::sync::Arc;

use glam::Mat4;

use super::HIDDEN_BONE_MATRIX;
use crate::host::Transform;
use crate::{Result, SkinError};

/// 骨骼视图
///
/// 矩阵以 `Arc` 共享给蒙皮任务；任务结束后控制器重新获得独占，
/// 下一次 `rebuild` 原地写入。
#[derive(Clone, Debug)]
pub struct SkeletonView {
    matrices: Arc<Vec<Mat4>>,
    visible: Vec<bool>,
    visibility_changed: bool,
}

impl SkeletonView {
    /// 所有骨骼为单位矩阵且可见
    pub fn new(bone_count: usize) -> Self {
        Self {
            matrices: Arc::new(vec![Mat4::IDENTITY; bone_count]),
            visible: vec![true; bone_count],
            visibility_changed: false,
        }
    }

    pub fn bone_count(&self) -> usize {
        self.visible.len()
    }

    /// 从宿主姿势重建全部蒙皮矩阵
    ///
    /// 可见骨骼：`pose * inverse_bind`，平移乘以 `global_scale_inv`；
    /// 不可见骨骼：零矩阵。可见性数组短于骨骼数时，缺失项视为可见。
    pub fn rebuild(
        &mut self,
        host_transforms: &[Transform],
        ref_inverse_bind: &[Mat4],
        visibility: &[bool],
        global_scale_inv: f32,
    ) -> Result<()> {
        let bone_count = self.bone_count();
        if host_transforms.len() < bone_count || ref_inverse_bind.len() != bone_count {
            return Err(SkinError::BoneCountMismatch {
                expected: bone_count,
                host: host_transforms.len(),
                inverse_bind: ref_inverse_bind.len(),
            });
        }

        let mut changed = false;
        let matrices = Arc::make_mut(&mut self.matrices);
        for bone in 0..bone_count {
            let visible = visibility.get(bone).copied().unwrap_or(true);
            if visible != self.visible[bone] {
                self.visible[bone] = visible;
                changed = true;
            }

            matrices[bone] = if visible {
                let mut m = host_transforms[bone].to_matrix() * ref_inverse_bind[bone];
                let t = m.w_axis.truncate() * global_scale_inv;
                m.w_axis = t.extend(1.0);
                m
            } else {
                HIDDEN_BONE_MATRIX
            };
        }
        self.visibility_changed = changed;
        Ok(())
    }

    /// 与上一次重建相比是否有骨骼可见性变化
    pub fn visibility_changed(&self) -> bool {
        self.visibility_changed
    }

    pub fn is_visible(&self, bone: usize) -> bool {
        self.visible.get(bone).copied().unwrap_or(false)
    }

    pub fn matrices(&self) -> &[Mat4] {
        &self.matrices
    }

    /// 供蒙皮任务持有的共享句柄
    pub fn shared_matrices(&self) -> Arc<Vec<Mat4>> {
        Arc::clone(&self.matrices)
    }
}
