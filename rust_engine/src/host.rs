//! 宿主引擎接口
//!
//! 骨骼组件、布料模拟快照等由宿主提供，管线只在一帧内只读借用。

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use crate::model::SkinnedMesh;

/// 变换数据（平移 / 旋转 / 缩放）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// 忽略缩放的矩阵
    pub fn to_matrix_no_scale(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }
}

/// 组件类型，决定宿主应在哪个 tick 阶段更新采样器
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentKind {
    /// 骨骼动画组件，骨骼变换在物理之前计算
    Skeletal,
    /// 可破碎组件，变换在物理结束后更新
    Destructible,
    /// 其他（例如 poseable mesh），不支持
    Other,
}

/// 单个布料资源的模拟结果（世界空间）
#[derive(Clone, Debug, Default)]
pub struct ClothSimData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

/// 一帧的布料模拟快照：布料资源 ID → 模拟数据
pub type ClothSnapshot = HashMap<u32, ClothSimData>;

/// 宿主骨骼组件
///
/// 所有返回的切片只在当前帧有效。
pub trait SkinnedComponent {
    /// 组件名称（用于日志）
    fn name(&self) -> &str;

    fn kind(&self) -> ComponentKind {
        ComponentKind::Skeletal
    }

    /// 组件引用的网格资源
    fn skinned_mesh(&self) -> Option<Arc<SkinnedMesh>>;

    fn bone_count(&self) -> usize {
        self.component_space_transforms().len()
    }

    /// 当前姿势（组件空间）；可能多于网格骨骼数（虚拟骨骼）
    fn component_space_transforms(&self) -> &[Transform];

    /// 每个骨骼是否可见
    fn bone_visibility_states(&self) -> &[bool];

    /// 主姿势组件（共享骨骼）
    fn leader_component(&self) -> Option<&dyn SkinnedComponent> {
        None
    }

    /// 本组件骨骼 → 主姿势组件骨骼 的映射，-1 表示无对应
    fn leader_bone_map(&self) -> &[i32] {
        &[]
    }

    /// 最近是否被渲染过
    fn recently_rendered(&self) -> bool {
        true
    }

    /// 不可见时是否仍然更新骨骼
    fn always_tick_pose(&self) -> bool {
        false
    }

    fn cloth_simulation_enabled(&self) -> bool {
        false
    }

    /// 当前帧的布料模拟数据
    fn cloth_data(&self) -> Option<Arc<ClothSnapshot>> {
        None
    }

    /// 相对父节点的变换
    fn relative_transform(&self) -> Transform {
        Transform::IDENTITY
    }

    /// 世界变换
    fn component_transform(&self) -> Transform {
        Transform::IDENTITY
    }
}
