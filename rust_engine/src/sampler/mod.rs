//! 骨骼网格采样器
//!
//! 控制器负责姿势构建、每帧蒙皮调度、速度与布料钩子，
//! 并把结果以 `ShapeDescriptor` 的形式交给粒子模拟器。

pub mod accel;
mod controller;
mod hooks;
pub mod transforms;


pub use accel::{ColorChannel, SamplingMode, SurfaceSample, SurfaceSamplingAccel};
pub use controller::SkinnedMeshSampler;
pub use transforms::{OwnerTransforms, ShapeTransforms, TransformsMode};

use std::sync::RwLockReadGuard;

use glam::{Vec2, Vec3A, Vec4};

use crate::host::ComponentKind;
use crate::influence::InfluenceStreams;
use crate::stream::AttributeMask;

/// 每个采样器的构建选项
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplerSettings {
    pub skin_positions: bool,
    pub skin_normals: bool,
    pub skin_tangents: bool,
    /// 顶点颜色直接从绑定姿势复制
    pub build_colors: bool,
    /// UV 直接从绑定姿势复制
    pub build_uvs: bool,
    /// 需要位置蒙皮
    pub compute_velocities: bool,
    pub build_cloth_data: bool,
    pub sampling_mode: SamplingMode,
    /// Weighted 模式的密度通道
    pub density_channel: ColorChannel,
    pub transforms: TransformsMode,
    /// 形状变换是否包含缩放
    pub apply_scale: bool,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        // 默认只构建位置
        Self {
            skin_positions: true,
            skin_normals: false,
            skin_tangents: false,
            build_colors: false,
            build_uvs: false,
            compute_velocities: false,
            build_cloth_data: false,
            sampling_mode: SamplingMode::Uniform,
            density_channel: ColorChannel::Red,
            transforms: TransformsMode::SamplerRelative,
            apply_scale: false,
        }
    }
}

impl SamplerSettings {
    /// 速度由位置差分得到，开启速度时强制蒙皮位置
    pub fn normalized(mut self) -> Self {
        if self.compute_velocities {
            self.skin_positions = true;
        }
        self
    }

    pub fn skins(&self) -> bool {
        self.skin_positions || self.skin_normals || self.skin_tangents
    }

    pub fn attribute_mask(&self) -> AttributeMask {
        let mut mask = AttributeMask::NONE;
        if self.skin_positions {
            mask |= AttributeMask::POSITIONS;
        }
        if self.skin_normals {
            mask |= AttributeMask::NORMALS;
        }
        if self.skin_tangents {
            mask |= AttributeMask::TANGENTS;
        }
        if self.build_colors {
            mask |= AttributeMask::COLORS;
        }
        if self.build_uvs {
            mask |= AttributeMask::UVS;
        }
        if self.compute_velocities {
            mask |= AttributeMask::VELOCITIES;
        }
        mask
    }
}

/// 采样器生命周期
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplerState {
    /// 尚未构建（或构建失败）
    Unbuilt,
    /// 已构建，没有正在执行的蒙皮任务
    PoseBuilt,
    /// 蒙皮任务执行中
    Skinning,
    /// 已暂停（没有消费者）
    Idle,
}

/// 宿主调度提示：采样器应在哪个阶段 tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TickGroup {
    /// 骨骼组件在物理之前计算姿势
    PrePhysics,
    /// 可破碎组件在物理结束后更新
    EndPhysics,
    /// 目标未知时的默认值
    #[default]
    PostPhysics,
}

impl TickGroup {
    pub fn for_kind(kind: ComponentKind) -> Option<Self> {
        match kind {
            ComponentKind::Skeletal => Some(TickGroup::PrePhysics),
            ComponentKind::Destructible => Some(TickGroup::EndPhysics),
            ComponentKind::Other => None,
        }
    }
}

/// 交给粒子模拟器的形状
///
/// 持有加速结构的读锁，只在两次蒙皮任务之间有效。
pub struct ShapeDescriptor<'a> {
    /// 蒙皮位置；未蒙皮时为绑定姿势
    pub positions: &'a [Vec3A],
    pub normals: Option<&'a [Vec3A]>,
    pub tangents: Option<&'a [Vec4]>,
    pub colors: Option<&'a [Vec4]>,
    pub uvs: &'a [Vec<Vec2>],
    pub velocities: Option<&'a [Vec3A]>,
    pub indices: &'a [u32],
    pub influences: Option<InfluenceStreams<'a>>,
    pub accel: RwLockReadGuard<'a, SurfaceSamplingAccel>,
    pub transforms: ShapeTransforms,
}

impl ShapeDescriptor<'_> {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocities_force_positions() {
        let settings = SamplerSettings {
            skin_positions: false,
            skin_normals: true,
            compute_velocities: true,
            ..SamplerSettings::default()
        }
        .normalized();
        assert!(settings.skin_positions);
        let mask = settings.attribute_mask();
        assert!(mask.contains(AttributeMask::POSITIONS | AttributeMask::NORMALS | AttributeMask::VELOCITIES));
        assert!(!mask.contains(AttributeMask::TANGENTS));
    }

    #[test]
    fn test_default_settings() {
        let settings = SamplerSettings::default();
        assert_eq!(settings.attribute_mask(), AttributeMask::POSITIONS);
        assert!(settings.skins());
    }

    #[test]
    fn test_tick_group() {
        assert_eq!(TickGroup::for_kind(ComponentKind::Skeletal), Some(TickGroup::PrePhysics));
        assert_eq!(TickGroup::for_kind(ComponentKind::Destructible), Some(TickGroup::EndPhysics));
        assert_eq!(TickGroup::for_kind(ComponentKind::Other), None);
    }
}
