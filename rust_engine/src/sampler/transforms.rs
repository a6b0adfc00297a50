//! 形状的世界变换

use glam::{Mat4, Vec3};

use crate::host::{SkinnedComponent, Transform};

/// 形状变换的来源
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransformsMode {
    /// 骨骼组件相对父节点的变换
    SkinnedComponentRelative,
    /// 骨骼组件的世界变换
    SkinnedComponentWorld,
    /// 采样器自身相对父节点的变换
    #[default]
    SamplerRelative,
    /// 采样器自身的世界变换
    SamplerWorld,
}

impl TransformsMode {
    pub fn uses_component(self) -> bool {
        matches!(
            self,
            TransformsMode::SkinnedComponentRelative | TransformsMode::SkinnedComponentWorld
        )
    }
}

/// 采样器所属对象的变换（由宿主每帧提供）
#[derive(Clone, Copy, Debug, Default)]
pub struct OwnerTransforms {
    pub relative: Transform,
    pub world: Transform,
    /// 所属对象的线速度
    pub velocity: Vec3,
}

/// 当前帧与上一帧的形状变换及速度
#[derive(Clone, Copy, Debug)]
pub struct ShapeTransforms {
    pub current: Mat4,
    pub previous: Mat4,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl Default for ShapeTransforms {
    fn default() -> Self {
        Self {
            current: Mat4::IDENTITY,
            previous: Mat4::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }
}

impl ShapeTransforms {
    /// 推进一帧
    ///
    /// 需要骨骼组件但组件不存在时保留上一次的 `current`。
    pub fn update(
        &mut self,
        mode: TransformsMode,
        apply_scale: bool,
        owner: &OwnerTransforms,
        component: Option<&dyn SkinnedComponent>,
        global_scale_inv: f32,
    ) {
        self.previous = self.current;
        self.angular_velocity = Vec3::ZERO;
        self.linear_velocity = owner.velocity;

        let source = match (mode, component) {
            (TransformsMode::SkinnedComponentRelative, Some(c)) => c.relative_transform(),
            (TransformsMode::SkinnedComponentWorld, Some(c)) => c.component_transform(),
            (TransformsMode::SamplerRelative, _) => owner.relative,
            (TransformsMode::SamplerWorld, _) => owner.world,
            (_, None) => return,
        };

        let mut current = if apply_scale {
            source.to_matrix()
        } else {
            source.to_matrix_no_scale()
        };
        let t = current.w_axis.truncate() * global_scale_inv;
        current.w_axis = t.extend(1.0);
        self.current = current;
    }
}
