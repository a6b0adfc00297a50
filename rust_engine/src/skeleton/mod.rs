//! 骨骼视图：每帧的蒙皮矩阵与骨骼可见性

mod view;

pub use view::SkeletonView;

use glam::Mat4;

/// 隐藏骨骼使用的矩阵，蒙皮后顶点坍缩到原点
pub const HIDDEN_BONE_MATRIX: Mat4 = Mat4::ZERO;
