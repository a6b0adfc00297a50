//! Skin Sampler - 骨骼蒙皮网格的 CPU 采样管线
//!
//! 将骨骼动画网格作为粒子模拟器的几何形状（shape）：
//! - 顶点流存储（绑定姿势 / 蒙皮输出，16 字节对齐、去交错）
//! - 骨骼权重/索引编解码（8 位 / 16 位索引）
//! - 骨骼视图（每帧蒙皮矩阵 + 可见性）
//! - 主姿势骨骼重映射与布料顶点对应表
//! - 异步蒙皮引擎（rayon 并行，start/wait 协议）
//! - 采样器控制器（姿势构建、每帧更新、速度、表面采样加速结构）

pub mod config;
pub mod host;
pub mod influence;
pub mod model;
pub mod remap;
pub mod sampler;
pub mod skeleton;
pub mod skinning;
pub mod stream;

pub use config::PipelineConfig;
pub use host::{ClothSimData, ClothSnapshot, ComponentKind, SkinnedComponent, Transform};
pub use influence::{BoneIndexWidth, InfluenceCodec};
pub use model::{InfluenceFormat, RenderSection, SkinnedMesh};
pub use sampler::{SamplerSettings, SamplerState, ShapeDescriptor, SkinnedMeshSampler};
pub use skeleton::SkeletonView;
pub use skinning::{AsyncSkinContext, SkinContext};
pub use stream::{AttributeMask, OutputStreams, VertexStreams};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkinError {
    #[error("Allocation error: {0}")]
    Allocation(String),

    #[error("Skin data error: {0}")]
    SkinData(String),

    #[error("Bone count mismatch: expected {expected}, host has {host} transforms and {inverse_bind} inverse bind matrices")]
    BoneCountMismatch {
        expected: usize,
        host: usize,
        inverse_bind: usize,
    },

    #[error("Unsupported topology: {0}")]
    UnsupportedTopology(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("No skinned component resolved")]
    MissingComponent,

    #[error("Empty mesh: {0}")]
    EmptyMesh(String),

    #[error("Initial pose not built")]
    NotBuilt,
}

pub type Result<T> = std::result::Result<T, SkinError>;
