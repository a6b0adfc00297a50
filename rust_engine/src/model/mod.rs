//! 骨骼网格资源（宿主导入后的只读数据）

mod section;

pub use section::RenderSection;

use std::collections::HashMap;

use glam::{Mat4, Vec3};

use crate::influence::SourceInfluences;
use crate::stream::VertexStreams;
use crate::{Result, SkinError};

/// 骨骼影响打包格式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InfluenceFormat {
    /// 每顶点固定数量的影响（可采样）
    #[default]
    Fixed,
    /// 每顶点不限数量（不支持采样）
    Unlimited,
}

/// 布料资源的物理网格顶点（宿主单位）
#[derive(Clone, Debug, Default)]
pub struct ClothAsset {
    pub name: String,
    pub vertices: Vec<Vec3>,
}

/// 骨骼网格
#[derive(Clone, Debug, Default)]
pub struct SkinnedMesh {
    pub name: String,
    /// 绑定姿势
    pub streams: VertexStreams,
    /// 三角形索引
    pub indices: Vec<u32>,
    pub sections: Vec<RenderSection>,
    pub influence_format: InfluenceFormat,
    /// 源影响流中每个顶点的槽位数
    pub influence_stride: usize,
    /// 每顶点 `influence_stride` 个权重，降序，遇 0 结束
    pub bone_weights: Vec<f32>,
    /// 段内骨骼索引（经 `RenderSection::bone_map` 转换）
    pub bone_indices: Vec<u16>,
    /// 参考骨骼的逆绑定矩阵
    pub ref_inverse_bind: Vec<Mat4>,
    /// 网格需要的骨骼总数
    pub bone_count: usize,
    pub cloth_assets: HashMap<u32, ClothAsset>,
}

impl SkinnedMesh {
    pub fn vertex_count(&self) -> usize {
        self.streams.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// 所有分段中最大的影响数
    pub fn max_section_influences(&self) -> usize {
        self.sections
            .iter()
            .map(|s| s.max_influences)
            .max()
            .unwrap_or(self.influence_stride)
    }

    pub fn source_influences(&self) -> SourceInfluences<'_> {
        SourceInfluences {
            weights: &self.bone_weights,
            indices: &self.bone_indices,
            stride: self.influence_stride,
        }
    }

    /// 检查网格数据自洽
    pub fn validate(&self) -> Result<()> {
        self.streams.validate()?;

        let vertex_count = self.vertex_count();
        let influence_len = vertex_count * self.influence_stride;
        if self.bone_weights.len() < influence_len || self.bone_indices.len() < influence_len {
            return Err(SkinError::SkinData(format!(
                "mesh '{}': influence streams hold {} weights / {} indices, expected {}",
                self.name,
                self.bone_weights.len(),
                self.bone_indices.len(),
                influence_len
            )));
        }

        let mut covered = 0;
        for (i, section) in self.sections.iter().enumerate() {
            if section.vertex_range().end > vertex_count {
                return Err(SkinError::SkinData(format!(
                    "mesh '{}': section {} exceeds vertex count {}",
                    self.name, i, vertex_count
                )));
            }
            if section.max_influences == 0 || section.max_influences > self.influence_stride {
                return Err(SkinError::SkinData(format!(
                    "mesh '{}': section {} has {} influences, stride is {}",
                    self.name, i, section.max_influences, self.influence_stride
                )));
            }
            covered += section.vertex_count;
        }
        if covered != vertex_count {
            return Err(SkinError::SkinData(format!(
                "mesh '{}': sections cover {} of {} vertices",
                self.name, covered, vertex_count
            )));
        }

        if self.indices.len() % 3 != 0 {
            return Err(SkinError::SkinData(format!(
                "mesh '{}': index count {} is not a triangle list",
                self.name,
                self.indices.len()
            )));
        }
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(SkinError::SkinData(format!(
                "mesh '{}': index {} out of range",
                self.name, bad
            )));
        }
        Ok(())
    }
}
