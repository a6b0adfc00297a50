//! 渲染分段定义

use std::ops::Range;

/// 渲染分段：一段连续顶点，共享骨骼映射与最大影响数
#[derive(Clone, Debug, Default)]
pub struct RenderSection {
    pub base_vertex: usize,
    pub vertex_count: usize,
    /// 本段每个顶点最多的骨骼影响数
    pub max_influences: usize,
    /// 段内骨骼索引 → 网格骨骼索引；为空表示索引已是网格全局索引
    pub bone_map: Vec<u16>,
    /// 布料资源 ID（有布料模拟时）
    pub cloth_asset: Option<u32>,
}

impl RenderSection {
    pub fn new(base_vertex: usize, vertex_count: usize, max_influences: usize) -> Self {
        Self {
            base_vertex,
            vertex_count,
            max_influences,
            bone_map: Vec::new(),
            cloth_asset: None,
        }
    }

    pub fn with_bone_map(mut self, bone_map: Vec<u16>) -> Self {
        self.bone_map = bone_map;
        self
    }

    pub fn with_cloth_asset(mut self, cloth_asset: u32) -> Self {
        self.cloth_asset = Some(cloth_asset);
        self
    }

    pub fn vertex_range(&self) -> Range<usize> {
        self.base_vertex..self.base_vertex + self.vertex_count
    }
}
