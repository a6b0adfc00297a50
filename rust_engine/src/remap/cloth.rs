//! 布料分段：网格顶点 → 布料模拟顶点

use std::ops::Range;

use glam::{Mat4, Vec3, Vec3A};

use crate::host::ClothSimData;
use crate::model::RenderSection;

/// 找不到对应布料顶点的网格顶点（段内索引）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClothMiss {
    pub vertex: usize,
}

/// 为每个网格顶点找距离最近的布料顶点
///
/// 网格位置先乘以 `scale` 换算到布料资源的单位，只接受距离平方 ≤ ε² 的候选；
/// 距离相同时取先遍历到的顶点。复杂度 O(n·m)，只在姿势构建时调用。
pub fn build_cloth_lookup(
    mesh_positions: &[Vec3A],
    cloth_vertices: &[Vec3],
    epsilon: f32,
    scale: f32,
) -> std::result::Result<Vec<u32>, ClothMiss> {
    let eps_sq = epsilon * epsilon;
    mesh_positions
        .iter()
        .enumerate()
        .map(|(vertex, position)| {
            let position = Vec3::from(*position) * scale;
            let mut best: Option<(u32, f32)> = None;
            for (index, cloth_vertex) in cloth_vertices.iter().enumerate() {
                let dist_sq = cloth_vertex.distance_squared(position);
                if dist_sq > eps_sq {
                    continue;
                }
                if best.map_or(true, |(_, d)| dist_sq < d) {
                    best = Some((index as u32, dist_sq));
                }
            }
            best.map(|(index, _)| index).ok_or(ClothMiss { vertex })
        })
        .collect()
}

/// 一个由布料模拟驱动的渲染分段
#[derive(Clone, Debug)]
pub struct ClothSection {
    pub base_vertex: usize,
    pub vertex_count: usize,
    pub cloth_asset: u32,
    /// 段内顶点 → 布料模拟顶点
    pub indices: Vec<u32>,
}

impl ClothSection {
    /// 构建对应表；任一顶点匹配失败则整段放弃（回退为普通蒙皮）
    pub fn build(
        mesh_name: &str,
        section_index: usize,
        section: &RenderSection,
        cloth_asset: u32,
        mesh_positions: &[Vec3A],
        cloth_vertices: &[Vec3],
        epsilon: f32,
        scale: f32,
    ) -> Option<Self> {
        let positions = mesh_positions.get(section.vertex_range())?;
        match build_cloth_lookup(positions, cloth_vertices, epsilon, scale) {
            Ok(indices) => Some(Self {
                base_vertex: section.base_vertex,
                vertex_count: section.vertex_count,
                cloth_asset,
                indices,
            }),
            Err(miss) => {
                log::warn!(
                    "无法为 '{}' 的分段 {} 构建布料对应表（顶点 {} 无匹配），该分段不支持布料，回退为普通蒙皮",
                    mesh_name,
                    section_index,
                    miss.vertex
                );
                None
            }
        }
    }

    pub fn vertex_range(&self) -> Range<usize> {
        self.base_vertex..self.base_vertex + self.vertex_count
    }

    /// 用布料模拟结果覆盖一段蒙皮输出
    ///
    /// `positions` / `normals` 从全局顶点 `range_start` 开始；`normals` 为空时跳过法线。
    /// 模拟数据在世界空间，经 `to_local` 变回组件空间后乘以 `inv_scale`。
    pub fn overlay(
        &self,
        range_start: usize,
        positions: &mut [Vec3A],
        normals: &mut [Vec3A],
        data: &ClothSimData,
        to_local: &Mat4,
        inv_scale: f32,
    ) {
        let range_end = range_start + positions.len();
        let start = range_start.max(self.base_vertex);
        let end = range_end.min(self.base_vertex + self.vertex_count);
        if start >= end {
            return;
        }

        for vertex in start..end {
            let sim = self.indices[vertex - self.base_vertex] as usize;
            let (Some(position), Some(normal)) = (data.positions.get(sim), data.normals.get(sim))
            else {
                continue;
            };

            let local = vertex - range_start;
            positions[local] = Vec3A::from(to_local.transform_point3(*position) * inv_scale);
            if let Some(dst) = normals.get_mut(local) {
                *dst = Vec3A::from(to_local.transform_vector3(*normal).normalize_or_zero());
            }
        }
    }
}
