//! 顶点流存储
//!
//! 绑定姿势与蒙皮输出都以去交错数组存放。位置/法线使用 `Vec3A`，
//! 切线/颜色使用 `Vec4`，两者都是 16 字节对齐、16 字节步长。

mod mask;

pub use mask::AttributeMask;

use glam::{Vec2, Vec3A, Vec4};

use crate::{Result, SkinError};

/// 绑定姿势顶点流（网格资源的只读输入）
#[derive(Clone, Debug, Default)]
pub struct VertexStreams {
    pub positions: Vec<Vec3A>,
    pub normals: Option<Vec<Vec3A>>,
    /// w = 副切线符号
    pub tangents: Option<Vec<Vec4>>,
    pub colors: Option<Vec<Vec4>>,
    pub uvs: Vec<Vec<Vec2>>,
}

impl VertexStreams {
    pub fn new(positions: Vec<Vec3A>) -> Self {
        Self {
            positions,
            ..Self::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// 检查所有属性数组长度一致
    pub fn validate(&self) -> Result<()> {
        let count = self.vertex_count();
        let check = |name: &str, len: usize| {
            if len == count {
                Ok(())
            } else {
                Err(SkinError::SkinData(format!(
                    "{} stream has {} vertices, expected {}",
                    name, len, count
                )))
            }
        };
        if let Some(normals) = &self.normals {
            check("normal", normals.len())?;
        }
        if let Some(tangents) = &self.tangents {
            check("tangent", tangents.len())?;
        }
        if let Some(colors) = &self.colors {
            check("color", colors.len())?;
        }
        for uv in &self.uvs {
            check("uv", uv.len())?;
        }
        Ok(())
    }
}

/// 蒙皮输出顶点流
///
/// 未请求的属性保持为空数组。
#[derive(Clone, Debug, Default)]
pub struct OutputStreams {
    vertex_count: usize,
    mask: AttributeMask,
    pub positions: Vec<Vec3A>,
    pub normals: Vec<Vec3A>,
    pub tangents: Vec<Vec4>,
    pub colors: Vec<Vec4>,
    pub uvs: Vec<Vec<Vec2>>,
    pub velocities: Vec<Vec3A>,
    /// 上一帧的位置（用于速度差分）
    pub old_positions: Vec<Vec3A>,
}

impl OutputStreams {
    /// 按属性掩码分配输出数组
    pub fn allocate(vertex_count: usize, mask: AttributeMask) -> Result<Self> {
        if vertex_count == 0 {
            return Err(SkinError::Allocation(
                "cannot allocate output streams for 0 vertices".to_string(),
            ));
        }

        let mut streams = Self {
            vertex_count,
            mask,
            ..Self::default()
        };
        if mask.contains(AttributeMask::POSITIONS) {
            streams.positions = alloc_stream(vertex_count, Vec3A::ZERO)?;
        }
        if mask.contains(AttributeMask::NORMALS) {
            streams.normals = alloc_stream(vertex_count, Vec3A::ZERO)?;
        }
        if mask.contains(AttributeMask::TANGENTS) {
            streams.tangents = alloc_stream(vertex_count, Vec4::ZERO)?;
        }
        if mask.contains(AttributeMask::COLORS) {
            streams.colors = alloc_stream(vertex_count, Vec4::ZERO)?;
        }
        if mask.contains(AttributeMask::VELOCITIES) {
            streams.velocities = alloc_stream(vertex_count, Vec3A::ZERO)?;
            streams.old_positions = alloc_stream(vertex_count, Vec3A::ZERO)?;
        }
        Ok(streams)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn mask(&self) -> AttributeMask {
        self.mask
    }

    /// 用绑定姿势初始化输出（蒙皮前的第一帧也有合法数据）
    pub fn copy_bind_pose(&mut self, bind: &VertexStreams) -> Result<()> {
        if bind.vertex_count() != self.vertex_count {
            return Err(SkinError::SkinData(format!(
                "bind pose has {} vertices, output streams have {}",
                bind.vertex_count(),
                self.vertex_count
            )));
        }

        if !self.positions.is_empty() {
            self.positions.copy_from_slice(&bind.positions);
        }
        if !self.old_positions.is_empty() {
            self.old_positions.copy_from_slice(&bind.positions);
        }
        if !self.normals.is_empty() {
            let normals = bind.normals.as_deref().ok_or_else(|| {
                SkinError::SkinData("normals requested but the mesh has none".to_string())
            })?;
            self.normals.copy_from_slice(normals);
        }
        if !self.tangents.is_empty() {
            let tangents = bind.tangents.as_deref().ok_or_else(|| {
                SkinError::SkinData("tangents requested but the mesh has none".to_string())
            })?;
            self.tangents.copy_from_slice(tangents);
        }
        if !self.colors.is_empty() {
            let colors = bind.colors.as_deref().ok_or_else(|| {
                SkinError::SkinData("colors requested but the mesh has none".to_string())
            })?;
            self.colors.copy_from_slice(colors);
        }
        if self.mask.contains(AttributeMask::UVS) {
            self.uvs.clear();
            for channel in &bind.uvs {
                let mut uv = alloc_stream(self.vertex_count, Vec2::ZERO)?;
                uv.copy_from_slice(channel);
                self.uvs.push(uv);
            }
        }
        Ok(())
    }

    /// 速度清零（动画停止）
    pub fn clear_velocities(&mut self) {
        self.velocities.fill(Vec3A::ZERO);
    }
}

/// 单个属性的字节步长，存储生命周期内不变
pub fn stride_of(attribute: AttributeMask) -> usize {
    if attribute == AttributeMask::UVS {
        std::mem::size_of::<Vec2>()
    } else {
        // Vec3A 与 Vec4 都是 16 字节
        std::mem::size_of::<Vec4>()
    }
}

fn alloc_stream<T: Copy>(count: usize, value: T) -> Result<Vec<T>> {
    let mut stream = Vec::new();
    stream.try_reserve_exact(count).map_err(|e| {
        SkinError::Allocation(format!("failed to reserve {} vertices: {}", count, e))
    })?;
    stream.resize(count, value);
    Ok(stream)
}
