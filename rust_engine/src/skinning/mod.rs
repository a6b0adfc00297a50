//! 顶点蒙皮计算
//!
//! 蒙皮任务以 `SkinContext` 为单位：控制器填好输出流与钩子后把它移交给
//! `AsyncSkinContext::start`，任务在 rayon 线程池中按顶点区间并行执行，
//! `wait` 时再交还给控制器。

mod engine;
mod skinning;

pub use engine::AsyncSkinContext;
pub use skinning::skin_range;

use std::sync::Arc;

use glam::{Vec3A, Vec4};

use crate::influence::InfluenceCodec;
use crate::model::SkinnedMesh;
use crate::stream::OutputStreams;

/// 区间钩子（在蒙皮内核前/后对每个区间调用）
pub type RangeHook = Box<dyn Fn(&mut SkinRange<'_>) + Send + Sync>;

/// 任务结束钩子（在 `wait` 的调用线程上执行一次）
pub type FinishHook = Box<dyn FnOnce(&SkinContext) + Send>;

/// 一次蒙皮任务的全部数据
pub struct SkinContext {
    /// 绑定姿势与网格信息
    pub mesh: Arc<SkinnedMesh>,
    /// 为空时只执行钩子
    pub influences: Option<Arc<InfluenceCodec>>,
    pub outputs: OutputStreams,
    pub pre_process: Option<RangeHook>,
    pub post_process: Option<RangeHook>,
    pub finish: Option<FinishHook>,
}

impl SkinContext {
    pub fn new(mesh: Arc<SkinnedMesh>, influences: Option<Arc<InfluenceCodec>>, outputs: OutputStreams) -> Self {
        Self {
            mesh,
            influences,
            outputs,
            pre_process: None,
            post_process: None,
            finish: None,
        }
    }

    pub fn clear_hooks(&mut self) {
        self.pre_process = None;
        self.post_process = None;
        self.finish = None;
    }
}

/// 一段连续顶点的输出切片
///
/// 各切片都从全局顶点 `start` 开始；未分配的流为空切片。
pub struct SkinRange<'a> {
    pub start: usize,
    pub count: usize,
    pub positions: &'a mut [Vec3A],
    pub normals: &'a mut [Vec3A],
    pub tangents: &'a mut [Vec4],
    pub velocities: &'a mut [Vec3A],
    pub old_positions: &'a mut [Vec3A],
}

impl SkinRange<'_> {
    pub fn end(&self) -> usize {
        self.start + self.count
    }
}

/// 把输出流切成不重叠的区间
pub(crate) fn split_ranges(outputs: &mut OutputStreams, chunk_vertices: usize) -> Vec<SkinRange<'_>> {
    let vertex_count = outputs.vertex_count();
    let chunk_vertices = chunk_vertices.max(1);

    let mut positions = outputs.positions.as_mut_slice();
    let mut normals = outputs.normals.as_mut_slice();
    let mut tangents = outputs.tangents.as_mut_slice();
    let mut velocities = outputs.velocities.as_mut_slice();
    let mut old_positions = outputs.old_positions.as_mut_slice();

    let mut ranges = Vec::with_capacity(vertex_count.div_ceil(chunk_vertices));
    let mut start = 0;
    while start < vertex_count {
        let count = chunk_vertices.min(vertex_count - start);
        ranges.push(SkinRange {
            start,
            count,
            positions: take_front(&mut positions, count),
            normals: take_front(&mut normals, count),
            tangents: take_front(&mut tangents, count),
            velocities: take_front(&mut velocities, count),
            old_positions: take_front(&mut old_positions, count),
        });
        start += count;
    }
    ranges
}

fn take_front<'a, T>(slice: &mut &'a mut [T], count: usize) -> &'a mut [T] {
    let rest = std::mem::take(slice);
    let split = count.min(rest.len());
    let (head, tail) = rest.split_at_mut(split);
    *slice = tail;
    head
}
