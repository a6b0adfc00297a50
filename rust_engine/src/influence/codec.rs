//! 骨骼影响编码器

use std::ops::Range;

use super::{choose_width, BoneIndex, BoneIndexWidth, InfluenceStreams, InfluenceView, SourceInfluences};
use crate::{Result, SkinError};

/// 按宽度存放的骨骼索引
#[derive(Clone, Debug)]
enum BoneIndices {
    Small(Vec<u8>),
    Wide(Vec<u16>),
}

/// 打包后的逐顶点骨骼影响
#[derive(Clone, Debug)]
pub struct InfluenceCodec {
    vertex_count: usize,
    max_influences: usize,
    total_bone_count: usize,
    weights: Vec<f32>,
    indices: BoneIndices,
}

impl InfluenceCodec {
    /// 分配 `vertex_count * max_influences` 个槽位，全部清零
    pub fn allocate(vertex_count: usize, max_influences: usize, total_bone_count: usize) -> Result<Self> {
        let total = vertex_count
            .checked_mul(max_influences)
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                SkinError::Allocation(format!(
                    "invalid influence buffer size: {} vertices x {} influences",
                    vertex_count, max_influences
                ))
            })?;

        let mut weights = Vec::new();
        weights.try_reserve_exact(total).map_err(|e| {
            SkinError::Allocation(format!("failed to reserve {} bone weights: {}", total, e))
        })?;
        weights.resize(total, 0.0);

        let indices = match choose_width(total_bone_count) {
            BoneIndexWidth::U8 => BoneIndices::Small(alloc_indices(total)?),
            BoneIndexWidth::U16 => BoneIndices::Wide(alloc_indices(total)?),
        };

        Ok(Self {
            vertex_count,
            max_influences,
            total_bone_count,
            weights,
            indices,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn max_influences(&self) -> usize {
        self.max_influences
    }

    pub fn total_bone_count(&self) -> usize {
        self.total_bone_count
    }

    pub fn width(&self) -> BoneIndexWidth {
        match self.indices {
            BoneIndices::Small(_) => BoneIndexWidth::U8,
            BoneIndices::Wide(_) => BoneIndexWidth::U16,
        }
    }

    /// 填充一段顶点的骨骼影响
    ///
    /// 权重原样复制；索引先经过段骨骼映射，再（主姿势时）经过 `bone_remap`。
    /// 非零权重引用了没有主骨骼对应的骨骼时返回 `UnsupportedTopology`。
    /// 源权重已按降序排列，遇到第一个零权重即停止。
    pub fn fill(
        &mut self,
        vertex_range: Range<usize>,
        section_influences: usize,
        source: SourceInfluences<'_>,
        section_bone_map: &[u16],
        bone_remap: Option<&[Option<u16>]>,
    ) -> Result<()> {
        if self.total_bone_count == 0 {
            return Err(SkinError::SkinData("total bone count is 0".to_string()));
        }
        if vertex_range.end > self.vertex_count {
            return Err(SkinError::SkinData(format!(
                "vertex range {:?} overflows influence buffer of {} vertices",
                vertex_range, self.vertex_count
            )));
        }
        let src_needed = vertex_range.end * source.stride;
        if source.weights.len() < src_needed || source.indices.len() < src_needed {
            return Err(SkinError::SkinData(format!(
                "vertex range {:?} overflows source influences ({} weights)",
                vertex_range,
                source.weights.len()
            )));
        }

        let total_bone_count = self.total_bone_count;
        let count = section_influences
            .min(source.stride)
            .min(self.max_influences);
        let stride = self.max_influences;
        let map_bone = |local: u16| -> Result<usize> {
            let mesh_bone = if section_bone_map.is_empty() {
                local
            } else {
                *section_bone_map.get(local as usize).ok_or_else(|| {
                    SkinError::SkinData(format!("section bone index {} has no mapping", local))
                })?
            };
            let bone = match bone_remap {
                Some(remap) => remap.get(mesh_bone as usize).copied().flatten().ok_or_else(|| {
                    SkinError::UnsupportedTopology(format!(
                        "bone {} is referenced but has no leader bone",
                        mesh_bone
                    ))
                })?,
                None => mesh_bone,
            };
            if bone as usize >= total_bone_count {
                return Err(SkinError::SkinData(format!(
                    "bone index {} out of range ({} bones)",
                    bone, total_bone_count
                )));
            }
            Ok(bone as usize)
        };

        match &mut self.indices {
            BoneIndices::Small(indices) => fill_vertices(
                &mut self.weights,
                indices,
                stride,
                vertex_range,
                count,
                source,
                map_bone,
            ),
            BoneIndices::Wide(indices) => fill_vertices(
                &mut self.weights,
                indices,
                stride,
                vertex_range,
                count,
                source,
                map_bone,
            ),
        }
    }

    /// 与宽度无关的只读视图
    pub fn view(&self) -> InfluenceStreams<'_> {
        match &self.indices {
            BoneIndices::Small(indices) => InfluenceStreams::Small(InfluenceView::new(
                &self.weights,
                indices,
                self.max_influences,
            )),
            BoneIndices::Wide(indices) => InfluenceStreams::Wide(InfluenceView::new(
                &self.weights,
                indices,
                self.max_influences,
            )),
        }
    }
}

fn alloc_indices<I: BoneIndex>(total: usize) -> Result<Vec<I>> {
    let mut indices = Vec::new();
    indices.try_reserve_exact(total).map_err(|e| {
        SkinError::Allocation(format!("failed to reserve {} bone indices: {}", total, e))
    })?;
    indices.resize(total, I::default());
    Ok(indices)
}

fn fill_vertices<I: BoneIndex>(
    weights: &mut [f32],
    indices: &mut [I],
    stride: usize,
    vertex_range: Range<usize>,
    count: usize,
    source: SourceInfluences<'_>,
    map_bone: impl Fn(u16) -> Result<usize>,
) -> Result<()> {
    for vertex in vertex_range {
        let dst = vertex * stride;
        let src = vertex * source.stride;

        weights[dst..dst + stride].fill(0.0);
        indices[dst..dst + stride].fill(I::default());

        for i in 0..count {
            let weight = source.weights[src + i];
            // 权重已排序，后面都是 0
            if weight == 0.0 {
                break;
            }
            let bone = map_bone(source.indices[src + i])?;
            indices[dst + i] = I::from_index(bone).ok_or_else(|| {
                SkinError::SkinData(format!("bone index {} does not fit {:?}", bone, I::WIDTH))
            })?;
            weights[dst + i] = weight;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source<'a>(weights: &'a [f32], indices: &'a [u16], stride: usize) -> SourceInfluences<'a> {
        SourceInfluences {
            weights,
            indices,
            stride,
        }
    }

    #[test]
    fn test_allocate_chooses_width() {
        assert_eq!(InfluenceCodec::allocate(4, 2, 256).unwrap().width(), BoneIndexWidth::U8);
        assert_eq!(InfluenceCodec::allocate(4, 2, 257).unwrap().width(), BoneIndexWidth::U16);
        assert!(InfluenceCodec::allocate(0, 2, 4).is_err());
        assert!(InfluenceCodec::allocate(4, 0, 4).is_err());
    }

    #[test]
    fn test_fill_weights_sum_to_one() {
        let weights = [0.5, 0.3, 0.2, 1.0, 0.0, 0.0, 0.7, 0.3, 0.0];
        let indices = [0, 1, 2, 3, 0, 0, 2, 1, 0];
        let mut codec = InfluenceCodec::allocate(3, 3, 4).unwrap();
        codec.fill(0..3, 3, source(&weights, &indices, 3), &[], None).unwrap();

        let view = codec.view();
        for v in 0..3 {
            let sum: f32 = view.influences(v).iter().map(|(_, w)| w).sum();
            assert!((sum - 1.0).abs() < 1e-5, "vertex {} sums to {}", v, sum);
        }
        assert_eq!(view.influences(1), vec![(3, 1.0)]);
    }

    #[test]
    fn test_fill_through_bone_map_and_remap() {
        let weights = [1.0, 0.0];
        let indices = [1, 0];
        let section_map = [5u16, 2];
        // 网格骨骼 2 → 主骨骼 300
        let mut remap = vec![Some(0u16); 6];
        remap[2] = Some(300);
        let mut codec = InfluenceCodec::allocate(1, 2, 301).unwrap();
        codec
            .fill(0..1, 2, source(&weights, &indices, 2), &section_map, Some(remap.as_slice()))
            .unwrap();
        assert_eq!(codec.view().influences(0), vec![(300, 1.0)]);
        assert_eq!(codec.view().width(), BoneIndexWidth::U16);
    }

    #[test]
    fn test_fill_unmapped_leader_bone() {
        let remap = [Some(0u16), None];
        let mut codec = InfluenceCodec::allocate(2, 2, 4).unwrap();
        // 只在零权重槽位出现的骨骼 1 不需要映射
        let weights = [1.0, 0.0, 1.0, 0.0];
        let indices = [0, 1, 0, 1];
        codec
            .fill(0..2, 2, source(&weights, &indices, 2), &[], Some(remap.as_slice()))
            .unwrap();
        assert_eq!(codec.view().influences(0), vec![(0, 1.0)]);

        let weights = [0.5, 0.5, 1.0, 0.0];
        let err = codec
            .fill(0..2, 2, source(&weights, &indices, 2), &[], Some(remap.as_slice()))
            .unwrap_err();
        assert!(matches!(err, SkinError::UnsupportedTopology(_)));
    }

    #[test]
    fn test_fill_stops_at_zero_weight() {
        // 零权重后的索引是垃圾数据，不应被映射
        let weights = [1.0, 0.0, 0.5];
        let indices = [0, 999, 999];
        let mut codec = InfluenceCodec::allocate(1, 3, 2).unwrap();
        codec.fill(0..1, 3, source(&weights, &indices, 3), &[], None).unwrap();
        assert_eq!(codec.view().influences(0), vec![(0, 1.0)]);
    }

    #[test]
    fn test_fill_overflow() {
        let weights = [1.0; 4];
        let indices = [0; 4];
        let mut codec = InfluenceCodec::allocate(2, 2, 4).unwrap();
        let err = codec
            .fill(0..3, 2, source(&weights, &indices, 2), &[], None)
            .unwrap_err();
        assert!(matches!(err, SkinError::SkinData(_)));
    }

    #[test]
    fn test_fill_zero_bones() {
        let weights = [1.0];
        let indices = [0];
        let mut codec = InfluenceCodec::allocate(1, 1, 0).unwrap();
        let err = codec
            .fill(0..1, 1, source(&weights, &indices, 1), &[], None)
            .unwrap_err();
        assert!(matches!(err, SkinError::SkinData(_)));
    }

    #[test]
    fn test_fill_out_of_range_bone() {
        let weights = [1.0];
        let indices = [4];
        let mut codec = InfluenceCodec::allocate(1, 1, 4).unwrap();
        assert!(codec
            .fill(0..1, 1, source(&weights, &indices, 1), &[], None)
            .is_err());
    }
}
