//! 骨骼权重/索引编解码
//!
//! 权重以 f32 存放，索引按骨骼总数选择 8 位或 16 位。
//! 宽度在姿势构建时确定一次，蒙皮内核按宽度分别实例化。

mod codec;

pub use codec::InfluenceCodec;

/// 骨骼索引宽度
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoneIndexWidth {
    U8,
    U16,
}

impl BoneIndexWidth {
    pub fn bytes(self) -> usize {
        match self {
            BoneIndexWidth::U8 => 1,
            BoneIndexWidth::U16 => 2,
        }
    }
}

/// 骨骼总数 ≤ 256 时用 8 位索引
pub fn choose_width(total_bone_count: usize) -> BoneIndexWidth {
    if total_bone_count <= 256 {
        BoneIndexWidth::U8
    } else {
        BoneIndexWidth::U16
    }
}

/// 可作为骨骼索引存储的整数类型
pub trait BoneIndex: Copy + Default + Send + Sync + 'static {
    const WIDTH: BoneIndexWidth;

    fn from_index(index: usize) -> Option<Self>;

    fn index(self) -> usize;
}

impl BoneIndex for u8 {
    const WIDTH: BoneIndexWidth = BoneIndexWidth::U8;

    fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index).ok()
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl BoneIndex for u16 {
    const WIDTH: BoneIndexWidth = BoneIndexWidth::U16;

    fn from_index(index: usize) -> Option<Self> {
        u16::try_from(index).ok()
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// 网格资源中的源影响流
#[derive(Clone, Copy, Debug)]
pub struct SourceInfluences<'a> {
    pub weights: &'a [f32],
    /// 段内骨骼索引
    pub indices: &'a [u16],
    /// 每顶点槽位数
    pub stride: usize,
}

/// 单一宽度的只读视图
#[derive(Clone, Copy, Debug)]
pub struct InfluenceView<'a, I: BoneIndex> {
    weights: &'a [f32],
    indices: &'a [I],
    stride: usize,
}

impl<'a, I: BoneIndex> InfluenceView<'a, I> {
    pub(crate) fn new(weights: &'a [f32], indices: &'a [I], stride: usize) -> Self {
        Self {
            weights,
            indices,
            stride,
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn vertex_count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.weights.len() / self.stride
        }
    }

    /// 顶点的 (骨骼索引, 权重)，在第一个零权重处结束
    pub fn vertex(&self, vertex: usize) -> impl Iterator<Item = (usize, f32)> + 'a {
        let start = vertex * self.stride;
        let end = start + self.stride;
        let weights = &self.weights[start..end];
        let indices = &self.indices[start..end];
        weights
            .iter()
            .zip(indices.iter())
            .take_while(|(w, _)| **w != 0.0)
            .map(|(w, i)| (i.index(), *w))
    }
}

/// 与宽度无关的统一访问
#[derive(Clone, Copy, Debug)]
pub enum InfluenceStreams<'a> {
    Small(InfluenceView<'a, u8>),
    Wide(InfluenceView<'a, u16>),
}

impl InfluenceStreams<'_> {
    pub fn width(&self) -> BoneIndexWidth {
        match self {
            InfluenceStreams::Small(_) => BoneIndexWidth::U8,
            InfluenceStreams::Wide(_) => BoneIndexWidth::U16,
        }
    }

    /// 顶点的影响列表（调试/测试用，内核直接使用具体视图）
    pub fn influences(&self, vertex: usize) -> Vec<(usize, f32)> {
        match self {
            InfluenceStreams::Small(view) => view.vertex(vertex).collect(),
            InfluenceStreams::Wide(view) => view.vertex(vertex).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_width_boundary() {
        assert_eq!(choose_width(1), BoneIndexWidth::U8);
        assert_eq!(choose_width(256), BoneIndexWidth::U8);
        assert_eq!(choose_width(257), BoneIndexWidth::U16);
        assert_eq!(choose_width(257).bytes(), 2);
    }

    #[test]
    fn test_from_index() {
        assert_eq!(u8::from_index(255), Some(255));
        assert_eq!(u8::from_index(256), None);
        assert_eq!(u16::from_index(256), Some(256));
    }

    #[test]
    fn test_view_stops_at_zero_weight() {
        let weights = [0.6, 0.4, 0.0, 0.3];
        let indices: [u8; 4] = [3, 1, 7, 2];
        let view = InfluenceView::new(&weights, &indices, 4);
        let influences: Vec<_> = view.vertex(0).collect();
        assert_eq!(influences, vec![(3, 0.6), (1, 0.4)]);
    }
}
