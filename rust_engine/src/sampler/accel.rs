//! 表面采样加速结构
//!
//! 按三角形面积（Weighted 模式再乘以顶点颜色某通道的平均值）建立分布：
//! Uniform / Weighted 使用累积分布 + 二分查找，Fast 使用 Vose 别名表（O(1) 采样）。

use glam::{Vec3, Vec3A, Vec4};

/// 三角形选择方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SamplingMode {
    /// 按面积均匀，累积分布查找
    #[default]
    Uniform,
    /// 按面积均匀，别名表查找
    Fast,
    /// 面积 × 颜色通道密度
    Weighted,
}

/// 密度所用的颜色通道
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorChannel {
    #[default]
    Red,
    Green,
    Blue,
    Alpha,
}

impl ColorChannel {
    pub fn read(self, color: Vec4) -> f32 {
        match self {
            ColorChannel::Red => color.x,
            ColorChannel::Green => color.y,
            ColorChannel::Blue => color.z,
            ColorChannel::Alpha => color.w,
        }
    }
}

/// 一次表面采样的结果
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSample {
    pub triangle: u32,
    /// 三个顶点的重心坐标，和为 1
    pub barycentric: Vec3,
}

#[derive(Clone, Debug, Default)]
pub struct SurfaceSamplingAccel {
    mode: SamplingMode,
    /// 归一化的累积分布（Uniform / Weighted）
    cdf: Vec<f32>,
    /// 别名表：(接受概率, 别名三角形)（Fast）
    alias: Vec<(f32, u32)>,
    total_weight: f32,
}

impl SurfaceSamplingAccel {
    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    pub fn triangle_count(&self) -> usize {
        self.cdf.len().max(self.alias.len())
    }

    /// 所有三角形的权重和（Uniform / Fast 模式下即总面积）
    pub fn total_weight(&self) -> f32 {
        self.total_weight
    }

    /// 采样域为空（没有面积为正的三角形）
    pub fn is_empty(&self) -> bool {
        self.total_weight <= 0.0
    }

    pub fn clear(&mut self) {
        self.cdf.clear();
        self.alias.clear();
        self.total_weight = 0.0;
    }

    /// 重建分布；总权重为 0 时清空并返回 false
    ///
    /// `density` 仅在 Weighted 模式下使用，为 `None` 时退化为按面积。
    pub fn build(
        &mut self,
        mode: SamplingMode,
        indices: &[u32],
        positions: &[Vec3A],
        density: Option<(&[Vec4], ColorChannel)>,
    ) -> bool {
        self.clear();
        self.mode = mode;

        let density = match mode {
            SamplingMode::Weighted => density,
            _ => None,
        };

        let weights: Vec<f32> = indices
            .chunks_exact(3)
            .map(|tri| {
                let (Some(a), Some(b), Some(c)) = (
                    positions.get(tri[0] as usize),
                    positions.get(tri[1] as usize),
                    positions.get(tri[2] as usize),
                ) else {
                    return 0.0;
                };
                let area = 0.5 * (*b - *a).cross(*c - *a).length();
                let weight = match density {
                    Some((colors, channel)) => {
                        let sum: f32 = tri
                            .iter()
                            .filter_map(|&i| colors.get(i as usize))
                            .map(|&color| channel.read(color))
                            .sum();
                        area * (sum / 3.0).max(0.0)
                    }
                    None => area,
                };
                if weight.is_finite() {
                    weight
                } else {
                    0.0
                }
            })
            .collect();

        let total: f32 = weights.iter().sum();
        if !(total > 0.0) {
            return false;
        }
        self.total_weight = total;

        match mode {
            SamplingMode::Fast => self.alias = build_alias_table(&weights, total),
            SamplingMode::Uniform | SamplingMode::Weighted => {
                let mut acc = 0.0;
                self.cdf = weights
                    .iter()
                    .map(|w| {
                        acc += w / total;
                        acc
                    })
                    .collect();
                // 消除累加误差
                if let Some(last) = self.cdf.last_mut() {
                    *last = 1.0;
                }
            }
        }
        true
    }

    /// 选择三角形；`u` ∈ [0, 1)
    pub fn sample_triangle(&self, u: f32) -> Option<u32> {
        if self.is_empty() {
            return None;
        }
        let u = u.clamp(0.0, 1.0);
        match self.mode {
            SamplingMode::Fast => {
                let n = self.alias.len();
                let scaled = u * n as f32;
                let slot = (scaled as usize).min(n - 1);
                let frac = scaled - slot as f32;
                let (prob, alias) = self.alias[slot];
                Some(if frac < prob { slot as u32 } else { alias })
            }
            SamplingMode::Uniform | SamplingMode::Weighted => {
                // 第一个累积值 > u 的三角形，跳过零面积三角形
                let index = self.cdf.partition_point(|&c| c <= u);
                Some(index.min(self.cdf.len() - 1) as u32)
            }
        }
    }

    /// 在表面上取一点；`u` 选择三角形，`(v, w)` 决定三角形内的位置
    pub fn sample(&self, u: f32, v: f32, w: f32) -> Option<SurfaceSample> {
        let triangle = self.sample_triangle(u)?;
        let su = v.clamp(0.0, 1.0).sqrt();
        let b0 = 1.0 - su;
        let b1 = w.clamp(0.0, 1.0) * su;
        Some(SurfaceSample {
            triangle,
            barycentric: Vec3::new(b0, b1, 1.0 - b0 - b1),
        })
    }
}

fn build_alias_table(weights: &[f32], total: f32) -> Vec<(f32, u32)> {
    let n = weights.len();
    let mut scaled: Vec<f32> = weights.iter().map(|w| w * n as f32 / total).collect();
    let mut table: Vec<(f32, u32)> = (0..n as u32).map(|i| (1.0, i)).collect();

    let mut small: Vec<usize> = Vec::new();
    let mut large: Vec<usize> = Vec::new();
    for (i, &p) in scaled.iter().enumerate() {
        if p < 1.0 {
            small.push(i);
        } else {
            large.push(i);
        }
    }

    while let (Some(s), Some(&l)) = (small.pop(), large.last()) {
        table[s] = (scaled[s], l as u32);
        scaled[l] -= 1.0 - scaled[s];
        if scaled[l] < 1.0 {
            large.pop();
            small.push(l);
        }
    }
    // 剩余项的概率因浮点误差略偏离 1，直接视为 1
    for i in large.into_iter().chain(small) {
        table[i] = (1.0, i as u32);
    }
    table
}
