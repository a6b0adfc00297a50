//! 蒙皮任务钩子：旧位置保存、布料覆盖、速度差分、加速结构重建

use std::sync::{Arc, RwLock};

use glam::{Mat4, Vec3A};

use super::accel::{ColorChannel, SamplingMode, SurfaceSamplingAccel};
use crate::host::ClothSnapshot;
use crate::remap::ClothSection;
use crate::skinning::{FinishHook, RangeHook, SkinContext, SkinRange};

/// 一帧的布料覆盖参数
pub(super) struct ClothOverlay {
    pub sections: Arc<Vec<ClothSection>>,
    pub snapshot: Arc<ClothSnapshot>,
    /// 组件世界变换的逆
    pub to_local: Mat4,
    pub inv_scale: f32,
}

impl ClothOverlay {
    fn apply(&self, range: &mut SkinRange<'_>) {
        for section in self.sections.iter() {
            let Some(data) = self.snapshot.get(&section.cloth_asset) else {
                continue;
            };
            section.overlay(
                range.start,
                range.positions,
                range.normals,
                data,
                &self.to_local,
                self.inv_scale,
            );
        }
    }
}

/// 一帧的速度参数
#[derive(Clone, Copy, Debug)]
pub(super) struct VelocityPolicy {
    pub accumulated_dt: f32,
    pub max_idle_time: f32,
}

impl VelocityPolicy {
    fn apply(&self, range: &mut SkinRange<'_>) {
        if range.velocities.is_empty() {
            return;
        }
        // 动画停止太久（或尚未经过时间）：不插值
        if self.accumulated_dt <= 0.0 || self.accumulated_dt >= self.max_idle_time {
            range.velocities.fill(Vec3A::ZERO);
            return;
        }

        let inv_dt = 1.0 / self.accumulated_dt;
        for ((velocity, current), old) in range
            .velocities
            .iter_mut()
            .zip(range.positions.iter())
            .zip(range.old_positions.iter())
        {
            *velocity = (*current - *old) * inv_dt;
        }
    }
}

/// 蒙皮前保存上一帧的位置
pub(super) fn save_old_positions() -> RangeHook {
    Box::new(|range: &mut SkinRange<'_>| {
        if range.old_positions.len() == range.positions.len() {
            range.old_positions.copy_from_slice(range.positions);
        }
    })
}

/// 蒙皮后：先覆盖布料，再计算速度
pub(super) fn post_process(
    cloth: Option<ClothOverlay>,
    velocity: Option<VelocityPolicy>,
) -> Option<RangeHook> {
    if cloth.is_none() && velocity.is_none() {
        return None;
    }
    Some(Box::new(move |range: &mut SkinRange<'_>| {
        if let Some(cloth) = &cloth {
            cloth.apply(range);
        }
        if let Some(velocity) = &velocity {
            velocity.apply(range);
        }
    }))
}

/// 任务结束后按蒙皮位置重建加速结构
pub(super) fn rebuild_accel(
    accel: Arc<RwLock<SurfaceSamplingAccel>>,
    mode: SamplingMode,
    channel: ColorChannel,
) -> FinishHook {
    Box::new(move |ctx: &SkinContext| {
        let density = ctx
            .mesh
            .streams
            .colors
            .as_deref()
            .map(|colors| (colors, channel));
        let mut accel = match accel.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !accel.build(mode, &ctx.mesh.indices, &ctx.outputs.positions, density) {
            log::warn!(
                "'{}' 骨骼可见性变化后没有可采样的三角形，采样域为空",
                ctx.mesh.name
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ClothSimData;
    use glam::Vec3;

    fn range<'a>(
        start: usize,
        positions: &'a mut [Vec3A],
        normals: &'a mut [Vec3A],
        velocities: &'a mut [Vec3A],
        old_positions: &'a mut [Vec3A],
    ) -> SkinRange<'a> {
        SkinRange {
            start,
            count: positions.len(),
            positions,
            normals,
            tangents: &mut [],
            velocities,
            old_positions,
        }
    }

    #[test]
    fn test_velocity_from_positions() {
        let mut positions = vec![Vec3A::new(1.0, 0.0, 0.0); 2];
        let mut old = vec![Vec3A::ZERO; 2];
        let mut velocities = vec![Vec3A::ZERO; 2];
        let mut r = range(0, &mut positions, &mut [], &mut velocities, &mut old);

        let policy = VelocityPolicy {
            accumulated_dt: 0.5,
            max_idle_time: 1.0,
        };
        policy.apply(&mut r);
        assert!((r.velocities[1] - Vec3A::new(2.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_velocity_idle_is_zero() {
        let mut positions = vec![Vec3A::new(1.0, 0.0, 0.0); 2];
        let mut old = vec![Vec3A::ZERO; 2];
        let mut velocities = vec![Vec3A::ONE; 2];
        let mut r = range(0, &mut positions, &mut [], &mut velocities, &mut old);

        let policy = VelocityPolicy {
            accumulated_dt: 1.0,
            max_idle_time: 1.0,
        };
        policy.apply(&mut r);
        assert!(r.velocities.iter().all(|v| *v == Vec3A::ZERO));
    }

    #[test]
    fn test_save_old_positions() {
        let mut positions = vec![Vec3A::X, Vec3A::Y];
        let mut old = vec![Vec3A::ZERO; 2];
        let mut velocities = vec![Vec3A::ZERO; 2];
        let mut r = range(4, &mut positions, &mut [], &mut velocities, &mut old);
        save_old_positions()(&mut r);
        assert_eq!(&r.old_positions[..], &[Vec3A::X, Vec3A::Y][..]);
    }

    #[test]
    fn test_cloth_then_velocity() {
        let section = ClothSection {
            base_vertex: 0,
            vertex_count: 1,
            cloth_asset: 3,
            indices: vec![0],
        };
        let mut snapshot = ClothSnapshot::new();
        snapshot.insert(
            3,
            ClothSimData {
                positions: vec![Vec3::new(0.0, 1.0, 0.0)],
                normals: vec![Vec3::X],
            },
        );
        let hook = post_process(
            Some(ClothOverlay {
                sections: Arc::new(vec![section]),
                snapshot: Arc::new(snapshot),
                to_local: Mat4::IDENTITY,
                inv_scale: 1.0,
            }),
            Some(VelocityPolicy {
                accumulated_dt: 0.25,
                max_idle_time: 1.0,
            }),
        )
        .unwrap();

        let mut positions = vec![Vec3A::ZERO];
        let mut normals = vec![Vec3A::Z];
        let mut old = vec![Vec3A::ZERO];
        let mut velocities = vec![Vec3A::ZERO];
        let mut r = range(0, &mut positions, &mut normals, &mut velocities, &mut old);
        hook(&mut r);

        assert!((r.positions[0] - Vec3A::Y).length() < 1e-6);
        assert!((r.normals[0] - Vec3A::X).length() < 1e-6);
        // 速度基于布料覆盖后的位置
        assert!((r.velocities[0] - Vec3A::new(0.0, 4.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_no_post_process() {
        assert!(post_process(None, None).is_none());
    }
}
