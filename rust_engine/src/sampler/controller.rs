//! 采样器控制器

use std::sync::{Arc, RwLock, RwLockReadGuard};

use glam::Mat4;

use super::accel::{SamplingMode, SurfaceSamplingAccel};
use super::hooks::{self, ClothOverlay, VelocityPolicy};
use super::transforms::{OwnerTransforms, ShapeTransforms};
use super::{SamplerSettings, SamplerState, ShapeDescriptor, TickGroup};
use crate::config::{self, PipelineConfig};
use crate::host::{ClothSnapshot, SkinnedComponent};
use crate::influence::InfluenceCodec;
use crate::model::{InfluenceFormat, SkinnedMesh};
use crate::remap::{build_bone_remap, remap_inverse_bind, ClothSection};
use crate::skeleton::SkeletonView;
use crate::skinning::{AsyncSkinContext, SkinContext};
use crate::stream::OutputStreams;
use crate::{Result, SkinError};

/// 姿势构建的产物
struct BuiltPose {
    mesh: Arc<SkinnedMesh>,
    /// 不蒙皮（只复制颜色/UV）时为空
    skeleton: Option<SkeletonView>,
    /// 骨骼视图空间（主姿势时为主骨骼空间）的逆绑定矩阵
    inverse_bind: Vec<Mat4>,
    /// 由主姿势组件驱动
    leader_driven: bool,
    cloth_sections: Arc<Vec<ClothSection>>,
    influences: Option<Arc<InfluenceCodec>>,
    sampling_mode: SamplingMode,
}

/// 骨骼网格采样器
///
/// 宿主每帧的调用顺序：`tick`（启动蒙皮）→ `pre_update`（等待结果）→ `shape`。
pub struct SkinnedMeshSampler {
    config: PipelineConfig,
    settings: SamplerSettings,
    pose: Option<BuiltPose>,
    /// 任务执行期间为 `None`
    context: Option<SkinContext>,
    engine: AsyncSkinContext,
    accel: Arc<RwLock<SurfaceSamplingAccel>>,
    transforms: ShapeTransforms,
    cloth_snapshot: Option<Arc<ClothSnapshot>>,
    accumulated_dt: f32,
    /// 上一次 tick 是否启动了蒙皮
    skinning_active: bool,
    paused: bool,
    last_frame: Option<u64>,
    tick_group: TickGroup,
}

impl SkinnedMeshSampler {
    /// 使用全局配置快照
    pub fn new(settings: SamplerSettings) -> Self {
        Self::with_config(settings, config::get_config())
    }

    pub fn with_config(settings: SamplerSettings, config: PipelineConfig) -> Self {
        let engine = AsyncSkinContext::new(config.skin_chunk_vertices);
        Self {
            config,
            settings: settings.normalized(),
            pose: None,
            context: None,
            engine,
            accel: Arc::new(RwLock::new(SurfaceSamplingAccel::default())),
            transforms: ShapeTransforms::default(),
            cloth_snapshot: None,
            accumulated_dt: 0.0,
            skinning_active: false,
            paused: false,
            last_frame: None,
            tick_group: TickGroup::default(),
        }
    }

    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> SamplerState {
        if self.pose.is_none() {
            SamplerState::Unbuilt
        } else if self.engine.in_flight() {
            SamplerState::Skinning
        } else if self.paused {
            SamplerState::Idle
        } else {
            SamplerState::PoseBuilt
        }
    }

    pub fn accumulated_dt(&self) -> f32 {
        self.accumulated_dt
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// 宿主应在哪个阶段 tick 本采样器
    pub fn tick_group_hint(&self) -> TickGroup {
        self.tick_group
    }

    /// 最近一次蒙皮时骨骼可见性是否变化
    pub fn visibility_changed(&self) -> bool {
        self.pose
            .as_ref()
            .and_then(|pose| pose.skeleton.as_ref())
            .map_or(false, |skeleton| skeleton.visibility_changed())
    }

    /// 本帧蒙皮持有的布料快照，下一次 `tick` 开始时释放
    pub fn cloth_snapshot(&self) -> Option<&ClothSnapshot> {
        self.cloth_snapshot.as_deref()
    }

    /// 布料覆盖使用的分段数
    pub fn cloth_section_count(&self) -> usize {
        self.pose.as_ref().map_or(0, |pose| pose.cloth_sections.len())
    }

    /// 修改构建选项并重建姿势
    pub fn apply_settings(
        &mut self,
        settings: SamplerSettings,
        component: Option<&dyn SkinnedComponent>,
    ) -> Result<()> {
        self.settings = settings.normalized();
        self.build_initial_pose(component)
    }

    pub fn rebuild(&mut self, component: Option<&dyn SkinnedComponent>) -> Result<()> {
        self.build_initial_pose(component)
    }

    /// 粒子模拟器开始使用本采样器：恢复蒙皮，必要时构建姿势，刷新变换
    pub fn attach(
        &mut self,
        component: Option<&dyn SkinnedComponent>,
        owner: &OwnerTransforms,
    ) -> Result<()> {
        self.paused = false;
        if self.pose.is_none() {
            self.build_initial_pose(component)?;
        }
        self.update_transforms(owner, component);
        Ok(())
    }

    /// 构建绑定姿势、影响编码、重映射表与加速结构
    ///
    /// 失败时采样器保持 `Unbuilt`，形状不产生粒子。
    pub fn build_initial_pose(&mut self, component: Option<&dyn SkinnedComponent>) -> Result<()> {
        self.clear();

        let result = match component {
            Some(component) => self.build_pose(component),
            None => Err(SkinError::MissingComponent),
        };
        if let Err(e) = &result {
            let name = component.map_or("<none>", |c| c.name());
            log::warn!("无法为组件 '{}' 构建采样姿势: {}", name, e);
            self.clear();
        }
        result
    }

    fn build_pose(&mut self, component: &dyn SkinnedComponent) -> Result<()> {
        let settings = self.settings;
        let mesh = component.skinned_mesh().ok_or(SkinError::MissingComponent)?;

        if mesh.vertex_count() == 0 {
            return Err(SkinError::EmptyMesh(format!("mesh '{}' has no vertices", mesh.name)));
        }
        if mesh.bone_count == 0 {
            return Err(SkinError::EmptyMesh(format!("mesh '{}' has no bones", mesh.name)));
        }
        if mesh.influence_format == InfluenceFormat::Unlimited {
            return Err(SkinError::UnsupportedFormat(format!(
                "mesh '{}': unlimited bone influences cannot be sampled",
                mesh.name
            )));
        }
        mesh.validate()?;
        if mesh.ref_inverse_bind.len() != mesh.bone_count {
            return Err(SkinError::BoneCountMismatch {
                expected: mesh.bone_count,
                host: component.bone_count(),
                inverse_bind: mesh.ref_inverse_bind.len(),
            });
        }

        let vertex_count = mesh.vertex_count();
        let skin = settings.skins();

        let mut outputs = OutputStreams::allocate(vertex_count, settings.attribute_mask())?;
        outputs.copy_bind_pose(&mesh.streams)?;

        // 主姿势：索引和逆绑定矩阵都换到主骨骼空间
        let leader = component.leader_component();
        let (bone_remap, total_bone_count, inverse_bind) = match leader {
            Some(leader) if skin => {
                let bone_map = component.leader_bone_map();
                if bone_map.len() != mesh.bone_count {
                    return Err(SkinError::UnsupportedTopology(format!(
                        "leader bone map has {} entries, mesh '{}' has {} bones",
                        bone_map.len(),
                        mesh.name,
                        mesh.bone_count
                    )));
                }
                let leader_bone_count = leader.bone_count();
                let remap = build_bone_remap(bone_map, leader_bone_count)?;
                let inverse_bind =
                    remap_inverse_bind(&remap, &mesh.ref_inverse_bind, leader_bone_count)?;
                (Some(remap), leader_bone_count, inverse_bind)
            }
            _ => (None, mesh.bone_count, mesh.ref_inverse_bind.clone()),
        };

        let influences = if skin {
            let mut codec =
                InfluenceCodec::allocate(vertex_count, mesh.max_section_influences(), total_bone_count)?;
            let source = mesh.source_influences();
            for section in &mesh.sections {
                codec.fill(
                    section.vertex_range(),
                    section.max_influences,
                    source,
                    &section.bone_map,
                    bone_remap.as_deref(),
                )?;
            }
            Some(Arc::new(codec))
        } else {
            None
        };

        let cloth_sections = if skin && settings.build_cloth_data {
            self.build_cloth_sections(&mesh)
        } else {
            Vec::new()
        };

        let sampling_mode = match settings.sampling_mode {
            SamplingMode::Weighted if mesh.streams.colors.is_none() => {
                log::warn!(
                    "mesh '{}' 没有顶点颜色，Weighted 采样退化为 Uniform",
                    mesh.name
                );
                SamplingMode::Uniform
            }
            mode => mode,
        };
        {
            let density = mesh
                .streams
                .colors
                .as_deref()
                .map(|colors| (colors, settings.density_channel));
            let mut accel = self.write_accel();
            if !accel.build(sampling_mode, &mesh.indices, &mesh.streams.positions, density) {
                return Err(SkinError::EmptyMesh(format!(
                    "mesh '{}' has no triangle with positive area",
                    mesh.name
                )));
            }
        }

        let skeleton = if skin {
            self.tick_group = TickGroup::for_kind(component.kind()).ok_or_else(|| {
                SkinError::UnsupportedTopology(format!(
                    "component '{}' is neither skeletal nor destructible",
                    component.name()
                ))
            })?;
            Some(SkeletonView::new(total_bone_count))
        } else {
            None
        };

        log::info!(
            "采样姿势构建完成: mesh='{}', 顶点={}, 三角形={}, 骨骼={}, 索引宽度={:?}, 主姿势={}, 布料分段={}",
            mesh.name,
            vertex_count,
            mesh.triangle_count(),
            total_bone_count,
            influences.as_ref().map(|c| c.width()),
            bone_remap.is_some(),
            cloth_sections.len()
        );

        self.context = Some(SkinContext::new(Arc::clone(&mesh), influences.clone(), outputs));
        self.pose = Some(BuiltPose {
            mesh,
            skeleton,
            inverse_bind,
            leader_driven: bone_remap.is_some(),
            cloth_sections: Arc::new(cloth_sections),
            influences,
            sampling_mode,
        });
        Ok(())
    }

    fn build_cloth_sections(&self, mesh: &SkinnedMesh) -> Vec<ClothSection> {
        let mut sections = Vec::new();
        for (index, section) in mesh.sections.iter().enumerate() {
            let Some(asset_id) = section.cloth_asset else {
                continue;
            };
            let asset = match mesh.cloth_assets.get(&asset_id) {
                Some(asset) if !asset.vertices.is_empty() => asset,
                _ => {
                    log::warn!(
                        "无法为 '{}' 的分段 {} 构建布料数据：布料资源 {} 没有物理网格",
                        mesh.name,
                        index,
                        asset_id
                    );
                    continue;
                }
            };
            if let Some(cloth) = ClothSection::build(
                &mesh.name,
                index,
                section,
                asset_id,
                &mesh.streams.positions,
                &asset.vertices,
                self.config.cloth_match_epsilon,
                self.config.global_scale,
            ) {
                sections.push(cloth);
            }
        }
        sections
    }

    /// 每帧更新：决定是否蒙皮并启动任务
    pub fn tick(&mut self, delta_time: f32, component: &dyn SkinnedComponent) {
        self.cloth_snapshot = None;

        let Some(pose) = &self.pose else {
            return;
        };
        if pose.skeleton.is_none() {
            return;
        }

        let mut should_skin =
            (component.recently_rendered() || component.always_tick_pose()) && !self.paused;

        let max_idle = self.config.max_anim_idle_time;
        if self.accumulated_dt < max_idle {
            self.accumulated_dt = (self.accumulated_dt + delta_time).min(max_idle);
        }

        if should_skin {
            // 上一帧的结果无人消费：自动暂停
            if self.engine.in_flight() {
                self.finish_job();
                self.paused = true;
                log::debug!("'{}' 的蒙皮结果未被读取，暂停蒙皮", component.name());
                return;
            }
            should_skin = match self.update_skinning(component) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("'{}' 蒙皮更新失败: {}", component.name(), e);
                    false
                }
            };
        } else {
            // 任务结果无人消费：交还上下文并暂停
            if self.engine.in_flight() {
                self.finish_job();
                self.paused = true;
                log::debug!("'{}' 停止蒙皮时仍有未读取的结果，暂停蒙皮", component.name());
            }
            if self.skinning_active {
                if let Some(ctx) = &mut self.context {
                    ctx.outputs.clear_velocities();
                }
            }
        }
        self.skinning_active = should_skin;
    }

    /// 刷新骨骼视图并启动蒙皮任务
    pub fn update_skinning(&mut self, component: &dyn SkinnedComponent) -> Result<()> {
        let pose = self.pose.as_mut().ok_or(SkinError::NotBuilt)?;
        let skeleton = pose.skeleton.as_mut().ok_or(SkinError::NotBuilt)?;
        if self.context.is_none() {
            return Err(SkinError::NotBuilt);
        }

        let driver = match component.leader_component() {
            Some(leader) if pose.leader_driven => leader,
            _ => component,
        };
        if let Err(e) = skeleton.rebuild(
            driver.component_space_transforms(),
            &pose.inverse_bind,
            driver.bone_visibility_states(),
            self.config.global_scale_rcp(),
        ) {
            log::warn!(
                "骨骼数量不匹配，请重新构建 '{}' 的绑定姿势: {}",
                pose.mesh.name,
                e
            );
            return Err(e);
        }

        let cloth = if self.settings.build_cloth_data
            && !pose.cloth_sections.is_empty()
            && component.cloth_simulation_enabled()
        {
            self.cloth_snapshot = component.cloth_data();
            self.cloth_snapshot.as_ref().map(|snapshot| ClothOverlay {
                sections: Arc::clone(&pose.cloth_sections),
                snapshot: Arc::clone(snapshot),
                to_local: component.component_transform().to_matrix().inverse(),
                inv_scale: self.config.global_scale_rcp(),
            })
        } else {
            None
        };

        let velocity = self.settings.compute_velocities.then_some(VelocityPolicy {
            accumulated_dt: self.accumulated_dt,
            max_idle_time: self.config.max_anim_idle_time,
        });

        let Some(mut ctx) = self.context.take() else {
            return Err(SkinError::NotBuilt);
        };
        if self.settings.compute_velocities {
            ctx.pre_process = Some(hooks::save_old_positions());
        }
        ctx.post_process = hooks::post_process(cloth, velocity);
        if skeleton.visibility_changed() {
            if self.settings.skin_positions {
                ctx.finish = Some(hooks::rebuild_accel(
                    Arc::clone(&self.accel),
                    pose.sampling_mode,
                    self.settings.density_channel,
                ));
            } else {
                log::warn!(
                    "'{}' 骨骼可见性变化但未蒙皮位置，采样分布可能无效",
                    pose.mesh.name
                );
            }
        }

        if self.config.debug_log {
            log::debug!(
                "启动蒙皮: mesh='{}', accumulated_dt={:.4}",
                pose.mesh.name,
                self.accumulated_dt
            );
        }
        self.engine.start(skeleton, ctx);
        Ok(())
    }

    /// 模拟器读取形状前调用：每帧最多一次
    pub fn pre_update(
        &mut self,
        frame_index: u64,
        owner: &OwnerTransforms,
        component: Option<&dyn SkinnedComponent>,
    ) {
        if self.last_frame == Some(frame_index) {
            return;
        }
        self.last_frame = Some(frame_index);

        self.update_transforms(owner, component);

        if self.pose.is_some() && self.skinning_active {
            self.finish_job();
            if !self.paused {
                self.accumulated_dt = 0.0;
            }
        }
    }

    fn update_transforms(&mut self, owner: &OwnerTransforms, component: Option<&dyn SkinnedComponent>) {
        // 没有构建成功的组件不能作为变换来源
        let component = if self.pose.is_some() { component } else { None };
        self.transforms.update(
            self.settings.transforms,
            self.settings.apply_scale,
            owner,
            component,
            self.config.global_scale_rcp(),
        );
    }

    /// 等待蒙皮任务并取回上下文
    fn finish_job(&mut self) {
        if !self.engine.in_flight() {
            return;
        }
        match self.engine.wait(None) {
            Some(ctx) => self.context = Some(ctx),
            None => {
                log::error!("蒙皮任务丢失，采样器需要重新构建");
                self.pose = None;
                self.context = None;
            }
        }
    }

    /// 当前形状；未构建或任务执行中返回 `None`
    pub fn shape(&self) -> Option<ShapeDescriptor<'_>> {
        let pose = self.pose.as_ref()?;
        let ctx = self.context.as_ref()?;
        let outputs = &ctx.outputs;
        let bind = &pose.mesh.streams;

        let positions = if outputs.positions.is_empty() {
            bind.positions.as_slice()
        } else {
            outputs.positions.as_slice()
        };
        Some(ShapeDescriptor {
            positions,
            normals: non_empty(&outputs.normals),
            tangents: non_empty(&outputs.tangents),
            colors: non_empty(&outputs.colors),
            uvs: &outputs.uvs,
            velocities: non_empty(&outputs.velocities),
            indices: &pose.mesh.indices,
            influences: pose.influences.as_ref().map(|codec| codec.view()),
            accel: self.read_accel(),
            transforms: self.transforms,
        })
    }

    fn read_accel(&self) -> RwLockReadGuard<'_, SurfaceSamplingAccel> {
        match self.accel.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_accel(&self) -> std::sync::RwLockWriteGuard<'_, SurfaceSamplingAccel> {
        match self.accel.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// 丢弃所有构建结果（等待正在执行的任务）
    fn clear(&mut self) {
        self.engine.wait(None);
        self.pose = None;
        self.context = None;
        self.cloth_snapshot = None;
        self.skinning_active = false;
        self.accumulated_dt = 0.0;
        self.tick_group = TickGroup::default();
        self.write_accel().clear();
    }
}

impl Drop for SkinnedMeshSampler {
    fn drop(&mut self) {
        self.engine.wait(None);
    }
}

fn non_empty<T>(stream: &[T]) -> Option<&[T]> {
    if stream.is_empty() {
        None
    } else {
        Some(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ComponentKind, Transform};
    use crate::model::RenderSection;
    use crate::stream::VertexStreams;
    use glam::{Vec3, Vec3A};

    struct TestComponent {
        mesh: Option<Arc<SkinnedMesh>>,
        pose: Vec<Transform>,
        visibility: Vec<bool>,
        kind: ComponentKind,
        rendered: bool,
    }

    impl TestComponent {
        fn new(mesh: SkinnedMesh) -> Self {
            let bones = mesh.bone_count;
            Self {
                mesh: Some(Arc::new(mesh)),
                pose: vec![Transform::IDENTITY; bones],
                visibility: vec![true; bones],
                kind: ComponentKind::Skeletal,
                rendered: true,
            }
        }
    }

    impl SkinnedComponent for TestComponent {
        fn name(&self) -> &str {
            "test"
        }
        fn kind(&self) -> ComponentKind {
            self.kind
        }
        fn skinned_mesh(&self) -> Option<Arc<SkinnedMesh>> {
            self.mesh.clone()
        }
        fn component_space_transforms(&self) -> &[Transform] {
            &self.pose
        }
        fn bone_visibility_states(&self) -> &[bool] {
            &self.visibility
        }
        fn recently_rendered(&self) -> bool {
            self.rendered
        }
    }

    /// 一个三角形，单骨骼
    fn triangle() -> SkinnedMesh {
        SkinnedMesh {
            name: "tri".to_string(),
            streams: VertexStreams::new(vec![Vec3A::ZERO, Vec3A::X, Vec3A::Y]),
            indices: vec![0, 1, 2],
            sections: vec![RenderSection::new(0, 3, 1)],
            influence_stride: 1,
            bone_weights: vec![1.0; 3],
            bone_indices: vec![0; 3],
            ref_inverse_bind: vec![Mat4::IDENTITY],
            bone_count: 1,
            ..SkinnedMesh::default()
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            skin_chunk_vertices: 2,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_build_and_skin() {
        let mut component = TestComponent::new(triangle());
        let mut sampler = SkinnedMeshSampler::with_config(SamplerSettings::default(), config());
        assert_eq!(sampler.state(), SamplerState::Unbuilt);
        assert!(sampler.shape().is_none());

        sampler.build_initial_pose(Some(&component)).unwrap();
        assert_eq!(sampler.state(), SamplerState::PoseBuilt);
        assert_eq!(sampler.tick_group_hint(), TickGroup::PrePhysics);

        component.pose[0] = Transform::from_translation(Vec3::Z);
        sampler.tick(0.016, &component);
        assert_eq!(sampler.state(), SamplerState::Skinning);
        assert!(sampler.shape().is_none());

        sampler.pre_update(1, &OwnerTransforms::default(), Some(&component));
        assert_eq!(sampler.state(), SamplerState::PoseBuilt);
        assert_eq!(sampler.accumulated_dt(), 0.0);

        let shape = sampler.shape().unwrap();
        assert!((shape.positions[1] - Vec3A::new(1.0, 0.0, 1.0)).length() < 1e-6);
        assert!(!shape.accel.is_empty());
    }

    #[test]
    fn test_missing_component() {
        let mut sampler = SkinnedMeshSampler::with_config(SamplerSettings::default(), config());
        assert_eq!(sampler.build_initial_pose(None), Err(SkinError::MissingComponent));
        assert_eq!(sampler.state(), SamplerState::Unbuilt);
    }

    #[test]
    fn test_unlimited_influences_rejected() {
        let mut mesh = triangle();
        mesh.influence_format = InfluenceFormat::Unlimited;
        let component = TestComponent::new(mesh);
        let mut sampler = SkinnedMeshSampler::with_config(SamplerSettings::default(), config());
        let err = sampler.build_initial_pose(Some(&component)).unwrap_err();
        assert!(matches!(err, SkinError::UnsupportedFormat(_)));
        assert!(sampler.shape().is_none());
    }

    #[test]
    fn test_other_component_kind_rejected() {
        let mut component = TestComponent::new(triangle());
        component.kind = ComponentKind::Other;
        let mut sampler = SkinnedMeshSampler::with_config(SamplerSettings::default(), config());
        assert!(sampler.build_initial_pose(Some(&component)).is_err());
        assert_eq!(sampler.state(), SamplerState::Unbuilt);
    }

    #[test]
    fn test_unconsumed_job_pauses() {
        let component = TestComponent::new(triangle());
        let mut sampler = SkinnedMeshSampler::with_config(SamplerSettings::default(), config());
        sampler.build_initial_pose(Some(&component)).unwrap();

        sampler.tick(0.016, &component);
        // 没有 pre_update，下一帧自动暂停
        sampler.tick(0.016, &component);
        assert!(sampler.is_paused());
        assert_eq!(sampler.state(), SamplerState::Idle);

        // 暂停时不再启动任务
        sampler.tick(0.016, &component);
        assert_eq!(sampler.state(), SamplerState::Idle);

        sampler
            .attach(Some(&component), &OwnerTransforms::default())
            .unwrap();
        assert!(!sampler.is_paused());
    }

    #[test]
    fn test_not_rendered_skips_skinning() {
        let mut component = TestComponent::new(triangle());
        component.rendered = false;
        let mut sampler = SkinnedMeshSampler::with_config(SamplerSettings::default(), config());
        sampler.build_initial_pose(Some(&component)).unwrap();
        sampler.tick(0.016, &component);
        assert_eq!(sampler.state(), SamplerState::PoseBuilt);
    }

    #[test]
    fn test_accumulated_dt_capped() {
        let mut component = TestComponent::new(triangle());
        component.rendered = false;
        let mut sampler = SkinnedMeshSampler::with_config(SamplerSettings::default(), config());
        sampler.build_initial_pose(Some(&component)).unwrap();
        for _ in 0..10 {
            sampler.tick(0.3, &component);
        }
        assert_eq!(sampler.accumulated_dt(), 1.0);
    }

    #[test]
    fn test_pre_update_once_per_frame() {
        let component = TestComponent::new(triangle());
        let mut sampler = SkinnedMeshSampler::with_config(SamplerSettings::default(), config());
        sampler.build_initial_pose(Some(&component)).unwrap();

        let owner = OwnerTransforms {
            relative: Transform::from_translation(Vec3::X),
            ..OwnerTransforms::default()
        };
        sampler.pre_update(7, &owner, Some(&component));
        sampler.pre_update(7, &owner, Some(&component));
        let shape = sampler.shape().unwrap();
        // 第二次调用被忽略，previous 仍是初始的单位矩阵
        assert_eq!(shape.transforms.previous, Mat4::IDENTITY);
        assert!((shape.transforms.current.w_axis.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_weighted_without_colors_falls_back() {
        let component = TestComponent::new(triangle());
        let settings = SamplerSettings {
            sampling_mode: SamplingMode::Weighted,
            ..SamplerSettings::default()
        };
        let mut sampler = SkinnedMeshSampler::with_config(settings, config());
        sampler.build_initial_pose(Some(&component)).unwrap();
        assert_eq!(sampler.shape().unwrap().accel.mode(), SamplingMode::Uniform);
    }
}
