//! 蒙皮采样管线全局配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。
//! 每个采样器在创建时读取一次快照，运行期修改只影响之后创建的采样器。

use once_cell::sync::Lazy;
use std::sync::RwLock;

/// 管线配置（扁平化，不嵌套）
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    // ========== 单位 ==========
    /// 宿主单位 / 模拟单位的比例，默认 1.0
    pub global_scale: f32,

    // ========== 速度 ==========
    /// 最大动画空闲时间（秒），默认 1.0
    /// 累计时间达到此值后速度强制归零
    pub max_anim_idle_time: f32,

    // ========== 布料 ==========
    /// 布料顶点匹配容差（距离，比较时取平方），默认 1e-4
    pub cloth_match_epsilon: f32,

    // ========== 并行 ==========
    /// 每个蒙皮任务处理的顶点数，默认 1024
    pub skin_chunk_vertices: usize,

    // ========== 调试 ==========
    /// 是否输出每帧调试日志，默认 false
    pub debug_log: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            // ====== 单位 ======
            // 宿主引擎的长度单位与粒子模拟单位之比
            // 骨骼矩阵和世界变换的平移部分都会除以这个值
            global_scale: 1.0,

            // ====== 速度 ======
            // 超过这个时间没有被读取的蒙皮结果视为“停止”
            // 此时不再用旧位置差分计算速度
            max_anim_idle_time: 1.0,

            // ====== 布料 ======
            // 导入/导出往返会引入浮点误差，不能用精确相等
            cloth_match_epsilon: 1.0e-4,

            // ====== 并行 ======
            // 越大 → 调度开销越小，但负载均衡越差
            skin_chunk_vertices: 1024,

            // ====== 调试 ======
            debug_log: false,
        }
    }
}

impl PipelineConfig {
    /// 全局缩放的倒数（零缩放视为 1）
    pub fn global_scale_rcp(&self) -> f32 {
        if self.global_scale == 0.0 {
            1.0
        } else {
            1.0 / self.global_scale
        }
    }
}

/// 全局配置实例
static PIPELINE_CONFIG: Lazy<RwLock<PipelineConfig>> =
    Lazy::new(|| RwLock::new(PipelineConfig::default()));

/// 获取当前配置（只读）
pub fn get_config() -> PipelineConfig {
    match PIPELINE_CONFIG.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: PipelineConfig) {
    match PIPELINE_CONFIG.write() {
        Ok(mut guard) => *guard = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

/// 重置为默认配置
pub fn reset_config() {
    set_config(PipelineConfig::default());
}
