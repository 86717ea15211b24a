//! 求解器全局配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。
//! 节点自身的属性默认值（maxstretch、slide 等）在各节点的 Default 中，不在这里。

use once_cell::sync::Lazy;
use std::sync::RwLock;

/// 求解器配置（扁平化，不嵌套）
#[derive(Debug, Clone)]
pub struct SolverConfig {
    // ========== 弹簧 ==========
    /// 连续播放允许的最大时间步（帧），默认 1.0
    /// 两次求值的时间差为负或超过此值时视为拖动时间轴，弹簧重置到目标点
    pub spring_max_time_step: f64,

    // ========== 采样 ==========
    /// Roll Spline 重采样默认细分数，默认 10（最小 3）
    pub default_subdiv: usize,
    /// 曲线百分比映射默认采样数，默认 40
    pub default_curve_steps: usize,

    // ========== 射线 ==========
    /// 射线最大参数距离，默认 9999
    pub ray_max_param: f64,
    /// 射线求交容差，默认 1e-6
    pub ray_tolerance: f64,

    // ========== 并行 ==========
    /// 批量求值时启用 rayon 的最小节点数，默认 64
    pub parallel_min_batch: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            // ====== 弹簧 ======
            // 只接受一帧以内的步进，超过即重置（回放拖动检测）
            spring_max_time_step: 1.0,

            // ====== 采样 ======
            default_subdiv: 10,
            default_curve_steps: 40,

            // ====== 射线 ======
            ray_max_param: 9999.0,
            ray_tolerance: 1.0e-6,

            // ====== 并行 ======
            // 节点很少时线程调度开销比计算本身还大
            parallel_min_batch: 64,
        }
    }
}

/// 全局配置实例
static SOLVER_CONFIG: Lazy<RwLock<SolverConfig>> = Lazy::new(|| {
    RwLock::new(SolverConfig::default())
});

/// 获取当前配置（只读）
pub fn get_config() -> SolverConfig {
    SOLVER_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: SolverConfig) {
    *SOLVER_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// 重置为默认配置
pub fn reset_config() {
    *SOLVER_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = SolverConfig::default();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.spring_max_time_step, 1.0);
        assert_eq!(config.default_subdiv, 10);
        assert_eq!(config.default_curve_steps, 40);
        assert_eq!(config.parallel_min_batch, 64);
    }

    #[test]
    fn test_set_and_reset() {
        // 其它测试并行读取全局配置，这里只写回默认值
        set_config(SolverConfig::default());
        assert_eq!(get_config().default_curve_steps, 40);
        reset_config();
        assert_eq!(get_config().default_subdiv, 10);
        assert_eq!(get_config().spring_max_time_step, 1.0);
    }
}
