// crates/gf_foundation/src/tolerance.rs

//! 数值容差配置
//!
//! 集中管理几何判定与迭代收敛使用的容差阈值，通过参数注入传递，
//! 避免散落在各处的魔法数字。

use serde::{Deserialize, Serialize};

/// 数值容差配置
///
/// 包含网格构造与求解过程中使用的全部容差阈值。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericalTolerance {
    /// 空间坐标零判定容差
    pub spatial: f64,
    /// 节点合并容差（相对于单元尺寸的比例）
    pub node_merge_rel: f64,
    /// 最小单元面积 [m²]
    pub min_area: f64,
    /// 安全除法阈值
    pub safe_div: f64,
    /// 迭代收敛容差
    pub convergence: f64,
}

impl Default for NumericalTolerance {
    fn default() -> Self {
        Self {
            spatial: 1e-12,
            node_merge_rel: 1e-6,
            min_area: 1e-14,
            safe_div: 1e-14,
            convergence: 1e-8,
        }
    }
}

impl NumericalTolerance {
    /// 创建保守配置（更严格的容差）
    pub fn conservative() -> Self {
        Self {
            convergence: 1e-10,
            node_merge_rel: 1e-8,
            ..Default::default()
        }
    }

    /// 创建快速配置（更宽松的容差）
    pub fn fast() -> Self {
        Self {
            convergence: 1e-6,
            ..Default::default()
        }
    }

    /// 判断空间值是否接近零
    #[inline]
    pub fn is_spatial_zero(&self, x: f64) -> bool {
        x.abs() < self.spatial
    }

    /// 节点合并的绝对容差（按参考单元尺寸缩放）
    #[inline]
    pub fn node_merge_abs(&self, cell_size: f64) -> f64 {
        self.node_merge_rel * cell_size
    }

    /// 判断面积是否有效
    #[inline]
    pub fn is_area_valid(&self, area: f64) -> bool {
        area > self.min_area
    }

    /// 安全除法判断分母是否过小
    #[inline]
    pub fn is_divisor_safe(&self, d: f64) -> bool {
        d.abs() >= self.safe_div
    }

    /// 判断迭代是否收敛
    #[inline]
    pub fn is_converged(&self, residual: f64, initial: f64) -> bool {
        residual < self.convergence * initial.max(1.0)
    }
}
