// crates/gf_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `GfError` 枚举和 `GfResult` 类型别名，用于整个项目的错误处理。
//!
//! # 设计原则
//!
//! 1. **构造期失败**: 几何/区域错误在网格构造时同步抛出，不留下半成品网格
//! 2. **易用性**: 提供便捷的构造方法
//! 3. **不重试**: 求解器不收敛由核心层向上传播，不在内部重试
//!
//! # 示例
//!
//! ```
//! use gf_foundation::error::{GfError, GfResult};
//!
//! fn check_cell_size(h: f64) -> GfResult<()> {
//!     if h <= 0.0 {
//!         return Err(GfError::invalid_domain("单元尺寸必须为正"));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// 统一结果类型
pub type GfResult<T> = Result<T, GfError>;

/// GalvanoFill 错误类型
///
/// 核心错误类型，覆盖网格构造、几何计算与线性求解全流程。
#[derive(Error, Debug)]
pub enum GfError {
    /// 计算域参数无效（非正或不一致的尺寸）
    #[error("计算域无效: {message}")]
    InvalidDomain {
        /// 说明无效原因
        message: String,
    },

    /// 退化几何（零/负单元面积、无定义的面法向）
    #[error("退化几何: {entity} {index}: {message}")]
    DegenerateGeometry {
        /// 几何实体类别（单元/面/节点）
        entity: &'static str,
        /// 实体索引
        index: usize,
        /// 具体错误信息
        message: String,
    },

    /// 网格拼接失败（子区域共享边界不匹配）
    #[error("网格拼接失败: {message}")]
    MeshStitch {
        /// 具体错误信息
        message: String,
    },

    /// 线性求解器不收敛
    #[error("求解器不收敛: {iterations} 次迭代后残差 {residual:.3e}")]
    Convergence {
        /// 已执行的迭代次数
        iterations: usize,
        /// 最终相对残差
        residual: f64,
    },

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl GfError {
    /// 计算域错误
    pub fn invalid_domain(message: impl Into<String>) -> Self {
        Self::InvalidDomain {
            message: message.into(),
        }
    }

    /// 退化几何错误
    pub fn degenerate(entity: &'static str, index: usize, message: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            entity,
            index,
            message: message.into(),
        }
    }

    /// 网格拼接错误
    pub fn stitch(message: impl Into<String>) -> Self {
        Self::MeshStitch {
            message: message.into(),
        }
    }

    /// 求解器不收敛
    pub fn convergence(iterations: usize, residual: f64) -> Self {
        Self::Convergence {
            iterations,
            residual,
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl GfError {
    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> GfResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查参数是否严格为正
    #[inline]
    pub fn check_positive(name: &str, value: f64) -> GfResult<()> {
        if value > 0.0 {
            Ok(())
        } else {
            Err(Self::invalid_domain(format!("{} 必须为正, 实际 {}", name, value)))
        }
    }

    /// 检查索引是否在范围内
    #[inline]
    pub fn check_index(index_type: &'static str, index: usize, len: usize) -> GfResult<()> {
        if index >= len {
            Err(Self::invalid_input(format!(
                "{} 索引 {} 超出范围 0..{}",
                index_type, index, len
            )))
        } else {
            Ok(())
        }
    }
}

// ========================================================================
// 测试
// ========================================================================
