// crates/gf_foundation/src/lib.rs

//! GalvanoFill 基础层
//!
//! 零业务依赖的基础层，提供整个项目共用的基础抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型
//! - [`tolerance`]: 数值容差配置
//!
//! # 设计原则
//!
//! 1. **最小依赖**: 仅依赖 serde 和 thiserror
//! 2. **构造期失败**: 所有几何/区域错误在构造时同步抛出
//! 3. **参数注入**: 容差通过参数传递，不使用全局状态

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod tolerance;

// 重导出常用类型
pub use error::{GfError, GfResult};
pub use tolerance::NumericalTolerance;

/// 标量类型（整个项目统一使用双精度）
pub type Scalar = f64;

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{GfError, GfResult};
    pub use crate::tolerance::NumericalTolerance;
    pub use crate::Scalar;
}
