// crates/gf_physics/src/lib.rs

//! GalvanoFill 物理层
//!
//! 在 `gf_mesh` 网格上的有限体积离散：
//!
//! - [`field`]: 单元场与代际戳缓存
//! - [`numerics`]: 梯度重构、CSR 稀疏矩阵、PCG 求解器
//! - [`equation`]: 扩散方程组装与欠松弛
//! - [`constraint`]: Dirichlet 型约束登记
//!
//! # 示例
//!
//! ```
//! use std::sync::Arc;
//! use gf_mesh::RectGrid;
//! use gf_physics::{
//!     CellField, ConstraintSet, DiffusionCoeff, DiffusionEquation, PcgSolver, Selector,
//! };
//!
//! let mesh = Arc::new(RectGrid::new(8, 8, 0.125, 0.125).build().unwrap());
//! let mut constraints = ConstraintSet::new();
//! constraints.constrain(0.0, Selector::Faces(mesh.faces_bottom()));
//! constraints.constrain(1.0, Selector::Faces(mesh.faces_top()));
//!
//! let mut field = CellField::new(Arc::clone(&mesh), 0.0);
//! let mut eq = DiffusionEquation::new(Arc::clone(&mesh), DiffusionCoeff::Uniform(1.0)).unwrap();
//! eq.solve(&mut field, &mut PcgSolver::default(), &constraints).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constraint;
pub mod equation;
pub mod field;
pub mod numerics;

// 重导出常用类型
pub use constraint::{Constraint, ConstraintSet, ConstraintValue, Selector};
pub use equation::{DiffusionCoeff, DiffusionEquation};
pub use field::{CellField, GradientCache};
pub use numerics::{
    CsrBuilder, CsrMatrix, CsrPattern, FaceGradient, FaceInterpolation, GreenGaussConfig,
    GreenGaussGradient, LinearSolver, PcgSolver, SolverConfig, SolverStats, ValueWrap,
};
