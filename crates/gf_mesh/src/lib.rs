// crates/gf_mesh/src/lib.rs

//! GalvanoFill 网格层
//!
//! 提供有限体积离散所需的网格数据结构与复合网格拼接。
//!
//! # 核心类型
//!
//! - [`FvMesh`]: 只读 SoA 布局网格，构造时完成全部几何计算
//! - [`RectGrid`]: 结构化矩形网格生成
//! - [`CompositeMesh`]: 细化区 + 过渡区 + 边界层区的三区拼接
//! - [`TrenchMesh`]: 以沟槽工艺参数重铸的复合网格特化
//!
//! # 协作接口
//!
//! - [`MeshGenerator`]: 外部网格生成器契约（声明式几何 → 原始网格）
//! - [`GradedBandGenerator`]: 内置参考实现
//!
//! # 示例
//!
//! ```
//! use gf_mesh::{CompositeMesh, CompositeParams, GradedBandGenerator};
//!
//! let params = CompositeParams {
//!     cell_size: 0.1,
//!     domain_width: 1.0,
//!     domain_height: 5.0,
//!     fine_region_height: 1.0,
//!     transition_region_height: 2.0,
//! };
//! let mesh = CompositeMesh::build(&params, &GradedBandGenerator::new()).unwrap();
//! assert_eq!(mesh.resolved().nx, 10);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod composite;
pub mod generator;
pub mod geometry;
pub mod mesh;
pub mod structured;
pub mod trench;

// 重导出常用类型
pub use composite::{CompositeMesh, CompositeParams, Region, ResolvedParams};
pub use generator::{
    GeometryDescription, GradedBandGenerator, MeshGenerator, RawMesh,
};
pub use mesh::FvMesh;
pub use structured::RectGrid;
pub use trench::{TrenchMesh, TrenchParams};
