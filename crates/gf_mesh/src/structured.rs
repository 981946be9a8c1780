// crates/gf_mesh/src/structured.rs

//! 结构化矩形网格
//!
//! 生成矩形域上的四边形结构网格，单元按行主序排列。
//! 复合网格的细化区直接由本模块生成，无需外部网格生成器。

use crate::mesh::FvMesh;
use gf_foundation::{GfError, GfResult};
use glam::DVec2;

/// 矩形结构化网格生成器
///
/// 顶点按行主序排列，单元为逆时针四边形。
#[derive(Debug, Clone)]
pub struct RectGrid {
    /// x 方向单元数
    nx: usize,
    /// y 方向单元数
    ny: usize,
    /// x 方向单元尺寸
    dx: f64,
    /// y 方向单元尺寸
    dy: f64,
    /// x 方向起点
    x0: f64,
    /// y 方向起点
    y0: f64,
}

impl RectGrid {
    /// 创建矩形网格生成器
    pub fn new(nx: usize, ny: usize, dx: f64, dy: f64) -> Self {
        Self {
            nx,
            ny,
            dx,
            dy,
            x0: 0.0,
            y0: 0.0,
        }
    }

    /// 创建方形网格生成器
    pub fn square(n: usize, cell_size: f64) -> Self {
        Self::new(n, n, cell_size, cell_size)
    }

    /// 设置原点偏移
    pub fn with_origin(mut self, x0: f64, y0: f64) -> Self {
        self.x0 = x0;
        self.y0 = y0;
        self
    }

    /// 顶点总数
    pub fn n_vertices(&self) -> usize {
        (self.nx + 1) * (self.ny + 1)
    }

    /// 单元总数
    pub fn n_cells(&self) -> usize {
        self.nx * self.ny
    }

    /// 构建网格
    ///
    /// 参数无效（零单元数或非正间距）时返回 `InvalidDomain`。
    pub fn build(&self) -> GfResult<FvMesh> {
        if self.nx < 1 || self.ny < 1 {
            return Err(GfError::invalid_domain(format!(
                "网格单元数必须为正: nx={}, ny={}",
                self.nx, self.ny
            )));
        }
        GfError::check_positive("dx", self.dx)?;
        GfError::check_positive("dy", self.dy)?;

        // 顶点按行主序
        let mut nodes = Vec::with_capacity(self.n_vertices());
        for j in 0..=self.ny {
            for i in 0..=self.nx {
                nodes.push(DVec2::new(
                    self.x0 + i as f64 * self.dx,
                    self.y0 + j as f64 * self.dy,
                ));
            }
        }

        let idx = |i: usize, j: usize| -> usize { j * (self.nx + 1) + i };

        // 单元为逆时针四边形
        let mut cells = Vec::with_capacity(self.n_cells());
        for j in 0..self.ny {
            for i in 0..self.nx {
                cells.push(vec![idx(i, j), idx(i + 1, j), idx(i + 1, j + 1), idx(i, j + 1)]);
            }
        }

        FvMesh::from_cells(nodes, cells)
    }
}
