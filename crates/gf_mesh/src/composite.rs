// crates/gf_mesh/src/composite.rs

//! 复合网格拼接
//!
//! 将三个子区域拼接为一个统一编号的逻辑网格：
//!
//! 1. **细化区**: 结构化四边形网格，直接生成
//! 2. **过渡区**: 由外部生成器按声明式几何产生的非结构渐变区
//! 3. **边界层区**: 过渡区顶边向上挤出的粗大单元列
//!
//! # 拼接不变量
//!
//! - 合并后单元数 = 三个子区域单元数之和（无重复、无空洞）
//! - 相邻区域共享边界上的节点必须重合：网格对齐点精确重合，
//!   生成器产生的点在小容差内匹配
//! - 拼接后所有边界面必须落在外边界矩形上，否则视为拼接失败

use crate::generator::{GeometryDescription, MeshGenerator};
use crate::mesh::FvMesh;
use crate::structured::RectGrid;
use gf_foundation::{GfError, GfResult, NumericalTolerance};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

// ============================================================
// 参数
// ============================================================

/// 复合网格构造参数（期望尺寸）
///
/// 期望尺寸仅作参考：实际细化区尺寸总是 `cell_size` 的整数倍。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeParams {
    /// 细化区单元尺寸
    pub cell_size: f64,
    /// 期望计算域宽度
    pub domain_width: f64,
    /// 期望计算域总高度
    pub domain_height: f64,
    /// 期望细化区高度
    pub fine_region_height: f64,
    /// 过渡区高度
    pub transition_region_height: f64,
}

/// 解析后的实际网格参数
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResolvedParams {
    /// x 方向细化区单元数
    pub nx: usize,
    /// y 方向细化区单元数
    pub ny: usize,
    /// 实际计算域宽度（`nx * cell_size`）
    pub actual_width: f64,
    /// 实际细化区高度（`ny * cell_size`）
    pub actual_fine_height: f64,
    /// 边界层高度
    pub boundary_layer_height: f64,
    /// 边界层单元行数
    pub n_boundary_layer_cells: usize,
    /// 共享边界防歧义偏移量（`cell_size / nx / 10`）
    pub eps: f64,
}

impl CompositeParams {
    /// 解析期望参数为实际网格参数
    ///
    /// 所有用户输入错误（非正尺寸、区域放不下）在此同步报告。
    pub fn resolve(&self) -> GfResult<ResolvedParams> {
        GfError::check_positive("cell_size", self.cell_size)?;
        GfError::check_positive("domain_width", self.domain_width)?;
        GfError::check_positive("domain_height", self.domain_height)?;
        GfError::check_positive("fine_region_height", self.fine_region_height)?;
        GfError::check_positive("transition_region_height", self.transition_region_height)?;

        let nx = (self.domain_width / self.cell_size).floor() as usize;
        let ny = (self.fine_region_height / self.cell_size).floor() as usize;
        if nx < 1 || ny < 1 {
            return Err(GfError::invalid_domain(format!(
                "单元尺寸 {} 过大: nx={}, ny={}",
                self.cell_size, nx, ny
            )));
        }

        let actual_width = nx as f64 * self.cell_size;
        let actual_fine_height = ny as f64 * self.cell_size;
        let boundary_layer_height =
            self.domain_height - actual_fine_height - self.transition_region_height;
        if boundary_layer_height < 0.0 {
            return Err(GfError::invalid_domain(format!(
                "细化区与过渡区高度之和超出计算域: 边界层高度 = {:.3e}",
                boundary_layer_height
            )));
        }

        // 行数公式将边界层单元纵横比与域宽耦合，属策略选择而非
        // 结构性约束，如需解耦应在此处替换。
        let n_boundary_layer_cells = (boundary_layer_height / actual_width).floor() as usize;
        if n_boundary_layer_cells < 1 {
            return Err(GfError::invalid_domain(format!(
                "边界层高度 {:.3e} 不足以容纳一行单元（行高 = 域宽 {:.3e}）",
                boundary_layer_height, actual_width
            )));
        }

        // 共享边界的特征尺寸减去 eps，保证生成器在接缝处的列数
        // 取整无歧义。这是浮点稳健性手段，不是可调参数。
        let eps = self.cell_size / nx as f64 / 10.0;

        Ok(ResolvedParams {
            nx,
            ny,
            actual_width,
            actual_fine_height,
            boundary_layer_height,
            n_boundary_layer_cells,
            eps,
        })
    }
}

// ============================================================
// 复合网格
// ============================================================

/// 子区域标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    /// 细化区
    Fine,
    /// 过渡区
    Transition,
    /// 边界层区
    Coarse,
}

/// 复合网格
///
/// 持有三个子区域网格与拼接后的统一网格，以及
/// 合并索引与 (区域, 局部索引) 的双向映射。
#[derive(Debug, Clone)]
pub struct CompositeMesh {
    merged: Arc<FvMesh>,
    fine: FvMesh,
    transition: FvMesh,
    coarse: FvMesh,
    resolved: ResolvedParams,
    /// 各区域在合并编号中的起始偏移: [0, nf, nf+nt, nf+nt+nc]
    cell_offsets: [usize; 4],
}

impl CompositeMesh {
    /// 构造复合网格
    ///
    /// 过渡区与边界层区通过 `generator` 生成；细化区直接生成。
    pub fn build(params: &CompositeParams, generator: &dyn MeshGenerator) -> GfResult<Self> {
        let tol = NumericalTolerance::default();
        let resolved = params.resolve()?;
        let h = params.cell_size;
        let ResolvedParams {
            nx,
            ny,
            actual_width,
            actual_fine_height,
            boundary_layer_height,
            n_boundary_layer_cells,
            eps,
        } = resolved;

        // ---- 细化区: 结构化网格 ----
        let fine = RectGrid::new(nx, ny, h, h).build()?;

        // ---- 过渡区: 声明式几何 + 外部生成器 ----
        let cs = h - eps;
        let trans_h = params.transition_region_height;
        let mut geo = GeometryDescription::new();
        let p0 = geo.add_point(0.0, actual_fine_height, cs);
        let p1 = geo.add_point(actual_width, actual_fine_height, cs);
        let p2 = geo.add_point(actual_width, actual_fine_height + trans_h, actual_width);
        let p3 = geo.add_point(0.0, actual_fine_height + trans_h, actual_width);
        let l0 = geo.add_line(p0, p1);
        let l1 = geo.add_line(p1, p2);
        let l2 = geo.add_line(p2, p3);
        let l3 = geo.add_line(p3, p0);
        let lp = geo.add_line_loop(&[l0, l1, l2, l3]);
        geo.add_plane_surface(lp);
        let transition = generator.build(&geo, cs)?.into_mesh()?;

        // ---- 边界层区: 过渡区顶边挤出 ----
        let y_top = actual_fine_height + trans_h;
        let mut geo_bl = GeometryDescription::new();
        let q0 = geo_bl.add_point(0.0, y_top, actual_width);
        let q1 = geo_bl.add_point(actual_width, y_top, actual_width);
        let top_line = geo_bl.add_line(q0, q1);
        geo_bl.extrude_line(top_line, boundary_layer_height, n_boundary_layer_cells, true);
        let coarse = generator.build(&geo_bl, actual_width)?.into_mesh()?;

        // ---- 拼接 ----
        let merge_tol = tol.node_merge_abs(h);
        let mut merger = NodeMerger::new(merge_tol);
        let mut cells_merged: Vec<Vec<usize>> = Vec::new();
        for region in [&fine, &transition, &coarse] {
            let map: Vec<usize> = region
                .node_coords
                .iter()
                .map(|&p| merger.insert(p))
                .collect();
            for ci in 0..region.n_cells() {
                cells_merged.push(region.cell_nodes(ci).map(|ni| map[ni]).collect());
            }
        }

        // 共享边界节点数校验: 细化/过渡共享 nx+1 个，过渡/边界层共享 2 个
        let total_nodes = fine.n_nodes() + transition.n_nodes() + coarse.n_nodes();
        let expected_dup = (nx + 1) + 2;
        if merger.nodes.len() != total_nodes - expected_dup {
            return Err(GfError::stitch(format!(
                "共享边界节点未对齐: 期望合并 {} 个节点, 实际合并 {}",
                expected_dup,
                total_nodes - merger.nodes.len()
            )));
        }

        let n_fine = fine.n_cells();
        let n_trans = transition.n_cells();
        let n_coarse = coarse.n_cells();
        let merged = FvMesh::from_cells(merger.nodes, cells_merged)?;

        if merged.n_cells() != n_fine + n_trans + n_coarse {
            return Err(GfError::stitch(format!(
                "合并后单元数 {} 不等于子区域之和 {}",
                merged.n_cells(),
                n_fine + n_trans + n_coarse
            )));
        }

        // 所有边界面必须落在外边界矩形上
        let domain_height = y_top + boundary_layer_height;
        let tol_b = merge_tol.max(tol.spatial);
        for &fi in &merged.boundary_face_indices {
            let c = merged.face_center[fi as usize];
            let on_outer = c.x.abs() < tol_b
                || (c.x - actual_width).abs() < tol_b
                || c.y.abs() < tol_b
                || (c.y - domain_height).abs() < tol_b;
            if !on_outer {
                return Err(GfError::stitch(format!(
                    "面 {} 位于 ({:.6}, {:.6})，不在外边界上（区域间存在缝隙）",
                    fi, c.x, c.y
                )));
            }
        }

        info!(
            n_fine,
            n_trans, n_coarse,
            n_merged = merged.n_cells(),
            "复合网格拼接完成"
        );
        debug!(nx, ny, n_boundary_layer_cells, eps, "网格参数");

        Ok(Self {
            merged: Arc::new(merged),
            fine,
            transition,
            coarse,
            resolved,
            cell_offsets: [0, n_fine, n_fine + n_trans, n_fine + n_trans + n_coarse],
        })
    }

    /// 合并后的统一网格
    #[inline]
    pub fn mesh(&self) -> &FvMesh {
        &self.merged
    }

    /// 合并网格的共享句柄（供场引用）
    #[inline]
    pub fn shared_mesh(&self) -> Arc<FvMesh> {
        Arc::clone(&self.merged)
    }

    /// 细化区子网格
    #[inline]
    pub fn fine_mesh(&self) -> &FvMesh {
        &self.fine
    }

    /// 过渡区子网格
    #[inline]
    pub fn transition_mesh(&self) -> &FvMesh {
        &self.transition
    }

    /// 边界层区子网格
    #[inline]
    pub fn coarse_mesh(&self) -> &FvMesh {
        &self.coarse
    }

    /// 实际网格参数
    #[inline]
    pub fn resolved(&self) -> &ResolvedParams {
        &self.resolved
    }

    /// 合并单元总数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.merged.n_cells()
    }

    /// 合并索引映射到 (区域, 局部索引)
    pub fn region_of(&self, cell: usize) -> (Region, usize) {
        debug_assert!(cell < self.cell_offsets[3]);
        if cell < self.cell_offsets[1] {
            (Region::Fine, cell)
        } else if cell < self.cell_offsets[2] {
            (Region::Transition, cell - self.cell_offsets[1])
        } else {
            (Region::Coarse, cell - self.cell_offsets[2])
        }
    }

    /// (区域, 局部索引) 映射回合并索引
    pub fn global_of(&self, region: Region, local: usize) -> usize {
        match region {
            Region::Fine => local,
            Region::Transition => self.cell_offsets[1] + local,
            Region::Coarse => self.cell_offsets[2] + local,
        }
    }
}

// ============================================================
// 节点合并
// ============================================================

/// 容差量化的节点合并器
///
/// 网格对齐点键值完全一致直接命中；生成器产生的点通过相邻
/// 量化格子在容差内匹配。
struct NodeMerger {
    tol: f64,
    buckets: HashMap<(i64, i64), Vec<usize>>,
    nodes: Vec<DVec2>,
}

impl NodeMerger {
    fn new(tol: f64) -> Self {
        Self {
            tol,
            buckets: HashMap::new(),
            nodes: Vec::new(),
        }
    }

    fn key(&self, p: DVec2) -> (i64, i64) {
        ((p.x / self.tol).round() as i64, (p.y / self.tol).round() as i64)
    }

    /// 插入节点，返回合并后的索引
    fn insert(&mut self, p: DVec2) -> usize {
        let (kx, ky) = self.key(p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(ids) = self.buckets.get(&(kx + dx, ky + dy)) {
                    for &id in ids {
                        if (self.nodes[id] - p).length() <= self.tol {
                            return id;
                        }
                    }
                }
            }
        }
        let id = self.nodes.len();
        self.nodes.push(p);
        self.buckets.entry((kx, ky)).or_default().push(id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GradedBandGenerator;

    fn reference_params() -> CompositeParams {
        CompositeParams {
            cell_size: 0.1,
            domain_width: 1.0,
            domain_height: 5.0,
            fine_region_height: 1.0,
            transition_region_height: 2.0,
        }
    }

    #[test]
    fn test_resolve_reference_scenario() {
        let r = reference_params().resolve().unwrap();
        assert_eq!(r.nx, 10);
        assert_eq!(r.ny, 10);
        assert!((r.actual_width - 1.0).abs() < 1e-12);
        assert!((r.boundary_layer_height - 2.0).abs() < 1e-12);
        assert_eq!(r.n_boundary_layer_cells, 2);
        assert!((r.eps - 0.001).abs() < 1e-15);
    }

    #[test]
    fn test_resolve_snapping() {
        // 期望尺寸不是单元尺寸整数倍时向下取整
        let params = CompositeParams {
            cell_size: 0.3,
            domain_width: 1.0,
            domain_height: 10.0,
            fine_region_height: 1.0,
            transition_region_height: 2.0,
        };
        let r = params.resolve().unwrap();
        assert_eq!(r.nx, 3);
        assert!(r.actual_width <= 1.0);
        assert!((r.actual_width - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_resolve_invalid_inputs() {
        let mut p = reference_params();
        p.cell_size = 0.0;
        assert!(p.resolve().is_err());

        let mut p = reference_params();
        p.cell_size = 2.0; // nx = 0
        assert!(p.resolve().is_err());

        let mut p = reference_params();
        p.domain_height = 2.5; // 边界层高度为负
        assert!(p.resolve().is_err());

        let mut p = reference_params();
        p.domain_height = 3.5; // 边界层高度 0.5 < 域宽, 行数为 0
        assert!(p.resolve().is_err());
    }

    #[test]
    fn test_composite_cell_counts() {
        let generator = GradedBandGenerator::new();
        let composite = CompositeMesh::build(&reference_params(), &generator).unwrap();

        let n_fine = composite.fine_mesh().n_cells();
        let n_trans = composite.transition_mesh().n_cells();
        let n_coarse = composite.coarse_mesh().n_cells();
        assert_eq!(n_fine, 100);
        assert_eq!(n_coarse, 2);
        assert_eq!(composite.n_cells(), n_fine + n_trans + n_coarse);
    }

    #[test]
    fn test_composite_area_coverage() {
        let generator = GradedBandGenerator::new();
        let composite = CompositeMesh::build(&reference_params(), &generator).unwrap();
        // 总面积 = 1.0 * 5.0，接缝处无缝隙无重叠
        assert!((composite.mesh().total_area() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_composite_region_mapping() {
        let generator = GradedBandGenerator::new();
        let composite = CompositeMesh::build(&reference_params(), &generator).unwrap();

        let n = composite.n_cells();
        for cell in 0..n {
            let (region, local) = composite.region_of(cell);
            assert_eq!(composite.global_of(region, local), cell);
        }
        assert_eq!(composite.region_of(0).0, Region::Fine);
        assert_eq!(composite.region_of(n - 1).0, Region::Coarse);
    }

    #[test]
    fn test_composite_boundary_masks() {
        let generator = GradedBandGenerator::new();
        let composite = CompositeMesh::build(&reference_params(), &generator).unwrap();
        let mesh = composite.mesh();

        // 下边界: 细化区底边 10 个面; 上边界: 边界层顶边 1 个面
        assert_eq!(mesh.faces_bottom().iter().filter(|&&b| b).count(), 10);
        assert_eq!(mesh.faces_top().iter().filter(|&&b| b).count(), 1);
    }

    #[test]
    fn test_node_merger() {
        let mut m = NodeMerger::new(1e-6);
        let a = m.insert(DVec2::new(0.3, 1.0));
        let b = m.insert(DVec2::new(0.3 + 1e-9, 1.0 - 1e-9));
        let c = m.insert(DVec2::new(0.3 + 1e-3, 1.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(m.nodes.len(), 2);
    }
}
