// crates/gf_mesh/src/mesh.rs

//! 有限体积网格
//!
//! SoA 布局的只读网格：构造时从单元-节点连接关系推导面拓扑并
//! 计算全部几何量，此后不可修改，可被多个场安全共享（只读）。
//!
//! # 拓扑约定
//!
//! - 每个内部面恰好关联两个单元；边界面关联一个单元
//! - owner 为先遇到该面的单元（即索引较小者），面法向指向 owner 外侧
//! - `face_neighbor` 使用 `u32::MAX` 表示边界面
//!
//! # 几何约定
//!
//! - 单元节点按逆时针给出，鞋带公式面积必须为正
//! - 内部面的单元间距为两侧单元形心距离；
//!   边界面为 owner 形心到面中心的距离

use crate::geometry::{face_geometry, polygon_area, polygon_centroid};
use gf_foundation::{GfError, GfResult, NumericalTolerance};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 边界面 neighbor 哨兵值
const NO_NEIGHBOR: u32 = u32::MAX;

/// 有限体积网格（只读 SoA 布局）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FvMesh {
    // ===== 节点数据 =====
    /// 节点坐标
    pub node_coords: Vec<DVec2>,

    // ===== 单元数据 =====
    /// 单元形心
    pub cell_center: Vec<DVec2>,
    /// 单元面积
    pub cell_area: Vec<f64>,
    /// 单元节点索引（压缩格式: offsets）
    pub cell_node_offsets: Vec<usize>,
    /// 单元节点索引列表
    pub cell_node_indices: Vec<u32>,
    /// 单元面索引（压缩格式: offsets）
    pub cell_face_offsets: Vec<usize>,
    /// 单元面索引列表
    pub cell_face_indices: Vec<u32>,

    // ===== 面数据 =====
    /// 面中心
    pub face_center: Vec<DVec2>,
    /// 面单位法向（指向 owner 外侧）
    pub face_normal: Vec<DVec2>,
    /// 面单位切向
    pub face_tangent: Vec<DVec2>,
    /// 面长度
    pub face_length: Vec<f64>,
    /// 面 owner 单元索引
    pub face_owner: Vec<u32>,
    /// 面 neighbor 单元索引（`u32::MAX` 表示边界）
    pub face_neighbor: Vec<u32>,
    /// 单元间距：内部面为形心距离，边界面为 owner 形心到面中心距离
    pub face_dist: Vec<f64>,

    // ===== 派生索引 =====
    /// 内部面索引列表
    pub interior_face_indices: Vec<u32>,
    /// 边界面索引列表
    pub boundary_face_indices: Vec<u32>,

    // ===== 统计 =====
    /// 坐标下界
    pub extent_min: DVec2,
    /// 坐标上界
    pub extent_max: DVec2,
    /// 最小单元尺寸（面积平方根）
    pub min_cell_size: f64,
    /// 最大单元尺寸（面积平方根）
    pub max_cell_size: f64,
    /// 各轴特征网格间距（单元包围盒均值，结构化网格上等于 dx/dy）
    pub mesh_spacing: DVec2,
}

impl FvMesh {
    /// 从节点坐标与单元-节点回路构造网格
    ///
    /// `cells` 中每个单元按逆时针列出节点索引。面由相邻单元的公共边
    /// 自动识别；第三个单元引用同一条边视为拓扑错误。
    pub fn from_cells(nodes: Vec<DVec2>, cells: Vec<Vec<usize>>) -> GfResult<Self> {
        Self::from_cells_with_tolerance(nodes, cells, &NumericalTolerance::default())
    }

    /// 使用指定容差构造网格
    pub fn from_cells_with_tolerance(
        nodes: Vec<DVec2>,
        cells: Vec<Vec<usize>>,
        tol: &NumericalTolerance,
    ) -> GfResult<Self> {
        if nodes.is_empty() {
            return Err(GfError::invalid_input("节点列表为空"));
        }
        if cells.is_empty() {
            return Err(GfError::invalid_input("单元列表为空"));
        }

        let n_cells = cells.len();
        let n_nodes = nodes.len();

        // ---- 单元几何 ----
        let mut cell_center = Vec::with_capacity(n_cells);
        let mut cell_area = Vec::with_capacity(n_cells);
        let mut cell_node_offsets = Vec::with_capacity(n_cells + 1);
        let mut cell_node_indices = Vec::new();
        cell_node_offsets.push(0);

        let mut pts = Vec::new();
        for (ci, cell) in cells.iter().enumerate() {
            if cell.len() < 3 {
                return Err(GfError::degenerate("单元", ci, "节点数少于 3"));
            }
            pts.clear();
            for &ni in cell {
                GfError::check_index("节点", ni, n_nodes)?;
                pts.push(nodes[ni]);
            }
            let area = polygon_area(&pts);
            if !tol.is_area_valid(area) {
                return Err(GfError::degenerate(
                    "单元",
                    ci,
                    format!("面积非正 ({:.3e})，节点应按逆时针给出", area),
                ));
            }
            cell_area.push(area);
            cell_center.push(polygon_centroid(&pts));
            cell_node_indices.extend(cell.iter().map(|&ni| ni as u32));
            cell_node_offsets.push(cell_node_indices.len());
        }

        // ---- 面识别 ----
        // 按单元索引升序遍历，先遇到公共边的单元即为 owner（索引较小者）。
        let mut edge_map: HashMap<(u32, u32), u32> = HashMap::new();
        let mut face_endpoints: Vec<(u32, u32)> = Vec::new();
        let mut face_owner: Vec<u32> = Vec::new();
        let mut face_neighbor: Vec<u32> = Vec::new();

        for (ci, cell) in cells.iter().enumerate() {
            for k in 0..cell.len() {
                let a = cell[k] as u32;
                let b = cell[(k + 1) % cell.len()] as u32;
                if a == b {
                    return Err(GfError::degenerate("单元", ci, "存在重复的相邻节点"));
                }
                let key = (a.min(b), a.max(b));
                match edge_map.get(&key) {
                    None => {
                        let fi = face_owner.len() as u32;
                        edge_map.insert(key, fi);
                        face_endpoints.push((a, b));
                        face_owner.push(ci as u32);
                        face_neighbor.push(NO_NEIGHBOR);
                    }
                    Some(&fi) => {
                        if face_neighbor[fi as usize] != NO_NEIGHBOR {
                            return Err(GfError::invalid_input(format!(
                                "面 {} 被三个以上单元共享（非流形拓扑）",
                                fi
                            )));
                        }
                        face_neighbor[fi as usize] = ci as u32;
                    }
                }
            }
        }

        let n_faces = face_owner.len();

        // ---- 面几何 ----
        let mut face_center = Vec::with_capacity(n_faces);
        let mut face_normal = Vec::with_capacity(n_faces);
        let mut face_tangent = Vec::with_capacity(n_faces);
        let mut face_length = Vec::with_capacity(n_faces);
        let mut face_dist = Vec::with_capacity(n_faces);

        for fi in 0..n_faces {
            let (a, b) = face_endpoints[fi];
            let fg = face_geometry(nodes[a as usize], nodes[b as usize])
                .ok_or_else(|| GfError::degenerate("面", fi, "长度为零，法向无定义"))?;
            let owner = face_owner[fi] as usize;
            let dist = if face_neighbor[fi] == NO_NEIGHBOR {
                (fg.center - cell_center[owner]).length()
            } else {
                (cell_center[face_neighbor[fi] as usize] - cell_center[owner]).length()
            };
            if !tol.is_divisor_safe(dist) {
                return Err(GfError::degenerate("面", fi, "相邻单元形心重合"));
            }
            face_center.push(fg.center);
            face_normal.push(fg.normal);
            face_tangent.push(fg.tangent);
            face_length.push(fg.length);
            face_dist.push(dist);
        }

        // ---- 单元-面映射（两趟计数法） ----
        let mut counts = vec![0usize; n_cells];
        for fi in 0..n_faces {
            counts[face_owner[fi] as usize] += 1;
            if face_neighbor[fi] != NO_NEIGHBOR {
                counts[face_neighbor[fi] as usize] += 1;
            }
        }
        let mut cell_face_offsets = Vec::with_capacity(n_cells + 1);
        cell_face_offsets.push(0);
        for &c in &counts {
            let last = *cell_face_offsets.last().unwrap_or(&0);
            cell_face_offsets.push(last + c);
        }
        let mut cell_face_indices = vec![0u32; *cell_face_offsets.last().unwrap_or(&0)];
        let mut cursor: Vec<usize> = cell_face_offsets[..n_cells].to_vec();
        for fi in 0..n_faces {
            let o = face_owner[fi] as usize;
            cell_face_indices[cursor[o]] = fi as u32;
            cursor[o] += 1;
            if face_neighbor[fi] != NO_NEIGHBOR {
                let n = face_neighbor[fi] as usize;
                cell_face_indices[cursor[n]] = fi as u32;
                cursor[n] += 1;
            }
        }

        // ---- 内部面/边界面列表 ----
        let mut interior_face_indices = Vec::new();
        let mut boundary_face_indices = Vec::new();
        for fi in 0..n_faces {
            if face_neighbor[fi] == NO_NEIGHBOR {
                boundary_face_indices.push(fi as u32);
            } else {
                interior_face_indices.push(fi as u32);
            }
        }

        // ---- 统计量 ----
        let mut extent_min = DVec2::splat(f64::MAX);
        let mut extent_max = DVec2::splat(f64::MIN);
        for p in &nodes {
            extent_min = extent_min.min(*p);
            extent_max = extent_max.max(*p);
        }
        let mut min_cell_size = f64::MAX;
        let mut max_cell_size: f64 = 0.0;
        for &a in &cell_area {
            let size = a.sqrt();
            min_cell_size = min_cell_size.min(size);
            max_cell_size = max_cell_size.max(size);
        }

        // 单元包围盒均值作为各轴特征间距
        let mut spacing_sum = DVec2::ZERO;
        for cell in &cells {
            let mut lo = DVec2::splat(f64::MAX);
            let mut hi = DVec2::splat(f64::MIN);
            for &ni in cell {
                lo = lo.min(nodes[ni]);
                hi = hi.max(nodes[ni]);
            }
            spacing_sum += hi - lo;
        }
        let mesh_spacing = spacing_sum / n_cells as f64;

        Ok(Self {
            node_coords: nodes,
            cell_center,
            cell_area,
            cell_node_offsets,
            cell_node_indices,
            cell_face_offsets,
            cell_face_indices,
            face_center,
            face_normal,
            face_tangent,
            face_length,
            face_owner,
            face_neighbor,
            face_dist,
            interior_face_indices,
            boundary_face_indices,
            extent_min,
            extent_max,
            min_cell_size,
            max_cell_size,
            mesh_spacing,
        })
    }

    // =========================================================================
    // 基本统计
    // =========================================================================

    /// 节点数量
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.node_coords.len()
    }

    /// 单元数量
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.cell_center.len()
    }

    /// 面数量
    #[inline]
    pub fn n_faces(&self) -> usize {
        self.face_owner.len()
    }

    /// 内部面数量
    #[inline]
    pub fn n_interior_faces(&self) -> usize {
        self.interior_face_indices.len()
    }

    // =========================================================================
    // 拓扑访问
    // =========================================================================

    /// 面的 owner 单元
    #[inline]
    pub fn face_owner(&self, face: usize) -> usize {
        self.face_owner[face] as usize
    }

    /// 面的 neighbor 单元（边界面返回 `None`）
    #[inline]
    pub fn face_neighbor(&self, face: usize) -> Option<usize> {
        let n = self.face_neighbor[face];
        if n == NO_NEIGHBOR {
            None
        } else {
            Some(n as usize)
        }
    }

    /// 单元关联的面索引列表
    #[inline]
    pub fn cell_faces(&self, cell: usize) -> impl Iterator<Item = usize> + '_ {
        let start = self.cell_face_offsets[cell];
        let end = self.cell_face_offsets[cell + 1];
        self.cell_face_indices[start..end].iter().map(|&f| f as usize)
    }

    /// 单元的节点索引列表
    #[inline]
    pub fn cell_nodes(&self, cell: usize) -> impl Iterator<Item = usize> + '_ {
        let start = self.cell_node_offsets[cell];
        let end = self.cell_node_offsets[cell + 1];
        self.cell_node_indices[start..end].iter().map(|&n| n as usize)
    }

    // =========================================================================
    // 边界选择掩码
    // =========================================================================

    /// 按谓词选择边界面，返回长度为 `n_faces` 的布尔掩码
    pub fn faces_where<P>(&self, mut pred: P) -> Vec<bool>
    where
        P: FnMut(DVec2) -> bool,
    {
        let mut mask = vec![false; self.n_faces()];
        for &fi in &self.boundary_face_indices {
            if pred(self.face_center[fi as usize]) {
                mask[fi as usize] = true;
            }
        }
        mask
    }

    /// 边界带宽容差（远小于最小单元尺寸）
    #[inline]
    fn side_tol(&self) -> f64 {
        0.25 * self.min_cell_size
    }

    /// 下边界面掩码
    pub fn faces_bottom(&self) -> Vec<bool> {
        let y = self.extent_min.y;
        let tol = self.side_tol();
        self.faces_where(|c| (c.y - y).abs() < tol)
    }

    /// 上边界面掩码
    pub fn faces_top(&self) -> Vec<bool> {
        let y = self.extent_max.y;
        let tol = self.side_tol();
        self.faces_where(|c| (c.y - y).abs() < tol)
    }

    /// 左边界面掩码
    pub fn faces_left(&self) -> Vec<bool> {
        let x = self.extent_min.x;
        let tol = self.side_tol();
        self.faces_where(|c| (c.x - x).abs() < tol)
    }

    /// 右边界面掩码
    pub fn faces_right(&self) -> Vec<bool> {
        let x = self.extent_max.x;
        let tol = self.side_tol();
        self.faces_where(|c| (c.x - x).abs() < tol)
    }

    /// 单元总面积
    pub fn total_area(&self) -> f64 {
        self.cell_area.iter().sum()
    }
}
