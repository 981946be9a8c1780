// crates/gf_mesh/src/generator.rs

//! 网格生成器协作接口
//!
//! 过渡区网格由外部生成器协作产生。核心只依赖一个契约：
//! 输入声明式几何描述与目标单元尺寸，输出原始节点坐标与单元回路。
//!
//! 本模块提供：
//!
//! - [`GeometryDescription`]: 声明式几何（点/线/线环/平面/挤出）
//! - [`MeshGenerator`]: 生成器契约 trait
//! - [`GradedBandGenerator`]: 内置参考实现，针对矩形渐变过渡带
//!   生成 2:1 合并的三角形行，针对线挤出生成分层四边形条带
//!
//! 外部后端（如 Gmsh）可通过 [`GeometryDescription::to_geo_script`]
//! 渲染的脚本消费同一份几何描述。

use crate::mesh::FvMesh;
use gf_foundation::{GfError, GfResult};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

// ============================================================
// 声明式几何描述
// ============================================================

/// 几何点（带特征单元尺寸）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    /// x 坐标
    pub x: f64,
    /// y 坐标
    pub y: f64,
    /// 该点附近的特征单元尺寸
    pub char_length: f64,
}

/// 几何线段（点索引对）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoLine {
    /// 起点索引
    pub from: usize,
    /// 终点索引
    pub to: usize,
}

/// 线环（线索引列表，按首尾相接顺序）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineLoop {
    /// 线索引列表
    pub lines: Vec<usize>,
}

/// 平面区域（由线环围成）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlaneSurface {
    /// 线环索引
    pub line_loop: usize,
}

/// 线挤出（带层数与四边形重组提示）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Extrusion {
    /// 被挤出的线索引
    pub line: usize,
    /// 挤出位移（+y 方向）
    pub dy: f64,
    /// 层数
    pub layers: usize,
    /// 是否重组为四边形
    pub recombine: bool,
}

/// 声明式几何描述
///
/// 与常见网格生成器（如 Gmsh）的几何语言同构：
/// 点、线、线环、平面区域、带层数与 Recombine 提示的挤出。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeometryDescription {
    /// 几何点列表
    pub points: Vec<GeoPoint>,
    /// 线段列表
    pub lines: Vec<GeoLine>,
    /// 线环列表
    pub loops: Vec<LineLoop>,
    /// 平面区域列表
    pub surfaces: Vec<PlaneSurface>,
    /// 挤出列表
    pub extrusions: Vec<Extrusion>,
}

impl GeometryDescription {
    /// 创建空几何描述
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加点，返回点索引
    pub fn add_point(&mut self, x: f64, y: f64, char_length: f64) -> usize {
        self.points.push(GeoPoint { x, y, char_length });
        self.points.len() - 1
    }

    /// 添加线段，返回线索引
    pub fn add_line(&mut self, from: usize, to: usize) -> usize {
        self.lines.push(GeoLine { from, to });
        self.lines.len() - 1
    }

    /// 添加线环，返回线环索引
    pub fn add_line_loop(&mut self, lines: &[usize]) -> usize {
        self.loops.push(LineLoop {
            lines: lines.to_vec(),
        });
        self.loops.len() - 1
    }

    /// 添加平面区域，返回区域索引
    pub fn add_plane_surface(&mut self, line_loop: usize) -> usize {
        self.surfaces.push(PlaneSurface { line_loop });
        self.surfaces.len() - 1
    }

    /// 添加线挤出，返回挤出索引
    pub fn extrude_line(&mut self, line: usize, dy: f64, layers: usize, recombine: bool) -> usize {
        self.extrusions.push(Extrusion {
            line,
            dy,
            layers,
            recombine,
        });
        self.extrusions.len() - 1
    }

    /// 渲染为 Gmsh 风格的几何脚本
    ///
    /// 实体编号统一 1 起始连续分配（点、线、线环、面依次排布）。
    pub fn to_geo_script(&self) -> String {
        let mut s = String::new();
        let line_base = self.points.len();
        let loop_base = line_base + self.lines.len();
        let surface_base = loop_base + self.loops.len();

        for (i, p) in self.points.iter().enumerate() {
            let _ = writeln!(
                s,
                "Point({}) = {{{}, {}, 0, {}}};",
                i + 1,
                p.x,
                p.y,
                p.char_length
            );
        }
        for (i, l) in self.lines.iter().enumerate() {
            let _ = writeln!(
                s,
                "Line({}) = {{{}, {}}};",
                line_base + i + 1,
                l.from + 1,
                l.to + 1
            );
        }
        for (i, lp) in self.loops.iter().enumerate() {
            let ids: Vec<String> = lp
                .lines
                .iter()
                .map(|&l| (line_base + l + 1).to_string())
                .collect();
            let _ = writeln!(s, "Line Loop({}) = {{{}}};", loop_base + i + 1, ids.join(", "));
        }
        for (i, surf) in self.surfaces.iter().enumerate() {
            let _ = writeln!(
                s,
                "Plane Surface({}) = {{{}}};",
                surface_base + i + 1,
                loop_base + surf.line_loop + 1
            );
        }
        for e in &self.extrusions {
            let _ = writeln!(s, "Extrude{{0, {}, 0}} {{", e.dy);
            let recombine = if e.recombine { " Recombine;" } else { "" };
            let _ = writeln!(
                s,
                "    Line{{{}}}; Layers{{ {} }};{}",
                line_base + e.line + 1,
                e.layers,
                recombine
            );
            let _ = writeln!(s, "}}");
        }
        s
    }
}

// ============================================================
// 生成器契约
// ============================================================

/// 生成器输出的原始网格数据
///
/// 节点坐标加上按逆时针列出的单元-节点回路，
/// 面连接关系由 [`FvMesh::from_cells`] 推导。
#[derive(Debug, Clone)]
pub struct RawMesh {
    /// 节点坐标
    pub nodes: Vec<DVec2>,
    /// 单元节点回路（逆时针）
    pub cells: Vec<Vec<usize>>,
}

impl RawMesh {
    /// 转换为有限体积网格
    pub fn into_mesh(self) -> GfResult<FvMesh> {
        FvMesh::from_cells(self.nodes, self.cells)
    }
}

/// 网格生成器契约
///
/// 同步阻塞调用，无超时/取消语义（调用方可自行包装）。
pub trait MeshGenerator {
    /// 根据几何描述生成原始网格
    fn build(&self, geometry: &GeometryDescription, default_cell_size: f64) -> GfResult<RawMesh>;
}

// ============================================================
// 内置参考实现
// ============================================================

/// 渐变过渡带生成器
///
/// 内置参考后端，覆盖复合网格所需的两类几何：
///
/// - **矩形平面区域**: 自下而上生成 2:1 合并的三角形行，每行列数
///   减半（向上取整），行高按该行局部间距加权，直至单列收口。
///   底边列数由底部角点的特征尺寸取整得到。
/// - **线挤出**: 沿 +y 生成 `layers` 层单元条带；`recombine`
///   为真时输出四边形，否则拆分为三角形。
#[derive(Debug, Clone, Default)]
pub struct GradedBandGenerator;

impl GradedBandGenerator {
    /// 创建生成器
    pub fn new() -> Self {
        Self
    }

    /// 生成矩形过渡带
    fn build_band(
        &self,
        geo: &GeometryDescription,
        surface: &PlaneSurface,
        default_cell_size: f64,
    ) -> GfResult<RawMesh> {
        let lp = geo
            .loops
            .get(surface.line_loop)
            .ok_or_else(|| GfError::invalid_input("平面区域引用的线环不存在"))?;

        // 汇集线环涉及的全部点
        let mut point_ids = Vec::new();
        for &li in &lp.lines {
            let line = geo
                .lines
                .get(li)
                .ok_or_else(|| GfError::invalid_input("线环引用的线不存在"))?;
            for pid in [line.from, line.to] {
                if !point_ids.contains(&pid) {
                    point_ids.push(pid);
                }
            }
        }
        if point_ids.iter().any(|&p| p >= geo.points.len()) {
            return Err(GfError::invalid_input("线引用的点不存在"));
        }

        let xs: Vec<f64> = point_ids.iter().map(|&p| geo.points[p].x).collect();
        let ys: Vec<f64> = point_ids.iter().map(|&p| geo.points[p].y).collect();
        let x_min = xs.iter().cloned().fold(f64::MAX, f64::min);
        let x_max = xs.iter().cloned().fold(f64::MIN, f64::max);
        let y_min = ys.iter().cloned().fold(f64::MAX, f64::min);
        let y_max = ys.iter().cloned().fold(f64::MIN, f64::max);
        let width = x_max - x_min;
        let height = y_max - y_min;
        GfError::check_positive("过渡带宽度", width)?;
        GfError::check_positive("过渡带高度", height)?;

        // 仅支持轴对齐矩形带：所有点必须落在四个角上
        let corner_tol = 1e-9 * (width + height);
        for &pid in &point_ids {
            let p = geo.points[pid];
            let on_x = (p.x - x_min).abs() < corner_tol || (p.x - x_max).abs() < corner_tol;
            let on_y = (p.y - y_min).abs() < corner_tol || (p.y - y_max).abs() < corner_tol;
            if !(on_x && on_y) {
                return Err(GfError::invalid_input(
                    "渐变带生成器仅支持轴对齐矩形区域",
                ));
            }
        }

        // 底部角点的特征尺寸决定底边列数
        let bottom_char = point_ids
            .iter()
            .map(|&p| geo.points[p])
            .filter(|p| (p.y - y_min).abs() < corner_tol && p.char_length > 0.0)
            .map(|p| p.char_length)
            .fold(f64::MAX, f64::min);
        let bottom_char = if bottom_char < f64::MAX {
            bottom_char
        } else {
            default_cell_size
        };
        GfError::check_positive("特征单元尺寸", bottom_char)?;

        let n0 = (width / bottom_char).round().max(1.0) as usize;

        // 行列数序列: q, ceil(q/2), ... 直至 1
        let mut row_counts = Vec::new();
        let mut q = n0;
        while q > 1 {
            row_counts.push(q);
            q = q.div_ceil(2);
        }
        if row_counts.is_empty() {
            // 单列带: 一行四边形
            row_counts.push(1);
        }

        // 行高按局部间距 (width/q) 加权分配
        let weight_sum: f64 = row_counts.iter().map(|&q| width / q as f64).sum();
        let row_heights: Vec<f64> = row_counts
            .iter()
            .map(|&q| height * (width / q as f64) / weight_sum)
            .collect();

        let mut nodes: Vec<DVec2> = Vec::new();
        let mut cells: Vec<Vec<usize>> = Vec::new();

        // 底行节点
        let mut bottom_ids: Vec<usize> = Vec::new();
        for i in 0..=n0 {
            let x = x_min + width * i as f64 / n0 as f64;
            bottom_ids.push(nodes.len());
            nodes.push(DVec2::new(x, y_min));
        }

        let mut y = y_min;
        for (row, (&qk, &hk)) in row_counts.iter().zip(row_heights.iter()).enumerate() {
            let y_top = if row + 1 == row_counts.len() {
                // 最后一行收口到带顶，避免行高累加误差
                y_max
            } else {
                y + hk
            };

            if qk == 1 {
                // 单列：一整块四边形
                let tl = nodes.len();
                nodes.push(DVec2::new(x_min, y_top));
                let tr = nodes.len();
                nodes.push(DVec2::new(x_min + width, y_top));
                cells.push(vec![bottom_ids[0], bottom_ids[1], tr, tl]);
                bottom_ids = vec![tl, tr];
            } else {
                // 2:1 合并行
                let bottom_xs: Vec<f64> = bottom_ids.iter().map(|&id| nodes[id].x).collect();
                let mut top_ids: Vec<usize> = Vec::new();
                let mut i = 0;
                while i <= qk {
                    top_ids.push(nodes.len());
                    nodes.push(DVec2::new(bottom_xs[i], y_top));
                    if i + 2 > qk && i < qk {
                        // 奇数列的最后一段不合并
                        i = qk;
                    } else {
                        i += 2;
                    }
                }

                let mut i = 0;
                let mut t = 0;
                while i + 1 < qk {
                    let (bl, bm, br) = (bottom_ids[i], bottom_ids[i + 1], bottom_ids[i + 2]);
                    let (tl, tr) = (top_ids[t], top_ids[t + 1]);
                    cells.push(vec![bl, bm, tl]);
                    cells.push(vec![bm, br, tr]);
                    cells.push(vec![bm, tr, tl]);
                    i += 2;
                    t += 1;
                }
                if i < qk {
                    // 剩余单段（奇数列）
                    let (bl, br) = (bottom_ids[i], bottom_ids[i + 1]);
                    let (tl, tr) = (top_ids[t], top_ids[t + 1]);
                    cells.push(vec![bl, br, tr]);
                    cells.push(vec![bl, tr, tl]);
                }
                bottom_ids = top_ids;
            }
            y = y_top;
        }

        Ok(RawMesh { nodes, cells })
    }

    /// 生成线挤出条带
    fn build_extrusion(&self, geo: &GeometryDescription, ext: &Extrusion) -> GfResult<RawMesh> {
        let line = geo
            .lines
            .get(ext.line)
            .ok_or_else(|| GfError::invalid_input("挤出引用的线不存在"))?;
        if line.from >= geo.points.len() || line.to >= geo.points.len() {
            return Err(GfError::invalid_input("线引用的点不存在"));
        }
        if ext.layers < 1 {
            return Err(GfError::invalid_domain("挤出层数必须至少为 1"));
        }
        GfError::check_positive("挤出高度", ext.dy)?;

        let pa = geo.points[line.from];
        let pb = geo.points[line.to];
        // 保证单元逆时针：沿 +y 挤出时底边按 +x 方向排列
        let (a, b) = if pa.x <= pb.x {
            (DVec2::new(pa.x, pa.y), DVec2::new(pb.x, pb.y))
        } else {
            (DVec2::new(pb.x, pb.y), DVec2::new(pa.x, pa.y))
        };
        if (b - a).length() <= 0.0 {
            return Err(GfError::invalid_input("挤出线段长度为零"));
        }

        let dy = ext.dy / ext.layers as f64;
        let mut nodes = Vec::with_capacity(2 * (ext.layers + 1));
        for k in 0..=ext.layers {
            let off = DVec2::new(0.0, k as f64 * dy);
            nodes.push(a + off);
            nodes.push(b + off);
        }
        let mut cells = Vec::with_capacity(ext.layers);
        for k in 0..ext.layers {
            let (bl, br) = (2 * k, 2 * k + 1);
            let (tl, tr) = (2 * (k + 1), 2 * (k + 1) + 1);
            if ext.recombine {
                cells.push(vec![bl, br, tr, tl]);
            } else {
                cells.push(vec![bl, br, tr]);
                cells.push(vec![bl, tr, tl]);
            }
        }

        Ok(RawMesh { nodes, cells })
    }
}

impl MeshGenerator for GradedBandGenerator {
    fn build(&self, geometry: &GeometryDescription, default_cell_size: f64) -> GfResult<RawMesh> {
        match (geometry.surfaces.as_slice(), geometry.extrusions.as_slice()) {
            ([surface], []) => self.build_band(geometry, surface, default_cell_size),
            ([], [ext]) => self.build_extrusion(geometry, ext),
            _ => Err(GfError::invalid_input(
                "渐变带生成器每次只处理一个平面区域或一个挤出",
            )),
        }
    }
}
