// crates/gf_physics/src/numerics/gradient.rs

//! 梯度重构
//!
//! Green-Gauss 单元梯度：
//!
//! ```text
//! ∇φ_i ≈ (1/A_i) Σ_f φ_f · n_f · L_f
//! ```
//!
//! 周期（角度值）场通过 [`ValueWrap::Periodic`] 在梯度乘以特征
//! 间距后折回基本区间再除回，使相邻单元间 2π 跳变不污染梯度。
//!
//! 串行路径为参考实现；rayon 并行路径为可选加速，两者结果
//! 必须在数值容差内一致（由等价性测试保证）。

use gf_foundation::{GfError, GfResult};
use gf_mesh::FvMesh;
use glam::DVec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================
// 配置
// ============================================================

/// 面插值方法
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceInterpolation {
    /// 简单算术平均
    #[default]
    Arithmetic,
    /// 距离加权插值（适用于非均匀网格）
    DistanceWeighted,
}

/// 周期折回策略
///
/// `Periodic { period }` 将输入折回到 `(-period/2, period/2]`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum ValueWrap {
    /// 线性场，不折回
    #[default]
    Linear,
    /// 周期场（如角度，周期 2π）
    Periodic {
        /// 周期长度
        period: f64,
    },
}

impl ValueWrap {
    /// 折回到基本区间
    #[inline]
    pub fn wrap(&self, x: f64) -> f64 {
        match *self {
            Self::Linear => x,
            Self::Periodic { period } => x - period * (x / period).round(),
        }
    }
}

/// Green-Gauss 梯度配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreenGaussConfig {
    /// 是否启用并行
    pub parallel: bool,
    /// 并行阈值（单元数）
    pub parallel_threshold: usize,
    /// 面插值方法
    pub face_interpolation: FaceInterpolation,
    /// 周期折回策略
    pub wrap: ValueWrap,
}

impl Default for GreenGaussConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 1000,
            face_interpolation: FaceInterpolation::Arithmetic,
            wrap: ValueWrap::Linear,
        }
    }
}

// ============================================================
// Green-Gauss 单元梯度
// ============================================================

/// Green-Gauss 梯度计算器
#[derive(Debug, Clone, Default)]
pub struct GreenGaussGradient {
    config: GreenGaussConfig,
}

impl GreenGaussGradient {
    /// 创建默认配置实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用配置创建
    pub fn with_config(config: GreenGaussConfig) -> Self {
        Self { config }
    }

    /// 设置并行开关
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.config.parallel = enabled;
        self
    }

    /// 设置面插值方法
    pub fn with_face_interpolation(mut self, method: FaceInterpolation) -> Self {
        self.config.face_interpolation = method;
        self
    }

    /// 使用距离加权插值
    pub fn with_distance_weighted(self) -> Self {
        self.with_face_interpolation(FaceInterpolation::DistanceWeighted)
    }

    /// 设置周期折回
    pub fn with_wrap(mut self, wrap: ValueWrap) -> Self {
        self.config.wrap = wrap;
        self
    }

    /// 配置引用
    pub fn config(&self) -> &GreenGaussConfig {
        &self.config
    }

    /// 距离加权插值: (φ_n d_o + φ_o d_n) / (d_o + d_n)
    #[inline]
    fn distance_weighted(phi_o: f64, phi_n: f64, d_o: f64, d_n: f64) -> f64 {
        let d_total = d_o + d_n;
        if d_total < 1e-14 {
            0.5 * (phi_o + phi_n)
        } else {
            (phi_n * d_o + phi_o * d_n) / d_total
        }
    }

    /// 计算单个单元的梯度（参考路径）
    fn cell_gradient(&self, cell: usize, field: &[f64], mesh: &FvMesh) -> DVec2 {
        let area = mesh.cell_area[cell];
        if area < 1e-14 {
            return DVec2::ZERO;
        }

        let cell_center = mesh.cell_center[cell];
        let phi_c = field[cell];
        let mut grad = DVec2::ZERO;

        for face in mesh.cell_faces(cell) {
            let owner = mesh.face_owner(face);
            let neighbor = mesh.face_neighbor(face);

            // owner 侧法向指向外侧，neighbor 侧取相反号
            let sign = if owner == cell { 1.0 } else { -1.0 };
            let ds = mesh.face_normal[face] * mesh.face_length[face] * sign;

            let phi_face = if let Some(neigh) = neighbor {
                let other = if owner == cell { neigh } else { owner };
                match self.config.face_interpolation {
                    FaceInterpolation::Arithmetic => 0.5 * (phi_c + field[other]),
                    FaceInterpolation::DistanceWeighted => {
                        let fc = mesh.face_center[face];
                        let d_self = (fc - cell_center).length();
                        let d_other = (fc - mesh.cell_center[other]).length();
                        Self::distance_weighted(phi_c, field[other], d_self, d_other)
                    }
                }
            } else {
                // 边界面: 使用单元中心值
                phi_c
            };

            grad += ds * phi_face;
        }

        grad /= area;

        // 周期场: 梯度乘以特征间距折回后再除回
        match self.config.wrap {
            ValueWrap::Linear => grad,
            wrap => {
                let s = mesh.mesh_spacing;
                DVec2::new(wrap.wrap(grad.x * s.x) / s.x, wrap.wrap(grad.y * s.y) / s.y)
            }
        }
    }

    /// 计算所有单元的梯度
    ///
    /// 单元数达到阈值且启用并行时走 rayon 路径，否则走串行参考路径。
    pub fn compute(&self, field: &[f64], mesh: &FvMesh) -> GfResult<Vec<DVec2>> {
        GfError::check_size("field", mesh.n_cells(), field.len())?;
        if self.config.parallel && mesh.n_cells() >= self.config.parallel_threshold {
            Ok(self.compute_parallel(field, mesh))
        } else {
            Ok(self.compute_reference(field, mesh))
        }
    }

    /// 串行参考路径
    ///
    /// 加速路径的唯一真值来源；等价性由测试保证。
    pub fn compute_reference(&self, field: &[f64], mesh: &FvMesh) -> Vec<DVec2> {
        (0..mesh.n_cells())
            .map(|cell| self.cell_gradient(cell, field, mesh))
            .collect()
    }

    /// rayon 并行路径
    pub fn compute_parallel(&self, field: &[f64], mesh: &FvMesh) -> Vec<DVec2> {
        (0..mesh.n_cells())
            .into_par_iter()
            .map(|cell| self.cell_gradient(cell, field, mesh))
            .collect()
    }
}

// ============================================================
// 面梯度
// ============================================================

/// 面梯度计算器
///
/// 法向分量为两侧单元值的有限差分（经周期折回）除以单元间距；
/// 切向分量取两侧单元梯度在面切向上投影的平均。
/// 边界面法向差分为零，切向取 owner 单元梯度。
#[derive(Debug, Clone, Default)]
pub struct FaceGradient {
    wrap: ValueWrap,
}

impl FaceGradient {
    /// 创建线性（不折回）实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置周期折回
    pub fn with_wrap(mut self, wrap: ValueWrap) -> Self {
        self.wrap = wrap;
        self
    }

    /// 计算所有面的梯度
    ///
    /// `cell_grads` 为已计算的单元梯度（通常来自
    /// [`GreenGaussGradient::compute`]）。
    pub fn compute(
        &self,
        field: &[f64],
        cell_grads: &[DVec2],
        mesh: &FvMesh,
    ) -> GfResult<Vec<DVec2>> {
        GfError::check_size("field", mesh.n_cells(), field.len())?;
        GfError::check_size("cell_grads", mesh.n_cells(), cell_grads.len())?;

        let mut out = Vec::with_capacity(mesh.n_faces());
        for face in 0..mesh.n_faces() {
            let owner = mesh.face_owner(face);
            let normal = mesh.face_normal[face];
            let tangent = mesh.face_tangent[face];

            let (normal_diff, t_proj) = match mesh.face_neighbor(face) {
                Some(neigh) => {
                    let n = self.wrap.wrap(field[neigh] - field[owner]) / mesh.face_dist[face];
                    let t = 0.5 * (tangent.dot(cell_grads[owner]) + tangent.dot(cell_grads[neigh]));
                    (n, t)
                }
                None => (0.0, tangent.dot(cell_grads[owner])),
            };

            out.push(normal * normal_diff + tangent * t_proj);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gf_mesh::RectGrid;
    use std::f64::consts::PI;

    #[test]
    fn test_wrap_linear_identity() {
        let w = ValueWrap::Linear;
        assert_eq!(w.wrap(7.5), 7.5);
    }

    #[test]
    fn test_wrap_periodic() {
        let w = ValueWrap::Periodic { period: 2.0 * PI };
        assert!((w.wrap(2.0 * PI + 0.3) - 0.3).abs() < 1e-14);
        assert!((w.wrap(-2.0 * PI + 0.3) - 0.3).abs() < 1e-14);
        assert!((w.wrap(0.3) - 0.3).abs() < 1e-14);
        // 折回到 |x| <= period/2
        assert!(w.wrap(100.0).abs() <= PI + 1e-12);
    }

    #[test]
    fn test_uniform_field_zero_gradient() {
        let mesh = RectGrid::new(4, 4, 0.5, 0.5).build().unwrap();
        let field = vec![3.0; mesh.n_cells()];
        let grads = GreenGaussGradient::new().compute(&field, &mesh).unwrap();
        for g in grads {
            assert!(g.length() < 1e-13);
        }
    }

    #[test]
    fn test_affine_field_interior_exact() {
        // φ = 2x + 3y + 1, 内部单元梯度应精确为 (2, 3)
        let mesh = RectGrid::new(6, 6, 0.25, 0.5).build().unwrap();
        let field: Vec<f64> = mesh
            .cell_center
            .iter()
            .map(|c| 2.0 * c.x + 3.0 * c.y + 1.0)
            .collect();
        let grads = GreenGaussGradient::new()
            .with_parallel(false)
            .compute(&field, &mesh)
            .unwrap();

        for cell in 0..mesh.n_cells() {
            let interior = mesh.cell_faces(cell).all(|f| mesh.face_neighbor(f).is_some());
            if interior {
                assert!((grads[cell].x - 2.0).abs() < 1e-12, "单元 {}", cell);
                assert!((grads[cell].y - 3.0).abs() < 1e-12, "单元 {}", cell);
            }
        }
    }

    #[test]
    fn test_parallel_matches_reference() {
        let mesh = RectGrid::new(12, 9, 0.1, 0.2).build().unwrap();
        let field: Vec<f64> = mesh
            .cell_center
            .iter()
            .map(|c| (3.0 * c.x).sin() * (2.0 * c.y).cos())
            .collect();
        let gg = GreenGaussGradient::new();
        let serial = gg.compute_reference(&field, &mesh);
        let parallel = gg.compute_parallel(&field, &mesh);
        for (s, p) in serial.iter().zip(&parallel) {
            assert!((*s - *p).length() < 1e-14);
        }
    }

    #[test]
    fn test_modular_gradient_bounded() {
        // 存储值带 2π 跳变: 折回后梯度受 period/(2*间距) 限制
        let mesh = RectGrid::new(10, 1, 0.1, 0.1).build().unwrap();
        let field: Vec<f64> = mesh
            .cell_center
            .iter()
            .map(|c| {
                let phase = 0.2 * c.x;
                if c.x > 0.5 {
                    phase - 2.0 * PI
                } else {
                    phase
                }
            })
            .collect();

        let wrap = ValueWrap::Periodic { period: 2.0 * PI };
        let gg = GreenGaussGradient::new().with_wrap(wrap).with_parallel(false);
        let grads = gg.compute(&field, &mesh).unwrap();

        let bound = PI / mesh.mesh_spacing.x + 1e-9;
        for g in &grads {
            assert!(g.x.abs() <= bound, "梯度 {} 超出折回界限", g.x);
        }

        // 光滑场上折回应为恒等
        let smooth: Vec<f64> = mesh.cell_center.iter().map(|c| 0.2 * c.x).collect();
        let wrapped = gg.compute(&smooth, &mesh).unwrap();
        let raw = GreenGaussGradient::new()
            .with_parallel(false)
            .compute(&smooth, &mesh)
            .unwrap();
        for (w, r) in wrapped.iter().zip(&raw) {
            assert!((*w - *r).length() < 1e-12);
        }
    }

    #[test]
    fn test_face_gradient_normal_difference() {
        // φ = x, 内部竖直面的法向分量应为 1
        let mesh = RectGrid::new(4, 4, 0.25, 0.25).build().unwrap();
        let field: Vec<f64> = mesh.cell_center.iter().map(|c| c.x).collect();
        let cell_grads = GreenGaussGradient::new()
            .with_parallel(false)
            .compute(&field, &mesh)
            .unwrap();
        let face_grads = FaceGradient::new()
            .compute(&field, &cell_grads, &mesh)
            .unwrap();

        for &fi in &mesh.interior_face_indices {
            let f = fi as usize;
            if mesh.face_normal[f].x.abs() > 0.5 {
                assert!((face_grads[f].x - 1.0).abs() < 1e-10, "面 {}", f);
            }
        }
    }

    #[test]
    fn test_face_gradient_wrap_unwraps_jump() {
        // 相邻单元存储值相差约 2π: 折回后法向差分恢复真实小差值
        let mesh = RectGrid::new(2, 1, 0.1, 0.1).build().unwrap();
        let field = vec![PI - 0.1, -PI + 0.1];
        let cell_grads = vec![DVec2::ZERO; 2];

        let fg = FaceGradient::new().with_wrap(ValueWrap::Periodic { period: 2.0 * PI });
        let grads = fg.compute(&field, &cell_grads, &mesh).unwrap();

        let fi = mesh.interior_face_indices[0] as usize;
        // 真实差值 wrap(-2π + 0.2) = 0.2, 间距 0.1 => 法向梯度 2.0
        assert!((grads[fi].x - 2.0).abs() < 1e-10);

        // 不折回时梯度被 2π 跳变污染
        let raw = FaceGradient::new().compute(&field, &cell_grads, &mesh).unwrap();
        assert!(raw[fi].x < -50.0);
    }
}
