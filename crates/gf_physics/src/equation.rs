// crates/gf_physics/src/equation.rs

//! 扩散方程组装
//!
//! 将扩散项离散为稀疏线性系统 `L·x = b`：
//!
//! - 内部面: 系数 `a = Γ_f · L_f / d`，对称五点/多点格式
//!   （对角 `+a`，非对角 `-a`，两行同时写入）
//! - 被约束的边界面: Dirichlet 单侧差分，`a_b = Γ · L_f / d_of`
//!   加到 owner 对角，`a_b·值` 加到右端项
//! - 未约束边界面: 自然零通量，不产生贡献
//! - 被约束的单元: 对称消元后行覆盖为单位行，右端项为固定值
//!
//! # 欠松弛
//!
//! 给定松弛因子 `r ∈ (0, 1]`，提取对角 `Lii`，除以 `r` 后写回，
//! 并将 `(1 - r)·(Lii/r)·旧迭代值` 加到右端项，使新系统向上一次
//! 迭代融合，稳定非线性耦合求解。
//!
//! **前置条件**: [`DiffusionEquation::relax`] 只能在一次全新的
//! 未松弛组装后调用一次；重复调用会叠加松弛。
//! 组装失败后 `L`/`b` 处于未定义状态，调用方必须丢弃重建。

use crate::constraint::ConstraintSet;
use crate::field::CellField;
use crate::numerics::csr::{CsrBuilder, CsrMatrix};
use crate::numerics::solver::LinearSolver;
use gf_foundation::{GfError, GfResult};
use gf_mesh::FvMesh;
use std::sync::Arc;
use tracing::debug;

/// 扩散系数
#[derive(Debug, Clone)]
pub enum DiffusionCoeff {
    /// 均匀系数
    Uniform(f64),
    /// 逐单元系数（面上取调和平均，保证正定性）
    PerCell(Vec<f64>),
}

impl DiffusionCoeff {
    /// 校验系数与网格一致
    pub fn validate(&self, mesh: &FvMesh) -> GfResult<()> {
        match self {
            Self::Uniform(gamma) => {
                if *gamma < 0.0 {
                    return Err(GfError::invalid_input(format!(
                        "扩散系数不能为负: {}",
                        gamma
                    )));
                }
                Ok(())
            }
            Self::PerCell(gammas) => {
                GfError::check_size("diffusion_coeff", mesh.n_cells(), gammas.len())
            }
        }
    }

    /// 面上的系数
    ///
    /// 逐单元系数在内部面取调和平均，边界面取 owner 值。
    #[inline]
    fn at_face(&self, mesh: &FvMesh, face: usize) -> f64 {
        match self {
            Self::Uniform(gamma) => *gamma,
            Self::PerCell(gammas) => {
                let g_o = gammas[mesh.face_owner(face)];
                match mesh.face_neighbor(face) {
                    Some(neigh) => {
                        let g_n = gammas[neigh];
                        if g_o + g_n > 1e-14 {
                            2.0 * g_o * g_n / (g_o + g_n)
                        } else {
                            0.0
                        }
                    }
                    None => g_o,
                }
            }
        }
    }
}

/// 扩散方程
///
/// 持有稀疏矩阵、右端项、上一次迭代值与松弛因子。
/// 稀疏模式在构造时确定一次，每次组装只重填值。
pub struct DiffusionEquation {
    mesh: Arc<FvMesh>,
    coeff: DiffusionCoeff,
    relaxation: f64,
    matrix: CsrMatrix,
    rhs: Vec<f64>,
    diag_indices: Vec<usize>,
    old_sweep: Vec<f64>,
}

impl DiffusionEquation {
    /// 创建扩散方程
    ///
    /// 稀疏模式由网格拓扑（对角 + 面邻居）确定。
    pub fn new(mesh: Arc<FvMesh>, coeff: DiffusionCoeff) -> GfResult<Self> {
        coeff.validate(&mesh)?;
        let n = mesh.n_cells();

        let mut builder = CsrBuilder::new_square(n);
        for cell in 0..n {
            builder.set(cell, cell, 0.0);
            for face in mesh.cell_faces(cell) {
                let owner = mesh.face_owner(face);
                if let Some(neigh) = mesh.face_neighbor(face) {
                    let other = if owner == cell { neigh } else { owner };
                    builder.set(cell, other, 0.0);
                }
            }
        }
        let matrix: CsrMatrix = builder.build_pattern().into();
        let diag_indices = matrix
            .diagonal_indices()
            .ok_or_else(|| GfError::invalid_input("稀疏模式缺少对角元"))?;

        Ok(Self {
            mesh,
            coeff,
            relaxation: 1.0,
            matrix,
            rhs: vec![0.0; n],
            diag_indices,
            old_sweep: vec![0.0; n],
        })
    }

    /// 设置松弛因子
    ///
    /// 必须满足 `0 < r <= 1`；`r = 1` 等价于不松弛。
    pub fn with_relaxation(mut self, relaxation: f64) -> GfResult<Self> {
        if !(relaxation > 0.0 && relaxation <= 1.0) {
            return Err(GfError::invalid_input(format!(
                "松弛因子必须在 (0, 1] 内: {}",
                relaxation
            )));
        }
        self.relaxation = relaxation;
        Ok(self)
    }

    /// 当前松弛因子
    #[inline]
    pub fn relaxation(&self) -> f64 {
        self.relaxation
    }

    /// 系数矩阵引用
    #[inline]
    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    /// 右端项引用
    #[inline]
    pub fn rhs(&self) -> &[f64] {
        &self.rhs
    }

    /// 上一次迭代值
    #[inline]
    pub fn old_sweep(&self) -> &[f64] {
        &self.old_sweep
    }

    /// 全新（未松弛）组装
    ///
    /// 清零后按面遍历重填矩阵与右端项，并以场的当前值快照
    /// 上一次迭代数组。
    pub fn build_matrix(
        &mut self,
        field: &CellField,
        constraints: &ConstraintSet,
    ) -> GfResult<()> {
        constraints.validate(&self.mesh)?;
        GfError::check_size("field", self.mesh.n_cells(), field.len())?;

        self.old_sweep.clear();
        self.old_sweep.extend_from_slice(field.values());

        self.matrix.clear_values();
        self.rhs.fill(0.0);

        let mesh = &self.mesh;
        let face_values = constraints.resolve_face_values(mesh.n_faces());
        let cell_values = constraints.resolve_cell_values(mesh.n_cells());

        // ---- 内部面 ----
        for &fi in &mesh.interior_face_indices {
            let face = fi as usize;
            let owner = mesh.face_owner(face);
            let neigh = match mesh.face_neighbor(face) {
                Some(n) => n,
                None => continue,
            };
            let dist = mesh.face_dist[face];
            if dist < 1e-14 {
                continue;
            }
            let a = self.coeff.at_face(mesh, face) * mesh.face_length[face] / dist;

            self.matrix.add(owner, owner, a);
            self.matrix.add(owner, neigh, -a);
            self.matrix.add(neigh, neigh, a);
            self.matrix.add(neigh, owner, -a);
        }

        // ---- 边界面 ----
        // 被约束的面施加 Dirichlet 单侧差分；其余为自然零通量。
        for &fi in &mesh.boundary_face_indices {
            let face = fi as usize;
            if let Some(value) = face_values[face] {
                let owner = mesh.face_owner(face);
                let dist = mesh.face_dist[face].max(1e-14);
                let a = self.coeff.at_face(mesh, face) * mesh.face_length[face] / dist;
                self.matrix.add(owner, owner, a);
                self.rhs[owner] += a * value;
            }
        }

        // ---- 单元约束: 对称消元 + 行覆盖 ----
        for (i, v_opt) in cell_values.iter().enumerate() {
            if let Some(v) = v_opt {
                let cols: Vec<usize> = self.matrix.row(i).map(|(j, _)| j).collect();
                for j in cols {
                    if j == i {
                        continue;
                    }
                    let idx = self.matrix.pattern().find_index(j, i);
                    if let Some(idx) = idx {
                        self.rhs[j] -= self.matrix.values()[idx] * v;
                        self.matrix.values_mut()[idx] = 0.0;
                    }
                }
            }
        }
        for (i, v_opt) in cell_values.iter().enumerate() {
            if let Some(v) = v_opt {
                self.matrix.clear_row(i);
                self.matrix.values_mut()[self.diag_indices[i]] = 1.0;
                self.rhs[i] = *v;
            }
        }

        Ok(())
    }

    /// 欠松弛
    ///
    /// `Lii /= r`；`b += (1 - r)·Lii·旧迭代值`；对角写回。
    ///
    /// **前置条件**: 只能在一次全新的 [`Self::build_matrix`] 之后
    /// 调用一次，重复调用会叠加松弛（调用方负责）。
    pub fn relax(&mut self) {
        let r = self.relaxation;
        for i in 0..self.rhs.len() {
            let idx = self.diag_indices[i];
            let lii = self.matrix.values()[idx] / r;
            self.rhs[i] += (1.0 - r) * lii * self.old_sweep[i];
            self.matrix.values_mut()[idx] = lii;
        }
    }

    /// 不松弛地组装并求解一次
    pub fn solve(
        &mut self,
        field: &mut CellField,
        solver: &mut dyn LinearSolver,
        constraints: &ConstraintSet,
    ) -> GfResult<()> {
        self.build_matrix(field, constraints)?;
        let mut x = field.values().to_vec();
        solver.solve(&self.matrix, &self.rhs, &mut x)?;
        field.set_values(&x)
    }

    /// 一次非线性扫掠: 组装 → 欠松弛 → 求解 → 更新场
    ///
    /// 返回本次扫掠的最大位移 `max|x - 旧迭代值|`，供调用方
    /// 判断非线性迭代收敛。
    pub fn sweep(
        &mut self,
        field: &mut CellField,
        solver: &mut dyn LinearSolver,
        constraints: &ConstraintSet,
    ) -> GfResult<f64> {
        self.build_matrix(field, constraints)?;
        if self.relaxation < 1.0 {
            self.relax();
        }

        let mut x = field.values().to_vec();
        let stats = solver.solve(&self.matrix, &self.rhs, &mut x)?;

        let displacement = x
            .iter()
            .zip(&self.old_sweep)
            .map(|(new, old)| (new - old).abs())
            .fold(0.0_f64, f64::max);
        debug!(
            iterations = stats.iterations,
            displacement, "扫掠完成"
        );

        field.set_values(&x)?;
        Ok(displacement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Selector;
    use crate::numerics::solver::PcgSolver;
    use gf_mesh::RectGrid;

    fn strip_mesh() -> Arc<FvMesh> {
        // 4x1 水平条带, dx = 0.25
        Arc::new(RectGrid::new(4, 1, 0.25, 1.0).build().unwrap())
    }

    fn dirichlet_lr(mesh: &FvMesh, left: f64, right: f64) -> ConstraintSet {
        let mut set = ConstraintSet::new();
        set.constrain(left, Selector::Faces(mesh.faces_left()));
        set.constrain(right, Selector::Faces(mesh.faces_right()));
        set
    }

    #[test]
    fn test_solve_linear_profile_1d() {
        let mesh = strip_mesh();
        let constraints = dirichlet_lr(&mesh, 0.0, 1.0);
        let mut field = CellField::new(Arc::clone(&mesh), 0.0);
        let mut eq = DiffusionEquation::new(Arc::clone(&mesh), DiffusionCoeff::Uniform(1.0)).unwrap();
        let mut solver = PcgSolver::default();

        eq.solve(&mut field, &mut solver, &constraints).unwrap();

        // 一维两点通量格式对线性解精确: φ = x
        for (ci, c) in mesh.cell_center.iter().enumerate() {
            assert!(
                (field.values()[ci] - c.x).abs() < 1e-7,
                "单元 {}: {} != {}",
                ci,
                field.values()[ci],
                c.x
            );
        }
    }

    #[test]
    fn test_matrix_symmetric_after_build() {
        let mesh = Arc::new(RectGrid::new(3, 3, 0.5, 0.5).build().unwrap());
        let constraints = dirichlet_lr(&mesh, 0.0, 2.0);
        let field = CellField::new(Arc::clone(&mesh), 0.0);
        let mut eq = DiffusionEquation::new(Arc::clone(&mesh), DiffusionCoeff::Uniform(1.0)).unwrap();
        eq.build_matrix(&field, &constraints).unwrap();
        assert!(eq.matrix().is_symmetric(1e-12));
    }

    #[test]
    fn test_cell_constraint_row_overwrite() {
        let mesh = Arc::new(RectGrid::new(3, 1, 1.0, 1.0).build().unwrap());
        let mut constraints = ConstraintSet::new();
        let mut cell_mask = vec![false; 3];
        cell_mask[1] = true;
        constraints.constrain(5.0, Selector::Cells(cell_mask));
        constraints.constrain(0.0, Selector::Faces(mesh.faces_left()));

        let mut field = CellField::new(Arc::clone(&mesh), 0.0);
        let mut eq = DiffusionEquation::new(Arc::clone(&mesh), DiffusionCoeff::Uniform(1.0)).unwrap();
        let mut solver = PcgSolver::default();
        eq.solve(&mut field, &mut solver, &constraints).unwrap();

        assert!((field.values()[1] - 5.0).abs() < 1e-9);
        // 对称消元保持矩阵对称
        eq.build_matrix(&field, &constraints).unwrap();
        assert!(eq.matrix().is_symmetric(1e-12));
    }

    #[test]
    fn test_relaxation_unity_is_identity() {
        let mesh = strip_mesh();
        let constraints = dirichlet_lr(&mesh, 0.0, 1.0);
        let field = CellField::new(Arc::clone(&mesh), 0.3);

        let mut eq = DiffusionEquation::new(Arc::clone(&mesh), DiffusionCoeff::Uniform(1.0))
            .unwrap()
            .with_relaxation(1.0)
            .unwrap();
        eq.build_matrix(&field, &constraints).unwrap();
        let values_before = eq.matrix().values().to_vec();
        let rhs_before = eq.rhs().to_vec();

        eq.relax();

        // r = 1: 矩阵与右端项不变
        for (a, b) in eq.matrix().values().iter().zip(&values_before) {
            assert!((a - b).abs() < 1e-14);
        }
        for (a, b) in eq.rhs().iter().zip(&rhs_before) {
            assert!((a - b).abs() < 1e-14);
        }
    }

    #[test]
    fn test_relaxation_rescales_diagonal() {
        let mesh = strip_mesh();
        let constraints = dirichlet_lr(&mesh, 0.0, 1.0);
        let field = CellField::new(Arc::clone(&mesh), 0.5);

        let mut eq = DiffusionEquation::new(Arc::clone(&mesh), DiffusionCoeff::Uniform(1.0))
            .unwrap()
            .with_relaxation(0.5)
            .unwrap();
        eq.build_matrix(&field, &constraints).unwrap();
        let diag_before = eq.matrix().extract_diagonal();
        let rhs_before = eq.rhs().to_vec();

        eq.relax();
        let diag_after = eq.matrix().extract_diagonal();

        for i in 0..diag_before.len() {
            assert!((diag_after[i] - diag_before[i] / 0.5).abs() < 1e-12);
            let expected_rhs = rhs_before[i] + (1.0 - 0.5) * diag_after[i] * 0.5;
            assert!((eq.rhs()[i] - expected_rhs).abs() < 1e-12);
        }
    }

    #[test]
    fn test_invalid_relaxation_rejected() {
        let mesh = strip_mesh();
        let eq = DiffusionEquation::new(Arc::clone(&mesh), DiffusionCoeff::Uniform(1.0)).unwrap();
        assert!(eq.with_relaxation(0.0).is_err());

        let eq = DiffusionEquation::new(Arc::clone(&mesh), DiffusionCoeff::Uniform(1.0)).unwrap();
        assert!(eq.with_relaxation(1.5).is_err());
    }

    #[test]
    fn test_per_cell_coeff_harmonic_mean() {
        let mesh = strip_mesh();
        // 两种材料: 左两格 Γ=1, 右两格 Γ=3
        let coeff = DiffusionCoeff::PerCell(vec![1.0, 1.0, 3.0, 3.0]);
        let constraints = dirichlet_lr(&mesh, 0.0, 1.0);
        let mut field = CellField::new(Arc::clone(&mesh), 0.0);
        let mut eq = DiffusionEquation::new(Arc::clone(&mesh), coeff).unwrap();
        let mut solver = PcgSolver::default();
        eq.solve(&mut field, &mut solver, &constraints).unwrap();

        // 通量连续: 高扩散区梯度更平缓
        let v = field.values();
        let grad_left = v[1] - v[0];
        let grad_right = v[3] - v[2];
        assert!(grad_left > grad_right * 1.5);
        // 单调
        assert!(v[0] < v[1] && v[1] < v[2] && v[2] < v[3]);
    }

    #[test]
    fn test_coeff_size_validation() {
        let mesh = strip_mesh();
        let bad = DiffusionCoeff::PerCell(vec![1.0; 2]);
        assert!(DiffusionEquation::new(Arc::clone(&mesh), bad).is_err());
        let neg = DiffusionCoeff::Uniform(-1.0);
        assert!(DiffusionEquation::new(mesh, neg).is_err());
    }
}
