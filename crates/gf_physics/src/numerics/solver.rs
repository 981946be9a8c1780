// crates/gf_physics/src/numerics/solver.rs

//! 线性求解器
//!
//! 核心只依赖一个契约：输入系数矩阵与右端项，输出解向量；
//! 不收敛作为 [`GfError::Convergence`] 向上传播，核心不重试。
//!
//! 内置实现为雅可比预处理共轭梯度法（PCG），适用于扩散类
//! 对称正定系统。迭代格式：
//!
//! 1. r_0 = b - A*x_0, z_0 = M⁻¹r_0, p_0 = z_0
//! 2. α = (r, z) / (p, A*p)
//! 3. x += α p; r -= α A*p
//! 4. 收敛判断后 z = M⁻¹r, β = (r', z') / (r, z), p = z + β p

use super::csr::CsrMatrix;
use gf_foundation::{GfError, GfResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// 求解器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// 相对容差（残差 / ‖b‖）
    pub rtol: f64,
    /// 绝对容差
    pub atol: f64,
    /// 最大迭代次数
    pub max_iter: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-14,
            max_iter: 1000,
        }
    }
}

impl SolverConfig {
    /// 创建配置
    pub fn new(rtol: f64, max_iter: usize) -> Self {
        Self {
            rtol,
            max_iter,
            ..Default::default()
        }
    }
}

/// 求解统计
#[derive(Debug, Clone, Copy)]
pub struct SolverStats {
    /// 实际迭代次数
    pub iterations: usize,
    /// 最终残差范数
    pub residual_norm: f64,
    /// 相对残差（‖r‖ / ‖b‖）
    pub relative_residual: f64,
}

/// 线性求解器契约
///
/// `solve(matrix, b, x)`：`x` 传入初始猜测，传出解。
/// 同步阻塞调用；不收敛返回 [`GfError::Convergence`]。
pub trait LinearSolver {
    /// 求解 A x = b
    fn solve(&mut self, matrix: &CsrMatrix, b: &[f64], x: &mut [f64]) -> GfResult<SolverStats>;
}

/// 雅可比预处理共轭梯度求解器
///
/// 工作区预分配，可跨多次求解复用。
pub struct PcgSolver {
    config: SolverConfig,
    r: Vec<f64>,
    z: Vec<f64>,
    p: Vec<f64>,
    ap: Vec<f64>,
    diag: Vec<f64>,
}

impl Default for PcgSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl PcgSolver {
    /// 创建求解器
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            r: Vec::new(),
            z: Vec::new(),
            p: Vec::new(),
            ap: Vec::new(),
            diag: Vec::new(),
        }
    }

    /// 配置引用
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn ensure_capacity(&mut self, n: usize) {
        if self.r.len() != n {
            self.r = vec![0.0; n];
            self.z = vec![0.0; n];
            self.p = vec![0.0; n];
            self.ap = vec![0.0; n];
            self.diag = vec![0.0; n];
        }
    }

    /// 雅可比预处理: z = M⁻¹ r，对角元过小时退化为恒等
    fn apply_preconditioner(diag: &[f64], r: &[f64], z: &mut [f64]) {
        for i in 0..r.len() {
            let d = diag[i];
            z[i] = if d.abs() > 1e-30 { r[i] / d } else { r[i] };
        }
    }
}

#[inline]
fn dot(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

impl LinearSolver for PcgSolver {
    fn solve(&mut self, matrix: &CsrMatrix, b: &[f64], x: &mut [f64]) -> GfResult<SolverStats> {
        let n = matrix.n_rows();
        GfError::check_size("rhs", n, b.len())?;
        GfError::check_size("solution", n, x.len())?;
        self.ensure_capacity(n);

        // 雅可比预处理器取矩阵对角
        self.diag = matrix.extract_diagonal();

        // r = b - A*x
        matrix.mul_vec(x, &mut self.r);
        for i in 0..n {
            self.r[i] = b[i] - self.r[i];
        }

        let b_norm = dot(b, b).sqrt();
        let initial_r_norm = dot(&self.r, &self.r).sqrt();

        // 右端项接近零: 初始猜测即为解
        if b_norm < self.config.atol {
            return Ok(SolverStats {
                iterations: 0,
                residual_norm: initial_r_norm,
                relative_residual: 0.0,
            });
        }

        Self::apply_preconditioner(&self.diag, &self.r, &mut self.z);
        self.p.copy_from_slice(&self.z);
        let mut rho = dot(&self.r, &self.z);

        for iter in 0..self.config.max_iter {
            matrix.mul_vec(&self.p, &mut self.ap);

            let p_ap = dot(&self.p, &self.ap);
            if p_ap.abs() < 1e-30 {
                // 搜索方向退化
                let r_norm = dot(&self.r, &self.r).sqrt();
                return Err(GfError::convergence(iter, r_norm / b_norm));
            }
            let alpha = rho / p_ap;

            for i in 0..n {
                x[i] += alpha * self.p[i];
                self.r[i] -= alpha * self.ap[i];
            }

            let r_norm = dot(&self.r, &self.r).sqrt();
            let relative_residual = r_norm / b_norm;

            if iter % 50 == 0 {
                trace!(iter, relative_residual, "PCG 迭代");
            }

            if r_norm < self.config.atol || relative_residual < self.config.rtol {
                debug!(
                    iterations = iter + 1,
                    relative_residual, "PCG 收敛"
                );
                return Ok(SolverStats {
                    iterations: iter + 1,
                    residual_norm: r_norm,
                    relative_residual,
                });
            }

            Self::apply_preconditioner(&self.diag, &self.r, &mut self.z);
            let rho_new = dot(&self.r, &self.z);
            let beta = rho_new / rho;
            rho = rho_new;

            for i in 0..n {
                self.p[i] = self.z[i] + beta * self.p[i];
            }
        }

        let r_norm = dot(&self.r, &self.r).sqrt();
        Err(GfError::convergence(
            self.config.max_iter,
            r_norm / b_norm,
        ))
    }
}
