// crates/gf_physics/src/field.rs

//! 单元场
//!
//! 每单元一个标量值，绑定共享网格句柄。所有可变访问都会递增
//! 代际戳；派生量缓存记录其输入的代际戳，只有过期时才重算，
//! 不依赖隐式的变更通知。

use crate::numerics::gradient::GreenGaussGradient;
use gf_foundation::{GfError, GfResult};
use gf_mesh::FvMesh;
use glam::DVec2;
use std::sync::Arc;

/// 单元中心标量场
///
/// 场引用（不拥有）其网格；网格几何在构造后只读，
/// 可被多个场共享。
#[derive(Debug, Clone)]
pub struct CellField {
    mesh: Arc<FvMesh>,
    values: Vec<f64>,
    generation: u64,
}

impl CellField {
    /// 创建常值场
    pub fn new(mesh: Arc<FvMesh>, initial: f64) -> Self {
        let n = mesh.n_cells();
        Self {
            mesh,
            values: vec![initial; n],
            generation: 0,
        }
    }

    /// 从值数组创建场
    pub fn from_values(mesh: Arc<FvMesh>, values: Vec<f64>) -> GfResult<Self> {
        GfError::check_size("values", mesh.n_cells(), values.len())?;
        Ok(Self {
            mesh,
            values,
            generation: 0,
        })
    }

    /// 以函数对单元中心取值创建场
    pub fn from_fn<F>(mesh: Arc<FvMesh>, f: F) -> Self
    where
        F: Fn(DVec2) -> f64,
    {
        let values = mesh.cell_center.iter().map(|&c| f(c)).collect();
        Self {
            mesh,
            values,
            generation: 0,
        }
    }

    /// 网格句柄
    #[inline]
    pub fn mesh(&self) -> &Arc<FvMesh> {
        &self.mesh
    }

    /// 值切片（只读）
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 可变值切片
    ///
    /// 借出即视为修改，代际戳递增，依赖该场的缓存失效。
    #[inline]
    pub fn values_mut(&mut self) -> &mut [f64] {
        self.generation += 1;
        &mut self.values
    }

    /// 覆盖全部值
    pub fn set_values(&mut self, values: &[f64]) -> GfResult<()> {
        GfError::check_size("values", self.values.len(), values.len())?;
        self.values.copy_from_slice(values);
        self.generation += 1;
        Ok(())
    }

    /// 设置单个单元的值
    #[inline]
    pub fn set(&mut self, cell: usize, value: f64) {
        self.values[cell] = value;
        self.generation += 1;
    }

    /// 单元数
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 当前代际戳
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// 单元梯度缓存
///
/// 记录梯度计算时刻的场代际戳，过期时惰性重算。
/// 初始为"未计算"哨兵状态，首次访问时求值。
#[derive(Debug, Clone, Default)]
pub struct GradientCache {
    grads: Vec<DVec2>,
    stamp: Option<u64>,
}

impl GradientCache {
    /// 创建空缓存（未计算状态）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取梯度，必要时重算
    pub fn get_or_compute(
        &mut self,
        field: &CellField,
        evaluator: &GreenGaussGradient,
    ) -> GfResult<&[DVec2]> {
        if self.stamp != Some(field.generation()) {
            self.grads = evaluator.compute(field.values(), field.mesh())?;
            self.stamp = Some(field.generation());
        }
        Ok(&self.grads)
    }

    /// 是否与场的当前代际一致
    pub fn is_fresh(&self, field: &CellField) -> bool {
        self.stamp == Some(field.generation())
    }

    /// 手动置为未计算状态
    pub fn invalidate(&mut self) {
        self.stamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gf_mesh::RectGrid;

    fn grid() -> Arc<FvMesh> {
        Arc::new(RectGrid::new(4, 4, 0.25, 0.25).build().unwrap())
    }

    #[test]
    fn test_field_creation() {
        let mesh = grid();
        let field = CellField::new(Arc::clone(&mesh), 2.5);
        assert_eq!(field.len(), 16);
        assert!(field.values().iter().all(|&v| v == 2.5));
        assert_eq!(field.generation(), 0);
    }

    #[test]
    fn test_field_from_values_size_check() {
        let mesh = grid();
        assert!(CellField::from_values(Arc::clone(&mesh), vec![0.0; 3]).is_err());
        assert!(CellField::from_values(mesh, vec![0.0; 16]).is_ok());
    }

    #[test]
    fn test_mutation_bumps_generation() {
        let mesh = grid();
        let mut field = CellField::new(mesh, 0.0);
        let g0 = field.generation();
        field.set(3, 1.0);
        assert!(field.generation() > g0);
        let g1 = field.generation();
        field.values_mut()[0] = 5.0;
        assert!(field.generation() > g1);
    }

    #[test]
    fn test_gradient_cache_staleness() {
        let mesh = grid();
        let mut field = CellField::from_fn(Arc::clone(&mesh), |c| c.x);
        let evaluator = GreenGaussGradient::new().with_parallel(false);
        let mut cache = GradientCache::new();

        assert!(!cache.is_fresh(&field));
        cache.get_or_compute(&field, &evaluator).unwrap();
        assert!(cache.is_fresh(&field));

        // 修改场后缓存过期
        field.set(0, 99.0);
        assert!(!cache.is_fresh(&field));
        let grads = cache.get_or_compute(&field, &evaluator).unwrap();
        assert_eq!(grads.len(), 16);
        assert!(cache.is_fresh(&field));
    }

    #[test]
    fn test_gradient_cache_invalidate() {
        let mesh = grid();
        let field = CellField::new(mesh, 1.0);
        let evaluator = GreenGaussGradient::new().with_parallel(false);
        let mut cache = GradientCache::new();

        cache.get_or_compute(&field, &evaluator).unwrap();
        cache.invalidate();
        assert!(!cache.is_fresh(&field));
    }
}
