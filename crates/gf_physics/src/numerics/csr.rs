// crates/gf_physics/src/numerics/csr.rs

//! 压缩稀疏行（CSR）矩阵
//!
//! 稀疏模式与值分离存储：方程组装器在构造时确定一次稀疏模式，
//! 之后每次非线性扫掠只清零并重填值，不重新分配。
//!
//! # 格式说明
//!
//! - `row_ptr`: 行指针，长度 n_rows + 1
//! - `col_idx`: 列索引，每行内升序
//! - `values`: 非零元值

use std::collections::BTreeMap;

// =============================================================================
// 稀疏模式
// =============================================================================

/// CSR 矩阵的稀疏模式
///
/// 只存储结构信息（哪些位置有非零元），可在多次组装间复用。
#[derive(Debug, Clone)]
pub struct CsrPattern {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
}

impl CsrPattern {
    /// 行数
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// 列数
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// 非零元数量
    #[inline]
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    /// 行指针切片
    #[inline]
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    /// 列索引切片
    #[inline]
    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    /// 查找 (row, col) 在值数组中的索引
    ///
    /// 行内列索引升序，使用二分查找。
    pub fn find_index(&self, row: usize, col: usize) -> Option<usize> {
        let start = self.row_ptr[row];
        let end = self.row_ptr[row + 1];
        match self.col_idx[start..end].binary_search(&col) {
            Ok(local) => Some(start + local),
            Err(_) => None,
        }
    }
}

// =============================================================================
// 构建器
// =============================================================================

/// CSR 矩阵构建器
///
/// 使用 BTreeMap 暂存各行元素，构建时转换为紧凑 CSR 格式，
/// 行内列索引自然有序。
pub struct CsrBuilder {
    n_rows: usize,
    n_cols: usize,
    rows: Vec<BTreeMap<usize, f64>>,
}

impl CsrBuilder {
    /// 创建方阵构建器
    #[inline]
    pub fn new_square(n: usize) -> Self {
        Self::new(n, n)
    }

    /// 创建构建器
    ///
    /// # Panics
    /// - `n_rows == 0` 或 `n_cols == 0`
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        assert!(n_rows > 0, "行数必须大于 0");
        assert!(n_cols > 0, "列数必须大于 0");
        Self {
            n_rows,
            n_cols,
            rows: vec![BTreeMap::new(); n_rows],
        }
    }

    /// 设置 (row, col) 的值（覆盖）
    ///
    /// # Panics
    /// - 索引越界
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.n_rows, "行索引越界");
        assert!(col < self.n_cols, "列索引越界");
        self.rows[row].insert(col, value);
    }

    /// 累加到 (row, col)
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.n_rows, "行索引越界");
        assert!(col < self.n_cols, "列索引越界");
        *self.rows[row].entry(col).or_insert(0.0) += value;
    }

    /// 构建稀疏模式（丢弃值）
    pub fn build_pattern(&self) -> CsrPattern {
        let mut row_ptr = Vec::with_capacity(self.n_rows + 1);
        let mut col_idx = Vec::new();
        row_ptr.push(0);
        for row in &self.rows {
            col_idx.extend(row.keys().copied());
            row_ptr.push(col_idx.len());
        }
        CsrPattern {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            row_ptr,
            col_idx,
        }
    }

    /// 构建矩阵
    pub fn build(&self) -> CsrMatrix {
        let pattern = self.build_pattern();
        let mut values = Vec::with_capacity(pattern.nnz());
        for row in &self.rows {
            values.extend(row.values().copied());
        }
        CsrMatrix { pattern, values }
    }
}

// =============================================================================
// CSR 矩阵
// =============================================================================

/// CSR 格式稀疏矩阵（双精度）
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    pattern: CsrPattern,
    values: Vec<f64>,
}

impl From<CsrPattern> for CsrMatrix {
    /// 从稀疏模式创建零值矩阵
    fn from(pattern: CsrPattern) -> Self {
        let nnz = pattern.nnz();
        Self {
            pattern,
            values: vec![0.0; nnz],
        }
    }
}

impl CsrMatrix {
    /// 行数
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.pattern.n_rows()
    }

    /// 列数
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.pattern.n_cols()
    }

    /// 非零元数量
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// 稀疏模式
    #[inline]
    pub fn pattern(&self) -> &CsrPattern {
        &self.pattern
    }

    /// 值切片
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 可变值切片
    #[inline]
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// 获取 (row, col) 的值，位置不存在返回 0
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.pattern
            .find_index(row, col)
            .map_or(0.0, |idx| self.values[idx])
    }

    /// 累加到 (row, col)（位置必须已存在）
    ///
    /// # 返回
    /// - `true`: 累加成功
    /// - `false`: 位置不在稀疏模式中（未修改）
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) -> bool {
        if let Some(idx) = self.pattern.find_index(row, col) {
            self.values[idx] += value;
            true
        } else {
            false
        }
    }

    /// 提取对角线元素
    pub fn extract_diagonal(&self) -> Vec<f64> {
        (0..self.n_rows())
            .map(|i| self.get(i, i))
            .collect()
    }

    /// 构建对角元素索引缓存
    ///
    /// 所有行都必须含对角元（组装器的稀疏模式保证该前提）。
    pub fn diagonal_indices(&self) -> Option<Vec<usize>> {
        (0..self.n_rows())
            .map(|i| self.pattern.find_index(i, i))
            .collect()
    }

    /// 将某行所有元素清零
    pub fn clear_row(&mut self, row: usize) {
        let start = self.pattern.row_ptr[row];
        let end = self.pattern.row_ptr[row + 1];
        self.values[start..end].fill(0.0);
    }

    /// 遍历某行的 (列索引, 值) 对
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = self.pattern.row_ptr[row];
        let end = self.pattern.row_ptr[row + 1];
        self.pattern.col_idx[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    /// 矩阵-向量乘法 y = A * x
    ///
    /// # Panics
    /// - `x.len() != n_cols` 或 `y.len() != n_rows`
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n_cols(), "x 长度必须等于矩阵列数");
        assert_eq!(y.len(), self.n_rows(), "y 长度必须等于矩阵行数");

        for row in 0..self.n_rows() {
            let start = self.pattern.row_ptr[row];
            let end = self.pattern.row_ptr[row + 1];
            let mut sum = 0.0;
            for idx in start..end {
                sum += self.values[idx] * x[self.pattern.col_idx[idx]];
            }
            y[row] = sum;
        }
    }

    /// 将所有值清零（保持稀疏模式不变）
    ///
    /// 用于矩阵复用，避免重复分配。
    pub fn clear_values(&mut self) {
        self.values.fill(0.0);
    }

    /// 检查矩阵是否对称（容差内）
    pub fn is_symmetric(&self, tol: f64) -> bool {
        for i in 0..self.n_rows() {
            for (j, a_ij) in self.row(i) {
                if j > i && (a_ij - self.get(j, i)).abs() > tol {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tridiag(n: usize) -> CsrMatrix {
        let mut builder = CsrBuilder::new_square(n);
        for i in 0..n {
            builder.set(i, i, 2.0);
            if i > 0 {
                builder.set(i, i - 1, -1.0);
            }
            if i + 1 < n {
                builder.set(i, i + 1, -1.0);
            }
        }
        builder.build()
    }

    #[test]
    fn test_build_and_get() {
        let m = tridiag(4);
        assert_eq!(m.n_rows(), 4);
        assert_eq!(m.nnz(), 10);
        assert_eq!(m.get(0, 0), 2.0);
        assert_eq!(m.get(1, 0), -1.0);
        assert_eq!(m.get(0, 3), 0.0);
    }

    #[test]
    fn test_builder_add_accumulates() {
        let mut builder = CsrBuilder::new_square(2);
        builder.add(0, 0, 1.0);
        builder.add(0, 0, 2.0);
        let m = builder.build();
        assert_eq!(m.get(0, 0), 3.0);
    }

    #[test]
    fn test_pattern_reuse() {
        let mut builder = CsrBuilder::new_square(3);
        for i in 0..3 {
            builder.set(i, i, 1.0);
        }
        builder.set(0, 2, 5.0);
        let pattern = builder.build_pattern();
        let mut m: CsrMatrix = pattern.into();
        assert_eq!(m.nnz(), 4);
        assert_eq!(m.get(0, 2), 0.0);
        assert!(m.add(0, 2, 7.0));
        assert!(!m.add(2, 0, 1.0));
        assert_eq!(m.get(0, 2), 7.0);
    }

    #[test]
    fn test_mul_vec() {
        let m = tridiag(3);
        let x = vec![1.0, 2.0, 3.0];
        let mut y = vec![0.0; 3];
        m.mul_vec(&x, &mut y);
        assert_eq!(y, vec![0.0, 0.0, 4.0]);
    }

    #[test]
    fn test_diagonal() {
        let mut m = tridiag(3);
        let diag = m.extract_diagonal();
        assert_eq!(diag, vec![2.0, 2.0, 2.0]);

        let idx = m.diagonal_indices().unwrap();
        m.values_mut()[idx[1]] = 9.0;
        assert_eq!(m.get(1, 1), 9.0);
    }

    #[test]
    fn test_clear_row() {
        let mut m = tridiag(3);
        m.clear_row(1);
        assert_eq!(m.get(1, 0), 0.0);
        assert_eq!(m.get(1, 1), 0.0);
        assert_eq!(m.get(1, 2), 0.0);
        // 其他行不受影响
        assert_eq!(m.get(0, 0), 2.0);
    }

    #[test]
    fn test_is_symmetric() {
        let m = tridiag(4);
        assert!(m.is_symmetric(1e-14));

        let mut builder = CsrBuilder::new_square(2);
        builder.set(0, 0, 1.0);
        builder.set(0, 1, 3.0);
        builder.set(1, 0, -3.0);
        builder.set(1, 1, 1.0);
        assert!(!builder.build().is_symmetric(1e-14));
    }

    #[test]
    fn test_clear_values_keeps_pattern() {
        let mut m = tridiag(3);
        m.clear_values();
        assert_eq!(m.nnz(), 7);
        assert_eq!(m.get(0, 1), 0.0);
    }
}
