// crates/gf_physics/src/constraint.rs

//! 约束登记
//!
//! 将固定值与布尔选择掩码配对登记到场上，组装时作为
//! Dirichlet 型边界条件施加。
//!
//! 约束只增不删，在场的生命周期内累积。重叠选择按登记顺序
//! 后写覆盖（last-write-wins）：逐实体掩码天然允许交叠
//! （如角点面同时被底边与左边选中），施加顺序即为契约。

use gf_foundation::{GfError, GfResult};
use gf_mesh::FvMesh;
use serde::{Deserialize, Serialize};

/// 约束值
///
/// 标量广播到全部选中实体；逐实体数组按实体索引取值
/// （长度必须等于实体总数）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConstraintValue {
    /// 标量值
    Scalar(f64),
    /// 逐实体数组
    PerEntity(Vec<f64>),
}

impl From<f64> for ConstraintValue {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<Vec<f64>> for ConstraintValue {
    fn from(v: Vec<f64>) -> Self {
        Self::PerEntity(v)
    }
}

impl ConstraintValue {
    /// 取实体处的值
    #[inline]
    pub fn at(&self, entity: usize) -> f64 {
        match self {
            Self::Scalar(v) => *v,
            Self::PerEntity(vs) => vs[entity],
        }
    }
}

/// 选择掩码
///
/// 布尔向量长度必须分别等于面数/单元数。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Selector {
    /// 面选择（边界条件）
    Faces(Vec<bool>),
    /// 单元选择（内部固定值）
    Cells(Vec<bool>),
}

/// 单条约束：固定值 + 选择掩码
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    /// 固定值
    pub value: ConstraintValue,
    /// 选择掩码
    pub selector: Selector,
}

/// 约束集合
///
/// 按登记顺序保存；无删除接口。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintSet {
    items: Vec<Constraint>,
}

impl ConstraintSet {
    /// 创建空集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一条约束
    pub fn constrain(&mut self, value: impl Into<ConstraintValue>, selector: Selector) {
        self.items.push(Constraint {
            value: value.into(),
            selector,
        });
    }

    /// 约束条数
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 迭代约束（登记顺序）
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.items.iter()
    }

    /// 校验所有掩码与数组长度和网格一致
    pub fn validate(&self, mesh: &FvMesh) -> GfResult<()> {
        for c in &self.items {
            match &c.selector {
                Selector::Faces(mask) => {
                    GfError::check_size("face_mask", mesh.n_faces(), mask.len())?;
                    if let ConstraintValue::PerEntity(vs) = &c.value {
                        GfError::check_size("face_values", mesh.n_faces(), vs.len())?;
                    }
                }
                Selector::Cells(mask) => {
                    GfError::check_size("cell_mask", mesh.n_cells(), mask.len())?;
                    if let ConstraintValue::PerEntity(vs) = &c.value {
                        GfError::check_size("cell_values", mesh.n_cells(), vs.len())?;
                    }
                }
            }
        }
        Ok(())
    }

    /// 解析面约束为逐面的固定值（后写覆盖）
    pub fn resolve_face_values(&self, n_faces: usize) -> Vec<Option<f64>> {
        let mut out = vec![None; n_faces];
        for c in &self.items {
            if let Selector::Faces(mask) = &c.selector {
                for (f, &selected) in mask.iter().enumerate() {
                    if selected {
                        out[f] = Some(c.value.at(f));
                    }
                }
            }
        }
        out
    }

    /// 解析单元约束为逐单元的固定值（后写覆盖）
    pub fn resolve_cell_values(&self, n_cells: usize) -> Vec<Option<f64>> {
        let mut out = vec![None; n_cells];
        for c in &self.items {
            if let Selector::Cells(mask) = &c.selector {
                for (i, &selected) in mask.iter().enumerate() {
                    if selected {
                        out[i] = Some(c.value.at(i));
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gf_mesh::RectGrid;

    #[test]
    fn test_constrain_accumulates() {
        let mut set = ConstraintSet::new();
        assert!(set.is_empty());
        set.constrain(1.0, Selector::Faces(vec![true, false]));
        set.constrain(2.0, Selector::Cells(vec![false]));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_resolve_last_write_wins() {
        let mut set = ConstraintSet::new();
        set.constrain(1.0, Selector::Faces(vec![true, true, false]));
        set.constrain(5.0, Selector::Faces(vec![false, true, false]));

        let resolved = set.resolve_face_values(3);
        assert_eq!(resolved[0], Some(1.0));
        assert_eq!(resolved[1], Some(5.0));
        assert_eq!(resolved[2], None);
    }

    #[test]
    fn test_per_entity_value() {
        let mut set = ConstraintSet::new();
        set.constrain(
            vec![10.0, 20.0, 30.0],
            Selector::Faces(vec![false, true, true]),
        );
        let resolved = set.resolve_face_values(3);
        assert_eq!(resolved[0], None);
        assert_eq!(resolved[1], Some(20.0));
        assert_eq!(resolved[2], Some(30.0));
    }

    #[test]
    fn test_validate_sizes() {
        let mesh = RectGrid::new(2, 2, 1.0, 1.0).build().unwrap();
        let mut set = ConstraintSet::new();
        set.constrain(0.0, Selector::Faces(mesh.faces_bottom()));
        assert!(set.validate(&mesh).is_ok());

        let mut bad = ConstraintSet::new();
        bad.constrain(0.0, Selector::Faces(vec![true; 3]));
        assert!(bad.validate(&mesh).is_err());

        let mut bad_vals = ConstraintSet::new();
        bad_vals.constrain(vec![1.0; 2], Selector::Cells(vec![true; 4]));
        assert!(bad_vals.validate(&mesh).is_err());
    }

    #[test]
    fn test_resolve_cells() {
        let mut set = ConstraintSet::new();
        set.constrain(7.0, Selector::Cells(vec![false, true, false, true]));
        let resolved = set.resolve_cell_values(4);
        assert_eq!(resolved[1], Some(7.0));
        assert_eq!(resolved[3], Some(7.0));
        assert_eq!(resolved[0], None);
    }
}
