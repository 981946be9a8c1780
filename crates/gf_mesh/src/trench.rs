// crates/gf_mesh/src/trench.rs

//! 沟槽网格
//!
//! 以沟槽工艺参数（深度、间距、纵横比、边界层深度、锥角）重铸
//! 复合网格参数，并在构造时对每个单元计算一次电解液掩码：
//! 单元位于刻蚀腔体内或其上方为电解液，位于金属侧壁/底部为固体。

use crate::composite::{CompositeMesh, CompositeParams};
use crate::generator::MeshGenerator;
use crate::mesh::FvMesh;
use gf_foundation::{GfError, GfResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 沟槽网格构造参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrenchParams {
    /// 沟槽深度
    pub trench_depth: f64,
    /// 沟槽间距（相邻沟槽中心距）
    pub trench_spacing: f64,
    /// 水动力边界层深度
    pub boundary_layer_depth: f64,
    /// 细化区单元尺寸
    pub cell_size: f64,
    /// 纵横比（深度 / 宽度）
    pub aspect_ratio: f64,
    /// 侧壁锥角 [rad]，0 为竖直侧壁
    pub angle: f64,
}

/// 沟槽网格
///
/// 复合网格加上派生的单元电解液掩码（构造时计算一次）。
#[derive(Debug, Clone)]
pub struct TrenchMesh {
    composite: CompositeMesh,
    electrolyte_mask: Vec<bool>,
    /// 沟槽底面以下的高度（`10 * cell_size`）
    height_below_trench: f64,
    /// 沟槽宽度（`depth / aspect_ratio`）
    trench_width: f64,
}

impl TrenchMesh {
    /// 构造沟槽网格
    ///
    /// 参数重铸规则：
    /// - 细化区高度 = 槽下高度 + 槽深 + 槽上高度（槽上高度取槽深）
    /// - 过渡区高度 = 细化区高度 × 3
    /// - 域宽 = 沟槽间距 / 2（对称半胞）
    /// - 域高 = 槽下高度 + 槽深 + 边界层深度
    pub fn build(params: &TrenchParams, generator: &dyn MeshGenerator) -> GfResult<Self> {
        GfError::check_positive("trench_depth", params.trench_depth)?;
        GfError::check_positive("trench_spacing", params.trench_spacing)?;
        GfError::check_positive("boundary_layer_depth", params.boundary_layer_depth)?;
        GfError::check_positive("cell_size", params.cell_size)?;
        GfError::check_positive("aspect_ratio", params.aspect_ratio)?;

        let height_below_trench = 10.0 * params.cell_size;
        let height_above_trench = params.trench_depth;
        let fine_region_height =
            height_below_trench + params.trench_depth + height_above_trench;
        let transition_region_height = fine_region_height * 3.0;
        let domain_width = params.trench_spacing / 2.0;
        let domain_height =
            height_below_trench + params.trench_depth + params.boundary_layer_depth;

        let composite = CompositeMesh::build(
            &CompositeParams {
                cell_size: params.cell_size,
                domain_width,
                domain_height,
                fine_region_height,
                transition_region_height,
            },
            generator,
        )?;

        let trench_width = params.trench_depth / params.aspect_ratio;
        let trench_top = params.trench_depth + height_below_trench;
        let trench_mid = height_below_trench + params.trench_depth / 2.0;
        let tan_angle = params.angle.tan();

        // 三层嵌套判定: 槽顶以上为电解液, 槽底以下为金属,
        // 槽内按锥角修正的半宽判定侧壁
        let electrolyte_mask = composite
            .mesh()
            .cell_center
            .iter()
            .map(|c| {
                if c.y > trench_top {
                    true
                } else if c.y < height_below_trench {
                    false
                } else {
                    let taper = tan_angle * (c.y - trench_mid);
                    c.x <= trench_width / 2.0 + taper
                }
            })
            .collect();

        Ok(Self {
            composite,
            electrolyte_mask,
            height_below_trench,
            trench_width,
        })
    }

    /// 复合网格
    #[inline]
    pub fn composite(&self) -> &CompositeMesh {
        &self.composite
    }

    /// 合并后的统一网格
    #[inline]
    pub fn mesh(&self) -> &FvMesh {
        self.composite.mesh()
    }

    /// 合并网格的共享句柄
    #[inline]
    pub fn shared_mesh(&self) -> Arc<FvMesh> {
        self.composite.shared_mesh()
    }

    /// 单元电解液掩码（true = 电解液, false = 金属）
    #[inline]
    pub fn electrolyte_mask(&self) -> &[bool] {
        &self.electrolyte_mask
    }

    /// 沟槽底面以下高度
    #[inline]
    pub fn height_below_trench(&self) -> f64 {
        self.height_below_trench
    }

    /// 沟槽宽度
    #[inline]
    pub fn trench_width(&self) -> f64 {
        self.trench_width
    }
}
