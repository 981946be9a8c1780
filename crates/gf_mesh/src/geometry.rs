// crates/gf_mesh/src/geometry.rs

//! 几何原语
//!
//! 基于节点坐标与单元-节点连接关系的纯几何计算：
//! 单元面积/形心（鞋带公式）、面长度/中心/法向/切向。
//!
//! 所有量在网格构造时计算一次并缓存，场更新不会触发重算。

use glam::DVec2;

/// 多边形有向面积（鞋带公式）
///
/// 逆时针顶点序返回正值。退化多边形（少于 3 个顶点）返回 0。
pub fn polygon_area(points: &[DVec2]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        twice += p.x * q.y - q.x * p.y;
    }
    0.5 * twice
}

/// 多边形形心
///
/// 使用面积加权公式。面积接近零时退化为顶点算术平均。
pub fn polygon_centroid(points: &[DVec2]) -> DVec2 {
    let area = polygon_area(points);
    if area.abs() < 1e-300 {
        let sum: DVec2 = points.iter().copied().sum();
        return sum / points.len().max(1) as f64;
    }
    let mut c = DVec2::ZERO;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        let cross = p.x * q.y - q.x * p.y;
        c += (p + q) * cross;
    }
    c / (6.0 * area)
}

/// 面几何量
///
/// `normal` 为单位外法向（相对于按逆时针遍历该边的单元），
/// `tangent` 为沿遍历方向的单位切向，两者正交。
#[derive(Debug, Clone, Copy)]
pub struct FaceGeometry {
    /// 面中心
    pub center: DVec2,
    /// 面长度
    pub length: f64,
    /// 单位外法向
    pub normal: DVec2,
    /// 单位切向
    pub tangent: DVec2,
}

/// 计算一条边（2D 面）的几何量
///
/// `a`、`b` 为 owner 单元逆时针遍历顺序下的端点。
/// 对逆时针多边形，`(e.y, -e.x)` 指向多边形外侧。
/// 长度为零的退化边返回 `None`，由调用方转换为几何错误。
pub fn face_geometry(a: DVec2, b: DVec2) -> Option<FaceGeometry> {
    let e = b - a;
    let length = e.length();
    if length <= 0.0 || !length.is_finite() {
        return None;
    }
    let tangent = e / length;
    let normal = DVec2::new(tangent.y, -tangent.x);
    Some(FaceGeometry {
        center: 0.5 * (a + b),
        length,
        normal,
        tangent,
    })
}
