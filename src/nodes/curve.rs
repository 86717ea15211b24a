//! 曲线相关节点
//!
//! 曲线本身由宿主提供，这里只通过 `Curve` trait 的小接口查询。
//! 三次曲线的参数域为 [0, cv_count - 3]。

use std::sync::Arc;

use glam::{DMat4, DVec3};

use crate::config::get_config;
use crate::error::{Result, RigError};
use crate::math::{find_closest_in_array, lerp, normalized_u_to_u, set01range, u_to_normalized_u};
use crate::node::{Plug, RigNode, Value, SINGLE_OUTPUT};

/// 宿主曲线（世界空间）
pub trait Curve: Send + Sync {
    /// 控制点数量
    fn cv_count(&self) -> usize;
    /// 参数处的位置
    fn point_at_param(&self, u: f64) -> DVec3;
    /// 参数处的切线（不要求单位长度）
    fn tangent_at_param(&self, u: f64) -> DVec3;
    /// 曲线总长
    fn length(&self) -> f64;
    /// 从起点沿曲线走过 `length` 对应的参数
    fn param_from_length(&self, length: f64) -> f64;
}

/// 共享的曲线句柄
pub type CurveHandle = Arc<dyn Curve>;

fn polyline_length(points: &[DVec3]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).length()).sum()
}

// ============================================================================
// PercentageToU
// ============================================================================

/// 弧长百分比 → 曲线参数
#[derive(Clone)]
pub struct PercentageToU {
    pub curve: Option<CurveHandle>,
    pub normalized_u: bool,
    /// 百分比（0..100）
    pub percentage: f64,
    pub steps: usize,
}

impl Default for PercentageToU {
    fn default() -> Self {
        Self {
            curve: None,
            normalized_u: false,
            percentage: 0.0,
            steps: get_config().default_curve_steps,
        }
    }
}

impl PercentageToU {
    pub fn evaluate(&self) -> Result<f64> {
        let curve = self.curve.as_ref().ok_or(RigError::MissingInput("curve"))?;
        let cv_count = curve.cv_count();
        let steps = self.steps.max(2);
        let percentage = self.percentage * 0.01;

        let u_list: Vec<f64> = (0..steps)
            .map(|i| normalized_u_to_u(i as f64 / (steps as f64 - 1.0), cv_count))
            .collect();
        let positions: Vec<DVec3> = u_list.iter().map(|u| curve.point_at_param(*u)).collect();

        let total_length = polyline_length(&positions);
        if total_length <= 0.0 {
            log::debug!("[PercentageToU] zero-length curve, u = 0");
            return Ok(0.0);
        }

        let mut u_perc = Vec::with_capacity(steps);
        let mut dist = 0.0;
        u_perc.push(0.0);
        for w in positions.windows(2) {
            dist += (w[1] - w[0]).length();
            u_perc.push(dist / total_length);
        }

        let Some(index) = find_closest_in_array(percentage, &u_perc) else {
            return Ok(0.0);
        };

        // 取包含 percentage 的区间，两端钳制
        let last = steps - 1;
        let (index_a, index_b) = if percentage <= u_perc[index] {
            if index == 0 {
                (0, 1)
            } else {
                (index - 1, index)
            }
        } else if index == last {
            (last - 1, last)
        } else {
            (index, index + 1)
        };

        let (pa, pb) = (u_perc[index_a], u_perc[index_b]);
        let blend = if pb > pa {
            set01range(percentage, pa, pb)
        } else {
            0.0
        };

        let mut out_u = lerp(u_list[index_a], u_list[index_b], blend);
        if self.normalized_u {
            out_u = u_to_normalized_u(out_u, cv_count);
        }
        Ok(out_u)
    }
}

impl RigNode for PercentageToU {
    const NODE_TYPE: &'static str = "mgear_percentageToU";

    fn outputs(&self) -> &'static [Plug] {
        SINGLE_OUTPUT
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Scalar(self.evaluate()?))
    }
}

// ============================================================================
// UToPercentage
// ============================================================================

/// 曲线参数 → 弧长百分比
#[derive(Clone)]
pub struct UToPercentage {
    pub curve: Option<CurveHandle>,
    pub normalized_u: bool,
    pub u: f64,
    pub steps: usize,
}

impl Default for UToPercentage {
    fn default() -> Self {
        Self {
            curve: None,
            normalized_u: false,
            u: 0.5,
            steps: get_config().default_curve_steps,
        }
    }
}

impl UToPercentage {
    pub fn evaluate(&self) -> Result<f64> {
        let curve = self.curve.as_ref().ok_or(RigError::MissingInput("curve"))?;
        let cv_count = curve.cv_count();
        let steps = self.steps.max(2);

        let u = if self.normalized_u {
            normalized_u_to_u(self.u, cv_count)
        } else {
            self.u
        };
        let u_max = normalized_u_to_u(1.0, cv_count);

        let sample = |end: f64| -> Vec<DVec3> {
            (0..steps)
                .map(|i| curve.point_at_param(i as f64 * end / (steps as f64 - 1.0)))
                .collect()
        };

        let u_length = polyline_length(&sample(u));
        let total_length = polyline_length(&sample(u_max));
        if total_length <= 0.0 {
            log::debug!("[UToPercentage] zero-length curve, percentage = 0");
            return Ok(0.0);
        }

        Ok(u_length / total_length * 100.0)
    }
}

impl RigNode for UToPercentage {
    const NODE_TYPE: &'static str = "mgear_uToPercentage";

    fn outputs(&self) -> &'static [Plug] {
        SINGLE_OUTPUT
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Scalar(self.evaluate()?))
    }
}

// ============================================================================
// SlideCurve2
// ============================================================================

/// 沿主曲线滑动一串点（变形器）
///
/// 从曲线长度相对 master_length 的变化得到拉伸/挤压，用指数软化逼近上限。
/// 超出曲线两端的点沿端点切线外插。
#[derive(Clone)]
pub struct SlideCurve2 {
    pub master_curve: Option<CurveHandle>,
    pub master_matrix: DMat4,
    /// 被变形物体的世界矩阵
    pub deformer_matrix: DMat4,
    /// 被变形物体的点数
    pub point_count: usize,
    pub slave_length: f64,
    pub master_length: f64,
    /// [0, 1]
    pub position: f64,
    pub max_stretch: f64,
    pub max_squash: f64,
    pub softness: f64,
}

impl Default for SlideCurve2 {
    fn default() -> Self {
        Self {
            master_curve: None,
            master_matrix: DMat4::IDENTITY,
            deformer_matrix: DMat4::IDENTITY,
            point_count: 0,
            slave_length: 1.0,
            master_length: 1.0,
            position: 0.0,
            max_stretch: 1.5,
            max_squash: 0.5,
            softness: 0.5,
        }
    }
}

impl SlideCurve2 {
    /// 拉伸/挤压后的从属长度
    fn effective_slave_length(&self, curve_length: f64) -> f64 {
        let sl = self.slave_length;
        let ml = self.master_length;
        let mut expo = 1.0;

        if curve_length > ml && self.max_stretch > 1.0 {
            if self.softness != 0.0 {
                let stretch = (curve_length - ml) / (sl * self.max_stretch);
                expo = 1.0 - (-stretch / self.softness).exp();
            }
            let ext = (sl * (self.max_stretch - 1.0) * expo).min(curve_length - ml);
            sl + ext
        } else if curve_length < ml && self.max_squash < 1.0 {
            if self.softness != 0.0 {
                let squash = (ml - curve_length) / (sl * self.max_squash);
                expo = 1.0 - (-squash / self.softness).exp();
            }
            let ext = (sl * (1.0 - self.max_squash) * expo).min(ml - curve_length);
            sl - ext
        } else {
            sl
        }
    }

    pub fn evaluate(&self) -> Result<Vec<DVec3>> {
        let curve = self
            .master_curve
            .as_ref()
            .ok_or(RigError::MissingInput("master_crv"))?;

        let to_output = self.master_matrix * self.deformer_matrix.inverse();
        let curve_length = curve.length();
        let u_end = normalized_u_to_u(1.0, curve.cv_count());

        if curve_length <= 0.0 {
            log::debug!("[SlideCurve2] zero-length master curve, collapsing points");
            let p = to_output.transform_point3(curve.point_at_param(0.0));
            return Ok(vec![p; self.point_count]);
        }

        let sl = self.effective_slave_length(curve_length);
        let size = sl / curve_length;
        let start = self.position * (1.0 - size);
        let end = start + size;
        let step = if self.point_count > 1 {
            (end - start) / (self.point_count as f64 - 1.0)
        } else {
            0.0
        };

        let points = (0..self.point_count)
            .map(|i| {
                let perc = start + i as f64 * step;
                let pt = if (0.0..=1.0).contains(&perc) {
                    curve.point_at_param(curve.param_from_length(perc * curve_length))
                } else {
                    // 沿端点切线外插
                    let (u, over) = if perc < 0.0 { (0.0, perc) } else { (u_end, perc - 1.0) };
                    let tangent = curve.tangent_at_param(u).normalize_or_zero();
                    curve.point_at_param(u) + tangent * curve_length * over
                };
                to_output.transform_point3(pt)
            })
            .collect();

        Ok(points)
    }
}

impl RigNode for SlideCurve2 {
    const NODE_TYPE: &'static str = "mgear_slideCurve2";

    fn outputs(&self) -> &'static [Plug] {
        &[Plug::OutputGeometry]
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Points(self.evaluate()?))
    }
}

// ============================================================================
// CurveCns
// ============================================================================

/// 每个点跟随对应输入矩阵的平移（变形器）
///
/// 输入矩阵比点少时，多出的点保持原位。
#[derive(Clone, Debug)]
pub struct CurveCns {
    pub inputs: Vec<DMat4>,
    pub deformer_matrix: DMat4,
    /// 被变形物体的原始点（局部空间）
    pub points: Vec<DVec3>,
}

impl Default for CurveCns {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            deformer_matrix: DMat4::IDENTITY,
            points: Vec::new(),
        }
    }
}

impl CurveCns {
    pub fn evaluate(&self) -> Vec<DVec3> {
        let inverse = self.deformer_matrix.inverse();
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| match self.inputs.get(i) {
                Some(m) => (inverse * *m).w_axis.truncate(),
                None => *p,
            })
            .collect()
    }
}

impl RigNode for CurveCns {
    const NODE_TYPE: &'static str = "mgear_curveCns";

    fn outputs(&self) -> &'static [Plug] {
        &[Plug::OutputGeometry]
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Points(self.evaluate()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 直线曲线：参数在 [0, cv_count - 3] 上均匀
    struct LineCurve {
        pub start: DVec3,
        pub end: DVec3,
        pub cv_count: usize,
    }

    impl LineCurve {
        fn span(&self) -> f64 {
            self.cv_count as f64 - 3.0
        }
    }

    impl Curve for LineCurve {
        fn cv_count(&self) -> usize {
            self.cv_count
        }

        fn point_at_param(&self, u: f64) -> DVec3 {
            self.start + (self.end - self.start) * (u / self.span())
        }

        fn tangent_at_param(&self, _u: f64) -> DVec3 {
            self.end - self.start
        }

        fn length(&self) -> f64 {
            (self.end - self.start).length()
        }

        fn param_from_length(&self, length: f64) -> f64 {
            length / self.length() * self.span()
        }
    }

    fn line(length: f64) -> CurveHandle {
        Arc::new(LineCurve {
            start: DVec3::ZERO,
            end: DVec3::new(length, 0.0, 0.0),
            cv_count: 6,
        })
    }

    const EPS: f64 = 1e-9;

    #[test]
    fn test_percentage_to_u() {
        let mut node = PercentageToU {
            curve: Some(line(10.0)),
            percentage: 25.0,
            ..PercentageToU::default()
        };
        assert!((node.evaluate().unwrap() - 0.75).abs() < EPS);

        node.normalized_u = true;
        assert!((node.evaluate().unwrap() - 0.25).abs() < EPS);

        node.percentage = 100.0;
        assert!((node.evaluate().unwrap() - 1.0).abs() < EPS);
        node.percentage = 0.0;
        assert!(node.evaluate().unwrap().abs() < EPS);
    }

    #[test]
    fn test_u_to_percentage() {
        let node = UToPercentage {
            curve: Some(line(10.0)),
            u: 1.5,
            ..UToPercentage::default()
        };
        assert!((node.evaluate().unwrap() - 50.0).abs() < EPS);

        let node = UToPercentage {
            curve: Some(line(10.0)),
            u: 0.2,
            normalized_u: true,
            ..UToPercentage::default()
        };
        assert!((node.evaluate().unwrap() - 20.0).abs() < EPS);
    }

    #[test]
    fn test_percentage_round_trip() {
        let curve = line(7.0);
        for p in [5.0, 33.0, 61.0, 90.0] {
            let u = PercentageToU {
                curve: Some(curve.clone()),
                percentage: p,
                ..PercentageToU::default()
            }
            .evaluate()
            .unwrap();
            let back = UToPercentage {
                curve: Some(curve.clone()),
                u,
                ..UToPercentage::default()
            }
            .evaluate()
            .unwrap();
            assert!((back - p).abs() < 1e-6);
        }
    }

    #[test]
    fn test_missing_curve() {
        assert_eq!(
            PercentageToU::default().evaluate(),
            Err(RigError::MissingInput("curve"))
        );
    }

    #[test]
    fn test_slide_curve_rest() {
        // 曲线长度等于 master_length，不拉伸
        let node = SlideCurve2 {
            master_curve: Some(line(10.0)),
            point_count: 3,
            slave_length: 4.0,
            master_length: 10.0,
            position: 0.5,
            ..SlideCurve2::default()
        };
        let points = node.evaluate().unwrap();
        assert_eq!(points.len(), 3);
        assert!((points[0].x - 3.0).abs() < EPS);
        assert!((points[1].x - 5.0).abs() < EPS);
        assert!((points[2].x - 7.0).abs() < EPS);
    }

    #[test]
    fn test_slide_curve_stretch_hard_limit() {
        // softness 0：拉伸量 = min(sl * (maxstretch - 1), 曲线增长量)
        let node = SlideCurve2 {
            master_curve: Some(line(20.0)),
            point_count: 2,
            slave_length: 4.0,
            master_length: 10.0,
            softness: 0.0,
            max_stretch: 1.5,
            ..SlideCurve2::default()
        };
        assert!((node.effective_slave_length(20.0) - 6.0).abs() < EPS);
        let points = node.evaluate().unwrap();
        assert!((points[1].x - points[0].x - 6.0).abs() < EPS);
    }

    #[test]
    fn test_slide_curve_extrapolates() {
        let node = SlideCurve2 {
            master_curve: Some(line(10.0)),
            point_count: 2,
            slave_length: 20.0,
            master_length: 10.0,
            position: 0.5,
            ..SlideCurve2::default()
        };
        // size = 2，start = -0.5，end = 1.5
        let points = node.evaluate().unwrap();
        assert!((points[0].x + 5.0).abs() < EPS);
        assert!((points[1].x - 15.0).abs() < EPS);
    }

    #[test]
    fn test_curve_cns() {
        let node = CurveCns {
            inputs: vec![
                DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0)),
                DMat4::from_translation(DVec3::new(4.0, 5.0, 6.0)),
            ],
            deformer_matrix: DMat4::from_translation(DVec3::new(1.0, 0.0, 0.0)),
            points: vec![DVec3::ZERO, DVec3::ZERO, DVec3::splat(9.0)],
        };
        let points = node.evaluate();
        assert_eq!(points[0], DVec3::new(0.0, 2.0, 3.0));
        assert_eq!(points[1], DVec3::new(3.0, 5.0, 6.0));
        assert_eq!(points[2], DVec3::splat(9.0));
    }
}
