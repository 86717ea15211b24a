//! Roll Spline 求解器
//!
//! 一串带方向的控制点构成分段四点贝塞尔，每段切线长度为控制点 x 缩放的 2.5 倍。
//! 沿曲线取参数 u 处的位置，x 轴沿切线，y 轴由相邻父级旋转 slerp 后再绕 x 轴滚转。
//!
//! 三种重采样模式：
//! - None: 直接用段内参数求贝塞尔
//! - Chord: 段内按弧长重采样
//! - Absolute: 整条曲线按弧长重采样，u 为全局弧长比例

use glam::{DMat4, DQuat, DVec3};

use crate::config::get_config;
use crate::error::{Result, RigError};
use crate::math::{
    bezier4point, degrees_to_radians, lerp, lerp_vec3, quaternion_from_axes, slerp,
    ArcLengthTable,
};
use crate::node::{Plug, RigNode, Value, SINGLE_OUTPUT};
use crate::transform::{to_output_space, Pose};

/// 切线长度相对 x 缩放的倍数
const TANGENT_LENGTH: f64 = 2.5;

/// 重采样最少细分
const MIN_SUBDIV: usize = 3;

/// 重采样模式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Resample {
    #[default]
    None,
    /// 段内弧长
    Chord,
    /// 全局弧长
    Absolute,
}

impl Resample {
    /// 由 resample / absolute 两个开关得到模式
    pub fn from_flags(resample: bool, absolute: bool) -> Self {
        match (resample, absolute) {
            (false, _) => Self::None,
            (true, false) => Self::Chord,
            (true, true) => Self::Absolute,
        }
    }
}

/// 控制点
#[derive(Clone, Debug, PartialEq)]
pub struct RollSplineControl {
    pub position: DVec3,
    /// 贝塞尔切线（世界空间，长度 = x 缩放 × 2.5）
    pub tangent: DVec3,
    /// 取自控制点父级的旋转
    pub rotation: DQuat,
    pub scale: DVec3,
    /// 滚转（弧度）
    pub roll: f64,
}

impl RollSplineControl {
    /// 从父级矩阵、控制点矩阵和滚转角度（角度制）构造
    pub fn from_matrices(parent_world: DMat4, input_world: DMat4, roll_degrees: f64) -> Self {
        let parent = Pose::from_matrix(parent_world);
        let input = Pose::from_matrix(input_world);

        Self {
            position: input.translation,
            tangent: input.rotation * DVec3::new(input.scale.x * TANGENT_LENGTH, 0.0, 0.0),
            rotation: parent.rotation,
            scale: input.scale,
            roll: degrees_to_radians(roll_degrees),
        }
    }
}

/// 从三个并行数组构造控制点，长度不一致时报错
pub fn controls_from_inputs(
    parents: &[DMat4],
    inputs: &[DMat4],
    rolls_degrees: &[f64],
) -> Result<Vec<RollSplineControl>> {
    let count = parents.len();
    if inputs.len() != count {
        return Err(RigError::LengthMismatch {
            what: "rollSplineKine.inputs",
            expected: count,
            found: inputs.len(),
        });
    }
    if rolls_degrees.len() != count {
        return Err(RigError::LengthMismatch {
            what: "rollSplineKine.inputsRoll",
            expected: count,
            found: rolls_degrees.len(),
        });
    }

    Ok(parents
        .iter()
        .zip(inputs)
        .zip(rolls_degrees)
        .map(|((p, i), r)| RollSplineControl::from_matrices(*p, *i, *r))
        .collect())
}

/// u 落在哪一段以及段内参数
fn locate_segment(count: usize, u: f64) -> (usize, f64) {
    let step = 1.0 / (count.saturating_sub(1).max(1)) as f64;
    let index = ((u / step).floor().max(0.0) as usize).min(count - 2);
    let v = (u - step * index as f64) / step;
    (index, v)
}

fn segment_bezier(controls: &[RollSplineControl], index: usize, v: f64) -> (DVec3, DVec3) {
    let c1 = &controls[index];
    let c2 = &controls[index + 1];
    bezier4point(c1.position, c1.tangent, c2.position, c2.tangent, v)
}

/// 求 u 处的世界空间 Pose
///
/// 控制点少于 2 个时报错。
pub fn evaluate_roll_spline(
    controls: &[RollSplineControl],
    u: f64,
    mode: Resample,
    subdiv: usize,
) -> Result<Pose> {
    let count = controls.len();
    if count < 2 {
        return Err(RigError::NotEnoughControls {
            what: "rollSplineKine",
            required: 2,
            found: count,
        });
    }

    let subdiv = subdiv.max(MIN_SUBDIV);
    let (index, v) = locate_segment(count, u);

    // ====== 位置与切线 ======
    let (position, tangent) = match mode {
        Resample::None => segment_bezier(controls, index, v),
        Resample::Chord => {
            let table = ArcLengthTable::build(subdiv, |s| segment_bezier(controls, index, s));
            table.locate(v).unwrap_or_else(|| {
                log::debug!("[RollSpline] zero-length segment {}, using bezier parameter", index);
                segment_bezier(controls, index, v)
            })
        }
        Resample::Absolute => {
            let table = ArcLengthTable::build(subdiv, |s| {
                let (i, sv) = locate_segment(count, s);
                segment_bezier(controls, i, sv)
            });
            table.locate(u).unwrap_or_else(|| {
                log::debug!("[RollSpline] zero-length spline, using bezier parameter");
                segment_bezier(controls, index, v)
            })
        }
    };
    let x_axis = tangent.normalize_or_zero();

    let c1 = &controls[index];
    let c2 = &controls[index + 1];

    // ====== 缩放 ======
    let scale = lerp_vec3(c1.scale, c2.scale, v);

    // ====== 旋转 ======
    let q = slerp(c1.rotation, c2.rotation, v);
    let mut y_axis = q * DVec3::Y;

    let roll = lerp(c1.roll, c2.roll, v);
    if x_axis != DVec3::ZERO {
        y_axis = DQuat::from_axis_angle(x_axis, roll) * y_axis;
    }

    let z_axis = x_axis.cross(y_axis).normalize_or_zero();
    let y_axis = z_axis.cross(x_axis).normalize_or_zero();

    Ok(Pose::from_trs(
        position,
        quaternion_from_axes(x_axis, y_axis, z_axis),
        scale,
    ))
}

// ============================================================================
// 节点
// ============================================================================

/// Roll Spline 节点
#[derive(Clone, Debug)]
pub struct RollSplineKine {
    /// 控制点父级（提供旋转）
    pub ctl_parent: Vec<DMat4>,
    /// 控制点（提供位置、切线、缩放）
    pub inputs: Vec<DMat4>,
    /// 每个控制点的滚转（角度）
    pub inputs_roll: Vec<f64>,
    pub output_parent: DMat4,
    /// [0, 1]
    pub u: f64,
    pub resample: bool,
    pub subdiv: usize,
    pub absolute: bool,
}

impl Default for RollSplineKine {
    fn default() -> Self {
        Self {
            ctl_parent: Vec::new(),
            inputs: Vec::new(),
            inputs_roll: Vec::new(),
            output_parent: DMat4::IDENTITY,
            u: 0.0,
            resample: false,
            subdiv: get_config().default_subdiv,
            absolute: false,
        }
    }
}

impl RollSplineKine {
    /// 求值，返回输出父级空间中的矩阵
    pub fn evaluate(&self) -> Result<DMat4> {
        let controls = controls_from_inputs(&self.ctl_parent, &self.inputs, &self.inputs_roll)
            .inspect_err(|e| log::warn!("[RollSpline] malformed input: {}", e))?;

        let mode = Resample::from_flags(self.resample, self.absolute);
        let pose = evaluate_roll_spline(&controls, self.u, mode, self.subdiv)?;
        Ok(to_output_space(pose.to_matrix(), self.output_parent))
    }
}

impl RigNode for RollSplineKine {
    const NODE_TYPE: &'static str = "mgear_rollSplineKine";

    fn outputs(&self) -> &'static [Plug] {
        SINGLE_OUTPUT
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Matrix(self.evaluate()?))
    }
}
