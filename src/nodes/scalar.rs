//! 标量/向量小节点
//!
//! 全部是单输出的纯函数节点。

use glam::DVec3;

use crate::error::{Result, RigError};
use crate::math::{clamp, euler_to_quat, lerp_vec3, slerp_safe};
use crate::node::{Plug, RigNode, Value, SINGLE_OUTPUT};

/// 缩放下限，避免零缩放导致矩阵不可逆
const MIN_SCALE: f64 = 1.0e-4;

// ============================================================================
// Add10Scalar
// ============================================================================

/// 十个标量求和
#[derive(Clone, Debug, Default)]
pub struct Add10Scalar {
    pub values: [f64; 10],
}

impl Add10Scalar {
    pub fn evaluate(&self) -> f64 {
        self.values.iter().sum()
    }
}

impl RigNode for Add10Scalar {
    const NODE_TYPE: &'static str = "mgear_add10scalar";

    fn outputs(&self) -> &'static [Plug] {
        SINGLE_OUTPUT
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Scalar(self.evaluate()))
    }
}

// ============================================================================
// LinearInterpolate3DVector
// ============================================================================

/// 两个向量线性插值
#[derive(Clone, Debug, Default)]
pub struct LinearInterpolate3DVector {
    pub vec_a: DVec3,
    pub vec_b: DVec3,
    pub blend: f64,
}

impl LinearInterpolate3DVector {
    pub fn evaluate(&self) -> DVec3 {
        self.vec_b * self.blend + self.vec_a * (1.0 - self.blend)
    }
}

impl RigNode for LinearInterpolate3DVector {
    const NODE_TYPE: &'static str = "mgear_linearInterpolate3Dvector";

    fn outputs(&self) -> &'static [Plug] {
        SINGLE_OUTPUT
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Vector(self.evaluate()))
    }
}

// ============================================================================
// InverseRotOrder
// ============================================================================

/// 旋转顺序的逆序
///
/// 顺序编号：xyz=0, yzx=1, zxy=2, xzy=3, yxz=4, zyx=5
#[derive(Clone, Debug, Default)]
pub struct InverseRotOrder {
    pub rot_order: i32,
}

const INVERSE_ROT_ORDER: [i32; 6] = [5, 3, 4, 1, 2, 0];

impl InverseRotOrder {
    pub fn evaluate(&self) -> Result<i32> {
        usize::try_from(self.rot_order)
            .ok()
            .and_then(|i| INVERSE_ROT_ORDER.get(i).copied())
            .ok_or(RigError::InvalidEnum {
                what: "rotOrder",
                value: self.rot_order,
            })
    }
}

impl RigNode for InverseRotOrder {
    const NODE_TYPE: &'static str = "mgear_inverseRotOrder";

    fn outputs(&self) -> &'static [Plug] {
        SINGLE_OUTPUT
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Int(self.evaluate()?))
    }
}

// ============================================================================
// TrigonometryAngle
// ============================================================================

/// 三角函数：0 = sin，其它 = cos
#[derive(Clone, Debug, Default)]
pub struct TrigonometryAngle {
    pub operation: i32,
    /// 弧度
    pub angle: f64,
}

impl TrigonometryAngle {
    pub fn evaluate(&self) -> f64 {
        if self.operation == 0 {
            self.angle.sin()
        } else {
            self.angle.cos()
        }
    }
}

impl RigNode for TrigonometryAngle {
    const NODE_TYPE: &'static str = "mgear_trigonometryAngle";

    fn outputs(&self) -> &'static [Plug] {
        SINGLE_OUTPUT
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Scalar(self.evaluate()))
    }
}

// ============================================================================
// SquashStretch2
// ============================================================================

/// 挤压拉伸
///
/// driver 高于 ctr 时按 stretch 缩放，低于 ctr 时按 squash 缩放，
/// 作用在 `axis` 以外的两个轴上。
#[derive(Clone, Debug)]
pub struct SquashStretch2 {
    pub global_scale: DVec3,
    pub blend: f64,
    pub driver: f64,
    pub driver_min: f64,
    pub driver_ctr: f64,
    pub driver_max: f64,
    /// 0 = x, 1 = y, 2 = z
    pub axis: i32,
    pub squash: f64,
    pub stretch: f64,
}

impl Default for SquashStretch2 {
    fn default() -> Self {
        Self {
            global_scale: DVec3::ONE,
            blend: 1.0,
            driver: 3.0,
            driver_min: 1.0,
            driver_ctr: 3.0,
            driver_max: 6.0,
            axis: 0,
            squash: 0.5,
            stretch: -0.5,
        }
    }
}

impl SquashStretch2 {
    pub fn evaluate(&self) -> Result<DVec3> {
        if !(0..3).contains(&self.axis) {
            return Err(RigError::InvalidEnum {
                what: "axis",
                value: self.axis,
            });
        }

        let st = self.stretch
            * clamp(
                (self.driver - self.driver_ctr).max(0.0) / (self.driver_max - self.driver_ctr).max(MIN_SCALE),
                0.0,
                1.0,
            );
        let sq = self.squash
            * clamp(
                (self.driver_ctr - self.driver).max(0.0) / (self.driver_ctr - self.driver_min).max(MIN_SCALE),
                0.0,
                1.0,
            );

        let factor = (1.0 + sq + st).max(0.0);
        let mut scale = self.global_scale;
        for i in 0..3 {
            if i as i32 != self.axis {
                scale[i] *= factor;
            }
        }

        let scale = lerp_vec3(self.global_scale, scale, self.blend);
        Ok(scale.max(DVec3::splat(MIN_SCALE)))
    }
}

impl RigNode for SquashStretch2 {
    const NODE_TYPE: &'static str = "mgear_squashStretch2";

    fn outputs(&self) -> &'static [Plug] {
        SINGLE_OUTPUT
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Vector(self.evaluate()?))
    }
}

// ============================================================================
// SpinePointAt
// ============================================================================

/// 脊柱指向
///
/// 两组欧拉角（角度）转成四元数后 slerp，用结果转动一个带符号的坐标轴。
#[derive(Clone, Debug)]
pub struct SpinePointAt {
    /// 角度
    pub rot_a: DVec3,
    /// 角度
    pub rot_b: DVec3,
    /// 0..5 = X, Y, Z, -X, -Y, -Z
    pub axe: i32,
    pub blend: f64,
}

impl Default for SpinePointAt {
    fn default() -> Self {
        Self {
            rot_a: DVec3::ZERO,
            rot_b: DVec3::ZERO,
            axe: 2,
            blend: 0.5,
        }
    }
}

fn signed_axis(axe: i32) -> Option<DVec3> {
    match axe {
        0 => Some(DVec3::X),
        1 => Some(DVec3::Y),
        2 => Some(DVec3::Z),
        3 => Some(DVec3::NEG_X),
        4 => Some(DVec3::NEG_Y),
        5 => Some(DVec3::NEG_Z),
        _ => None,
    }
}

impl SpinePointAt {
    pub fn evaluate(&self) -> Result<DVec3> {
        let axis = signed_axis(self.axe).ok_or(RigError::InvalidEnum {
            what: "axe",
            value: self.axe,
        })?;

        let qa = euler_to_quat(self.rot_a.x, self.rot_a.y, self.rot_a.z);
        let qb = euler_to_quat(self.rot_b.x, self.rot_b.y, self.rot_b.z);
        let qc = slerp_safe(qa, qb, self.blend);

        Ok(qc * axis)
    }
}

impl RigNode for SpinePointAt {
    const NODE_TYPE: &'static str = "mgear_spinePointAt";

    fn outputs(&self) -> &'static [Plug] {
        SINGLE_OUTPUT
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Vector(self.evaluate()?))
    }
}
