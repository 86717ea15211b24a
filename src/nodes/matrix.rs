//! 矩阵节点：乘法、插值、矩阵约束
//!
//! 矩阵为 glam 列向量约定，`A ∘ B` 表示先应用 A 再应用 B，即 `B * A`。

use glam::{DMat4, DQuat, DVec3, EulerRot};

use crate::error::{Result, RigError};
use crate::math::degrees_to_radians;
use crate::node::{Plug, RigNode, Value, SINGLE_OUTPUT};
use crate::transform::{interpolate_pose, Pose};

// ============================================================================
// MulMatrix
// ============================================================================

/// 矩阵乘法：先 A 后 B
#[derive(Clone, Debug)]
pub struct MulMatrix {
    pub matrix_a: DMat4,
    pub matrix_b: DMat4,
}

impl Default for MulMatrix {
    fn default() -> Self {
        Self {
            matrix_a: DMat4::IDENTITY,
            matrix_b: DMat4::IDENTITY,
        }
    }
}

impl MulMatrix {
    pub fn evaluate(&self) -> DMat4 {
        self.matrix_b * self.matrix_a
    }
}

impl RigNode for MulMatrix {
    const NODE_TYPE: &'static str = "mgear_mulMatrix";

    fn outputs(&self) -> &'static [Plug] {
        SINGLE_OUTPUT
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Matrix(self.evaluate()))
    }
}

// ============================================================================
// InterpolateMatrix
// ============================================================================

/// 分解后插值两个矩阵（剪切不参与插值）
#[derive(Clone, Debug)]
pub struct InterpolateMatrix {
    pub matrix_a: DMat4,
    pub matrix_b: DMat4,
    pub blend: f64,
}

impl Default for InterpolateMatrix {
    fn default() -> Self {
        Self {
            matrix_a: DMat4::IDENTITY,
            matrix_b: DMat4::IDENTITY,
            blend: 0.0,
        }
    }
}

impl InterpolateMatrix {
    pub fn evaluate(&self) -> DMat4 {
        let a = Pose::from_matrix(self.matrix_a);
        let b = Pose::from_matrix(self.matrix_b);
        interpolate_pose(&a, &b, self.blend).to_matrix()
    }
}

impl RigNode for InterpolateMatrix {
    const NODE_TYPE: &'static str = "mgear_intMatrix";

    fn outputs(&self) -> &'static [Plug] {
        SINGLE_OUTPUT
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Matrix(self.evaluate()))
    }
}

// ============================================================================
// MatrixConstraint
// ============================================================================

/// 矩阵约束
///
/// 驱动矩阵先在自身空间叠加一个欧拉旋转偏移（角度，xyz 顺序），
/// 再移到被驱动物体的父级空间。旋转相对 rest 矩阵计算，可按轴缩放四元数分量。
#[derive(Clone, Debug)]
pub struct MatrixConstraint {
    pub driver_matrix: DMat4,
    /// 角度
    pub driver_rotation_offset: DVec3,
    pub driven_parent_inverse_matrix: DMat4,
    pub driven_rest_matrix: DMat4,
    pub rotation_multiplier: DVec3,
    pub scale_multiplier: DVec3,
}

impl Default for MatrixConstraint {
    fn default() -> Self {
        Self {
            driver_matrix: DMat4::IDENTITY,
            driver_rotation_offset: DVec3::ZERO,
            driven_parent_inverse_matrix: DMat4::IDENTITY,
            driven_rest_matrix: DMat4::IDENTITY,
            rotation_multiplier: DVec3::ONE,
            scale_multiplier: DVec3::ONE,
        }
    }
}

/// 矩阵约束的全部输出
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixConstraintOutput {
    pub output_matrix: DMat4,
    pub driver_offset_matrix: DMat4,
    pub translate: DVec3,
    /// xyz 欧拉角（弧度）
    pub rotate: DVec3,
    pub scale: DVec3,
    pub shear: DVec3,
}

/// 旋转 → xyz 欧拉角（x 先转）
fn quat_to_euler_xyz(q: DQuat) -> DVec3 {
    let (z, y, x) = q.to_euler(EulerRot::ZYX);
    DVec3::new(x, y, z)
}

/// xyz 欧拉角（弧度）→ 旋转
fn euler_xyz_to_quat(r: DVec3) -> DQuat {
    DQuat::from_euler(EulerRot::ZYX, r.z, r.y, r.x)
}

impl MatrixConstraint {
    pub fn evaluate(&self) -> MatrixConstraintOutput {
        // 偏移加在驱动矩阵的旋转之前
        let offset = euler_xyz_to_quat(DVec3::new(
            degrees_to_radians(self.driver_rotation_offset.x),
            degrees_to_radians(self.driver_rotation_offset.y),
            degrees_to_radians(self.driver_rotation_offset.z),
        ));
        let mut driver = Pose::from_matrix(self.driver_matrix);
        driver.rotation = (driver.rotation * offset).normalize();
        let driver_offset_matrix = driver.to_matrix();

        let mult_matrix = self.driven_parent_inverse_matrix * driver_offset_matrix;
        // 旋转相对 rest（关节朝向）单独计算
        let rotate_matrix = self.driven_rest_matrix.inverse() * mult_matrix;

        let mult = Pose::from_matrix(mult_matrix);
        let rotate = Pose::from_matrix(rotate_matrix);

        let m = self.rotation_multiplier;
        let q = rotate.rotation;
        let rotation = DQuat::from_xyzw(q.x * m.x, q.y * m.y, q.z * m.z, q.w);
        let rotation = if rotation.length_squared() > 0.0 {
            rotation.normalize()
        } else {
            DQuat::IDENTITY
        };

        let result = Pose {
            translation: mult.translation,
            rotation,
            scale: mult.scale * self.scale_multiplier,
            shear: mult.shear,
        };

        MatrixConstraintOutput {
            output_matrix: result.to_matrix(),
            driver_offset_matrix,
            translate: result.translation,
            rotate: quat_to_euler_xyz(result.rotation),
            scale: result.scale,
            shear: result.shear,
        }
    }
}

const MATRIX_CONSTRAINT_OUTPUTS: &[Plug] = &[
    Plug::Output,
    Plug::DriverOffset,
    Plug::Translate,
    Plug::Rotate,
    Plug::Scale,
    Plug::Shear,
];

impl RigNode for MatrixConstraint {
    const NODE_TYPE: &'static str = "mgear_matrixConstraint";

    fn outputs(&self) -> &'static [Plug] {
        MATRIX_CONSTRAINT_OUTPUTS
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        let out = self.evaluate();
        let value = match plug {
            Plug::Output => Value::Matrix(out.output_matrix),
            Plug::DriverOffset => Value::Matrix(out.driver_offset_matrix),
            Plug::Translate => Value::Vector(out.translate),
            Plug::Rotate => Value::Vector(out.rotate),
            Plug::Scale => Value::Vector(out.scale),
            Plug::Shear => Value::Vector(out.shear),
            _ => {
                return Err(RigError::UnknownPlug {
                    node: Self::NODE_TYPE,
                    plug,
                })
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_mul_order() {
        let node = MulMatrix {
            matrix_a: DMat4::from_translation(DVec3::new(1.0, 0.0, 0.0)),
            matrix_b: DMat4::from_rotation_z(FRAC_PI_2),
        };
        // 先平移再旋转：(1, 0, 0) → (0, 1, 0)
        let p = node.evaluate().transform_point3(DVec3::ZERO);
        assert!((p - DVec3::Y).length() < EPS);
    }

    #[test]
    fn test_interpolate_matrix() {
        let mut node = InterpolateMatrix {
            matrix_a: DMat4::IDENTITY,
            matrix_b: DMat4::from_scale_rotation_translation(
                DVec3::splat(3.0),
                DQuat::from_rotation_y(1.0),
                DVec3::new(0.0, 4.0, 0.0),
            ),
            blend: 0.5,
        };
        let pose = Pose::from_matrix(node.evaluate());
        assert!((pose.translation - DVec3::new(0.0, 2.0, 0.0)).length() < EPS);
        assert!((pose.scale - DVec3::splat(2.0)).length() < EPS);
        assert!(pose.rotation.dot(DQuat::from_rotation_y(0.5)).abs() > 1.0 - EPS);

        node.blend = 1.0;
        assert!(node.evaluate().abs_diff_eq(node.matrix_b, EPS));
    }

    #[test]
    fn test_constraint_identity_passthrough() {
        let driver = DMat4::from_rotation_translation(
            DQuat::from_rotation_x(0.4),
            DVec3::new(1.0, 2.0, 3.0),
        );
        let node = MatrixConstraint {
            driver_matrix: driver,
            ..MatrixConstraint::default()
        };
        let out = node.evaluate();
        assert!(out.output_matrix.abs_diff_eq(driver, EPS));
        assert!(out.driver_offset_matrix.abs_diff_eq(driver, EPS));
        assert!((out.translate - DVec3::new(1.0, 2.0, 3.0)).length() < EPS);
        assert!((out.rotate - DVec3::new(0.4, 0.0, 0.0)).length() < EPS);
        assert!((out.scale - DVec3::ONE).length() < EPS);
    }

    #[test]
    fn test_constraint_parent_and_rest() {
        let node = MatrixConstraint {
            driver_matrix: DMat4::from_rotation_translation(
                DQuat::from_rotation_z(0.6),
                DVec3::new(5.0, 0.0, 0.0),
            ),
            driven_parent_inverse_matrix: DMat4::from_translation(DVec3::new(-2.0, 0.0, 0.0)),
            driven_rest_matrix: DMat4::from_rotation_z(0.2),
            ..MatrixConstraint::default()
        };
        let out = node.evaluate();
        assert!((out.translate - DVec3::new(3.0, 0.0, 0.0)).length() < EPS);
        // 旋转相对 rest
        assert!((out.rotate.z - 0.4).abs() < EPS);
    }

    #[test]
    fn test_constraint_multipliers() {
        let node = MatrixConstraint {
            driver_matrix: DMat4::from_scale_rotation_translation(
                DVec3::new(2.0, 2.0, 2.0),
                DQuat::from_rotation_y(0.8),
                DVec3::ZERO,
            ),
            rotation_multiplier: DVec3::new(1.0, 0.0, 1.0),
            scale_multiplier: DVec3::new(0.5, 1.0, 1.0),
            ..MatrixConstraint::default()
        };
        let out = node.evaluate();
        assert!(out.rotate.length() < EPS);
        assert!((out.scale - DVec3::new(1.0, 2.0, 2.0)).length() < EPS);
    }

    #[test]
    fn test_constraint_rotation_offset() {
        let node = MatrixConstraint {
            driver_rotation_offset: DVec3::new(0.0, 0.0, 90.0),
            ..MatrixConstraint::default()
        };
        let out = node.evaluate();
        let x = out.driver_offset_matrix.transform_vector3(DVec3::X);
        assert!((x - DVec3::Y).length() < 1e-8);
    }

    #[test]
    fn test_constraint_plugs() {
        let mut node = MatrixConstraint::default();
        assert!(node.compute(Plug::Shear).unwrap().as_vector().is_some());
        assert!(node.compute(Plug::DriverOffset).unwrap().as_matrix().is_some());
        assert!(node.compute(Plug::OutA).is_err());
    }
}
