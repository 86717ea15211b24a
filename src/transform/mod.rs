//! 变换代数
//!
//! Pose = 平移 + 旋转 + 缩放 + 剪切，每次求值重新构造，没有持久身份。
//! 矩阵采用 glam 的列向量约定：M = T · R · Sh · S。
//!
//! 函数参数名注明空间：`*_world` 为世界空间，`*_local` 为相对父级的空间。

use glam::{DMat4, DQuat, DVec3};

use crate::math::{compose_linear, decompose_linear, lerp_vec3, slerp};

// ============================================================================
// Pose
// ============================================================================

/// 刚体/缩放变换
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub translation: DVec3,
    /// 单位四元数，下游使用前保证已归一化
    pub rotation: DQuat,
    /// 各轴缩放（不支持负缩放）
    pub scale: DVec3,
    /// 剪切 (xy, xz, yz)
    pub shear: DVec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        translation: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
        scale: DVec3::ONE,
        shear: DVec3::ZERO,
    };

    /// 从平移、旋转、缩放创建（无剪切）
    #[inline]
    pub fn from_trs(translation: DVec3, rotation: DQuat, scale: DVec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
            shear: DVec3::ZERO,
        }
    }

    /// 仅平移
    #[inline]
    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// 转换为 4x4 矩阵
    pub fn to_matrix(&self) -> DMat4 {
        let linear = compose_linear(self.rotation.normalize(), self.scale, self.shear);
        DMat4::from_cols(
            linear.x_axis.extend(0.0),
            linear.y_axis.extend(0.0),
            linear.z_axis.extend(0.0),
            self.translation.extend(1.0),
        )
    }

    /// 从矩阵分解
    pub fn from_matrix(m: DMat4) -> Self {
        let (rotation, scale, shear) = decompose_linear(glam::DMat3::from_mat4(m));
        Self {
            translation: m.w_axis.truncate(),
            rotation,
            scale,
            shear,
        }
    }

    /// 替换缩放，其余不变
    #[inline]
    pub fn with_scale(mut self, scale: DVec3) -> Self {
        self.scale = scale;
        self
    }

    /// 替换旋转，其余不变
    #[inline]
    pub fn with_rotation(mut self, rotation: DQuat) -> Self {
        self.rotation = rotation;
        self
    }

    /// 替换平移，其余不变
    #[inline]
    pub fn with_translation(mut self, translation: DVec3) -> Self {
        self.translation = translation;
        self
    }

    /// 用自身旋转转动一个向量
    #[inline]
    pub fn rotate(&self, v: DVec3) -> DVec3 {
        self.rotation * v
    }

    /// 逆矩阵
    #[inline]
    pub fn inverse_matrix(&self) -> DMat4 {
        self.to_matrix().inverse()
    }
}

impl From<DMat4> for Pose {
    fn from(m: DMat4) -> Self {
        Self::from_matrix(m)
    }
}

impl From<Pose> for DMat4 {
    fn from(pose: Pose) -> Self {
        pose.to_matrix()
    }
}

// ============================================================================
// 空间变换
// ============================================================================

/// 世界空间 → 父级局部空间：parent⁻¹ · child
pub fn to_object_space(parent_world: &Pose, child_world: &Pose) -> Pose {
    Pose::from_matrix(parent_world.inverse_matrix() * child_world.to_matrix())
}

/// 父级局部空间 → 世界空间：parent · local
pub fn to_world_space(parent_world: &Pose, child_local: &Pose) -> Pose {
    Pose::from_matrix(parent_world.to_matrix() * child_local.to_matrix())
}

/// 世界矩阵 → 输出父级空间：output_parent⁻¹ · world
#[inline]
pub fn to_output_space(world: DMat4, output_parent: DMat4) -> DMat4 {
    output_parent.inverse() * world
}

/// Pose 插值
///
/// t == 0 / t == 1 直接返回端点（没有 slerp 误差）；
/// 否则平移、缩放线性插值，旋转 slerp。剪切不参与插值，结果剪切为零。
pub fn interpolate_pose(pose_a: &Pose, pose_b: &Pose, t: f64) -> Pose {
    if t == 1.0 {
        return *pose_b;
    } else if t == 0.0 {
        return *pose_a;
    }

    let translation = lerp_vec3(pose_a.translation, pose_b.translation, t);
    let scale = lerp_vec3(pose_a.scale, pose_b.scale, t);
    let rotation = slerp(pose_a.rotation, pose_b.rotation, t).normalize();

    Pose::from_trs(translation, rotation, scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::EulerRot;

    fn sample_pose() -> Pose {
        Pose {
            translation: DVec3::new(1.0, -2.0, 3.0),
            rotation: DQuat::from_euler(EulerRot::XYZ, 0.4, 0.1, -0.8),
            scale: DVec3::new(1.5, 2.0, 0.5),
            shear: DVec3::new(0.1, 0.0, -0.2),
        }
    }

    fn pose_close(a: &Pose, b: &Pose, eps: f64) -> bool {
        (a.translation - b.translation).length() < eps
            && a.rotation.dot(b.rotation).abs() > 1.0 - eps
            && (a.scale - b.scale).length() < eps
            && (a.shear - b.shear).length() < eps
    }

    #[test]
    fn test_matrix_round_trip() {
        let pose = sample_pose();
        let back = Pose::from_matrix(pose.to_matrix());
        assert!(pose_close(&pose, &back, 1e-10));
    }

    #[test]
    fn test_matches_glam_without_shear() {
        let pose = Pose::from_trs(
            DVec3::new(3.0, 0.0, 1.0),
            DQuat::from_rotation_y(0.7),
            DVec3::new(2.0, 2.0, 2.0),
        );
        let expected =
            DMat4::from_scale_rotation_translation(pose.scale, pose.rotation, pose.translation);
        assert!(pose.to_matrix().abs_diff_eq(expected, 1e-12));
    }

    #[test]
    fn test_object_world_round_trip() {
        let parent = sample_pose();
        let child = Pose::from_trs(
            DVec3::new(-4.0, 5.0, 0.5),
            DQuat::from_rotation_z(1.2),
            DVec3::ONE,
        );
        let local = to_object_space(&parent, &child);
        let world = to_world_space(&parent, &local);
        assert!(world.to_matrix().abs_diff_eq(child.to_matrix(), 1e-9));
    }

    #[test]
    fn test_interpolate_endpoints_exact() {
        let a = sample_pose();
        let b = Pose::from_trs(DVec3::ONE, DQuat::from_rotation_x(2.0), DVec3::splat(3.0));
        assert_eq!(interpolate_pose(&a, &b, 0.0), a);
        assert_eq!(interpolate_pose(&a, &b, 1.0), b);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let a = Pose::IDENTITY;
        let b = Pose::from_trs(
            DVec3::new(2.0, 0.0, 0.0),
            DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2),
            DVec3::splat(3.0),
        );
        let mid = interpolate_pose(&a, &b, 0.5);
        assert!((mid.translation - DVec3::new(1.0, 0.0, 0.0)).length() < 1e-12);
        assert!((mid.scale - DVec3::splat(2.0)).length() < 1e-12);
        let expected = DQuat::from_rotation_z(std::f64::consts::FRAC_PI_4);
        assert!(mid.rotation.dot(expected).abs() > 1.0 - 1e-12);
        assert_eq!(mid.shear, DVec3::ZERO);
    }

    #[test]
    fn test_output_space() {
        let world = DMat4::from_translation(DVec3::new(5.0, 0.0, 0.0));
        let parent = DMat4::from_translation(DVec3::new(2.0, 0.0, 0.0));
        let local = to_output_space(world, parent);
        assert!(local.abs_diff_eq(DMat4::from_translation(DVec3::new(3.0, 0.0, 0.0)), 1e-12));
    }
}
