//! 数学内核
//!
//! 无状态的纯函数：插值、四元数 slerp、轴角旋转、由坐标轴求四元数、取整等。
//! 常量沿用旧绑定使用的定点值（0.0174532925 而不是 π/180），
//! 否则已经制作好的绑定会出现微小偏差。

pub mod bezier;

pub use bezier::{bezier4point, ArcLengthTable};

use glam::{DMat3, DQuat, DVec3};

// ============================================================================
// 常量
// ============================================================================

/// 角度 → 弧度（旧值，不要换成 π/180）
pub const DEG_TO_RAD: f64 = 0.0174532925;

/// 弧度 → 角度（旧值）
pub const RAD_TO_DEG: f64 = 57.2957795;

/// 两骨求解器使用的 π（旧值，精度只到 8 位小数）
pub const LEGACY_PI: f64 = 3.14159265;

/// 分解矩阵时判定零长度的阈值
const DECOMPOSE_EPSILON: f64 = 1.0e-12;

// ============================================================================
// 标量工具
// ============================================================================

/// 角度转弧度
#[inline]
pub fn degrees_to_radians(a: f64) -> f64 {
    a * DEG_TO_RAD
}

/// 弧度转角度
#[inline]
pub fn radians_to_degrees(a: f64) -> f64 {
    a * RAD_TO_DEG
}

/// 先取 max 再取 min，min > max 时返回 max（不会 panic）
#[inline]
pub fn clamp(d: f64, min_value: f64, max_value: f64) -> f64 {
    d.max(min_value).min(max_value)
}

/// 按小数位数四舍五入（远离零方向），位数上限 15
///
/// 位数为负时原样返回。
pub fn round_to_precision(value: f64, digits: i32) -> f64 {
    if digits < 0 {
        return value;
    }
    let p = digits.min(15);
    let pwr = 10f64.powi(p);
    let inv_pwr = 10f64.powi(-p);

    let mut val = value;
    if value < 0.0 {
        val = (val * pwr - 0.5).ceil();
    }
    if value > 0.0 {
        val = (val * pwr + 0.5).floor();
    }
    val * inv_pwr
}

/// 把 value 映射到 [first, second] 区间的比例
#[inline]
pub fn set01range(value: f64, first: f64, second: f64) -> f64 {
    (value - first) / (second - first)
}

/// 标量线性插值，t 不做限制（可外插）
#[inline]
pub fn lerp(first: f64, second: f64, blend: f64) -> f64 {
    first * (1.0 - blend) + second * blend
}

/// 向量逐分量线性插值
#[inline]
pub fn lerp_vec3(v0: DVec3, v1: DVec3, blend: f64) -> DVec3 {
    DVec3::new(
        lerp(v0.x, v1.x, blend),
        lerp(v0.y, v1.y, blend),
        lerp(v0.z, v1.z, blend),
    )
}

/// 归一化 U → 三次曲线参数 U（参数域 [0, cv_count - 3]）
#[inline]
pub fn normalized_u_to_u(u: f64, cv_count: usize) -> f64 {
    u * (cv_count as f64 - 3.0)
}

/// 三次曲线参数 U → 归一化 U
#[inline]
pub fn u_to_normalized_u(u: f64, cv_count: usize) -> f64 {
    u / (cv_count as f64 - 3.0)
}

/// 找到与 value 最接近的元素索引，空数组返回 None
pub fn find_closest_in_array(value: f64, values: &[f64]) -> Option<usize> {
    let mut best = f64::INFINITY;
    let mut index = None;
    for (i, v) in values.iter().enumerate() {
        let diff = (v - value).abs();
        if diff < best {
            best = diff;
            index = Some(i);
        }
    }
    index
}

// ============================================================================
// 四元数
// ============================================================================

/// 四元数点积
#[inline]
pub fn get_dot(qa: DQuat, qb: DQuat) -> f64 {
    qa.w * qb.w + qa.x * qb.x + qa.y * qb.y + qa.z * qb.z
}

/// 标准 slerp（最短路径）
#[inline]
pub fn slerp(qa: DQuat, qb: DQuat, blend: f64) -> DQuat {
    qa.slerp(qb, blend)
}

/// 带退化处理的 slerp
///
/// - 点积 ≥ 1 - 1e-12：视为重合，直接线性混合
/// - 1 - dot² 四舍五入到 5 位为 0，或 sin(angle) 四舍五入到 6 位为 0：返回 qa
///
/// 阈值与旧绑定一致，不要改动。
pub fn slerp_safe(qa: DQuat, qb: DQuat, blend: f64) -> DQuat {
    let mut dot = get_dot(qa, qb);

    if dot >= 1.0 - 1.0e-12 {
        let scale_a = 1.0 - blend;
        let scale_b = blend;
        return DQuat::from_xyzw(
            scale_a * qa.x + scale_b * qb.x,
            scale_a * qa.y + scale_b * qb.y,
            scale_a * qa.z + scale_b * qb.z,
            scale_a * qa.w + scale_b * qb.w,
        );
    }
    dot = clamp(dot, -1.0, 1.0);

    if round_to_precision(-dot * dot + 1.0, 5) == 0.0 {
        return qa;
    }
    let angle = dot.acos();

    let sin_angle = angle.sin();
    if round_to_precision(sin_angle, 6) == 0.0 {
        return qa;
    }
    let factor = 1.0 / sin_angle;

    let scale_a = ((1.0 - blend) * angle).sin() * factor;
    let scale_b = (blend * angle).sin() * factor;

    DQuat::from_xyzw(
        scale_a * qa.x + scale_b * qb.x,
        scale_a * qa.y + scale_b * qb.y,
        scale_a * qa.z + scale_b * qb.z,
        scale_a * qa.w + scale_b * qb.w,
    )
}

/// 欧拉角（角度）→ 四元数
///
/// heading = y, attitude = z, bank = x
pub fn euler_to_quat(x: f64, y: f64, z: f64) -> DQuat {
    let x = degrees_to_radians(x);
    let y = degrees_to_radians(y);
    let z = degrees_to_radians(z);

    let c1 = (y / 2.0).cos();
    let s1 = (y / 2.0).sin();
    let c2 = (z / 2.0).cos();
    let s2 = (z / 2.0).sin();
    let c3 = (x / 2.0).cos();
    let s3 = (x / 2.0).sin();
    let c1c2 = c1 * c2;
    let s1s2 = s1 * s2;

    let qw = c1c2 * c3 - s1s2 * s3;
    let qx = c1c2 * s3 + s1s2 * c3;
    let qy = s1 * c2 * c3 + c1 * s2 * s3;
    let qz = c1 * s2 * c3 - s1 * c2 * s3;

    DQuat::from_xyzw(qx, qy, qz, qw)
}

/// 绕轴旋转向量（axis 需调用方归一化，角度为弧度）
///
/// 用两个单位四元数夹住纯四元数 v：conj(q) · v · q。
/// 正角度相当于右手定则的反方向，两骨求解器的弯曲方向依赖这一点。
pub fn rotate_vector_along_axis(v: DVec3, axis: DVec3, a: f64) -> DVec3 {
    let sa = (a / 2.0).sin();
    let ca = (a / 2.0).cos();

    let q1 = DQuat::from_xyzw(v.x, v.y, v.z, 0.0);
    let q2 = DQuat::from_xyzw(axis.x * sa, axis.y * sa, axis.z * sa, ca);
    let q2n = DQuat::from_xyzw(-axis.x * sa, -axis.y * sa, -axis.z * sa, ca);
    let q = q2n * q1 * q2;

    DVec3::new(q.x, q.y, q.z)
}

/// 由三根坐标轴求旋转四元数
///
/// 轴按列放入矩阵后做分解，只取旋转部分。
/// 调用方应传入正交单位轴，否则 x 之后的轴会被 Gram-Schmidt 修正。
pub fn quaternion_from_axes(x_axis: DVec3, y_axis: DVec3, z_axis: DVec3) -> DQuat {
    let (rotation, _, _) = decompose_linear(DMat3::from_cols(x_axis, y_axis, z_axis));
    rotation
}

// ============================================================================
// 线性部分分解 / 组合
// ============================================================================

/// 分解 3x3 线性部分：L = R · Sh · S
///
/// Sh 为上三角单位剪切矩阵（xy, xz, yz），S 为对角缩放。
/// 按 x → y → z 顺序做 Gram-Schmidt；行列式为负时把镜像折进 z 缩放。
pub fn decompose_linear(m: DMat3) -> (DQuat, DVec3, DVec3) {
    let c0 = m.x_axis;
    let c1 = m.y_axis;
    let c2 = m.z_axis;

    let sx = c0.length();
    let q0 = if sx > DECOMPOSE_EPSILON { c0 / sx } else { DVec3::X };

    let u01 = q0.dot(c1);
    let r1 = c1 - q0 * u01;
    let sy = r1.length();
    let q1 = if sy > DECOMPOSE_EPSILON {
        r1 / sy
    } else {
        q0.any_orthonormal_vector()
    };

    let u02 = q0.dot(c2);
    let u12 = q1.dot(c2);
    let r2 = c2 - q0 * u02 - q1 * u12;
    let mut sz = r2.length();
    let mut q2 = if sz > DECOMPOSE_EPSILON { r2 / sz } else { q0.cross(q1) };

    // 左手系：镜像归到 z
    if q0.cross(q1).dot(q2) < 0.0 {
        q2 = -q2;
        sz = -sz;
    }

    let shear = DVec3::new(
        if sy > DECOMPOSE_EPSILON { u01 / sy } else { 0.0 },
        if sz.abs() > DECOMPOSE_EPSILON { u02 / sz } else { 0.0 },
        if sz.abs() > DECOMPOSE_EPSILON { u12 / sz } else { 0.0 },
    );

    let rotation = DQuat::from_mat3(&DMat3::from_cols(q0, q1, q2)).normalize();
    (rotation, DVec3::new(sx, sy, sz), shear)
}

/// 组合 3x3 线性部分：L = R · Sh · S
pub fn compose_linear(rotation: DQuat, scale: DVec3, shear: DVec3) -> DMat3 {
    let shear_mat = DMat3::from_cols(
        DVec3::X,
        DVec3::new(shear.x, 1.0, 0.0),
        DVec3::new(shear.y, shear.z, 1.0),
    );
    DMat3::from_quat(rotation) * shear_mat * DMat3::from_diagonal(scale)
}
