//! 两骨 IK/FK 混合求解器
//!
//! IK 部分是闭式解：根据根骨、目标、极向量三点用余弦定理求出两个内角，
//! 支持最大拉伸、软化、滑动、反向。FK 部分从三个 FK 关节重建同样的四个插槽。
//!
//! 混合在局部空间进行：去掉缩放后把第二骨映射到第一骨空间、效应器映射到第二骨空间，
//! 逐对插值后再映射回世界空间，最后按 FK 规则重新求值。这样避免直接插值世界矩阵带来的剪切。
//!
//! 所有输入 Pose 都是世界空间；输出矩阵在最后乘以对应的输出父级逆矩阵。

use glam::{DMat4, DQuat, DVec3};

use crate::error::{Result, RigError};
use crate::math::{
    degrees_to_radians, lerp_vec3, quaternion_from_axes, rotate_vector_along_axis, LEGACY_PI,
};
use crate::node::{Plug, RigNode, Value};
use crate::transform::{interpolate_pose, to_object_space, to_output_space, to_world_space, Pose};

/// 三角形可解判定的容差
const TRIANGLE_EPSILON: f64 = 1.0e-6;

// ============================================================================
// 插槽
// ============================================================================

/// 两骨求解器的四个输出
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TwoBoneSocket {
    /// 上臂
    A,
    /// 前臂
    B,
    /// 肘部（两骨中间方向）
    Center,
    /// 效应器
    Eff,
}

impl TwoBoneSocket {
    pub const ALL: [TwoBoneSocket; 4] = [Self::A, Self::B, Self::Center, Self::Eff];

    pub fn from_plug(plug: Plug) -> Option<Self> {
        match plug {
            Plug::OutA => Some(Self::A),
            Plug::OutB => Some(Self::B),
            Plug::OutCenter => Some(Self::Center),
            Plug::OutEff => Some(Self::Eff),
            _ => None,
        }
    }

    pub fn plug(self) -> Plug {
        match self {
            Self::A => Plug::OutA,
            Self::B => Plug::OutB,
            Self::Center => Plug::OutCenter,
            Self::Eff => Plug::OutEff,
        }
    }
}

// ============================================================================
// 参数
// ============================================================================

/// IK 求值参数（世界空间）
#[derive(Clone, Debug, PartialEq)]
pub struct IkParams {
    pub root: Pose,
    /// IK 目标
    pub eff: Pose,
    /// 极向量
    pub upv: Pose,
    pub length_a: f64,
    pub length_b: f64,
    pub negate: bool,
    /// 绕根-目标轴的滚转（弧度）
    pub roll: f64,
    pub scale_a: f64,
    pub scale_b: f64,
    pub max_stretch: f64,
    /// 软化区比例，实际长度为 softness * restLength * 0.1
    pub softness: f64,
    pub slide: f64,
    pub reverse: f64,
}

impl Default for IkParams {
    fn default() -> Self {
        Self {
            root: Pose::IDENTITY,
            eff: Pose::IDENTITY,
            upv: Pose::IDENTITY,
            length_a: 0.0,
            length_b: 0.0,
            negate: false,
            roll: 0.0,
            scale_a: 1.0,
            scale_b: 1.0,
            max_stretch: 1.5,
            softness: 0.0,
            slide: 0.5,
            reverse: 0.0,
        }
    }
}

/// FK 求值参数（世界空间）
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FkParams {
    pub bone1: Pose,
    pub bone2: Pose,
    pub eff: Pose,
    pub negate: bool,
}

// ============================================================================
// IK 链
// ============================================================================

/// 求解后的 IK 链
///
/// 保存拉伸后的骨长、两个内角和初始坐标系，四个插槽都从这里派生。
#[derive(Clone, Debug, PartialEq)]
pub struct IkChain {
    pub root_pos: DVec3,
    pub root_scale: DVec3,
    /// 根骨 x 缩放，作为整体缩放
    pub global_scale: f64,
    /// 拉伸比例
    pub stretch: f64,
    pub length_a: f64,
    pub length_b: f64,
    /// 根骨处内角（弧度）
    pub angle_a: f64,
    /// 肘部内角（弧度）
    pub angle_b: f64,
    pub invert: bool,
    pub negate: bool,
    pub x_axis: DVec3,
    pub y_axis: DVec3,
    pub z_axis: DVec3,
}

/// 余弦定理：边 a、b 的夹角，c 为对边
#[inline]
pub fn law_of_cosines(a: f64, b: f64, c: f64) -> f64 {
    ((a * a + b * b - c * c) / (2.0 * a * b)).min(1.0).acos()
}

impl IkChain {
    /// 求解 IK 链
    pub fn solve(params: &IkParams) -> Self {
        let root_pos = params.root.translation;
        let eff_pos = params.eff.translation;
        let upv_pos = params.upv.translation;
        let root_eff = eff_pos - root_pos;
        let roll_axis = root_eff.normalize_or_zero();
        let root_eff_distance = root_eff.length();

        let root_scale = params.root.scale;
        let global_scale = root_scale.x;

        // ====== 最大拉伸 ======
        let rest_length =
            (params.length_a * params.scale_a + params.length_b * params.scale_b) * global_scale;
        let distance = root_eff_distance.min(rest_length * params.max_stretch);

        // 软化区长度随链长缩放
        let softness = params.softness * rest_length * 0.1;

        // ====== 拉伸与软化 ======
        // 软化用未截断的距离，不拉伸时也生效
        let mut stretch = if rest_length > 0.0 {
            (distance / rest_length).max(1.0)
        } else {
            1.0
        };
        let da = rest_length - softness;
        if softness > 0.0 && root_eff_distance > da {
            let new_length = softness * (1.0 - (-(root_eff_distance - da) / softness).exp()) + da;
            stretch = distance / new_length;
        }

        let mut length_a = params.length_a * stretch * params.scale_a * global_scale;
        let mut length_b = params.length_b * stretch * params.scale_b * global_scale;

        // ====== 反向 ======
        let total = length_a + length_b;
        let d = if total > 0.0 { distance / total } else { 1.0 };
        let reverse_scale = if params.reverse < 0.5 {
            1.0 - params.reverse * 2.0 * (1.0 - d)
        } else {
            1.0 - (1.0 - params.reverse) * 2.0 * (1.0 - d)
        };
        length_a *= reverse_scale;
        length_b *= reverse_scale;

        let invert = params.reverse > 0.5;

        // ====== 滑动 ======
        let slide_add = if params.slide < 0.5 {
            length_a * (params.slide * 2.0) - length_a
        } else {
            length_b * (params.slide * 2.0) - length_b
        };
        length_a += slide_add;
        length_b -= slide_add;

        // ====== 三角形内角 ======
        // 不可解（完全伸直或退化）时角度为零，避免 acos 产生 NaN
        let mut angle_a = 0.0;
        let mut angle_b = 0.0;
        if root_eff_distance < length_a + length_b
            && root_eff_distance > (length_a - length_b).abs() + TRIANGLE_EPSILON
        {
            angle_a = law_of_cosines(length_a, root_eff_distance, length_b);
            angle_b = law_of_cosines(length_b, length_a, root_eff_distance);

            if invert {
                angle_a = -angle_a;
                angle_b = -angle_b;
            }
        } else {
            log::trace!(
                "[IkFk2Bone] triangle not solvable (distance {:.6}, lengths {:.6}/{:.6}), angles zeroed",
                root_eff_distance,
                length_a,
                length_b
            );
        }

        // ====== 初始坐标系 ======
        let x_axis = root_eff.normalize_or_zero();
        let mut y_axis = (upv_pos - lerp_vec3(root_pos, eff_pos, 0.5)).normalize_or_zero();
        y_axis = rotate_vector_along_axis(y_axis, roll_axis, params.roll);
        let z_axis = x_axis.cross(y_axis).normalize_or_zero();
        let y_axis = z_axis.cross(x_axis).normalize_or_zero();

        Self {
            root_pos,
            root_scale,
            global_scale,
            stretch,
            length_a,
            length_b,
            angle_a,
            angle_b,
            invert,
            negate: params.negate,
            x_axis,
            y_axis,
            z_axis,
        }
    }

    /// 上臂方向
    pub fn upper_axis(&self) -> DVec3 {
        if self.angle_a != 0.0 {
            rotate_vector_along_axis(self.x_axis, self.z_axis, -self.angle_a)
        } else {
            self.x_axis
        }
    }

    /// 前臂方向
    pub fn lower_axis(&self) -> DVec3 {
        let upper = self.upper_axis();
        if self.angle_b != 0.0 {
            rotate_vector_along_axis(upper, self.z_axis, -(self.angle_b - LEGACY_PI))
        } else {
            upper
        }
    }

    /// 肘部位置
    pub fn elbow_position(&self) -> DVec3 {
        self.root_pos + self.upper_axis() * self.length_a
    }

    /// 效应器位置
    pub fn effector_position(&self) -> DVec3 {
        self.elbow_position() + self.lower_axis() * self.length_b
    }

    /// 某个插槽的世界空间 Pose
    ///
    /// `eff_world` 为 IK 目标 Pose，效应器插槽保留它的旋转与缩放。
    pub fn socket_pose(&self, socket: TwoBoneSocket, eff_world: &Pose) -> Pose {
        let z_axis = self.z_axis;
        let base = Pose::IDENTITY.with_scale(self.root_scale);

        match socket {
            TwoBoneSocket::A => {
                let mut x_axis = self.upper_axis();
                if self.negate {
                    x_axis = -x_axis;
                }
                let y_axis = z_axis.cross(x_axis).normalize_or_zero();

                Pose {
                    translation: self.root_pos,
                    rotation: quaternion_from_axes(x_axis, y_axis, z_axis),
                    scale: DVec3::new(self.length_a, self.global_scale, self.global_scale),
                    ..base
                }
            }
            TwoBoneSocket::B => {
                let mut x_axis = self.lower_axis();
                if self.negate {
                    x_axis = -x_axis;
                }
                let y_axis = z_axis.cross(x_axis).normalize_or_zero();

                Pose {
                    translation: self.elbow_position(),
                    rotation: quaternion_from_axes(x_axis, y_axis, z_axis),
                    scale: DVec3::new(self.length_b, self.global_scale, self.global_scale),
                    ..base
                }
            }
            TwoBoneSocket::Center => {
                let mut x_axis = self.upper_axis();
                if self.angle_b != 0.0 {
                    let mut angle_b = self.angle_b;
                    if self.invert {
                        angle_b += LEGACY_PI * 2.0;
                    }
                    x_axis =
                        rotate_vector_along_axis(x_axis, z_axis, -(angle_b * 0.5 - LEGACY_PI * 0.5));
                }

                // z 由当前 x 与初始 y 重新求出，之后才处理 negate
                let z_axis = x_axis.cross(self.y_axis).normalize_or_zero();
                if self.negate {
                    x_axis = -x_axis;
                }
                let y_axis = z_axis.cross(x_axis).normalize_or_zero();

                Pose {
                    translation: self.elbow_position(),
                    rotation: quaternion_from_axes(x_axis, y_axis, z_axis),
                    ..base
                }
            }
            TwoBoneSocket::Eff => eff_world.with_translation(self.effector_position()),
        }
    }
}

// ============================================================================
// IK / FK 求值
// ============================================================================

/// 纯 IK 求值
pub fn get_ik_transform(params: &IkParams, socket: TwoBoneSocket) -> Pose {
    IkChain::solve(params).socket_pose(socket, &params.eff)
}

/// 纯 FK 求值
pub fn get_fk_transform(params: &FkParams, socket: TwoBoneSocket) -> Pose {
    match socket {
        TwoBoneSocket::A => {
            let mut x_axis = params.bone2.translation - params.bone1.translation;
            let mut result = params
                .bone1
                .with_scale(DVec3::new(x_axis.length(), 1.0, 1.0));

            if params.negate {
                x_axis = -x_axis;
            }
            let x_axis = x_axis.normalize_or_zero();
            let z_axis = params.bone1.rotation * DVec3::Z;
            let y_axis = z_axis.cross(x_axis);

            result.rotation = quaternion_from_axes(x_axis, y_axis, z_axis);
            result
        }
        TwoBoneSocket::B => {
            let mut x_axis = params.eff.translation - params.bone2.translation;
            let mut result = params
                .bone2
                .with_scale(DVec3::new(x_axis.length(), 1.0, 1.0));

            if params.negate {
                x_axis = -x_axis;
            }
            let x_axis = x_axis.normalize_or_zero();
            let y_axis = params.bone2.rotation * DVec3::Y;
            let z_axis = x_axis.cross(y_axis).normalize_or_zero();
            let y_axis = z_axis.cross(x_axis).normalize_or_zero();

            result.rotation = quaternion_from_axes(x_axis, y_axis, z_axis);
            result
        }
        TwoBoneSocket::Center => {
            // 第二骨在第一骨空间中的旋转取一半，再回到世界空间
            // 四元数取半与逐分量欧拉角取半不同，大角度时两者相差明显
            let local = to_object_space(&params.bone1, &params.bone2);
            let half = DQuat::IDENTITY.slerp(local.rotation, 0.5);
            let world = to_world_space(&params.bone1, &local.with_rotation(half));

            Pose::from_trs(params.bone2.translation, world.rotation, DVec3::ONE)
        }
        TwoBoneSocket::Eff => params.eff,
    }
}

/// IK/FK 混合求值（世界空间）
///
/// blend 恰好为 0 或 1 时直接走纯 FK / 纯 IK，结果逐位相同。
pub fn blend_two_bone(
    ik: &IkParams,
    fk: &FkParams,
    blend: f64,
    socket: TwoBoneSocket,
) -> Pose {
    if blend == 0.0 {
        return get_fk_transform(fk, socket);
    }
    if blend == 1.0 {
        return get_ik_transform(ik, socket);
    }

    let chain = IkChain::solve(ik);
    let unit = |pose: Pose| pose.with_scale(DVec3::ONE);

    // 去掉缩放，避免剪切
    let ik_bone1 = unit(chain.socket_pose(TwoBoneSocket::A, &ik.eff));
    let ik_bone2 = unit(chain.socket_pose(TwoBoneSocket::B, &ik.eff));
    let ik_eff = unit(chain.socket_pose(TwoBoneSocket::Eff, &ik.eff));

    let fk_bone1 = unit(get_fk_transform(fk, TwoBoneSocket::A));
    let fk_bone2 = unit(get_fk_transform(fk, TwoBoneSocket::B));
    let fk_eff = unit(get_fk_transform(fk, TwoBoneSocket::Eff));

    // 世界 → 局部
    let ik_eff_local = to_object_space(&ik_bone2, &ik_eff);
    let fk_eff_local = to_object_space(&fk_bone2, &fk_eff);
    let ik_bone2_local = to_object_space(&ik_bone1, &ik_bone2);
    let fk_bone2_local = to_object_space(&fk_bone1, &fk_bone2);

    let bone1 = interpolate_pose(&fk_bone1, &ik_bone1, blend);
    let bone2_local = interpolate_pose(&fk_bone2_local, &ik_bone2_local, blend);
    let eff_local = interpolate_pose(&fk_eff_local, &ik_eff_local, blend);

    // 局部 → 世界
    let bone2 = to_world_space(&bone1, &bone2_local);
    let eff = to_world_space(&bone2, &eff_local);

    let blended = FkParams {
        bone1,
        bone2,
        eff,
        negate: fk.negate,
    };
    get_fk_transform(&blended, socket)
}

// ============================================================================
// 节点
// ============================================================================

/// 两骨 IK/FK 节点
///
/// 输入全部是世界矩阵；roll 以角度给出。每个输出插槽有各自的父级矩阵。
#[derive(Clone, Debug)]
pub struct IkFk2Bone {
    pub blend: f64,
    pub length_a: f64,
    pub length_b: f64,
    pub negate: bool,
    pub scale_a: f64,
    pub scale_b: f64,
    /// 滚转（角度）
    pub roll: f64,
    pub max_stretch: f64,
    pub slide: f64,
    pub softness: f64,
    pub reverse: f64,

    pub root: DMat4,
    pub ik_ref: DMat4,
    pub upv: DMat4,
    pub fk0: DMat4,
    pub fk1: DMat4,
    pub fk2: DMat4,

    pub a_parent: DMat4,
    pub b_parent: DMat4,
    pub center_parent: DMat4,
    pub eff_parent: DMat4,
}

impl Default for IkFk2Bone {
    fn default() -> Self {
        Self {
            blend: 0.0,
            length_a: 0.0,
            length_b: 0.0,
            negate: false,
            scale_a: 1.0,
            scale_b: 1.0,
            roll: 0.0,
            max_stretch: 1.5,
            slide: 0.5,
            softness: 0.0,
            reverse: 0.0,
            root: DMat4::IDENTITY,
            ik_ref: DMat4::IDENTITY,
            upv: DMat4::IDENTITY,
            fk0: DMat4::IDENTITY,
            fk1: DMat4::IDENTITY,
            fk2: DMat4::IDENTITY,
            a_parent: DMat4::IDENTITY,
            b_parent: DMat4::IDENTITY,
            center_parent: DMat4::IDENTITY,
            eff_parent: DMat4::IDENTITY,
        }
    }
}

impl IkFk2Bone {
    pub fn ik_params(&self) -> IkParams {
        IkParams {
            root: Pose::from_matrix(self.root),
            eff: Pose::from_matrix(self.ik_ref),
            upv: Pose::from_matrix(self.upv),
            length_a: self.length_a,
            length_b: self.length_b,
            negate: self.negate,
            roll: degrees_to_radians(self.roll),
            scale_a: self.scale_a,
            scale_b: self.scale_b,
            max_stretch: self.max_stretch,
            softness: self.softness,
            slide: self.slide,
            reverse: self.reverse,
        }
    }

    pub fn fk_params(&self) -> FkParams {
        FkParams {
            bone1: Pose::from_matrix(self.fk0),
            bone2: Pose::from_matrix(self.fk1),
            eff: Pose::from_matrix(self.fk2),
            negate: self.negate,
        }
    }

    fn output_parent(&self, socket: TwoBoneSocket) -> DMat4 {
        match socket {
            TwoBoneSocket::A => self.a_parent,
            TwoBoneSocket::B => self.b_parent,
            TwoBoneSocket::Center => self.center_parent,
            TwoBoneSocket::Eff => self.eff_parent,
        }
    }

    /// 求值一个插槽，返回输出父级空间中的矩阵
    pub fn evaluate(&self, socket: TwoBoneSocket) -> DMat4 {
        let pose = blend_two_bone(&self.ik_params(), &self.fk_params(), self.blend, socket);
        to_output_space(pose.to_matrix(), self.output_parent(socket))
    }
}

const TWO_BONE_OUTPUTS: &[Plug] = &[Plug::OutA, Plug::OutB, Plug::OutCenter, Plug::OutEff];

impl RigNode for IkFk2Bone {
    const NODE_TYPE: &'static str = "mgear_ikfk2Bone";

    fn outputs(&self) -> &'static [Plug] {
        TWO_BONE_OUTPUTS
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        let socket = TwoBoneSocket::from_plug(plug).ok_or(RigError::UnknownPlug {
            node: Self::NODE_TYPE,
            plug,
        })?;
        Ok(Value::Matrix(self.evaluate(socket)))
    }
}
