//! 求解器模块
//!
//! - ikfk_2bone: 解析两骨 IK 与 FK 混合
//! - roll_spline: 带滚转的控制点样条
//! - spring: 有状态的弹簧/重力积分器

pub mod ikfk_2bone;
pub mod roll_spline;
pub mod spring;

pub use ikfk_2bone::{IkFk2Bone, TwoBoneSocket};
pub use roll_spline::RollSplineKine;
pub use spring::{SpringNode, SpringStates};
