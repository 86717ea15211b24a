//! 绑定求解器节点库
//!
//! 程序化角色绑定使用的一组小型求解节点。每个节点读取标量/向量/矩阵输入，
//! 在依赖图每次重新求值时输出一个派生值。图求值、属性存储、脏标记传播都属于宿主，
//! 不在本库范围内。
//!
//! 模块划分：
//! - math: 数学内核（插值、四元数、贝塞尔）
//! - transform: Pose 与空间变换代数
//! - solver: 两骨 IK/FK 混合、Roll Spline、弹簧积分器
//! - nodes: 简单节点公式（矩阵、标量、曲线、网格）
//! - node / batch: 宿主边界与并行批量求值

pub mod batch;
pub mod config;
pub mod error;
pub mod math;
pub mod node;
pub mod nodes;
pub mod solver;
pub mod transform;

pub use error::{RigError, Result};
pub use node::{Plug, RigNode, Value};
pub use transform::Pose;

pub use solver::ikfk_2bone::{FkParams, IkChain, IkFk2Bone, IkParams, TwoBoneSocket};
pub use solver::roll_spline::{Resample, RollSplineControl, RollSplineKine};
pub use solver::spring::{SpringHandle, SpringInputs, SpringNode, SpringState, SpringStates};
