//! 错误类型
//!
//! 只有两类情况会上报为错误：
//! - 请求了节点不拥有的输出（宿主应把请求转给别的节点）
//! - 输入格式错误（例如并行数组长度不一致），本次求值不产生任何输出
//!
//! 数值退化（零长度链、共线坐标系、弧长为零）一律走定义好的回退值，不是错误。

use thiserror::Error;

use crate::node::Plug;

/// 求解器错误
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RigError {
    /// 节点不拥有该输出
    #[error("node `{node}` has no output {plug:?}")]
    UnknownPlug { node: &'static str, plug: Plug },

    /// 并行输入数组长度不一致
    #[error("{what}: expected {expected} elements, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// 控制点数量不足
    #[error("{what}: needs at least {required} controls, found {found}")]
    NotEnoughControls {
        what: &'static str,
        required: usize,
        found: usize,
    },

    /// 顶点索引越界
    #[error("vertex index {index} out of range ({count} vertices)")]
    VertexOutOfRange { index: usize, count: usize },

    /// 枚举属性取值越界
    #[error("invalid value {value} for enum `{what}`")]
    InvalidEnum { what: &'static str, value: i32 },

    /// 必需的曲线/网格输入未连接
    #[error("missing input `{0}`")]
    MissingInput(&'static str),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, RigError>;
