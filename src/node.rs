//! 宿主边界
//!
//! 宿主图每次拉取某个输出插槽时调用一次 `compute`。插槽是封闭枚举，
//! 节点只计算被请求的那一个；不属于自己的插槽返回 `RigError::UnknownPlug`，
//! 宿主据此把请求转给别的节点。

use glam::{DMat4, DVec3};

use crate::error::{Result, RigError};

/// 输出插槽
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plug {
    /// 单输出节点的唯一输出
    Output,

    // ========== 两骨 ==========
    OutA,
    OutB,
    OutCenter,
    OutEff,

    // ========== 矩阵约束 ==========
    DriverOffset,
    Translate,
    Rotate,
    Scale,
    Shear,

    // ========== 变形器 ==========
    OutputGeometry,
}

/// 插槽输出值
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Int(i32),
    Vector(DVec3),
    Matrix(DMat4),
    /// 变形器输出的点列
    Points(Vec<DVec3>),
}

impl Value {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<DVec3> {
        match self {
            Value::Vector(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<DMat4> {
        match self {
            Value::Matrix(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_points(&self) -> Option<&[DVec3]> {
        match self {
            Value::Points(p) => Some(p),
            _ => None,
        }
    }

    pub fn into_points(self) -> Option<Vec<DVec3>> {
        match self {
            Value::Points(p) => Some(p),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<DVec3> for Value {
    fn from(v: DVec3) -> Self {
        Value::Vector(v)
    }
}

impl From<DMat4> for Value {
    fn from(m: DMat4) -> Self {
        Value::Matrix(m)
    }
}

/// 求解节点
///
/// 输入以公开字段的形式由宿主写入，`compute` 只读取它们。
/// 弹簧之外的节点都是纯函数，`&mut self` 只是为了让有状态节点共用同一入口。
pub trait RigNode: Send {
    /// 节点类型名（宿主注册名）
    const NODE_TYPE: &'static str;

    /// 节点拥有的输出插槽
    fn outputs(&self) -> &'static [Plug];

    /// 计算被请求的插槽
    fn compute(&mut self, plug: Plug) -> Result<Value>;

    /// 是否拥有该插槽
    fn owns(&self, plug: Plug) -> bool {
        self.outputs().contains(&plug)
    }

    /// 不拥有该插槽时返回 UnknownPlug
    fn require(&self, plug: Plug) -> Result<()> {
        if self.owns(plug) {
            Ok(())
        } else {
            Err(RigError::UnknownPlug {
                node: Self::NODE_TYPE,
                plug,
            })
        }
    }
}

/// 单输出节点的插槽表
pub(crate) const SINGLE_OUTPUT: &[Plug] = &[Plug::Output];

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f64);

    impl RigNode for Constant {
        const NODE_TYPE: &'static str = "constant";

        fn outputs(&self) -> &'static [Plug] {
            SINGLE_OUTPUT
        }

        fn compute(&mut self, plug: Plug) -> Result<Value> {
            self.require(plug)?;
            Ok(Value::Scalar(self.0))
        }
    }

    #[test]
    fn test_unknown_plug() {
        let mut node = Constant(2.0);
        assert_eq!(node.compute(Plug::Output), Ok(Value::Scalar(2.0)));
        assert_eq!(
            node.compute(Plug::OutA),
            Err(RigError::UnknownPlug {
                node: "constant",
                plug: Plug::OutA
            })
        );
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::from(1.5).as_scalar(), Some(1.5));
        assert_eq!(Value::from(3).as_int(), Some(3));
        assert_eq!(Value::from(DVec3::X).as_vector(), Some(DVec3::X));
        assert!(Value::from(DMat4::IDENTITY).as_scalar().is_none());
        let points = Value::Points(vec![DVec3::ZERO, DVec3::ONE]);
        assert_eq!(points.as_points().map(|p| p.len()), Some(2));
    }
}
