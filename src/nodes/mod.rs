//! 简单节点
//!
//! 每个节点都是一条小公式，读取输入后直接输出，没有跨求值的状态。

pub mod curve;
pub mod matrix;
pub mod mesh;
pub mod scalar;

pub use curve::{Curve, CurveCns, CurveHandle, PercentageToU, SlideCurve2, UToPercentage};
pub use matrix::{InterpolateMatrix, MatrixConstraint, MatrixConstraintOutput, MulMatrix};
pub use mesh::{Mesh, MeshHandle, RayCastPosition, VertexPosition};
pub use scalar::{
    Add10Scalar, InverseRotOrder, LinearInterpolate3DVector, SpinePointAt, SquashStretch2,
    TrigonometryAngle,
};
