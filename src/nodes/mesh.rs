//! 网格查询节点：顶点位置、射线求交

use std::sync::Arc;

use glam::{DMat4, DVec3};

use crate::config::get_config;
use crate::error::{Result, RigError};
use crate::node::{Plug, RigNode, Value, SINGLE_OUTPUT};

/// 宿主网格（世界空间）
pub trait Mesh: Send + Sync {
    fn vertex_count(&self) -> usize;
    fn vertex_position(&self, index: usize) -> Option<DVec3>;
    /// 沿单位方向求最近交点，参数超过 `max_param` 视为未命中
    fn closest_intersection(
        &self,
        origin: DVec3,
        direction: DVec3,
        max_param: f64,
        tolerance: f64,
    ) -> Option<DVec3>;
}

pub type MeshHandle = Arc<dyn Mesh>;

// ============================================================================
// VertexPosition
// ============================================================================

/// 顶点世界位置转到被驱动物体的父级空间
#[derive(Clone)]
pub struct VertexPosition {
    pub mesh: Option<MeshHandle>,
    pub vertex: usize,
    pub driven_parent_inverse: DMat4,
}

impl Default for VertexPosition {
    fn default() -> Self {
        Self {
            mesh: None,
            vertex: 0,
            driven_parent_inverse: DMat4::IDENTITY,
        }
    }
}

impl VertexPosition {
    pub fn evaluate(&self) -> Result<DVec3> {
        let mesh = self.mesh.as_ref().ok_or(RigError::MissingInput("inputShape"))?;
        let position = mesh
            .vertex_position(self.vertex)
            .ok_or(RigError::VertexOutOfRange {
                index: self.vertex,
                count: mesh.vertex_count(),
            })?;
        Ok(self.driven_parent_inverse.transform_point3(position))
    }
}

impl RigNode for VertexPosition {
    const NODE_TYPE: &'static str = "mgear_vertexPosition";

    fn outputs(&self) -> &'static [Plug] {
        SINGLE_OUTPUT
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Vector(self.evaluate()?))
    }
}

// ============================================================================
// RayCastPosition
// ============================================================================

/// 从 source 平移射向 direction 平移
///
/// 命中且不超过两点距离时输出只含平移的命中矩阵，否则原样输出 direction 矩阵。
#[derive(Clone)]
pub struct RayCastPosition {
    pub mesh: Option<MeshHandle>,
    pub ray_source: DMat4,
    pub ray_direction: DMat4,
}

impl Default for RayCastPosition {
    fn default() -> Self {
        Self {
            mesh: None,
            ray_source: DMat4::IDENTITY,
            ray_direction: DMat4::IDENTITY,
        }
    }
}

impl RayCastPosition {
    pub fn evaluate(&self) -> Result<DMat4> {
        let mesh = self.mesh.as_ref().ok_or(RigError::MissingInput("meshInput"))?;
        let config = get_config();

        let origin = self.ray_source.w_axis.truncate();
        let target = self.ray_direction.w_axis.truncate();
        let offset = target - origin;
        let max_length = offset.length();
        let Some(direction) = offset.try_normalize() else {
            log::trace!("[RayCast] source and direction coincide");
            return Ok(self.ray_direction);
        };

        let hit = mesh.closest_intersection(origin, direction, config.ray_max_param, config.ray_tolerance);
        match hit {
            Some(p) if (p - origin).length() <= max_length => Ok(DMat4::from_translation(p)),
            _ => Ok(self.ray_direction),
        }
    }
}

impl RigNode for RayCastPosition {
    const NODE_TYPE: &'static str = "mgear_rayCastPosition";

    fn outputs(&self) -> &'static [Plug] {
        SINGLE_OUTPUT
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Matrix(self.evaluate()?))
    }
}
