//! 弹簧/重力积分器
//!
//! 每个弹簧实例记住上两次的位置和上次求值时间，按显式欧拉积分追随目标点。
//! 时间倒退或跳过超过一帧（拖动时间轴）时直接重置到目标点。
//!
//! 状态不藏在节点内部的静态量里：`SpringNode` 独占一个 `SpringState`，
//! 宿主也可以把大量弹簧的状态放进 `SpringStates`，用 `SpringHandle` 索引。
//! 同一实例的求值必须串行且时间单调，由宿主保证。

use glam::{DMat4, DVec3};

use crate::config::get_config;
use crate::error::Result;
use crate::node::{Plug, RigNode, Value, SINGLE_OUTPUT};

/// 碰撞体距离判零阈值
const COLLIDER_EPSILON: f64 = 1.0e-12;

// ============================================================================
// 输入
// ============================================================================

/// 球形碰撞体
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphereCollider {
    pub center: DVec3,
    pub radius: f64,
}

/// 一次求值的输入
#[derive(Clone, Debug, PartialEq)]
pub struct SpringInputs {
    /// 目标点（世界空间）
    pub goal: DVec3,
    /// 当前时间（帧）
    pub time: f64,
    /// [0, 1]
    pub stiffness: f64,
    /// [0, 1]
    pub damping: f64,
    pub intensity: f64,
    pub active: f64,
    pub gravity: f64,
    pub gravity_direction: DVec3,
    pub colliders: Vec<SphereCollider>,
    /// 碰撞推出的软化，推出量乘以 (1 - softness)
    pub collider_softness: f64,
    pub use_ground: bool,
    /// 地面变换，地面是其局部空间的 y = 0 平面
    pub ground_transform: DMat4,
}

impl Default for SpringInputs {
    fn default() -> Self {
        Self {
            goal: DVec3::ZERO,
            time: 0.0,
            stiffness: 1.0,
            damping: 1.0,
            intensity: 1.0,
            active: 1.0,
            gravity: 0.0,
            gravity_direction: DVec3::new(0.0, -1.0, 0.0),
            colliders: Vec::new(),
            collider_softness: 0.5,
            use_ground: false,
            ground_transform: DMat4::IDENTITY,
        }
    }
}

impl SpringInputs {
    /// 不带重力、碰撞、地面的普通弹簧
    pub fn plain(goal: DVec3, time: f64, stiffness: f64, damping: f64, intensity: f64) -> Self {
        Self {
            goal,
            time,
            stiffness,
            damping,
            intensity,
            ..Self::default()
        }
    }
}

// ============================================================================
// 状态
// ============================================================================

/// 单个弹簧实例的历史状态
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpringState {
    initialized: bool,
    previous_position: DVec3,
    current_position: DVec3,
    previous_time: f64,
}

impl SpringState {
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// 上一次积分得到的位置（未乘 intensity）
    pub fn current_position(&self) -> DVec3 {
        self.current_position
    }

    pub fn previous_position(&self) -> DVec3 {
        self.previous_position
    }

    /// 丢弃历史，下一次求值重新从目标点开始
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn reset_to(&mut self, goal: DVec3, time: f64) {
        self.previous_position = goal;
        self.current_position = goal;
        self.previous_time = time;
    }

    /// 推进一步，返回输出位置
    pub fn step(&mut self, inputs: &SpringInputs) -> DVec3 {
        let goal = inputs.goal;

        if !self.initialized {
            self.reset_to(goal, inputs.time);
            self.initialized = true;
        }

        // 只接受一帧以内的连续步进
        let time_difference = inputs.time - self.previous_time;
        if time_difference > get_config().spring_max_time_step || time_difference < 0.0 {
            log::debug!(
                "[Spring] time jump {:.3} -> {:.3}, reset to goal",
                self.previous_time,
                inputs.time
            );
            self.reset_to(goal, inputs.time);
            // 下一次求值重新播种
            self.initialized = false;
        }

        // ====== 积分 ======
        let velocity = (self.current_position - self.previous_position) * (1.0 - inputs.damping);
        let mut new_position = self.current_position + velocity;
        let goal_force =
            (goal - new_position) * inputs.stiffness + inputs.gravity * inputs.gravity_direction;
        new_position += goal_force;

        // ====== 碰撞 ======
        let collider_strength = 1.0 - inputs.collider_softness;
        for collider in &inputs.colliders {
            let offset = new_position - collider.center;
            let distance = offset.length();
            if distance < COLLIDER_EPSILON {
                continue;
            }
            // 只向外推
            let amount = (collider.radius - distance) / distance * collider_strength;
            if amount > 0.0 {
                new_position += amount * offset;
            }
        }

        if inputs.use_ground {
            new_position = push_above_ground(new_position, inputs.ground_transform, collider_strength);
        }

        // ====== 保存状态 ======
        self.previous_position = self.current_position;
        self.current_position = new_position;
        self.previous_time = inputs.time;

        goal + (new_position - goal) * inputs.intensity * inputs.active
    }
}

/// 把地面以下的点沿地面法线推回
fn push_above_ground(position: DVec3, ground_transform: DMat4, strength: f64) -> DVec3 {
    let mut local = ground_transform.inverse().transform_point3(position);
    let amount = -local.y * strength;
    if amount > 0.0 {
        local.y += amount;
        ground_transform.transform_point3(local)
    } else {
        position
    }
}

// ============================================================================
// 状态池
// ============================================================================

/// 弹簧实例句柄
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpringHandle(usize);

impl SpringHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// 弹簧状态池，每个节点实例一个槽位
#[derive(Clone, Debug, Default)]
pub struct SpringStates {
    slots: Vec<SpringState>,
}

impl SpringStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// 分配新的槽位
    pub fn allocate(&mut self) -> SpringHandle {
        self.slots.push(SpringState::default());
        SpringHandle(self.slots.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, handle: SpringHandle) -> Option<&SpringState> {
        self.slots.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: SpringHandle) -> Option<&mut SpringState> {
        self.slots.get_mut(handle.0)
    }

    /// 推进某个实例，句柄无效时返回 None
    pub fn step(&mut self, handle: SpringHandle, inputs: &SpringInputs) -> Option<DVec3> {
        self.get_mut(handle).map(|state| state.step(inputs))
    }

    /// 清空所有实例的历史（例如重新载入场景）
    pub fn clear_all(&mut self) {
        for state in &mut self.slots {
            state.clear();
        }
    }
}

// ============================================================================
// 节点
// ============================================================================

/// 弹簧节点，独占自己的状态
#[derive(Clone, Debug, Default)]
pub struct SpringNode {
    pub inputs: SpringInputs,
    state: SpringState,
}

impl SpringNode {
    pub fn new(inputs: SpringInputs) -> Self {
        Self {
            inputs,
            state: SpringState::default(),
        }
    }

    pub fn state(&self) -> &SpringState {
        &self.state
    }
}

impl RigNode for SpringNode {
    const NODE_TYPE: &'static str = "mgear_springGravityNode";

    fn outputs(&self) -> &'static [Plug] {
        SINGLE_OUTPUT
    }

    fn compute(&mut self, plug: Plug) -> Result<Value> {
        self.require(plug)?;
        Ok(Value::Vector(self.state.step(&self.inputs)))
    }
}
