//! 四点贝塞尔与弧长采样表
//!
//! bezier4point 用 de Casteljau 求位置与切线；
//! ArcLengthTable 预计算采样点与累积弦长，按弧长比例查找位置（线性插值）。

use glam::DVec3;

use super::lerp_vec3;

/// 四点贝塞尔求值
///
/// 控制点：a, a + tan_a, d - tan_d, d。
/// 返回 (位置, 单位切线)。切线退化为零时返回零向量。
pub fn bezier4point(a: DVec3, tan_a: DVec3, d: DVec3, tan_d: DVec3, u: f64) -> (DVec3, DVec3) {
    let b = a + tan_a;
    let c = -tan_d + d;

    let ab = lerp_vec3(a, b, u);
    let bc = lerp_vec3(b, c, u);
    let cd = lerp_vec3(c, d, u);
    let abbc = lerp_vec3(ab, bc, u);
    let bccd = lerp_vec3(bc, cd, u);
    let abbcbccd = lerp_vec3(abbc, bccd, u);

    let tangent = (bccd - abbc).normalize_or_zero();
    (abbcbccd, tangent)
}

/// 弧长采样表
#[derive(Debug, Clone, PartialEq)]
pub struct ArcLengthTable {
    /// 采样位置
    positions: Vec<DVec3>,
    /// 采样切线
    tangents: Vec<DVec3>,
    /// 归一化累积弦长（首 0 尾 1）
    lengths: Vec<f64>,
    /// 总弦长
    total_length: f64,
}

impl ArcLengthTable {
    /// 在 [0, 1] 上均匀取 `subdiv` 个参数点构建采样表
    ///
    /// `sample` 给定参数返回 (位置, 切线)。subdiv 至少为 2。
    pub fn build<F>(subdiv: usize, mut sample: F) -> Self
    where
        F: FnMut(f64) -> (DVec3, DVec3),
    {
        let subdiv = subdiv.max(2);
        let step = 1.0 / (subdiv - 1) as f64;

        let mut positions: Vec<DVec3> = Vec::with_capacity(subdiv);
        let mut tangents = Vec::with_capacity(subdiv);
        let mut lengths = Vec::with_capacity(subdiv);

        let mut total_length = 0.0;
        for i in 0..subdiv {
            let (pos, tan) = sample(i as f64 * step);
            if let Some(prev) = positions.last() {
                total_length += (pos - *prev).length();
            }
            positions.push(pos);
            tangents.push(tan);
            lengths.push(total_length);
        }

        if total_length > 0.0 {
            for len in &mut lengths {
                *len /= total_length;
            }
        }

        Self {
            positions,
            tangents,
            lengths,
            total_length,
        }
    }

    /// 总弦长
    #[inline]
    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    /// 归一化累积弦长
    #[inline]
    pub fn lengths(&self) -> &[f64] {
        &self.lengths
    }

    /// 按弧长比例查找 (位置, 切线)
    ///
    /// 总弦长为零时返回 None，由调用方回退到参数求值。
    /// 超出 [0, 1] 的比例钳到首尾采样。
    pub fn locate(&self, fraction: f64) -> Option<(DVec3, DVec3)> {
        if self.total_length <= 0.0 {
            return None;
        }

        for i in 0..self.lengths.len() - 1 {
            let (l0, l1) = (self.lengths[i], self.lengths[i + 1]);
            if fraction >= l0 && fraction <= l1 {
                let blend = if l1 > l0 { (fraction - l0) / (l1 - l0) } else { 0.0 };
                return Some((
                    lerp_vec3(self.positions[i], self.positions[i + 1], blend),
                    lerp_vec3(self.tangents[i], self.tangents[i + 1], blend),
                ));
            }
        }

        let last = self.positions.len() - 1;
        if fraction < 0.0 {
            Some((self.positions[0], self.tangents[0]))
        } else {
            Some((self.positions[last], self.tangents[last]))
        }
    }
}
