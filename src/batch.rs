//! 批量求值
//!
//! 同一类型的多个节点互不依赖时可以并行求值（例如一整排手指的 IK）。
//! 节点数少于 `parallel_min_batch` 时顺序执行。

use rayon::prelude::*;

use crate::config::get_config;
use crate::error::Result;
use crate::node::{Plug, RigNode, Value};

/// 对每个节点请求同一个输出，结果顺序与输入一致
pub fn evaluate_batch<N: RigNode>(nodes: &mut [N], plug: Plug) -> Vec<Result<Value>> {
    let min_batch = get_config().parallel_min_batch;

    if nodes.len() >= min_batch {
        log::trace!("[Batch] {} x {} in parallel", nodes.len(), N::NODE_TYPE);
        nodes.par_iter_mut().map(|node| node.compute(plug)).collect()
    } else {
        nodes.iter_mut().map(|node| node.compute(plug)).collect()
    }
}
