/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : 拓扑排序（Kahn 算法），只考虑非循环连接
 *
 * 平局规则：初始根节点按模块名升序入队，之后按 FIFO 出队，
 * 同一节点的子节点也按模块名升序释放。模块名在网络内唯一，
 * 因此结果只取决于拓扑与命名，与注册模块、连接的先后无关。
 */

use super::{Incoming, Network, Schedule};
use crate::errors::NetworkError;
use crate::nn::buffer::ModuleBuffers;
use crate::nn::module::{Module, ModuleId};
use std::collections::VecDeque;

/// 对 `node_count` 个节点、给定有向边做拓扑排序，下标越小越先出队
///
/// 成功返回求值顺序；存在环时返回无法排出的节点（按下标升序）。
pub(in crate::nn::network) fn topological_order(
    node_count: usize,
    edges: &[(usize, usize)],
) -> Result<Vec<usize>, Vec<usize>> {
    let mut in_degree = vec![0usize; node_count];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for &(from, to) in edges {
        children[from].push(to);
        in_degree[to] += 1;
    }
    children.iter_mut().for_each(|c| c.sort_unstable());

    let mut roots: VecDeque<usize> = (0..node_count).filter(|&n| in_degree[n] == 0).collect();
    let mut order = Vec::with_capacity(node_count);
    while let Some(node) = roots.pop_front() {
        order.push(node);
        for &child in &children[node] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                roots.push_back(child);
            }
        }
    }

    if order.len() == node_count {
        Ok(order)
    } else {
        Err((0..node_count).filter(|&n| in_degree[n] > 0).collect())
    }
}

impl Network {
    /// 为传播做准备：计算求值顺序、网络的输入/输出维度
    ///
    /// 拓扑未变时直接返回，因此可以放心重复调用。
    /// 非循环连接成环时返回 `NetworkConstruction` 错误，且不改变网络状态。
    pub fn sort_modules(&mut self) -> Result<(), NetworkError> {
        if self.schedule.is_some() {
            return Ok(());
        }

        // 按模块名重新编号，排序结果随之按名称决胜
        let mut by_name: Vec<usize> = (0..self.modules.len()).collect();
        by_name.sort_by(|&a, &b| self.modules[a].name().cmp(self.modules[b].name()));
        let mut rank = vec![0usize; by_name.len()];
        for (r, &idx) in by_name.iter().enumerate() {
            rank[idx] = r;
        }

        let edges: Vec<(usize, usize)> = self
            .connections
            .iter()
            .filter(|c| !c.is_recurrent())
            .map(|c| {
                (
                    rank[self.module_index[&c.from()]],
                    rank[self.module_index[&c.to()]],
                )
            })
            .collect();

        let ranked = topological_order(self.modules.len(), &edges).map_err(|stuck| {
            let names: Vec<&str> = stuck
                .iter()
                .map(|&r| self.modules[by_name[r]].name())
                .collect();
            NetworkError::NetworkConstruction(format!(
                "loop in network graph（网络图中存在不经过循环连接的环），涉及模块：{names:?}"
            ))
        })?;
        let order: Vec<usize> = ranked.into_iter().map(|r| by_name[r]).collect();

        let mut incoming: Vec<Vec<Incoming>> = vec![Vec::new(); self.modules.len()];
        for (connection, c) in self.connections.iter().enumerate() {
            incoming[self.module_index[&c.to()]].push(Incoming {
                connection,
                source: self.module_index[&c.from()],
            });
        }

        let indim = self.dims_sum(&self.input_modules, Module::indim);
        let outdim = self.dims_sum(&self.output_modules, Module::outdim);
        if indim != self.indim || outdim != self.outdim {
            self.buffers = ModuleBuffers::new(indim, outdim, self.buffers.capacity());
            self.indim = indim;
            self.outdim = outdim;
        }
        self.warn_suspicious_topology();

        log::debug!(
            "网络{}排序完成：{:?}",
            self.name(),
            order.iter().map(|&i| self.modules[i].name()).collect::<Vec<_>>()
        );
        self.schedule = Some(Schedule { order, incoming });
        Ok(())
    }

    /// 求值顺序（模块 ID），未排序时返回 None
    pub fn sorted_modules(&self) -> Option<Vec<ModuleId>> {
        self.schedule
            .as_ref()
            .map(|s| s.order.iter().map(|&i| self.modules[i].id()).collect())
    }

    fn dims_sum(&self, ids: &[ModuleId], dim: fn(&Module) -> usize) -> usize {
        ids.iter()
            .filter_map(|id| self.module(*id))
            .map(dim)
            .sum()
    }

    /// 合法但多半是笔误的拓扑，只记日志
    fn warn_suspicious_topology(&self) {
        if self.input_modules.is_empty() {
            log::warn!("网络{}没有输入模块", self.name());
        }
        if self.output_modules.is_empty() {
            log::warn!("网络{}没有输出模块", self.name());
        }
        for module in &self.modules {
            let id = module.id();
            let touched = self.input_modules.contains(&id)
                || self.output_modules.contains(&id)
                || self
                    .connections
                    .iter()
                    .any(|c| c.from() == id || c.to() == id);
            if !touched {
                log::warn!("模块{module}既不是输入/输出模块，也没有任何连接");
            }
        }
    }
}
