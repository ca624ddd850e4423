/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : Network 执行引擎
 *
 * 各 impl 块分散在子模块中：
 * - core.rs: 构造、注册模块/连接、访问器
 * - sort.rs: 拓扑排序（只考虑非循环边）
 * - forward.rs: 前向传播 activate
 * - backward.rs: 反向传播 back_activate（BPTT）
 * - params.rs: 扁平参数/导数视图、reset
 * - describe.rs: 网络描述符与 Display
 */

mod backward;
mod core;
mod describe;
mod forward;
mod params;
mod sort;

pub use describe::{ConnectionDescriptor, ModuleDescriptor, NetworkDescriptor};

use super::buffer::ModuleBuffers;
use super::connection::Connection;
use super::module::{Module, ModuleId};
use super::params::Init;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 网络配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    /// 参数初始化的随机种子，None 表示每次运行都不同
    pub seed: Option<u64>,
    /// 模块缓冲区在注册时预留的时间步数（向上取 2 的幂）
    pub initial_capacity: usize,
    /// 新建私有参数容器时的初始化策略
    pub init: Init,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "default_network".to_string(),
            seed: None,
            initial_capacity: 2,
            init: Init::default(),
        }
    }
}

impl NetworkConfig {
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub const fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_init(mut self, init: Init) -> Self {
        self.init = init;
        self
    }
}

/// 入边引用：连接序号 + 源模块在 `modules` 中的下标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(in crate::nn::network) struct Incoming {
    pub(in crate::nn::network) connection: usize,
    pub(in crate::nn::network) source: usize,
}

/// 排序结果，拓扑不变时一直有效
#[derive(Debug, Clone)]
pub(in crate::nn::network) struct Schedule {
    /// 求值顺序（`modules` 下标）
    pub(in crate::nn::network) order: Vec<usize>,
    /// 每个模块的入边（含循环边），按连接注册顺序
    pub(in crate::nn::network) incoming: Vec<Vec<Incoming>>,
}

/// 由模块与连接组成的可训练网络
///
/// 网络本身也是模块：排序后具有 `indim`/`outdim`，并持有自己的 4 个缓冲区，
/// 逐步记录外部输入、输出及两类误差；可经 [`Module::network`] 嵌入另一个网络。
pub struct Network {
    pub(in crate::nn::network) config: NetworkConfig,
    pub(in crate::nn::network) rng: StdRng,
    /// 按注册顺序存放
    pub(in crate::nn::network) modules: Vec<Module>,
    pub(in crate::nn::network) module_index: HashMap<ModuleId, usize>,
    pub(in crate::nn::network) input_modules: Vec<ModuleId>,
    pub(in crate::nn::network) output_modules: Vec<ModuleId>,
    /// 普通连接与循环连接统一按注册顺序存放，靠 `is_recurrent()` 区分
    pub(in crate::nn::network) connections: Vec<Connection>,
    /// None 表示拓扑已变化、需要重新排序
    pub(in crate::nn::network) schedule: Option<Schedule>,
    pub(in crate::nn::network) indim: usize,
    pub(in crate::nn::network) outdim: usize,
    pub(in crate::nn::network) buffers: ModuleBuffers,
    /// 前向步数减反向步数（自上次 reset 起）
    pub(in crate::nn::network) offset: usize,
    /// 自上次 reset 起 offset 到达过的最大值
    pub(in crate::nn::network) max_offset: usize,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}
