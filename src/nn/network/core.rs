/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : Network 构造、模块/连接注册与访问器
 */

use super::{Network, NetworkConfig};
use crate::errors::NetworkError;
use crate::nn::buffer::ModuleBuffers;
use crate::nn::connection::{Connection, ConnectionId, ConnectionSpec, TraitConnectionKernel};
use crate::nn::module::{Module, ModuleId, TraitModuleKernel};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

impl Network {
    // ========== 创建 ==========

    pub fn new() -> Self {
        Self::from_config(NetworkConfig::default())
    }

    pub fn with_name(name: &str) -> Self {
        Self::from_config(NetworkConfig::default().with_name(name))
    }

    /// 创建一个带固定种子的网络（确保参数初始化可重复）
    pub fn new_with_seed(seed: u64) -> Self {
        Self::from_config(NetworkConfig::default().with_seed(seed))
    }

    pub fn with_name_and_seed(name: &str, seed: u64) -> Self {
        Self::from_config(NetworkConfig::default().with_name(name).with_seed(seed))
    }

    pub fn from_config(config: NetworkConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            modules: Vec::new(),
            module_index: HashMap::new(),
            input_modules: Vec::new(),
            output_modules: Vec::new(),
            connections: Vec::new(),
            schedule: None,
            indim: 0,
            outdim: 0,
            buffers: ModuleBuffers::new(0, 0, 1),
            offset: 0,
            max_offset: 0,
        }
    }

    // ========== 注册 ==========

    /// 注册模块，返回其 ID
    pub fn add_module(&mut self, mut module: Module) -> Result<ModuleId, NetworkError> {
        // Clone 出来的模块沿用原 ID
        if self.module_index.contains_key(&module.id()) {
            return Err(NetworkError::GraphConstruction(format!(
                "模块{}已注册到网络{}",
                module.id(),
                self.name()
            )));
        }
        module.kind().check_dims(module.indim(), module.outdim())?;
        let name = self.generate_valid_module_name(module.name(), module.type_name())?;
        module.set_name(name);
        module
            .buffers_mut()
            .grow_to(self.config.initial_capacity.max(1));

        let id = module.id();
        log::debug!("网络{}注册模块{module}", self.config.name);
        self.module_index.insert(id, self.modules.len());
        self.modules.push(module);
        self.invalidate();
        Ok(id)
    }

    /// 注册模块并标记为输入模块（网络输入按标记顺序拼接）
    pub fn add_input_module(&mut self, module: Module) -> Result<ModuleId, NetworkError> {
        let id = self.add_module(module)?;
        self.mark_input(id)?;
        Ok(id)
    }

    /// 注册模块并标记为输出模块（网络输出按标记顺序拼接）
    pub fn add_output_module(&mut self, module: Module) -> Result<ModuleId, NetworkError> {
        let id = self.add_module(module)?;
        self.mark_output(id)?;
        Ok(id)
    }

    /// 把已注册的模块标记为输入模块，重复标记无操作
    ///
    /// 同一模块可以同时是输入和输出模块。
    pub fn mark_input(&mut self, id: ModuleId) -> Result<(), NetworkError> {
        self.module_position(id)?;
        if !self.input_modules.contains(&id) {
            self.input_modules.push(id);
            self.invalidate();
        }
        Ok(())
    }

    /// 把已注册的模块标记为输出模块，重复标记无操作
    pub fn mark_output(&mut self, id: ModuleId) -> Result<(), NetworkError> {
        self.module_position(id)?;
        if !self.output_modules.contains(&id) {
            self.output_modules.push(id);
            self.invalidate();
        }
        Ok(())
    }

    /// 注册普通连接：同一时间步内从源模块流向目标模块
    pub fn add_connection(&mut self, spec: ConnectionSpec) -> Result<ConnectionId, NetworkError> {
        self.register_connection(spec, false)
    }

    /// 注册循环连接：目标模块在第 `t` 步读取源模块第 `t-1` 步的输出，不参与无环检查
    pub fn add_recurrent_connection(
        &mut self,
        spec: ConnectionSpec,
    ) -> Result<ConnectionId, NetworkError> {
        self.register_connection(spec, true)
    }

    fn register_connection(
        &mut self,
        spec: ConnectionSpec,
        recurrent: bool,
    ) -> Result<ConnectionId, NetworkError> {
        let source_idx = self.module_position(spec.from())?;
        let dest_idx = self.module_position(spec.to())?;
        let name = match spec.explicit_name() {
            Some(name) => name.to_string(),
            None => format!("{}_{}", spec.kind().type_name(), self.connections.len() + 1),
        };

        // 先解析（可能失败），成功后才修改网络
        let connection = Connection::resolve(
            spec,
            name,
            &self.modules[source_idx],
            &self.modules[dest_idx],
            recurrent,
            &self.config.init,
            &mut self.rng,
        )?;

        if self.connections.iter().any(|c| is_duplicate(c, &connection)) {
            log::debug!("连接{connection}与已有连接重复，二者的作用将叠加");
        }
        log::debug!("网络{}注册连接{connection}", self.config.name);

        let id = ConnectionId(self.connections.len());
        self.connections.push(connection);
        self.invalidate();
        Ok(id)
    }

    /// 拓扑变化后缓存的求值顺序失效
    pub(in crate::nn::network) fn invalidate(&mut self) {
        self.schedule = None;
    }

    // ========== 名称生成 ==========

    fn check_duplicate_module_name(&self, name: &str) -> Result<(), NetworkError> {
        if self.modules.iter().any(|m| m.name() == name) {
            return Err(NetworkError::GraphConstruction(format!(
                "模块{}在网络{}中重复",
                name,
                self.name()
            )));
        }
        Ok(())
    }

    fn generate_valid_module_name(
        &self,
        base_name: &str,
        type_name: &str,
    ) -> Result<String, NetworkError> {
        if !base_name.is_empty() {
            self.check_duplicate_module_name(base_name)?;
            return Ok(base_name.to_string());
        }

        let mut counter = 1;
        loop {
            let name = format!("{type_name}_{counter}");
            if self.check_duplicate_module_name(&name).is_ok() {
                return Ok(name);
            }
            counter += 1;
        }
    }

    // ========== 基础访问器 ==========

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub const fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// 网络输入维度（输入模块 indim 之和，排序后有效）
    pub const fn indim(&self) -> usize {
        self.indim
    }

    /// 网络输出维度（输出模块 outdim 之和，排序后有效）
    pub const fn outdim(&self) -> usize {
        self.outdim
    }

    /// 当前时间步指针
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// 自上次 reset 起前向推进到的最远时间步数
    pub const fn sequence_len(&self) -> usize {
        self.max_offset
    }

    pub const fn is_sorted(&self) -> bool {
        self.schedule.is_some()
    }

    pub fn modules_count(&self) -> usize {
        self.modules.len()
    }

    /// 所有模块 ID（注册顺序）
    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.modules.iter().map(Module::id).collect()
    }

    pub fn input_modules(&self) -> &[ModuleId] {
        &self.input_modules
    }

    pub fn output_modules(&self) -> &[ModuleId] {
        &self.output_modules
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.module_index.get(&id).map(|&idx| &self.modules[idx])
    }

    pub fn module_by_name(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name() == name)
    }

    pub fn module_buffers(&self, id: ModuleId) -> Option<&ModuleBuffers> {
        self.module(id).map(Module::buffers)
    }

    /// 网络自身的缓冲区（外部输入/输出及其误差）
    pub const fn network_buffers(&self) -> &ModuleBuffers {
        &self.buffers
    }

    /// 模块在 `modules` 中的下标
    pub(in crate::nn::network) fn module_position(&self, id: ModuleId) -> Result<usize, NetworkError> {
        self.module_index.get(&id).copied().ok_or_else(|| {
            NetworkError::GraphConstruction(format!("模块{id}未注册到网络{}", self.name()))
        })
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(id.0)
    }

    pub fn connection_by_name(&self, name: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.name() == name)
    }

    /// 只含循环连接
    pub fn recurrent_connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(|c| c.is_recurrent())
    }

    pub fn has_recurrent_connections(&self) -> bool {
        self.connections.iter().any(Connection::is_recurrent)
    }
}

/// 端点、切片、类型与循环属性都相同
fn is_duplicate(a: &Connection, b: &Connection) -> bool {
    a.from() == b.from()
        && a.to() == b.to()
        && a.in_slice() == b.in_slice()
        && a.out_slice() == b.out_slice()
        && a.kind() == b.kind()
        && a.is_recurrent() == b.is_recurrent()
}
