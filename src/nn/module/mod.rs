/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : 模块（Module）：具名计算节点，固定输入/输出维度，持有 4 个时间索引缓冲区
 */

mod kernels;
mod nested;

pub use kernels::{
    BiasUnit, LinearLayer, ModuleKind, SigmoidLayer, SoftmaxLayer, TanhLayer, TraitModuleKernel,
};
pub use nested::NetworkModule;

use super::buffer::ModuleBuffers;
use super::network::Network;
use super::params::ParamHandle;
use crate::errors::NetworkError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// 模块 ID，进程内全局唯一，因此能准确识别“未注册到本网络”的模块
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(pub(crate) u64);

impl ModuleId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Module {
    id: ModuleId,
    /// 为空表示未命名，注册到网络时自动生成
    name: String,
    indim: usize,
    outdim: usize,
    kind: ModuleKind,
    buffers: ModuleBuffers,
}

impl Module {
    /// 创建输入、输出维度相同的模块
    pub fn new<K: Into<ModuleKind>>(kind: K, dim: usize) -> Self {
        let kind = kind.into();
        Self {
            id: ModuleId::next(),
            name: String::new(),
            indim: dim,
            outdim: dim,
            kind,
            buffers: ModuleBuffers::new(dim, dim, 1),
        }
    }

    /// 创建输入、输出维度可以不同的模块，由内核校验维度组合是否合法
    pub fn with_dims<K: Into<ModuleKind>>(
        kind: K,
        indim: usize,
        outdim: usize,
    ) -> Result<Self, NetworkError> {
        let kind = kind.into();
        kind.check_dims(indim, outdim)?;
        Ok(Self {
            id: ModuleId::next(),
            name: String::new(),
            indim,
            outdim,
            kind,
            buffers: ModuleBuffers::new(indim, outdim, 1),
        })
    }

    pub fn linear(dim: usize) -> Self {
        Self::new(LinearLayer, dim)
    }

    pub fn sigmoid(dim: usize) -> Self {
        Self::new(SigmoidLayer, dim)
    }

    pub fn tanh(dim: usize) -> Self {
        Self::new(TanhLayer, dim)
    }

    pub fn softmax(dim: usize) -> Self {
        Self::new(SoftmaxLayer, dim)
    }

    pub fn bias() -> Self {
        Self::new(BiasUnit, 1)
    }

    /// 把网络包装成模块（嵌套），维度取内层网络排序后的 indim/outdim
    pub fn network(network: Network) -> Result<Self, NetworkError> {
        let nested = NetworkModule::new(network)?;
        let (indim, outdim) = (nested.indim(), nested.outdim());
        Self::with_dims(nested, indim, outdim)
    }

    /// 指定模块名（须在所属网络内唯一）
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub const fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn indim(&self) -> usize {
        self.indim
    }

    pub const fn outdim(&self) -> usize {
        self.outdim
    }

    pub const fn kind(&self) -> &ModuleKind {
        &self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub const fn buffers(&self) -> &ModuleBuffers {
        &self.buffers
    }

    pub(in crate::nn) fn buffers_mut(&mut self) -> &mut ModuleBuffers {
        &mut self.buffers
    }

    pub(in crate::nn) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// 内核自带的参数容器（嵌套网络的参数）
    pub fn param_containers(&self) -> Vec<ParamHandle> {
        self.kind.param_containers()
    }

    /// 清空缓冲区，并 reset 内核的内部状态
    pub(in crate::nn) fn reset(&mut self) {
        self.buffers.clear();
        self.kind.reset();
    }

    /// 由第 `t` 行输入计算第 `t` 行输出
    pub(in crate::nn) fn forward_at(&mut self, t: usize) -> Result<(), NetworkError> {
        self.buffers.reserve(t);
        let ModuleBuffers { input, output, .. } = &mut self.buffers;
        self.kind.forward(input.at(t), output.row_mut(t))
    }

    /// 由第 `t` 行输出误差计算第 `t` 行输入误差
    pub(in crate::nn) fn backward_at(&mut self, t: usize) -> Result<(), NetworkError> {
        self.buffers.reserve(t);
        let ModuleBuffers {
            input,
            output,
            input_error,
            output_error,
        } = &mut self.buffers;
        self.kind.backward(
            output_error.at(t),
            input_error.row_mut(t),
            output.at(t),
            input.at(t),
        )
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} '{}' {}→{}>",
            self.type_name(),
            self.name,
            self.indim,
            self.outdim
        )
    }
}
