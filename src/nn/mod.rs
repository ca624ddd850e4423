/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : 模块化神经网络的执行引擎
 *
 * - buffer: 按时间步索引的缓冲区
 * - params: 参数容器与共享句柄
 * - module: 模块及其数值内核（含嵌套网络）
 * - connection: 连接及其数值内核
 * - network: 注册、排序、前向/反向传播
 */

mod buffer;
mod connection;
mod module;
mod network;
mod params;

pub use buffer::{BufferKind, ModuleBuffers, TimeBuffer};
pub use connection::{
    Connection, ConnectionId, ConnectionKind, ConnectionSpec, FullConnection, IdentityConnection,
    LinearConnection, TraitConnectionKernel,
};
pub use module::{
    BiasUnit, LinearLayer, Module, ModuleId, ModuleKind, NetworkModule, SigmoidLayer,
    SoftmaxLayer, TanhLayer, TraitModuleKernel,
};
pub use network::{
    ConnectionDescriptor, ModuleDescriptor, Network, NetworkConfig, NetworkDescriptor,
};
pub use params::{Init, ParamHandle, ParameterContainer};

#[cfg(test)]
mod tests;
