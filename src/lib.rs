//! # Only Brain
//!
//! `only_brain`是一个用纯rust实现的模块化神经网络执行引擎：
//! 网络由具名模块与（可循环、可切片、可共享参数的）连接组成，
//! 按拓扑序逐时间步前向传播，再按逆序做随时间反向传播（BPTT），
//! 把梯度累加进各连接的参数容器，供外部优化器使用。
//!

pub mod errors;
pub mod nn;
pub mod utils;
