/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : 模块的数值内核（前向/反向契约）
 *
 * 层内核是其参数的纯函数，除引擎管理的缓冲区外不持有任何状态；
 * 嵌套网络内核见 nested.rs。
 */

use super::nested::NetworkModule;
use crate::errors::NetworkError;
use crate::nn::params::ParamHandle;
use enum_dispatch::enum_dispatch;
use ndarray::{ArrayView1, ArrayViewMut1, Zip};
use serde::{Deserialize, Serialize};

#[enum_dispatch]
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleKind {
    LinearLayer,
    SigmoidLayer,
    TanhLayer,
    SoftmaxLayer,
    BiasUnit,
    NetworkModule,
}

#[enum_dispatch(ModuleKind)]
pub trait TraitModuleKernel {
    fn type_name(&self) -> &'static str;

    /// 检查该内核能否工作在给定的输入/输出维度上（默认要求逐元素：两者相等）
    fn check_dims(&self, indim: usize, outdim: usize) -> Result<(), NetworkError> {
        if indim != outdim {
            return Err(NetworkError::GraphConstruction(format!(
                "{}是逐元素模块，输入维度{indim}与输出维度{outdim}必须相等",
                self.type_name()
            )));
        }
        Ok(())
    }

    /// 由输入计算输出（覆写 `output`）
    fn forward(
        &self,
        input: ArrayView1<f64>,
        output: ArrayViewMut1<f64>,
    ) -> Result<(), NetworkError>;

    /// 由输出误差计算输入误差（覆写 `input_error`）
    fn backward(
        &self,
        output_error: ArrayView1<f64>,
        input_error: ArrayViewMut1<f64>,
        output: ArrayView1<f64>,
        input: ArrayView1<f64>,
    ) -> Result<(), NetworkError>;

    /// 内核自带的参数容器（无状态内核没有）
    fn param_containers(&self) -> Vec<ParamHandle> {
        Vec::new()
    }

    /// 随宿主网络一起 reset 的内部状态
    fn reset(&self) {}
}

/// 恒等层：y = x
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearLayer;

impl TraitModuleKernel for LinearLayer {
    fn type_name(&self) -> &'static str {
        "LinearLayer"
    }

    fn forward(
        &self,
        input: ArrayView1<f64>,
        mut output: ArrayViewMut1<f64>,
    ) -> Result<(), NetworkError> {
        output.assign(&input);
        Ok(())
    }

    fn backward(
        &self,
        output_error: ArrayView1<f64>,
        mut input_error: ArrayViewMut1<f64>,
        _output: ArrayView1<f64>,
        _input: ArrayView1<f64>,
    ) -> Result<(), NetworkError> {
        input_error.assign(&output_error);
        Ok(())
    }
}

/// Sigmoid 层
///
/// forward: y = 1 / (1 + e^(-x))
/// backward: dy/dx = y * (1 - y)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigmoidLayer;

impl TraitModuleKernel for SigmoidLayer {
    fn type_name(&self) -> &'static str {
        "SigmoidLayer"
    }

    fn forward(
        &self,
        input: ArrayView1<f64>,
        output: ArrayViewMut1<f64>,
    ) -> Result<(), NetworkError> {
        Zip::from(output)
            .and(&input)
            .for_each(|y, &x| *y = 1.0 / (1.0 + (-x).exp()));
        Ok(())
    }

    fn backward(
        &self,
        output_error: ArrayView1<f64>,
        input_error: ArrayViewMut1<f64>,
        output: ArrayView1<f64>,
        _input: ArrayView1<f64>,
    ) -> Result<(), NetworkError> {
        Zip::from(input_error)
            .and(&output_error)
            .and(&output)
            .for_each(|e, &g, &y| *e = g * y * (1.0 - y));
        Ok(())
    }
}

/// Tanh 层
///
/// backward: d(tanh)/dx = 1 - tanh²(x)，直接用已缓存的输出计算
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TanhLayer;

impl TraitModuleKernel for TanhLayer {
    fn type_name(&self) -> &'static str {
        "TanhLayer"
    }

    fn forward(
        &self,
        input: ArrayView1<f64>,
        output: ArrayViewMut1<f64>,
    ) -> Result<(), NetworkError> {
        Zip::from(output).and(&input).for_each(|y, &x| *y = x.tanh());
        Ok(())
    }

    fn backward(
        &self,
        output_error: ArrayView1<f64>,
        input_error: ArrayViewMut1<f64>,
        output: ArrayView1<f64>,
        _input: ArrayView1<f64>,
    ) -> Result<(), NetworkError> {
        Zip::from(input_error)
            .and(&output_error)
            .and(&output)
            .for_each(|e, &g, &y| *e = g * (1.0 - y * y));
        Ok(())
    }
}

/// Softmax 层
///
/// 反向时误差原样透传：约定下游是交叉熵损失，其对 logits 的梯度已经是 `y - target`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftmaxLayer;

impl TraitModuleKernel for SoftmaxLayer {
    fn type_name(&self) -> &'static str {
        "SoftmaxLayer"
    }

    fn forward(
        &self,
        input: ArrayView1<f64>,
        mut output: ArrayViewMut1<f64>,
    ) -> Result<(), NetworkError> {
        // 减去最大值，避免 exp 溢出
        let max = input.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Zip::from(&mut output)
            .and(&input)
            .for_each(|y, &x| *y = (x - max).exp());
        let sum = output.sum();
        if sum > 0.0 {
            output.mapv_inplace(|y| y / sum);
        }
        Ok(())
    }

    fn backward(
        &self,
        output_error: ArrayView1<f64>,
        mut input_error: ArrayViewMut1<f64>,
        _output: ArrayView1<f64>,
        _input: ArrayView1<f64>,
    ) -> Result<(), NetworkError> {
        input_error.assign(&output_error);
        Ok(())
    }
}

/// 偏置单元：输出恒为 1，不向上游传播误差
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasUnit;

impl TraitModuleKernel for BiasUnit {
    fn type_name(&self) -> &'static str {
        "BiasUnit"
    }

    fn forward(
        &self,
        _input: ArrayView1<f64>,
        mut output: ArrayViewMut1<f64>,
    ) -> Result<(), NetworkError> {
        output.fill(1.0);
        Ok(())
    }

    fn backward(
        &self,
        _output_error: ArrayView1<f64>,
        mut input_error: ArrayViewMut1<f64>,
        _output: ArrayView1<f64>,
        _input: ArrayView1<f64>,
    ) -> Result<(), NetworkError> {
        input_error.fill(0.0);
        Ok(())
    }
}
