/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : 连接的数值内核
 *
 * 前向：把变换后的源输出累加进目标输入；
 * 反向：把目标输入误差反变换后累加进源输出误差，同时累加参数导数。
 * 所有写操作都是“累加”，因此重复连接、共享参数的贡献天然求和。
 */

use crate::errors::NetworkError;
use enum_dispatch::enum_dispatch;
use ndarray::{s, ArrayView1, ArrayViewMut1, Zip};
use serde::{Deserialize, Serialize};

#[enum_dispatch]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionKind {
    FullConnection,
    IdentityConnection,
    LinearConnection,
}

#[enum_dispatch(ConnectionKind)]
pub trait TraitConnectionKernel {
    fn type_name(&self) -> &'static str;

    /// 给定切片后的输入/输出维度，返回所需参数量；维度组合不合法时报错
    fn param_dim(&self, indim: usize, outdim: usize) -> Result<usize, NetworkError>;

    /// output += f(input; params)
    fn forward(
        &self,
        input: ArrayView1<f64>,
        output: ArrayViewMut1<f64>,
        params: ArrayView1<f64>,
    );

    /// input_error += f'ᵀ(output_error)；derivs += ∂/∂params
    fn backward(
        &self,
        output_error: ArrayView1<f64>,
        input_error: ArrayViewMut1<f64>,
        input: ArrayView1<f64>,
        params: ArrayView1<f64>,
        derivs: ArrayViewMut1<f64>,
    );
}

fn require_equal_dims(name: &str, indim: usize, outdim: usize) -> Result<(), NetworkError> {
    if indim != outdim {
        return Err(NetworkError::GraphConstruction(format!(
            "{name}要求两端切片维度相等，实际为{indim}与{outdim}"
        )));
    }
    Ok(())
}

/// 全连接：参数按行主序存放为 `outdim × indim` 的矩阵 W，y += W·x
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullConnection;

impl TraitConnectionKernel for FullConnection {
    fn type_name(&self) -> &'static str {
        "FullConnection"
    }

    fn param_dim(&self, indim: usize, outdim: usize) -> Result<usize, NetworkError> {
        Ok(indim * outdim)
    }

    fn forward(
        &self,
        input: ArrayView1<f64>,
        mut output: ArrayViewMut1<f64>,
        params: ArrayView1<f64>,
    ) {
        let indim = input.len();
        for (i, y) in output.iter_mut().enumerate() {
            let row = params.slice(s![i * indim..(i + 1) * indim]);
            *y += row.dot(&input);
        }
    }

    fn backward(
        &self,
        output_error: ArrayView1<f64>,
        mut input_error: ArrayViewMut1<f64>,
        input: ArrayView1<f64>,
        params: ArrayView1<f64>,
        mut derivs: ArrayViewMut1<f64>,
    ) {
        let indim = input.len();
        for (i, &g) in output_error.iter().enumerate() {
            let (from, to) = (i * indim, (i + 1) * indim);
            input_error.scaled_add(g, &params.slice(s![from..to]));
            // dW[i, j] += outerr[i] * x[j]
            derivs.slice_mut(s![from..to]).scaled_add(g, &input);
        }
    }
}

/// 恒等连接：无参数，y += x
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConnection;

impl TraitConnectionKernel for IdentityConnection {
    fn type_name(&self) -> &'static str {
        "IdentityConnection"
    }

    fn param_dim(&self, indim: usize, outdim: usize) -> Result<usize, NetworkError> {
        require_equal_dims(self.type_name(), indim, outdim)?;
        Ok(0)
    }

    fn forward(
        &self,
        input: ArrayView1<f64>,
        mut output: ArrayViewMut1<f64>,
        _params: ArrayView1<f64>,
    ) {
        output += &input;
    }

    fn backward(
        &self,
        output_error: ArrayView1<f64>,
        mut input_error: ArrayViewMut1<f64>,
        _input: ArrayView1<f64>,
        _params: ArrayView1<f64>,
        _derivs: ArrayViewMut1<f64>,
    ) {
        input_error += &output_error;
    }
}

/// 逐元素线性连接：每个分量一个权重，y += w ⊙ x
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearConnection;

impl TraitConnectionKernel for LinearConnection {
    fn type_name(&self) -> &'static str {
        "LinearConnection"
    }

    fn param_dim(&self, indim: usize, outdim: usize) -> Result<usize, NetworkError> {
        require_equal_dims(self.type_name(), indim, outdim)?;
        Ok(indim)
    }

    fn forward(
        &self,
        input: ArrayView1<f64>,
        output: ArrayViewMut1<f64>,
        params: ArrayView1<f64>,
    ) {
        Zip::from(output)
            .and(&input)
            .and(&params)
            .for_each(|y, &x, &w| *y += w * x);
    }

    fn backward(
        &self,
        output_error: ArrayView1<f64>,
        input_error: ArrayViewMut1<f64>,
        input: ArrayView1<f64>,
        params: ArrayView1<f64>,
        derivs: ArrayViewMut1<f64>,
    ) {
        Zip::from(input_error)
            .and(derivs)
            .and(&output_error)
            .and(&input)
            .and(&params)
            .for_each(|e, d, &g, &x, &w| {
                *e += w * g;
                *d += g * x;
            });
    }
}
