/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : 把一个已排序的网络当作模块嵌入另一个网络
 *
 * 外层网络在第 t 步调用内层的 activate / back_activate，
 * 两者的时间指针因此同步前进、同步回退；外层 reset 时内层一起 reset。
 */

use super::TraitModuleKernel;
use crate::errors::NetworkError;
use crate::nn::network::Network;
use crate::nn::params::ParamHandle;
use ndarray::{ArrayView1, ArrayViewMut1};
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// 内层网络句柄
///
/// Clone 出来的句柄指向同一个内层网络。
#[derive(Clone)]
pub struct NetworkModule {
    inner: Rc<RefCell<Network>>,
}

impl NetworkModule {
    /// 接管 `network`：先排序并 reset，使其时间指针从 0 开始
    pub fn new(mut network: Network) -> Result<Self, NetworkError> {
        network.sort_modules()?;
        network.reset();
        Ok(Self {
            inner: Rc::new(RefCell::new(network)),
        })
    }

    pub fn indim(&self) -> usize {
        self.inner.borrow().indim()
    }

    pub fn outdim(&self) -> usize {
        self.inner.borrow().outdim()
    }

    /// 只读访问内层网络（查看其缓冲区、参数等）
    pub fn network(&self) -> Ref<'_, Network> {
        self.inner.borrow()
    }
}

impl PartialEq for NetworkModule {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for NetworkModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let network = self.inner.borrow();
        f.debug_struct("NetworkModule")
            .field("name", &network.name())
            .field("indim", &network.indim())
            .field("outdim", &network.outdim())
            .finish()
    }
}

impl TraitModuleKernel for NetworkModule {
    fn type_name(&self) -> &'static str {
        "Network"
    }

    fn check_dims(&self, indim: usize, outdim: usize) -> Result<(), NetworkError> {
        let expected = (self.indim(), self.outdim());
        if (indim, outdim) != expected {
            return Err(NetworkError::GraphConstruction(format!(
                "内层网络的维度为{}→{}，不能作为{indim}→{outdim}的模块",
                expected.0, expected.1
            )));
        }
        Ok(())
    }

    fn forward(
        &self,
        input: ArrayView1<f64>,
        mut output: ArrayViewMut1<f64>,
    ) -> Result<(), NetworkError> {
        let y = self.inner.borrow_mut().activate(&input.to_vec())?;
        output.assign(&y);
        Ok(())
    }

    fn backward(
        &self,
        output_error: ArrayView1<f64>,
        mut input_error: ArrayViewMut1<f64>,
        _output: ArrayView1<f64>,
        _input: ArrayView1<f64>,
    ) -> Result<(), NetworkError> {
        let e = self
            .inner
            .borrow_mut()
            .back_activate(&output_error.to_vec())?;
        input_error.assign(&e);
        Ok(())
    }

    fn param_containers(&self) -> Vec<ParamHandle> {
        self.inner.borrow().param_containers()
    }

    fn reset(&self) {
        self.inner.borrow_mut().reset();
    }
}
