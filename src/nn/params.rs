/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : 参数容器（Parameter Container）及其共享句柄
 *
 * 容器持有一条扁平参数向量和一条等长的导数累加器。
 * 可被一条连接独占，也可作为“母容器”被多条连接（甚至多个网络）共享，
 * 共享时物理上只有一份导数缓冲区，各连接的贡献一律累加。
 */

use crate::errors::NetworkError;
use ndarray::{Array1, ArrayView1, ArrayViewMut1};
use rand::distributions::{Distribution, Standard};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

// ==================== Init 枚举 ====================

/// 参数初始化策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Init {
    /// 全零
    Zeros,
    /// 常数初始化
    Constant(f64),
    /// 正态分布（使用网络的 RNG）
    Normal { mean: f64, std: f64 },
}

impl Default for Init {
    fn default() -> Self {
        Self::Normal {
            mean: 0.0,
            std: 1.0,
        }
    }
}

impl Init {
    /// 生成长度为 `len` 的初始参数
    pub fn generate_with_rng(&self, len: usize, rng: &mut StdRng) -> Array1<f64> {
        match self {
            Self::Zeros => Array1::zeros(len),
            Self::Constant(v) => Array1::from_elem(len, *v),
            Self::Normal { mean, std } => Array1::from(normal_samples(*mean, *std, len, rng)),
        }
    }
}

/// Box-Muller 变换生成正态分布样本
fn normal_samples(mean: f64, std_dev: f64, len: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut data = Vec::with_capacity(len);
    while data.len() < len {
        let u1: f64 = Standard.sample(rng);
        let u2: f64 = Standard.sample(rng);
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f64::consts::PI * u2;
        let z0 = mean + std_dev * r * theta.cos();
        let z1 = mean + std_dev * r * theta.sin();

        if z0.is_finite() {
            data.push(z0);
        }
        if data.len() < len && z1.is_finite() {
            data.push(z1);
        }
    }
    data
}

// ==================== 参数容器 ====================

/// 扁平参数向量 + 导数累加器
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterContainer {
    params: Array1<f64>,
    derivs: Array1<f64>,
}

impl ParameterContainer {
    pub fn zeros(len: usize) -> Self {
        Self::from_array(Array1::zeros(len))
    }

    pub fn from_array(params: Array1<f64>) -> Self {
        let derivs = Array1::zeros(params.len());
        Self { params, derivs }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn params(&self) -> ArrayView1<'_, f64> {
        self.params.view()
    }

    pub fn derivatives(&self) -> ArrayView1<'_, f64> {
        self.derivs.view()
    }

    /// 原地覆写参数，长度必须一致
    pub fn set_parameters(&mut self, values: &[f64]) -> Result<(), NetworkError> {
        if values.len() != self.len() {
            return Err(NetworkError::dimension_mismatch(
                self.len(),
                values.len(),
                "参数向量长度与容器不符",
            ));
        }
        self.params
            .iter_mut()
            .zip(values)
            .for_each(|(p, &v)| *p = v);
        Ok(())
    }

    pub fn reset_derivatives(&mut self) {
        self.derivs.fill(0.0);
    }

    /// 同时拿到只读参数与可写导数，供连接的反向传播累加梯度
    pub(in crate::nn) fn split_mut(&mut self) -> (ArrayView1<'_, f64>, ArrayViewMut1<'_, f64>) {
        (self.params.view(), self.derivs.view_mut())
    }
}

// ==================== 共享句柄 ====================

/// 参数容器句柄
///
/// Clone 语义：多个句柄引用同一个容器（权值共享）。
/// 网络内部只通过句柄访问容器，从不深拷贝，保证共享不变式。
#[derive(Clone)]
pub struct ParamHandle {
    inner: Rc<RefCell<ParameterContainer>>,
}

impl ParamHandle {
    pub fn new(container: ParameterContainer) -> Self {
        Self {
            inner: Rc::new(RefCell::new(container)),
        }
    }

    /// 创建一个全零的母容器，供多条连接共享
    pub fn new_shared(len: usize) -> Self {
        Self::new(ParameterContainer::zeros(len))
    }

    pub fn from_values(values: &[f64]) -> Self {
        Self::new(ParameterContainer::from_array(Array1::from(values.to_vec())))
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    pub fn params(&self) -> Array1<f64> {
        self.inner.borrow().params().to_owned()
    }

    pub fn derivatives(&self) -> Array1<f64> {
        self.inner.borrow().derivatives().to_owned()
    }

    pub fn set_parameters(&self, values: &[f64]) -> Result<(), NetworkError> {
        self.inner.borrow_mut().set_parameters(values)
    }

    pub fn reset_derivatives(&self) {
        self.inner.borrow_mut().reset_derivatives();
    }

    /// 当前引用该容器的句柄数
    pub fn share_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn borrow(&self) -> Ref<'_, ParameterContainer> {
        self.inner.borrow()
    }

    pub(in crate::nn) fn borrow_mut(&self) -> RefMut<'_, ParameterContainer> {
        self.inner.borrow_mut()
    }
}

impl fmt::Debug for ParamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamHandle")
            .field("len", &self.len())
            .field("share_count", &self.share_count())
            .finish()
    }
}
