/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : 连接（Connection）：两个模块间有向、可带参数、可切片、可循环的边
 *
 * 用户先构造 `ConnectionSpec` 描述意图，注册到网络时才根据端点维度解析成 `Connection`
 * （确定切片、参数量并分配/绑定参数容器）。连接只以 `ModuleId` 引用端点，不拥有它们。
 */

mod kernels;

pub use kernels::{
    ConnectionKind, FullConnection, IdentityConnection, LinearConnection, TraitConnectionKernel,
};

use super::module::{Module, ModuleId};
use super::params::{Init, ParamHandle, ParameterContainer};
use crate::errors::NetworkError;
use ndarray::{s, Array1, ArrayView1, ArrayViewMut1};
use rand::rngs::StdRng;
use std::fmt;
use std::ops::Range;

/// 参数来源
#[derive(Debug, Clone)]
enum ParamSource {
    /// 注册时按网络的初始化策略新建私有容器
    Fresh,
    /// 绑定到已有（通常是共享的）容器
    Shared(ParamHandle),
    /// 用给定的值新建私有容器
    Values(Vec<f64>),
}

/// 尚未注册的连接描述
#[derive(Debug, Clone)]
pub struct ConnectionSpec {
    kind: ConnectionKind,
    from: ModuleId,
    to: ModuleId,
    name: Option<String>,
    in_slice: Option<(usize, usize)>,
    out_slice: Option<(usize, usize)>,
    params: ParamSource,
}

impl ConnectionSpec {
    pub fn new<K: Into<ConnectionKind>>(kind: K, from: ModuleId, to: ModuleId) -> Self {
        Self {
            kind: kind.into(),
            from,
            to,
            name: None,
            in_slice: None,
            out_slice: None,
            params: ParamSource::Fresh,
        }
    }

    pub fn full(from: ModuleId, to: ModuleId) -> Self {
        Self::new(FullConnection, from, to)
    }

    pub fn identity(from: ModuleId, to: ModuleId) -> Self {
        Self::new(IdentityConnection, from, to)
    }

    pub fn linear(from: ModuleId, to: ModuleId) -> Self {
        Self::new(LinearConnection, from, to)
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// 只读取源模块输出的 `[from, to)` 分量
    pub fn in_slice(mut self, from: usize, to: usize) -> Self {
        self.in_slice = Some((from, to));
        self
    }

    /// 只写入目标模块输入的 `[from, to)` 分量
    pub fn out_slice(mut self, from: usize, to: usize) -> Self {
        self.out_slice = Some((from, to));
        self
    }

    /// 绑定到共享的母容器（权值共享）
    pub fn shared(mut self, handle: &ParamHandle) -> Self {
        self.params = ParamSource::Shared(handle.clone());
        self
    }

    /// 以给定参数值创建私有容器
    pub fn with_params(mut self, values: &[f64]) -> Self {
        self.params = ParamSource::Values(values.to_vec());
        self
    }

    pub const fn from(&self) -> ModuleId {
        self.from
    }

    pub const fn to(&self) -> ModuleId {
        self.to
    }

    pub const fn kind(&self) -> &ConnectionKind {
        &self.kind
    }

    pub(in crate::nn) fn explicit_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// 连接在所属网络中的注册序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub(crate) usize);

impl ConnectionId {
    pub const fn index(&self) -> usize {
        self.0
    }
}

/// 已注册、已解析的连接
#[derive(Debug, Clone)]
pub struct Connection {
    name: String,
    kind: ConnectionKind,
    from: ModuleId,
    to: ModuleId,
    in_slice: Range<usize>,
    out_slice: Range<usize>,
    params: Option<ParamHandle>,
    shared: bool,
    recurrent: bool,
}

/// 校验切片 `[from, to)` 落在 `[0, dim]` 内且非空
fn resolve_slice(
    slice: Option<(usize, usize)>,
    dim: usize,
    what: &str,
) -> Result<Range<usize>, NetworkError> {
    let (from, to) = slice.unwrap_or((0, dim));
    if from >= to || to > dim {
        return Err(NetworkError::GraphConstruction(format!(
            "{what}切片[{from}, {to})非法，端点维度为{dim}"
        )));
    }
    Ok(from..to)
}

impl Connection {
    /// 依据端点模块解析连接描述
    pub(in crate::nn) fn resolve(
        spec: ConnectionSpec,
        name: String,
        source: &Module,
        dest: &Module,
        recurrent: bool,
        init: &Init,
        rng: &mut StdRng,
    ) -> Result<Self, NetworkError> {
        let in_slice = resolve_slice(spec.in_slice, source.outdim(), "源模块输出")?;
        let out_slice = resolve_slice(spec.out_slice, dest.indim(), "目标模块输入")?;
        let paramdim = spec.kind.param_dim(in_slice.len(), out_slice.len())?;

        let (params, shared) = match spec.params {
            ParamSource::Fresh if paramdim == 0 => (None, false),
            ParamSource::Fresh => {
                let values = init.generate_with_rng(paramdim, rng);
                (Some(ParamHandle::new(ParameterContainer::from_array(values))), false)
            }
            ParamSource::Values(values) => {
                if values.len() != paramdim {
                    return Err(NetworkError::GraphConstruction(format!(
                        "连接{name}需要{paramdim}个参数，实际给出{}个",
                        values.len()
                    )));
                }
                if paramdim == 0 {
                    (None, false)
                } else {
                    (Some(ParamHandle::from_values(&values)), false)
                }
            }
            ParamSource::Shared(handle) => {
                if paramdim == 0 || handle.len() != paramdim {
                    return Err(NetworkError::GraphConstruction(format!(
                        "连接{name}需要{paramdim}个参数，共享容器长度为{}",
                        handle.len()
                    )));
                }
                (Some(handle), true)
            }
        };

        Ok(Self {
            name,
            kind: spec.kind,
            from: source.id(),
            to: dest.id(),
            in_slice,
            out_slice,
            params,
            shared,
            recurrent,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn kind(&self) -> &ConnectionKind {
        &self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub const fn from(&self) -> ModuleId {
        self.from
    }

    pub const fn to(&self) -> ModuleId {
        self.to
    }

    pub fn in_slice(&self) -> Range<usize> {
        self.in_slice.clone()
    }

    pub fn out_slice(&self) -> Range<usize> {
        self.out_slice.clone()
    }

    /// 切片后的输入维度
    pub fn indim(&self) -> usize {
        self.in_slice.len()
    }

    /// 切片后的输出维度
    pub fn outdim(&self) -> usize {
        self.out_slice.len()
    }

    pub fn paramdim(&self) -> usize {
        self.params.as_ref().map_or(0, ParamHandle::len)
    }

    pub const fn params(&self) -> Option<&ParamHandle> {
        self.params.as_ref()
    }

    /// 是否绑定在（用户提供的）母容器上
    pub const fn is_shared(&self) -> bool {
        self.shared
    }

    pub const fn is_recurrent(&self) -> bool {
        self.recurrent
    }

    /// 把源模块整行输出按切片变换后累加进目标模块整行输入
    pub(in crate::nn) fn forward(
        &self,
        source_output: ArrayView1<f64>,
        mut dest_input: ArrayViewMut1<f64>,
    ) {
        let input = source_output.slice(s![self.in_slice.clone()]);
        let output = dest_input.slice_mut(s![self.out_slice.clone()]);
        match &self.params {
            Some(handle) => {
                let container = handle.borrow();
                self.kind.forward(input, output, container.params());
            }
            None => self.kind.forward(input, output, Array1::<f64>::zeros(0).view()),
        }
    }

    /// 把目标模块整行输入误差反传进源模块整行输出误差，并累加参数导数
    pub(in crate::nn) fn backward(
        &self,
        dest_input_error: ArrayView1<f64>,
        source_output: ArrayView1<f64>,
        mut source_output_error: ArrayViewMut1<f64>,
    ) {
        let output_error = dest_input_error.slice(s![self.out_slice.clone()]);
        let input = source_output.slice(s![self.in_slice.clone()]);
        let input_error = source_output_error.slice_mut(s![self.in_slice.clone()]);
        match &self.params {
            Some(handle) => {
                let mut container = handle.borrow_mut();
                let (params, derivs) = container.split_mut();
                self.kind
                    .backward(output_error, input_error, input, params, derivs);
            }
            None => {
                let mut no_derivs = Array1::<f64>::zeros(0);
                self.kind.backward(
                    output_error,
                    input_error,
                    input,
                    Array1::<f64>::zeros(0).view(),
                    no_derivs.view_mut(),
                );
            }
        }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} '{}': {}[{}..{}] -> {}[{}..{}]{}>",
            self.type_name(),
            self.name,
            self.from,
            self.in_slice.start,
            self.in_slice.end,
            self.to,
            self.out_slice.start,
            self.out_slice.end,
            if self.recurrent { " (recurrent)" } else { "" }
        )
    }
}
