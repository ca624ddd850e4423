/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : Network 的扁平参数/导数视图与状态重置
 *
 * 扁平向量先按连接注册顺序拼接各连接的参数容器，再按模块注册顺序拼接嵌套网络的容器；
 * 被多处共享的容器只在首次出现处计入一次。
 */

use super::Network;
use crate::errors::NetworkError;
use crate::nn::module::Module;
use crate::nn::params::ParamHandle;
use ndarray::Array1;

impl Network {
    /// 网络内互不相同的参数容器（连接在前，嵌套网络在后）
    pub fn param_containers(&self) -> Vec<ParamHandle> {
        let connections = self.connections.iter().filter_map(|c| c.params().cloned());
        let nested = self.modules.iter().flat_map(Module::param_containers);
        let mut containers: Vec<ParamHandle> = Vec::new();
        for handle in connections.chain(nested) {
            if !containers.iter().any(|h| h.ptr_eq(&handle)) {
                containers.push(handle);
            }
        }
        containers
    }

    /// 扁平参数向量的总长度
    pub fn paramdim(&self) -> usize {
        self.param_containers().iter().map(ParamHandle::len).sum()
    }

    pub fn params(&self) -> Array1<f64> {
        self.flatten(|h| h.params())
    }

    pub fn derivatives(&self) -> Array1<f64> {
        self.flatten(|h| h.derivatives())
    }

    /// 用扁平向量覆写全部参数，长度必须等于 `paramdim()`
    ///
    /// 长度不符时不修改任何容器。
    pub fn set_parameters(&mut self, values: &[f64]) -> Result<(), NetworkError> {
        let containers = self.param_containers();
        let total: usize = containers.iter().map(ParamHandle::len).sum();
        if values.len() != total {
            return Err(NetworkError::dimension_mismatch(
                total,
                values.len(),
                "参数向量长度与网络参数总量不符",
            ));
        }
        let mut cursor = 0;
        for handle in &containers {
            let len = handle.len();
            handle.set_parameters(&values[cursor..cursor + len])?;
            cursor += len;
        }
        Ok(())
    }

    /// 清零全部参数导数（共享容器只清一次）
    pub fn reset_derivatives(&mut self) {
        self.param_containers()
            .iter()
            .for_each(ParamHandle::reset_derivatives);
    }

    /// 回到“刚排序完”的状态：缓冲区清零、时间指针归零、导数清零，参数保持不变
    pub fn reset(&mut self) {
        for module in &mut self.modules {
            module.reset();
        }
        self.buffers.clear();
        self.reset_derivatives();
        self.offset = 0;
        self.max_offset = 0;
        log::debug!("网络{}已重置", self.name());
    }

    fn flatten(&self, values: impl Fn(&ParamHandle) -> Array1<f64>) -> Array1<f64> {
        let mut flat = Vec::with_capacity(self.paramdim());
        for handle in self.param_containers() {
            flat.extend(values(&handle).iter().copied());
        }
        Array1::from(flat)
    }
}
