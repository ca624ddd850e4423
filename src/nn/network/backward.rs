/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : Network 反向传播（随时间反向传播，BPTT）
 *
 * 每次 back_activate 回退一个时间步：t = offset - 1。
 * 循环连接把误差送回源模块第 t-1 步的输出误差，待下一次 back_activate 处理。
 */

use super::{Network, Schedule};
use crate::errors::NetworkError;
use crate::nn::connection::Connection;
use crate::nn::module::Module;
use ndarray::{s, Array1, Array2, ArrayView1, Axis};

impl Network {
    /// 反向传播一个时间步，返回输入模块在该步的输入误差之拼接
    ///
    /// 连接参数的导数只会累加，从不自动清零，见 [`Network::reset_derivatives`]。
    pub fn back_activate(&mut self, output_error: &[f64]) -> Result<Array1<f64>, NetworkError> {
        self.require_sorted()?;
        if self.offset == 0 {
            return Err(NetworkError::InvalidState(format!(
                "网络{}没有可回退的时间步（offset 为 0），请先调用 activate()",
                self.name()
            )));
        }
        if output_error.len() != self.outdim {
            return Err(NetworkError::dimension_mismatch(
                self.outdim,
                output_error.len(),
                "输出误差长度与网络输出维度不符",
            ));
        }

        let t = self.offset - 1;
        let error = ArrayView1::from(output_error);
        self.buffers.output_error.row_mut(t).assign(&error);

        // 1. 外部误差累加到各输出模块（可能已有来自 t+1 步的循环贡献）
        let mut cursor = 0;
        for id in &self.output_modules {
            let idx = self.module_index[id];
            let module = &mut self.modules[idx];
            let dim = module.outdim();
            let mut row = module.buffers_mut().output_error.row_mut(t);
            row += &error.slice(s![cursor..cursor + dim]);
            cursor += dim;
        }

        // 2. 逆求值顺序：先算模块自身，再沿入边把误差送回源模块
        let Self {
            modules,
            connections,
            schedule,
            ..
        } = self;
        if let Some(schedule) = schedule.as_ref() {
            propagate_backward(modules, connections, schedule, t)?;
        }

        // 3. 收集输入误差
        let input_error = self.collect_input_errors(t);
        self.buffers.input_error.row_mut(t).assign(&input_error);

        self.offset -= 1;
        Ok(input_error)
    }

    /// 对最近的 `output_errors.nrows()` 个时间步做 BPTT
    ///
    /// 第 `i` 行是第 `offset - nrows + i` 步的输出误差，按时间倒序处理；
    /// 返回值的第 `i` 行是同一步的输入误差。
    pub fn back_activate_sequence(
        &mut self,
        output_errors: &Array2<f64>,
    ) -> Result<Array2<f64>, NetworkError> {
        self.require_sorted()?;
        if output_errors.ncols() != self.outdim {
            return Err(NetworkError::dimension_mismatch(
                self.outdim,
                output_errors.ncols(),
                "误差序列的列数与网络输出维度不符",
            ));
        }
        if output_errors.nrows() > self.offset {
            return Err(NetworkError::InvalidState(format!(
                "误差序列有{}步，但网络只前向推进了{}步",
                output_errors.nrows(),
                self.offset
            )));
        }

        let mut input_errors = Array2::zeros((output_errors.nrows(), self.indim));
        for (i, row) in output_errors.axis_iter(Axis(0)).enumerate().rev() {
            let error: Vec<f64> = row.to_vec();
            let input_error = self.back_activate(&error)?;
            input_errors.row_mut(i).assign(&input_error);
        }
        Ok(input_errors)
    }

    fn collect_input_errors(&self, t: usize) -> Array1<f64> {
        let mut input_error = Array1::zeros(self.indim);
        let mut cursor = 0;
        for id in &self.input_modules {
            let module = &self.modules[self.module_index[id]];
            let dim = module.indim();
            input_error
                .slice_mut(s![cursor..cursor + dim])
                .assign(&module.buffers().input_error.at(t));
            cursor += dim;
        }
        input_error
    }
}

fn propagate_backward(
    modules: &mut [Module],
    connections: &[Connection],
    schedule: &Schedule,
    t: usize,
) -> Result<(), NetworkError> {
    for &m in schedule.order.iter().rev() {
        modules[m].backward_at(t)?;
        let dest_input_error = modules[m].buffers().input_error.at(t).to_owned();
        for edge in &schedule.incoming[m] {
            let connection = &connections[edge.connection];
            let source_t = if connection.is_recurrent() {
                // t == 0 时误差流向不存在的 -1 步，丢弃
                match t.checked_sub(1) {
                    Some(prev) => prev,
                    None => continue,
                }
            } else {
                t
            };
            let source = modules[edge.source].buffers_mut();
            let source_output = source.output.at(source_t).to_owned();
            connection.backward(
                dest_input_error.view(),
                source_output.view(),
                source.output_error.row_mut(source_t),
            );
        }
    }
    Ok(())
}
