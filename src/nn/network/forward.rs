/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : Network 前向传播
 */

use super::{Network, Schedule};
use crate::errors::NetworkError;
use crate::nn::connection::Connection;
use crate::nn::module::Module;
use ndarray::{s, Array1, Array2};

impl Network {
    /// 未排序时报错，排序后返回缓存的求值计划
    pub(in crate::nn::network) fn require_sorted(&self) -> Result<&Schedule, NetworkError> {
        self.schedule.as_ref().ok_or_else(|| {
            NetworkError::InvalidState(format!(
                "网络{}尚未排序（或拓扑已变化），请先调用 sort_modules()",
                self.name()
            ))
        })
    }

    /// 前向传播一个时间步（`t = offset`），返回输出模块在该步的输出之拼接
    ///
    /// 所有检查都在修改任何状态之前完成。
    pub fn activate(&mut self, input: &[f64]) -> Result<Array1<f64>, NetworkError> {
        self.require_sorted()?;
        if input.len() != self.indim {
            return Err(NetworkError::dimension_mismatch(
                self.indim,
                input.len(),
                "输入向量长度与网络输入维度不符",
            ));
        }

        let t = self.offset;
        // 新的时间步：清掉本步残留的输入累加值与误差，
        // 以及上一步输出误差里旧的循环反传贡献
        for module in &mut self.modules {
            let buffers = module.buffers_mut();
            buffers.clear_step(t);
            if t > 0 {
                buffers.output_error.clear_row(t - 1);
            }
        }
        self.buffers.clear_step(t);
        self.buffers
            .input
            .row_mut(t)
            .assign(&Array1::from(input.to_vec()));

        // 1. 外部输入写入各输入模块
        let mut cursor = 0;
        for id in &self.input_modules {
            let idx = self.module_index[id];
            let module = &mut self.modules[idx];
            let dim = module.indim();
            module
                .buffers_mut()
                .input
                .row_mut(t)
                .assign(&Array1::from(input[cursor..cursor + dim].to_vec()));
            cursor += dim;
        }

        // 2. 按求值顺序：先汇集入边，再计算模块输出
        let Self {
            modules,
            connections,
            schedule,
            ..
        } = self;
        if let Some(schedule) = schedule.as_ref() {
            propagate_forward(modules, connections, schedule, t)?;
        }

        // 3. 收集输出
        let output = self.collect_outputs(t);
        self.buffers.output.row_mut(t).assign(&output);

        // 4. 时间前进
        self.offset += 1;
        self.max_offset = self.max_offset.max(self.offset);
        Ok(output)
    }

    /// 从头跑一整段序列：先 reset，再逐行 activate，返回逐行输出
    ///
    /// 结束后不 reset，调用方可以紧接着做 BPTT。
    pub fn activate_sequence(&mut self, inputs: &Array2<f64>) -> Result<Array2<f64>, NetworkError> {
        self.require_sorted()?;
        if inputs.ncols() != self.indim {
            return Err(NetworkError::dimension_mismatch(
                self.indim,
                inputs.ncols(),
                "输入序列的列数与网络输入维度不符",
            ));
        }

        self.reset();
        let mut outputs = Array2::zeros((inputs.nrows(), self.outdim));
        for (i, row) in inputs.outer_iter().enumerate() {
            let input: Vec<f64> = row.to_vec();
            let output = self.activate(&input)?;
            outputs.row_mut(i).assign(&output);
        }
        Ok(outputs)
    }

    fn collect_outputs(&self, t: usize) -> Array1<f64> {
        let mut output = Array1::zeros(self.outdim);
        let mut cursor = 0;
        for id in &self.output_modules {
            let module = &self.modules[self.module_index[id]];
            let dim = module.outdim();
            output
                .slice_mut(s![cursor..cursor + dim])
                .assign(&module.buffers().output.at(t));
            cursor += dim;
        }
        output
    }
}

fn propagate_forward(
    modules: &mut [Module],
    connections: &[Connection],
    schedule: &Schedule,
    t: usize,
) -> Result<(), NetworkError> {
    for &m in &schedule.order {
        for edge in &schedule.incoming[m] {
            let connection = &connections[edge.connection];
            let source_t = if connection.is_recurrent() {
                // t == 0 时上一步状态视为全零，不产生贡献
                match t.checked_sub(1) {
                    Some(prev) => prev,
                    None => continue,
                }
            } else {
                t
            };
            // 源与目标可能是同一个模块（自循环），先拷出源行再写目标
            let source_row = modules[edge.source].buffers().output.at(source_t).to_owned();
            connection.forward(
                source_row.view(),
                modules[m].buffers_mut().input.row_mut(t),
            );
        }
        modules[m].forward_at(t)?;
    }
    Ok(())
}
