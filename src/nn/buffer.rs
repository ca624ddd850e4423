/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : 按时间步索引的缓冲区（Buffer Store）
 *
 * 每个模块持有 4 个逻辑形状为 `(T, dim)` 的缓冲区：输入、输出、输入误差、输出误差。
 * 物理上按 2 的幂预留容量，写入越界时整体翻倍扩容，已写入的历史行原样保留。
 */

use ndarray::{s, Array2, ArrayView1, ArrayViewMut1};

/// 缓冲区种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Input,
    Output,
    InputError,
    OutputError,
}

/// 单个时间索引缓冲区
///
/// 读写都以逻辑时间步 `t` 寻址，物理容量对调用方透明。
#[derive(Debug, Clone)]
pub struct TimeBuffer {
    /// 形状为 `(capacity, dim)`
    data: Array2<f64>,
    /// 已写入过的最大时间步 + 1
    rows: usize,
}

impl TimeBuffer {
    pub fn new(dim: usize, capacity: usize) -> Self {
        Self {
            data: Array2::zeros((capacity.max(1), dim)),
            rows: 0,
        }
    }

    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    pub fn capacity(&self) -> usize {
        self.data.nrows()
    }

    /// 已写入的逻辑行数
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// 读取第 `t` 行；超出物理容量时返回 `None`（尚未分配的行在逻辑上全为 0）
    pub fn row(&self, t: usize) -> Option<ArrayView1<'_, f64>> {
        (t < self.capacity()).then(|| self.data.row(t))
    }

    /// 引擎内部读取：调用方须已对第 `t` 行 `reserve`
    pub(in crate::nn) fn at(&self, t: usize) -> ArrayView1<'_, f64> {
        self.data.row(t)
    }

    /// 可写地获取第 `t` 行，必要时先扩容
    pub fn row_mut(&mut self, t: usize) -> ArrayViewMut1<'_, f64> {
        self.reserve(t);
        self.rows = self.rows.max(t + 1);
        self.data.row_mut(t)
    }

    /// 保证第 `t` 行可寻址
    pub fn reserve(&mut self, t: usize) {
        if t >= self.capacity() {
            self.grow_to(next_capacity(self.capacity(), t));
        }
    }

    /// 把容量扩到 `capacity`（不缩容），新区域清零，旧内容逐行拷贝
    pub(in crate::nn) fn grow_to(&mut self, capacity: usize) {
        let old = self.capacity();
        if capacity <= old {
            return;
        }
        let mut data = Array2::zeros((capacity, self.dim()));
        data.slice_mut(s![..old, ..]).assign(&self.data);
        self.data = data;
    }

    /// 清零全部内容，保留已分配的容量
    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.rows = 0;
    }

    /// 只清零第 `t` 行（行不存在时无操作）
    pub fn clear_row(&mut self, t: usize) {
        if t < self.capacity() {
            self.data.row_mut(t).fill(0.0);
        }
    }
}

/// 容量增长策略：至少翻倍，且为能容纳第 `t` 行的最小 2 的幂
fn next_capacity(current: usize, t: usize) -> usize {
    (current * 2).max((t + 1).next_power_of_two())
}

/// 一个模块的 4 个缓冲区，总是同步扩容
#[derive(Debug, Clone)]
pub struct ModuleBuffers {
    pub(in crate::nn) input: TimeBuffer,
    pub(in crate::nn) output: TimeBuffer,
    pub(in crate::nn) input_error: TimeBuffer,
    pub(in crate::nn) output_error: TimeBuffer,
}

impl ModuleBuffers {
    pub fn new(indim: usize, outdim: usize, capacity: usize) -> Self {
        Self {
            input: TimeBuffer::new(indim, capacity),
            output: TimeBuffer::new(outdim, capacity),
            input_error: TimeBuffer::new(indim, capacity),
            output_error: TimeBuffer::new(outdim, capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.input.capacity()
    }

    pub fn get(&self, kind: BufferKind) -> &TimeBuffer {
        match kind {
            BufferKind::Input => &self.input,
            BufferKind::Output => &self.output,
            BufferKind::InputError => &self.input_error,
            BufferKind::OutputError => &self.output_error,
        }
    }

    pub fn input_row(&self, t: usize) -> Option<ArrayView1<'_, f64>> {
        self.input.row(t)
    }

    pub fn output_row(&self, t: usize) -> Option<ArrayView1<'_, f64>> {
        self.output.row(t)
    }

    pub fn input_error_row(&self, t: usize) -> Option<ArrayView1<'_, f64>> {
        self.input_error.row(t)
    }

    pub fn output_error_row(&self, t: usize) -> Option<ArrayView1<'_, f64>> {
        self.output_error.row(t)
    }

    /// 保证 4 个缓冲区都能寻址第 `t` 行，且容量保持一致
    pub fn reserve(&mut self, t: usize) {
        let capacity = self.capacity();
        if t < capacity {
            return;
        }
        let grown = next_capacity(capacity, t);
        log::trace!("缓冲区扩容：{capacity} -> {grown}（写入时间步 {t}）");
        self.grow_to(grown);
    }

    /// 预分配容量（向上取 2 的幂），用于按配置预留初始长度
    pub(in crate::nn) fn grow_to(&mut self, capacity: usize) {
        let capacity = capacity.next_power_of_two();
        self.input.grow_to(capacity);
        self.output.grow_to(capacity);
        self.input_error.grow_to(capacity);
        self.output_error.grow_to(capacity);
    }

    /// 开始新的时间步 `t` 之前，清掉该步残留的输入累加值与误差
    pub(in crate::nn) fn clear_step(&mut self, t: usize) {
        self.reserve(t);
        self.input.clear_row(t);
        self.input_error.clear_row(t);
        self.output_error.clear_row(t);
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.output.clear();
        self.input_error.clear();
        self.output_error.clear();
    }
}
