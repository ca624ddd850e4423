/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : 网络执行引擎的错误类型
 */

use thiserror::Error;

/// 错误大类：构图期错误（图结构/网络结构）与调用期错误（状态）
///
/// 三类错误都不可恢复：调用方须修正拓扑或调用顺序后重来，引擎内部从不重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 构图期：未注册的端点、切片越界、维度或参数量不匹配、重名模块
    GraphConstruction,
    /// 排序期：非循环边构成了环
    NetworkConstruction,
    /// 调用期：未排序即传播、`offset == 0` 时反向传播、输入/误差向量维度不符
    InvalidState,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("构图失败：{0}")]
    GraphConstruction(String),
    #[error("网络结构非法：{0}")]
    NetworkConstruction(String),
    #[error("状态非法：{0}")]
    InvalidState(String),
    // 调用期的向量维度检查，归入 InvalidState 大类
    #[error("维度不一致：期望{expected}，实际为{got}（{message}）")]
    DimensionMismatch {
        expected: usize,
        got: usize,
        message: String,
    },
}

impl NetworkError {
    /// 返回错误所属的大类
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::GraphConstruction(_) => ErrorKind::GraphConstruction,
            Self::NetworkConstruction(_) => ErrorKind::NetworkConstruction,
            Self::InvalidState(_) | Self::DimensionMismatch { .. } => ErrorKind::InvalidState,
        }
    }

    pub(crate) fn dimension_mismatch(expected: usize, got: usize, message: &str) -> Self {
        Self::DimensionMismatch {
            expected,
            got,
            message: message.to_string(),
        }
    }
}
