/*
 * @Author       : 老董
 * @Date         : 2026-10-18
 * @Description  : 网络描述符（Network Descriptor）与 Display
 *                 可序列化的拓扑快照，用于调试输出与持久化拓扑信息（不含缓冲区内容）
 */

use super::Network;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 网络的可序列化描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    /// 格式版本（用于向后兼容）
    pub version: String,
    pub name: String,
    pub indim: usize,
    pub outdim: usize,
    /// 注册顺序
    pub modules: Vec<ModuleDescriptor>,
    /// 求值顺序（模块 ID），未排序时为 None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorted: Option<Vec<u64>>,
    /// 注册顺序
    pub connections: Vec<ConnectionDescriptor>,
    /// 扁平参数向量长度（共享容器只计一次）
    pub total_params: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub id: u64,
    pub name: String,
    pub type_name: String,
    pub indim: usize,
    pub outdim: usize,
    pub is_input: bool,
    pub is_output: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub name: String,
    pub type_name: String,
    pub from: u64,
    pub to: u64,
    pub in_slice: (usize, usize),
    pub out_slice: (usize, usize),
    pub paramdim: usize,
    pub shared: bool,
    pub recurrent: bool,
}

impl NetworkDescriptor {
    /// 连接自身参数量之和（共享容器按连接重复计数）
    pub fn connection_params(&self) -> usize {
        self.connections.iter().map(|c| c.paramdim).sum()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Network {
    /// 导出网络的描述符
    ///
    /// # 示例
    /// ```ignore
    /// let descriptor = net.describe();
    /// println!("{}", descriptor.to_json()?);
    /// ```
    pub fn describe(&self) -> NetworkDescriptor {
        let modules = self
            .modules
            .iter()
            .map(|m| ModuleDescriptor {
                id: m.id().get(),
                name: m.name().to_string(),
                type_name: m.type_name().to_string(),
                indim: m.indim(),
                outdim: m.outdim(),
                is_input: self.input_modules.contains(&m.id()),
                is_output: self.output_modules.contains(&m.id()),
            })
            .collect();

        let connections = self
            .connections
            .iter()
            .map(|c| {
                let (in_slice, out_slice) = (c.in_slice(), c.out_slice());
                ConnectionDescriptor {
                    name: c.name().to_string(),
                    type_name: c.type_name().to_string(),
                    from: c.from().get(),
                    to: c.to().get(),
                    in_slice: (in_slice.start, in_slice.end),
                    out_slice: (out_slice.start, out_slice.end),
                    paramdim: c.paramdim(),
                    shared: c.is_shared(),
                    recurrent: c.is_recurrent(),
                }
            })
            .collect();

        NetworkDescriptor {
            version: env!("CARGO_PKG_VERSION").to_string(),
            name: self.name().to_string(),
            indim: self.indim,
            outdim: self.outdim,
            modules,
            sorted: self
                .sorted_modules()
                .map(|ids| ids.iter().map(|id| id.get()).collect()),
            connections,
            total_params: self.paramdim(),
        }
    }
}

/// 名称 + 模块（已排序时按求值顺序）+ 连接（按名称排序）
impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name())?;

        writeln!(f, "   Modules:")?;
        let order: Vec<usize> = match &self.schedule {
            Some(schedule) => schedule.order.clone(),
            None => (0..self.modules.len()).collect(),
        };
        for idx in order {
            writeln!(f, "    {}", self.modules[idx])?;
        }

        writeln!(f, "   Connections:")?;
        let mut connections: Vec<_> = self.connections.iter().collect();
        connections.sort_by(|a, b| a.name().cmp(b.name()));
        for connection in connections {
            writeln!(f, "    {connection}")?;
        }
        Ok(())
    }
}
