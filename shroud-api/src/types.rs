//! API 类型定义
//!
//! 加载结果和依赖图的输出类型，均可序列化为 JSON。

use serde::Serialize;
use shroud_core::{Environment, Location, Unit, Value};

/// 加载输出
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutput {
    /// 单元标识（规范化的源文件位置）
    pub location: Location,
    /// 实际加载的文件
    pub file: Location,
    /// 是否来自编译产物
    pub compiled: bool,
    /// 导出值
    pub exports: Value,
}

impl From<&Unit> for RunOutput {
    fn from(unit: &Unit) -> Self {
        Self {
            location: unit.identity().clone(),
            file: unit.file(),
            compiled: unit.is_compiled(),
            exports: unit.exports(),
        }
    }
}

/// 依赖图中的一个单元
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub location: Location,
    pub file: Location,
    pub compiled: bool,
    pub executions: u64,
    /// 该单元加载过的单元
    pub dependencies: Vec<Location>,
    /// 加载过该单元的单元
    pub dependents: Vec<Location>,
}

/// 环境中所有已注册单元的依赖图（按位置排序）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnitGraph {
    pub units: Vec<GraphNode>,
}

impl UnitGraph {
    pub fn of(env: &Environment) -> Self {
        let units = env
            .units()
            .into_iter()
            .map(|(location, unit)| GraphNode {
                dependencies: env.dependencies_of(&location),
                dependents: env.dependents_of(&location),
                file: unit.file(),
                compiled: unit.is_compiled(),
                executions: unit.executions(),
                location,
            })
            .collect();
        Self { units }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl std::fmt::Display for UnitGraph {
    /// 每行一个单元，依赖缩进列出
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for node in &self.units {
            let marker = if node.compiled { " (compiled)" } else { "" };
            writeln!(f, "{}{}", node.location, marker)?;
            for dep in &node.dependencies {
                writeln!(f, "  -> {}", dep)?;
            }
        }
        Ok(())
    }
}
