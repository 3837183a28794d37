//! API 错误类型
//!
//! 提供统一的错误类型和结构化错误报告。

use serde::Serialize;
use shroud_config::Phase;
use shroud_core::{ErrorKind, LoadError};
use thiserror::Error;

/// Shroud 错误类型
#[derive(Error, Debug, Clone)]
pub enum ShroudError {
    /// 加载错误
    #[error(transparent)]
    Load(#[from] LoadError),

    /// 全局环境尚未初始化
    #[error("ambient environment is not initialized")]
    NotInitialized,

    /// 全局环境已经初始化
    #[error("ambient environment is already initialized")]
    AlreadyInitialized,

    /// 宿主环境错误（工作目录等）
    #[error("host error: {0}")]
    Host(String),
}

impl ShroudError {
    /// 获取错误阶段名称
    pub fn phase(&self) -> &'static str {
        match self {
            ShroudError::Load(e) => match e.kind() {
                ErrorKind::NotFound | ErrorKind::InvalidRequest => Phase::Resolve.as_str(),
                ErrorKind::Read
                | ErrorKind::Compile
                | ErrorKind::Execution
                | ErrorKind::CyclicLoad => Phase::Load.as_str(),
                ErrorKind::CascadeReload => Phase::Reload.as_str(),
                ErrorKind::Write => Phase::Artifact.as_str(),
                ErrorKind::Config => "config",
            },
            ShroudError::NotInitialized | ShroudError::AlreadyInitialized => "ambient",
            ShroudError::Host(_) => "host",
        }
    }

    /// 错误类型（可用于程序化处理）
    pub fn kind(&self) -> &'static str {
        match self {
            ShroudError::Load(e) => e.kind().as_str(),
            ShroudError::NotInitialized => "not_initialized",
            ShroudError::AlreadyInitialized => "already_initialized",
            ShroudError::Host(_) => "host",
        }
    }

    /// 转换为结构化错误报告
    ///
    /// CLI 可以直接打印，上层应用可以序列化为 JSON。
    pub fn to_report(&self) -> ErrorReport {
        let details = match self {
            ShroudError::Load(LoadError::NotFound { tried, .. }) => Some(ErrorDetails::Probes {
                tried: tried.iter().map(|l| l.to_string()).collect(),
            }),
            ShroudError::Load(LoadError::CyclicLoad { chain }) => Some(ErrorDetails::Chain {
                chain: chain.iter().map(|l| l.to_string()).collect(),
            }),
            ShroudError::Load(LoadError::CascadeReload(report)) => Some(ErrorDetails::Cascade {
                succeeded: report.succeeded.iter().map(|l| l.to_string()).collect(),
                failed: report
                    .failed
                    .iter()
                    .map(|(l, e)| FailedUnit {
                        location: l.to_string(),
                        kind: e.kind().as_str(),
                        message: e.to_string(),
                    })
                    .collect(),
            }),
            _ => None,
        };
        let (location, message) = match self {
            ShroudError::Load(e) => (e.location().map(|l| l.to_string()), headline(e)),
            other => (None, other.to_string()),
        };
        let line = match self {
            ShroudError::Load(LoadError::Compile { message, .. })
            | ShroudError::Load(LoadError::Execution { message, .. }) => source_line(message),
            _ => None,
        };
        ErrorReport {
            phase: self.phase(),
            kind: self.kind(),
            location,
            line,
            message,
            details,
        }
    }
}

/// Line number from a `line N: ...` executor message
fn source_line(message: &str) -> Option<usize> {
    let rest = message.strip_prefix("line ")?;
    let (number, _) = rest.split_once(':')?;
    number.parse().ok()
}

/// First line of the error; cascade failures are listed in the details
fn headline(error: &LoadError) -> String {
    let text = error.to_string();
    match text.split_once('\n') {
        Some((first, _)) => first.to_string(),
        None => text,
    }
}

/// 结构化错误报告
///
/// 上层应用（CLI、编辑器插件、宿主程序）可以根据自己的需求格式化。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    /// 错误阶段: resolve, load, reload, artifact
    pub phase: &'static str,
    /// 错误类型
    pub kind: &'static str,
    /// 相关单元（如果有）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// 源码行号（如果有）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// 人类可读的错误消息
    pub message: String,
    /// 额外详情
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// 错误额外详情
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorDetails {
    /// 尝试过的文件
    Probes { tried: Vec<String> },
    /// 循环加载链
    Chain { chain: Vec<String> },
    /// 级联重载结果
    Cascade {
        succeeded: Vec<String>,
        failed: Vec<FailedUnit>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedUnit {
    pub location: String,
    pub kind: &'static str,
    pub message: String,
}

impl std::fmt::Display for ErrorReport {
    /// 默认的 CLI 友好格式
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "[{}] {} error: {}", location, self.phase, self.message),
            None => write!(f, "[{}] {} error: {}", self.kind, self.phase, self.message),
        }
    }
}

impl ErrorReport {
    /// 转换为 JSON 格式
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"phase":"{}","message":"unserializable report: {}"}}"#, self.phase, e)
        })
    }

    /// 简洁格式（适合终端）
    pub fn to_short(&self) -> String {
        format!("{}: {}", self.phase, self.message)
    }
}
