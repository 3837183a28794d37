//! CLI 日志系统初始化
//!
//! 基于 `tracing-subscriber` 实现分阶段日志控制。日志写到 stderr，
//! stdout 只留给命令输出。

use crate::config::LogConfig;
use shroud_config::Phase;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

/// 日志输出格式
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// 彩色格式化（开发使用）
    Pretty,
    /// 紧凑格式
    Compact,
    /// JSON 格式（工具集成）
    Json,
}

/// Per-phase filter built from the log configuration
pub fn targets(log_config: &LogConfig) -> Targets {
    let mut targets = Targets::new().with_default(LevelFilter::from(log_config.global));
    for phase in Phase::ALL {
        targets = targets.with_target(phase.target(), LevelFilter::from(log_config.level_for(phase)));
    }
    targets.with_target("shroud::cli", LevelFilter::from(log_config.global))
}

/// 使用指定格式和日志配置初始化日志系统，可选同时写入文件
pub fn init_with_file(
    log_config: &LogConfig,
    format: LogFormat,
    file: Option<&Path>,
) -> Result<(), String> {
    let targets = targets(log_config);

    let file_layer = match file {
        Some(path) => {
            let handle = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("cannot open log file '{}': {}", path.display(), e))?;
            // File 通过 Arc 共享给所有事件
            Some(format_layer(format, Arc::new(handle), false).with_filter(targets.clone()))
        }
        None => None,
    };
    let console_layer = format_layer(format, io::stderr, true).with_filter(targets);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| format!("cannot install logger: {}", e))
}

/// Create formatter layer based on format
fn format_layer<S, W>(format: LogFormat, make_writer: W, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_ansi(ansi)
            .with_target(true)
            .with_timer(fmt::time::time())
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_ansi(ansi)
            .with_target(false)
            .without_time()
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_timer(fmt::time::time())
            .with_writer(make_writer)
            .boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_phase_targets() {
        let mut config = LogConfig::default();
        config.phases.insert(Phase::Resolve, Level::TRACE);
        let targets = targets(&config);

        assert!(targets.would_enable("shroud::resolve", &Level::TRACE));
        assert!(!targets.would_enable("shroud::load", &Level::INFO));
        assert!(targets.would_enable("shroud::load", &Level::WARN));
    }

    #[test]
    fn test_silent_disables_everything() {
        let config = LogConfig {
            global: None,
            ..LogConfig::default()
        };
        let targets = targets(&config);
        assert!(!targets.would_enable("shroud::artifact", &Level::ERROR));
    }
}
