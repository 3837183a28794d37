//! CLI 配置
//!
//! 项目文件 `shroud.json` 和日志配置。命令行参数覆盖项目文件。

use serde::Deserialize;
use shroud_config::{LoaderConfig, Phase};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::Level;

/// shroud.json 结构
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectFile {
    /// 入口单元请求（相对于项目目录）
    pub entry: Option<String>,
    /// 加载器配置
    pub loader: LoaderConfig,
    /// 日志级别: "silent", "error", "warn", "info", "debug", "trace"
    pub log_level: Option<String>,
    /// 分阶段日志级别，例如 `{"resolve": "trace"}`
    pub log_phases: BTreeMap<String, String>,
}

impl ProjectFile {
    /// Read a project file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("无法读取 '{}': {}", path.display(), e))?;
        Self::parse(&content).map_err(|e| format!("解析 '{}' 失败: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let project: ProjectFile = serde_json::from_str(content).map_err(|e| e.to_string())?;
        if matches!(&project.entry, Some(entry) if entry.is_empty()) {
            return Err(String::from("'entry' 字段不能为空"));
        }
        Ok(project)
    }
}

/// CLI 日志配置
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// `None` disables logging
    pub global: Option<Level>,
    pub phases: BTreeMap<Phase, Level>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global: Some(Level::WARN),
            phases: BTreeMap::new(),
        }
    }
}

impl LogConfig {
    /// Build from the project file, with `override_level` taking precedence
    pub fn from_project(project: &ProjectFile, override_level: Option<&str>) -> Result<Self, String> {
        let mut config = Self::default();
        if let Some(level) = override_level.or(project.log_level.as_deref()) {
            config.global = parse_log_level(level)?;
        }
        for (name, level) in &project.log_phases {
            let phase = Phase::ALL
                .into_iter()
                .find(|p| p.as_str() == name.as_str())
                .ok_or_else(|| format!("unknown log phase '{}'", name))?;
            if let Some(level) = parse_log_level(level)? {
                config.phases.insert(phase, level);
            }
        }
        Ok(config)
    }

    /// Get log level for a specific target
    pub fn level_for(&self, phase: Phase) -> Option<Level> {
        self.phases.get(&phase).copied().or(self.global)
    }
}

/// Parse log level string; `silent` turns logging off
pub fn parse_log_level(s: &str) -> Result<Option<Level>, String> {
    match s.to_lowercase().as_str() {
        "silent" | "off" => Ok(None),
        "error" => Ok(Some(Level::ERROR)),
        "warn" => Ok(Some(Level::WARN)),
        "info" => Ok(Some(Level::INFO)),
        "debug" => Ok(Some(Level::DEBUG)),
        "trace" => Ok(Some(Level::TRACE)),
        other => Err(format!("unknown log level '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_project_file() {
        let project = ProjectFile::parse(
            r#"{
                "entry": "./main",
                "loader": { "search_path": ["./vendor"], "write_artifacts": false },
                "log_level": "debug",
                "log_phases": { "resolve": "trace" }
            }"#,
        )
        .unwrap();

        assert_eq!(project.entry.as_deref(), Some("./main"));
        assert_eq!(project.loader.search_path, vec!["./vendor"]);
        assert!(!project.loader.write_artifacts);
        assert!(project.loader.use_artifacts);

        let log = LogConfig::from_project(&project, None).unwrap();
        assert_eq!(log.level_for(Phase::Resolve), Some(Level::TRACE));
        assert_eq!(log.level_for(Phase::Load), Some(Level::DEBUG));
    }

    #[test]
    fn test_empty_entry_rejected() {
        assert!(ProjectFile::parse(r#"{ "entry": "" }"#).is_err());
        assert!(ProjectFile::parse(r#"{ "unknown": 1 }"#).is_err());
        assert_eq!(ProjectFile::parse("{}").unwrap(), ProjectFile::default());
    }

    #[test]
    fn test_flag_overrides_project_level() {
        let project = ProjectFile {
            log_level: Some("debug".to_string()),
            ..ProjectFile::default()
        };
        let log = LogConfig::from_project(&project, Some("silent")).unwrap();
        assert_eq!(log.global, None);

        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn test_unknown_phase_rejected() {
        let mut project = ProjectFile::default();
        project.log_phases.insert("lexer".to_string(), "trace".to_string());
        assert!(LogConfig::from_project(&project, None).is_err());
    }
}
