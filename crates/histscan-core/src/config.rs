//! 配置文件加载（TOML）
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::detectors::DetectorType;
use crate::error::ConfigError;

/// 未指定配置路径时尝试的默认位置
pub const DEFAULT_CONFIG_PATH: &str = "./histscan.toml";

/// 顶层配置结构
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// git 可执行文件（名称或路径）
    pub git_binary: String,
    /// 在线验证请求超时（秒）
    pub http_timeout_secs: u64,
    pub detectors: DetectorSection,
}

/// `[detectors]` 小节
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DetectorSection {
    /// 启用的检测器名称；为空表示全部
    pub enabled: Vec<String>,
    /// 追加的误报片段
    pub extra_false_positives: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { git_binary: "git".to_string(), http_timeout_secs: 10, detectors: DetectorSection::default() }
    }
}

impl ScanConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// 解析启用的检测器；None 表示全部内置类型
    pub fn enabled_detectors(&self) -> Result<Option<Vec<DetectorType>>, ConfigError> {
        if self.detectors.enabled.is_empty() {
            return Ok(None);
        }
        self.detectors
            .enabled
            .iter()
            .map(|name| name.parse::<DetectorType>().map_err(ConfigError::UnknownDetector))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

/// 加载配置：显式路径不存在时报错；默认路径不存在时退回默认配置
pub fn load_config(path: Option<&Path>) -> Result<ScanConfig, ConfigError> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    if !explicit && !path.exists() {
        debug!("no config file found, using defaults");
        return Ok(ScanConfig::default());
    }
    let txt = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read { path: path.clone(), source })?;
    parse_config(&txt).map_err(|source| ConfigError::Parse { path, source })
}

pub fn parse_config(txt: &str) -> Result<ScanConfig, toml::de::Error> {
    toml::from_str(txt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse_config("").expect("parse");
        assert_eq!(cfg.git_binary, "git");
        assert_eq!(cfg.http_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.enabled_detectors().expect("detectors"), None);
    }

    #[test]
    fn parses_detector_section() {
        let cfg = parse_config(
            r#"
git_binary = "/usr/bin/git"
http_timeout_secs = 3

[detectors]
enabled = ["tmetric"]
extra_false_positives = ["fixture"]
"#,
        )
        .expect("parse");
        assert_eq!(cfg.git_binary, "/usr/bin/git");
        assert_eq!(cfg.http_timeout_secs, 3);
        assert_eq!(cfg.enabled_detectors().expect("detectors"), Some(vec![DetectorType::Tmetric]));
        assert_eq!(cfg.detectors.extra_false_positives, vec!["fixture".to_string()]);
    }

    #[test]
    fn unknown_detector_is_rejected() {
        let cfg = parse_config("[detectors]\nenabled = [\"aws\"]\n").expect("parse");
        assert!(matches!(cfg.enabled_detectors(), Err(ConfigError::UnknownDetector(name)) if name == "aws"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load_config(Some(Path::new("/no/such/histscan.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "http_timeout_secs = 1").expect("write");
        let cfg = load_config(Some(file.path())).expect("load");
        assert_eq!(cfg.http_timeout_secs, 1);
    }
}
