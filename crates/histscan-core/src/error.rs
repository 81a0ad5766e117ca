//! 错误类型（库内部使用 thiserror，CLI 层使用 anyhow 汇总）
use std::io;
use std::path::PathBuf;

/// 启动 git 进程前/时的同步错误；此时尚未产生任何流
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("cannot resolve repository path {}: {source}", .path.display())]
    ResolvePath { path: PathBuf, source: io::Error },
    #[error("failed to spawn `{program}`: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("child process has no stdout pipe")]
    MissingStdout,
}

/// 流提前终止的原因（已发出的提交依然有效）
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("reading git output failed: {0}")]
    Read(#[from] io::Error),
    #[error("revision producer panicked: {0}")]
    Panicked(String),
}

/// 检测器运行错误
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("building http client failed: {0}")]
    Client(#[from] reqwest::Error),
    #[error("invalid detector pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("building keyword automaton failed: {0}")]
    Prefilter(#[from] aho_corasick::BuildError),
}

/// 配置文件错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("parsing config {}: {source}", .path.display())]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("unknown detector `{0}` in config")]
    UnknownDetector(String),
}
