//! 扫描选项与统计信息（模块）
use std::path::PathBuf;

use crate::launcher::ScanMode;

/// 扫描选项
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// git 调用方式：全历史或工作区
    pub mode: ScanMode,
    /// 是否对候选密钥做在线验证
    pub verify: bool,
    /// 线程数：None 表示自动（等于 CPU 核数）；Some(1) 走串行
    pub threads: Option<usize>,
    /// 配置文件路径（TOML）；为空则尝试 ./histscan.toml，不存在时使用默认配置
    pub config_path: Option<PathBuf>,
}

/// 扫描统计信息（便于 CLI 打印）
#[derive(Debug, Default, Clone)]
pub struct ScanStats {
    pub revisions_scanned: usize,
    pub segments_scanned: usize,
    pub outputs_written: usize,
    pub verified: usize,
    /// 流是否完整结束（取消或中途失败时为 false，输出为部分结果）
    pub complete: bool,
}
