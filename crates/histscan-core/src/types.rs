//! 公共类型（对外暴露）
use serde::Serialize;

use crate::detectors::DetectorType;

/// 输出项结构（结果 JSON 数组的单个元素）
#[derive(Debug, Clone, Serialize)]
pub struct OutputItem<'a> {
    pub detector: DetectorType,
    pub commit: &'a str,
    pub author: &'a str,
    /// RFC 3339；提交时间未知时为 null
    pub date: Option<String>,
    pub path: &'a str,
    /// 所在 hunk 在新文件中的起始行
    pub line: usize,
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_v2: Option<String>,
    pub redacted: &'a str,
    pub verified: bool,
}
