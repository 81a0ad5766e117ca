//! 检测命中项与排序
use serde::Serialize;

use crate::detectors::DetectorType;

/// 检测器产生的候选密钥
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub detector_type: DetectorType,
    /// 命中的原始字节
    pub raw: Vec<u8>,
    /// 原始值 + 上下文（用于下游去重），部分检测器没有
    pub raw_v2: Option<Vec<u8>>,
    /// 展示用的脱敏形式
    pub redacted: String,
    pub verified: bool,
}

impl Finding {
    pub(crate) fn new(detector_type: DetectorType, raw: &[u8], redacted: String) -> Self {
        Self { detector_type, raw: raw.to_vec(), raw_v2: None, redacted, verified: false }
    }
}

/// 片段内稳定排序：检测器类型 → raw 字典序 → raw_v2 字典序
pub(crate) fn sort_findings_stable(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        a.detector_type
            .cmp(&b.detector_type)
            .then_with(|| a.raw.cmp(&b.raw))
            .then_with(|| a.raw_v2.cmp(&b.raw_v2))
    });
}
