//! 检测器接口与共享依赖
//!
//! 每个检测器提供：关键字（用于廉价预筛）、查找+可选在线验证、稳定类型标识。
//! HTTP 客户端与误报过滤器由构造函数注入，不使用进程级全局变量。
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::error::DetectorError;
use crate::false_positives::FalsePositiveFilter;
use crate::findings::Finding;

mod azure_container_registry;
mod tmetric;

pub use azure_container_registry::AzureContainerRegistry;
pub use tmetric::Tmetric;

/// 稳定的检测器类型标识（配置文件与输出中使用 snake_case 名称）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorType {
    AzureContainerRegistry,
    Tmetric,
}

impl DetectorType {
    pub const ALL: [DetectorType; 2] = [DetectorType::AzureContainerRegistry, DetectorType::Tmetric];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorType::AzureContainerRegistry => "azure_container_registry",
            DetectorType::Tmetric => "tmetric",
        }
    }
}

impl fmt::Display for DetectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DetectorType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| s.to_string())
    }
}

/// 检测器统一形态
pub trait Detector: Send + Sync {
    /// 预筛关键字（ASCII 大小写不敏感）
    fn keywords(&self) -> &[&'static str];

    /// 在数据中查找候选密钥；`verify` 为真时对服务端做在线验证。
    /// 网络错误或非 2xx 响应只会让结果保持未验证，不会作为错误返回。
    fn from_data(&self, verify: bool, data: &[u8]) -> Result<Vec<Finding>, DetectorError>;

    fn detector_type(&self) -> DetectorType;
}

/// 在线验证用的 HTTP 客户端（阻塞式，带超时）
#[derive(Clone)]
pub struct Verifier {
    client: reqwest::blocking::Client,
}

impl Verifier {
    pub fn new(timeout: Duration) -> Result<Self, DetectorError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("histscan/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// 注入已配置好的客户端（代理、证书等由调用方决定）
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }

    pub(crate) fn client(&self) -> &reqwest::blocking::Client {
        &self.client
    }
}

/// 检测器构造时注入的共享依赖
#[derive(Clone)]
pub struct DetectorContext {
    pub verifier: Verifier,
    pub false_positives: Arc<FalsePositiveFilter>,
}

impl DetectorContext {
    pub fn new(timeout: Duration, extra_false_positives: &[String]) -> Result<Self, DetectorError> {
        Ok(Self {
            verifier: Verifier::new(timeout)?,
            false_positives: Arc::new(FalsePositiveFilter::new(extra_false_positives)?),
        })
    }
}

/// 按类型构建检测器
pub fn build_detector(kind: DetectorType, ctx: &DetectorContext) -> Result<Box<dyn Detector>, DetectorError> {
    Ok(match kind {
        DetectorType::AzureContainerRegistry => Box::new(AzureContainerRegistry::new(ctx)?),
        DetectorType::Tmetric => Box::new(Tmetric::new(ctx)?),
    })
}

/// 关键字前缀正则：关键字（大小写不敏感）之后最多 40 个任意字符（惰性）
pub fn prefix_regex(keywords: &[&str]) -> String {
    let alternation = keywords.iter().map(|k| regex::escape(k)).collect::<Vec<_>>().join("|");
    format!(r"(?i:{alternation})(?s:.){{0,40}}?")
}

/// 展示用的脱敏形式：保留前 4 个字符
pub(crate) fn redact(raw: &str) -> String {
    let head: String = raw.chars().take(4).collect();
    format!("{head}{}", "*".repeat(raw.chars().count().saturating_sub(4)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detector_type_names_round_trip() {
        for t in DetectorType::ALL {
            assert_eq!(t.as_str().parse::<DetectorType>(), Ok(t));
        }
        assert_eq!("TMETRIC".parse::<DetectorType>(), Ok(DetectorType::Tmetric));
        assert!("aws".parse::<DetectorType>().is_err());
    }

    #[test]
    fn prefix_regex_scopes_case_insensitivity() {
        let re = regex::Regex::new(&(prefix_regex(&["tmetric"]) + r"\b([A-Z]{3})\b")).expect("regex");
        assert!(re.is_match("TMetric key: ABC"));
        assert!(!re.is_match("tmetric key: abc"));
    }

    #[test]
    fn redact_keeps_prefix() {
        assert_eq!(redact("ABCDEFGH"), "ABCD****");
        assert_eq!(redact("AB"), "AB");
    }
}
