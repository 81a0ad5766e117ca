//! TMetric API key：关键字附近的 64 位大写字母/数字串
use std::sync::Arc;

use regex::bytes::Regex;
use tracing::debug;

use super::{prefix_regex, redact, Detector, DetectorContext, DetectorType, Verifier};
use crate::error::DetectorError;
use crate::false_positives::FalsePositiveFilter;
use crate::findings::Finding;

const DEFAULT_ENDPOINT: &str = "https://app.tmetric.com";

pub struct Tmetric {
    verifier: Verifier,
    false_positives: Arc<FalsePositiveFilter>,
    key: Regex,
    endpoint: String,
}

impl Tmetric {
    pub fn new(ctx: &DetectorContext) -> Result<Self, DetectorError> {
        Self::with_endpoint(ctx, DEFAULT_ENDPOINT)
    }

    /// 指定验证服务的基础地址（测试或代理环境）
    pub fn with_endpoint(ctx: &DetectorContext, endpoint: &str) -> Result<Self, DetectorError> {
        let pattern = prefix_regex(&["tmetric"]) + r"\b([0-9A-Z]{64})\b";
        Ok(Self {
            verifier: ctx.verifier.clone(),
            false_positives: Arc::clone(&ctx.false_positives),
            key: Regex::new(&pattern)?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// 调用成功时检查响应状态：2xx 视为有效；传输错误保持未验证
    fn verify(&self, key: &str) -> bool {
        let url = format!("{}/api/v3/user", self.endpoint);
        match self.verifier.client().get(&url).bearer_auth(key).send() {
            Ok(resp) => resp.status().is_success(),
            Err(err) => {
                debug!(error = %err, "tmetric verification failed");
                false
            }
        }
    }
}

impl Detector for Tmetric {
    fn keywords(&self) -> &[&'static str] {
        &["tmetric"]
    }

    fn from_data(&self, verify: bool, data: &[u8]) -> Result<Vec<Finding>, DetectorError> {
        let mut results = Vec::new();

        for caps in self.key.captures_iter(data) {
            let Some(m) = caps.get(1) else { continue };
            let raw = m.as_bytes();
            let key = String::from_utf8_lossy(raw);

            let mut finding = Finding::new(self.detector_type(), raw, redact(&key));
            if verify {
                finding.verified = self.verify(&key);
            }
            if !finding.verified && self.false_positives.is_known(raw, true) {
                continue;
            }
            results.push(finding);
        }

        Ok(results)
    }

    fn detector_type(&self) -> DetectorType {
        DetectorType::Tmetric
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const KEY: &str = "V2SEH60KVJ50CE9UVW53EFR4EDT2SYWB3WKH5DNSIPZZ5FK2Z9RI19R0WYOJFLJO";

    fn detector() -> Tmetric {
        let ctx = DetectorContext::new(Duration::from_secs(1), &[]).expect("context");
        Tmetric::new(&ctx).expect("detector")
    }

    #[test]
    fn finds_key_near_keyword() {
        let data = format!("TMETRIC_API_KEY={KEY}\n");
        let results = detector().from_data(false, data.as_bytes()).expect("scan");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].raw, KEY.as_bytes());
        assert_eq!(results[0].redacted, format!("V2SE{}", "*".repeat(60)));
        assert!(!results[0].verified);
    }

    #[test]
    fn key_without_keyword_is_ignored() {
        let data = format!("API_KEY={KEY}\n");
        assert!(detector().from_data(false, data.as_bytes()).expect("scan").is_empty());
    }

    #[test]
    fn placeholder_key_is_filtered() {
        let data = format!("tmetric: {}\n", "0".repeat(64));
        assert!(detector().from_data(false, data.as_bytes()).expect("scan").is_empty());
    }
}
