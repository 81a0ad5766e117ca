//! Azure Container Registry：登录端点 + 52 位管理员密码
use std::sync::Arc;

use regex::bytes::Regex;
use tracing::debug;

use super::{Detector, DetectorContext, DetectorType, Verifier};
use crate::error::DetectorError;
use crate::false_positives::FalsePositiveFilter;
use crate::findings::Finding;

pub struct AzureContainerRegistry {
    verifier: Verifier,
    false_positives: Arc<FalsePositiveFilter>,
    url: Regex,
    password: Regex,
    /// 验证请求的基础地址；None 时直接访问命中的端点
    base_url: Option<String>,
}

impl AzureContainerRegistry {
    pub fn new(ctx: &DetectorContext) -> Result<Self, DetectorError> {
        Ok(Self {
            verifier: ctx.verifier.clone(),
            false_positives: Arc::clone(&ctx.false_positives),
            url: Regex::new(r"([a-zA-Z0-9-]{1,100})\.azurecr\.io")?,
            password: Regex::new(r"[A-Za-z0-9+/=]{52}")?,
            base_url: None,
        })
    }

    /// 所有验证请求都发往 `base_url`（测试或代理环境）
    pub fn with_base_url(ctx: &DetectorContext, base_url: &str) -> Result<Self, DetectorError> {
        let mut detector = Self::new(ctx)?;
        detector.base_url = Some(base_url.trim_end_matches('/').to_string());
        Ok(detector)
    }

    /// `GET https://<endpoint>/v2/`，Basic 认证（注册表名, 密码），200 视为有效
    fn verify(&self, endpoint: &str, username: &str, password: &str) -> bool {
        let url = match &self.base_url {
            Some(base) => format!("{base}/v2/"),
            None => format!("https://{endpoint}/v2/"),
        };
        match self.verifier.client().get(&url).basic_auth(username, Some(password)).send() {
            Ok(resp) => resp.status() == reqwest::StatusCode::OK,
            Err(err) => {
                debug!(%endpoint, error = %err, "azure container registry verification failed");
                false
            }
        }
    }
}

impl Detector for AzureContainerRegistry {
    fn keywords(&self) -> &[&'static str] {
        &[".azurecr.io"]
    }

    fn from_data(&self, verify: bool, data: &[u8]) -> Result<Vec<Finding>, DetectorError> {
        let passwords: Vec<&[u8]> = self.password.find_iter(data).map(|m| m.as_bytes()).collect();
        let mut results = Vec::new();

        for caps in self.url.captures_iter(data) {
            let endpoint = String::from_utf8_lossy(&caps[0]).into_owned();
            let username = String::from_utf8_lossy(&caps[1]).into_owned();

            for password in &passwords {
                let mut finding = Finding::new(self.detector_type(), endpoint.as_bytes(), endpoint.clone());
                finding.raw_v2 = Some([endpoint.as_bytes(), *password].concat());

                if verify {
                    let password = String::from_utf8_lossy(password);
                    finding.verified = self.verify(&endpoint, &username, &password);
                }
                if !finding.verified && self.false_positives.is_known(password, true) {
                    continue;
                }

                let verified = finding.verified;
                results.push(finding);
                // 该端点已确认有效，不再尝试其他密码
                if verified {
                    break;
                }
            }
        }

        Ok(results)
    }

    fn detector_type(&self) -> DetectorType {
        DetectorType::AzureContainerRegistry
    }
}
