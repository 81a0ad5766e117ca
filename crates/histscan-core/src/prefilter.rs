//! 检测器注册表与关键字预筛（Aho-Corasick）
//!
//! 设计要点：
//! - 注册表按 `DetectorType` 有序存放检测器，输出顺序可复现。
//! - 所有检测器的关键字合并为一个大小写不敏感的自动机；
//!   扫描时先找关键字命中，只运行命中的检测器，再做精确正则匹配。
use std::collections::{BTreeMap, BTreeSet};

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use tracing::warn;

use crate::detectors::{build_detector, Detector, DetectorContext, DetectorType};
use crate::error::DetectorError;
use crate::findings::Finding;

pub struct DetectorRegistry {
    detectors: BTreeMap<DetectorType, Box<dyn Detector>>,
    /// 全局关键字自动机（模式下标与 keyword_owner 一一对应）
    ac: AhoCorasick,
    keyword_owner: Vec<DetectorType>,
}

impl DetectorRegistry {
    /// 从检测器列表构建；同类型重复注册时后者覆盖前者
    pub fn new(detectors: Vec<Box<dyn Detector>>) -> Result<Self, DetectorError> {
        let detectors: BTreeMap<DetectorType, Box<dyn Detector>> =
            detectors.into_iter().map(|d| (d.detector_type(), d)).collect();

        let mut keywords: Vec<&str> = Vec::new();
        let mut keyword_owner = Vec::new();
        for (kind, detector) in &detectors {
            for kw in detector.keywords() {
                keywords.push(*kw);
                keyword_owner.push(*kind);
            }
        }

        let ac = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::Standard)
            .build(&keywords)?;

        Ok(Self { detectors, ac, keyword_owner })
    }

    /// 构建指定类型（None 表示全部内置类型）的注册表
    pub fn with_types(ctx: &DetectorContext, kinds: Option<&[DetectorType]>) -> Result<Self, DetectorError> {
        let kinds = kinds.unwrap_or(&DetectorType::ALL);
        let detectors = kinds.iter().map(|k| build_detector(*k, ctx)).collect::<Result<Vec<_>, _>>()?;
        Self::new(detectors)
    }

    pub fn get(&self, kind: DetectorType) -> Option<&dyn Detector> {
        self.detectors.get(&kind).map(|d| d.as_ref())
    }

    pub fn types(&self) -> impl Iterator<Item = DetectorType> + '_ {
        self.detectors.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// 关键字出现在数据中的检测器集合
    pub fn candidates(&self, data: &[u8]) -> BTreeSet<DetectorType> {
        self.ac
            .find_overlapping_iter(data)
            .map(|m| self.keyword_owner[m.pattern().as_usize()])
            .collect()
    }

    /// 对一段数据运行所有命中关键字的检测器；单个检测器出错只记录日志
    pub fn scan(&self, verify: bool, data: &[u8]) -> Vec<Finding> {
        let mut findings = Vec::new();
        for kind in self.candidates(data) {
            let Some(detector) = self.detectors.get(&kind) else { continue };
            match detector.from_data(verify, data) {
                Ok(mut found) => findings.append(&mut found),
                Err(err) => warn!(detector = %kind, error = %err, "detector failed"),
            }
        }
        findings
    }
}
