//! 已知误报过滤（所有检测器共享）
//!
//! - 片段表：命中即视为误报（如 example、xxxxxx）
//! - 词表检查（可选）：常见占位词/字典词子串，以及非 UTF-8 候选
//! 两张表均编译为 ASCII 大小写不敏感的 Aho-Corasick 自动机。
use aho_corasick::{AhoCorasick, AhoCorasickBuilder};

use crate::error::DetectorError;

/// 默认误报片段
pub const DEFAULT_FALSE_POSITIVES: [&str; 7] = ["example", "xxxxxx", "aaaaaa", "abcde", "00000", "sample", "*****"];

/// 占位词（词表检查时使用）
const PLACEHOLDER_WORDS: [&str; 22] = [
    "password", "passwd", "changeme", "secret", "token", "test", "dummy", "placeholder", "your",
    "default", "admin", "letmein", "qwerty", "lorem", "ipsum", "foobar", "redacted", "insert",
    "replace", "undefined", "null", "fake",
];

pub struct FalsePositiveFilter {
    fragments: AhoCorasick,
    words: AhoCorasick,
}

impl FalsePositiveFilter {
    /// 默认片段表 + 额外片段（来自配置文件）
    pub fn new(extra: &[String]) -> Result<Self, DetectorError> {
        let mut fragments: Vec<String> = DEFAULT_FALSE_POSITIVES.iter().map(|s| s.to_string()).collect();
        fragments.extend(extra.iter().filter(|s| !s.is_empty()).map(|s| s.to_ascii_lowercase()));
        Ok(Self { fragments: automaton(&fragments)?, words: automaton(&PLACEHOLDER_WORDS)? })
    }

    /// 判断候选值是否为已知误报
    pub fn is_known(&self, candidate: &[u8], word_check: bool) -> bool {
        if self.fragments.is_match(candidate) {
            return true;
        }
        if word_check {
            if std::str::from_utf8(candidate).is_err() {
                return true;
            }
            return self.words.is_match(candidate);
        }
        false
    }
}

fn automaton<P: AsRef<[u8]>>(patterns: &[P]) -> Result<AhoCorasick, DetectorError> {
    Ok(AhoCorasickBuilder::new().ascii_case_insensitive(true).build(patterns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> FalsePositiveFilter {
        FalsePositiveFilter::new(&["internal-fixture".to_string()]).expect("filter")
    }

    #[test]
    fn default_fragments_match_case_insensitively() {
        let f = filter();
        assert!(f.is_known(b"my-EXAMPLE-key", false));
        assert!(f.is_known(b"AKIAXXXXXXXXXXXX", false));
        assert!(f.is_known(b"value-Internal-Fixture-1", false));
        assert!(!f.is_known(b"PtYgjmUhBel31iEl2hpChYgCfrL1", false));
    }

    #[test]
    fn word_check_is_opt_in() {
        let f = filter();
        assert!(!f.is_known(b"ChangeMe123", false));
        assert!(f.is_known(b"ChangeMe123", true));
        assert!(f.is_known(&[0xff, 0xfe, 0x41], true));
        assert!(!f.is_known(b"V2SEH60KVJ50CE9UVW53EFR4EDT2", true));
    }
}
