//! 提交重建状态机
//!
//! 状态由（当前提交, 当前片段）二元组隐式表示；逐行推进，不做前瞻。
//! 任意时刻最多持有一个进行中的提交与一个进行中的片段。
use chrono::DateTime;
use tracing::debug;

use crate::classify::{binary_path, classify, hunk_line_start, LineKind};
use crate::launcher::GIT_DATE_FORMAT;
use crate::revision::{Revision, Segment};

/// commit 行中 hash 的字节区间（`commit ` 之后 40 个十六进制字符）
const HASH_START: usize = 7;
const HASH_END: usize = 47;

#[derive(Debug, Default)]
pub struct RevisionAssembler {
    revision: Option<Revision>,
    segment: Option<Segment>,
}

impl RevisionAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 处理一行；若该行是新的提交边界，返回上一个已完成的提交
    pub fn push_line(&mut self, line: &[u8]) -> Option<Revision> {
        match classify(line) {
            LineKind::CommitHeader => {
                let completed = self.take_revision();
                let mut revision = Revision::default();
                if line.len() >= HASH_END {
                    revision.hash = lossy(&line[HASH_START..HASH_END]);
                }
                self.revision = Some(revision);
                self.segment = Some(Segment::default());
                return completed;
            }
            LineKind::Author => {
                self.revision_mut().author = trim_newline(lossy(&line[8..]));
            }
            LineKind::Date => {
                let text = lossy(&line[6..]);
                let text = text.trim();
                match DateTime::parse_from_str(text, GIT_DATE_FORMAT) {
                    Ok(date) => self.revision_mut().date = Some(date),
                    Err(err) => {
                        debug!(date = text, error = %err, "could not parse date from git stream");
                        self.revision_mut().date = None;
                    }
                }
            }
            LineKind::DiffHeader => {
                self.revision_mut();
                self.flush_segment();
                self.segment = Some(Segment::default());
            }
            LineKind::Mode | LineKind::Index | LineKind::OldPath | LineKind::Removed => {
                // 只关心新增内容
            }
            LineKind::NewPath => {
                let path = lossy(line.get(6..).unwrap_or_default());
                self.segment_mut().path = path.trim().to_string();
            }
            LineKind::Added => {
                self.segment_mut().content.extend_from_slice(&line[1..]);
            }
            LineKind::Message => {
                let text = lossy(&line[4..]);
                self.revision_mut().message.push_str(&text);
            }
            LineKind::Binary => {
                self.flush_segment();
                self.segment = Some(Segment {
                    path: binary_path(line),
                    is_binary: true,
                    ..Segment::default()
                });
            }
            LineKind::HunkHeader => {
                let path = self.segment.as_ref().map(|s| s.path.clone()).unwrap_or_default();
                self.flush_segment();
                let mut segment = Segment::continuing(&path);
                segment.line_start = hunk_line_start(line).unwrap_or(0);
                self.segment = Some(segment);
            }
            LineKind::Other => {}
        }
        None
    }

    /// 输入结束：冲刷剩余片段并返回最后一个提交（若有）
    pub fn finish(mut self) -> Option<Revision> {
        self.take_revision()
    }

    /// 将当前片段并入当前提交并取出提交；片段状态被清空
    fn take_revision(&mut self) -> Option<Revision> {
        self.flush_segment();
        self.revision.take()
    }

    /// 片段被取代时调用：仅保留有新增内容的片段与二进制标记片段
    fn flush_segment(&mut self) {
        if let Some(segment) = self.segment.take() {
            self.revision_mut().push_segment(segment);
        }
    }

    /// 流开头缺少 commit 行时，补一个零值提交而不是失败
    fn revision_mut(&mut self) -> &mut Revision {
        self.revision.get_or_insert_with(Revision::default)
    }

    fn segment_mut(&mut self) -> &mut Segment {
        if self.revision.is_none() {
            self.revision = Some(Revision::default());
        }
        self.segment.get_or_insert_with(Segment::default)
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn trim_newline(mut s: String) -> String {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
    s
}

/// 对完整输入逐行重建，返回全部提交（测试与小规模输入使用）
pub fn assemble_all<'a, I>(lines: I) -> Vec<Revision>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut assembler = RevisionAssembler::new();
    let mut out: Vec<Revision> = lines.into_iter().filter_map(|l| assembler.push_line(l)).collect();
    out.extend(assembler.finish());
    out
}
