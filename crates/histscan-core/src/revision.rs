//! 提交记录（Revision）与差异片段（Segment）数据模型
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// 单个文件某个 hunk 中“新增内容”的片段
/// - `line_start` 仅在 `is_binary == false` 时有意义
/// - 二进制片段的 `content` 恒为空，`path` 取自 Binary 标记行
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub path: String,
    pub line_start: usize,
    #[serde(serialize_with = "serialize_lossy")]
    pub content: Vec<u8>,
    pub is_binary: bool,
}

impl Segment {
    /// 新片段继承上一个片段的路径（同一文件的下一个 hunk）
    pub(crate) fn continuing(path: &str) -> Self {
        Self { path: path.to_string(), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// 有新增内容，或是二进制文件标记（内容恒为空，但路径本身有价值）
    pub fn is_reportable(&self) -> bool {
        self.is_binary || !self.is_empty()
    }
}

/// 重建后的提交记录
/// 不变式：`segments` 中不存在内容为空的文本片段
#[derive(Debug, Clone, Default, Serialize)]
pub struct Revision {
    pub hash: String,
    pub author: String,
    /// 解析失败或缺失时为 None（零值）
    pub date: Option<DateTime<FixedOffset>>,
    pub message: String,
    pub segments: Vec<Segment>,
}

impl Revision {
    /// 追加片段；空内容的文本片段直接丢弃（仅元数据变化，如 mode/rename）
    pub(crate) fn push_segment(&mut self, segment: Segment) {
        if segment.is_reportable() {
            self.segments.push(segment);
        }
    }
}

/// 结构相等：hash、作者、时间（按时刻比较）、提交信息、片段数量一致，
/// 且逐位置比较每个片段的路径、起始行、内容与二进制标记
impl PartialEq for Revision {
    fn eq(&self, other: &Self) -> bool {
        if self.hash != other.hash
            || self.author != other.author
            || self.date != other.date
            || self.message != other.message
            || self.segments.len() != other.segments.len()
        {
            return false;
        }
        self.segments.iter().zip(&other.segments).all(|(a, b)| {
            a.path == b.path
                && a.line_start == b.line_start
                && a.content == b.content
                && a.is_binary == b.is_binary
        })
    }
}

impl Eq for Revision {}

fn serialize_lossy<S: serde::Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&String::from_utf8_lossy(bytes))
}
