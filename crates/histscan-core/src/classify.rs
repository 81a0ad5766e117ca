//! 行分类器：按固定优先级将 git 输出的每一行归入唯一类别
//!
//! 所有判定均为行首前缀匹配；输入行包含结尾换行符（若有）。

/// 行类别（全覆盖：无法识别的行归入 `Other`，不引起状态变化）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    CommitHeader,
    Author,
    Date,
    DiffHeader,
    Mode,
    Index,
    NewPath,
    OldPath,
    Added,
    Removed,
    Message,
    Binary,
    HunkHeader,
    Other,
}

const MODE_PREFIXES: [&[u8]; 4] = [b"old mode", b"new mode", b"deleted file mode", b"new file mode"];

/// 对单行分类（优先级顺序即判定顺序，不可调整）
pub fn classify(line: &[u8]) -> LineKind {
    if is_commit_line(line) {
        LineKind::CommitHeader
    } else if is_author_line(line) {
        LineKind::Author
    } else if is_date_line(line) {
        LineKind::Date
    } else if is_diff_line(line) {
        LineKind::DiffHeader
    } else if is_mode_line(line) {
        LineKind::Mode
    } else if line.starts_with(b"index ") {
        LineKind::Index
    } else if line.len() >= 6 && line.starts_with(b"+++") {
        LineKind::NewPath
    } else if line.len() >= 6 && line.starts_with(b"---") {
        LineKind::OldPath
    } else if line.starts_with(b"+") {
        LineKind::Added
    } else if line.starts_with(b"-") {
        LineKind::Removed
    } else if line.starts_with(b"    ") {
        LineKind::Message
    } else if line.len() > 7 && line.starts_with(b"Binary") {
        LineKind::Binary
    } else if line.starts_with(b"@@") {
        LineKind::HunkHeader
    } else {
        LineKind::Other
    }
}

fn is_commit_line(line: &[u8]) -> bool {
    line.len() > 7 && line.starts_with(b"commit")
}

fn is_author_line(line: &[u8]) -> bool {
    line.len() > 8 && line.starts_with(b"Author:")
}

fn is_date_line(line: &[u8]) -> bool {
    line.len() > 7 && line.starts_with(b"Date:")
}

fn is_diff_line(line: &[u8]) -> bool {
    line.len() > 7 && line.starts_with(b"diff --git")
}

fn is_mode_line(line: &[u8]) -> bool {
    MODE_PREFIXES.iter().any(|p| line.starts_with(p))
}

/// 从 `Binary files a/x and b/x differ` 中取出新路径；缺少分隔符时返回空串
pub fn binary_path(line: &[u8]) -> String {
    let text = String::from_utf8_lossy(line);
    let Some((_, rest)) = text.split_once(" and b/") else {
        return String::new();
    };
    let rest = rest.trim_end_matches(['\n', '\r']);
    rest.strip_suffix(" differ").unwrap_or(rest).to_string()
}

/// 解析 hunk 头 `@@ -a,b +c,d @@` 中新文件侧的起始行号 c
pub fn hunk_line_start(line: &[u8]) -> Option<usize> {
    let field = line.split(|b| *b == b' ').nth(2)?;
    let start = field.split(|b| *b == b',').next()?;
    let start = start.strip_prefix(b"+").unwrap_or(start);
    std::str::from_utf8(start).ok()?.parse().ok()
}
