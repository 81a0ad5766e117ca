//! git 历史/差异增量解析与密钥检测核心库
//!
//! 设计要点：
//! - git 输出按行分类，逐行折叠为提交（Revision）与新增内容片段（Segment），不做前瞻。
//! - 生产者与消费者之间是容量为 0 的通道：任何时刻只有一个进行中的提交，内存有界。
//! - 任何中途异常都降级为部分结果；只有启动 git 失败会同步返回错误。
//! - 检测器以注册表形式组织，先用关键字自动机预筛，再运行精确正则与可选的在线验证。

mod assembler;
mod classify;
mod config;
pub mod detectors;
mod error;
mod false_positives;
mod findings;
mod launcher;
mod options;
mod prefilter;
mod revision;
mod scan;
mod stream;
mod types;

pub use assembler::{assemble_all, RevisionAssembler};
pub use classify::{binary_path, classify, hunk_line_start, LineKind};
pub use config::{load_config, parse_config, DetectorSection, ScanConfig, DEFAULT_CONFIG_PATH};
pub use detectors::{prefix_regex, Detector, DetectorContext, DetectorType, Verifier};
pub use error::{ConfigError, DetectorError, SetupError, StreamError};
pub use false_positives::{FalsePositiveFilter, DEFAULT_FALSE_POSITIVES};
pub use findings::Finding;
pub use launcher::{GitCommand, ScanMode, GIT_DATE_FORMAT};
pub use options::{ScanOptions, ScanStats};
pub use prefilter::DetectorRegistry;
pub use revision::{Revision, Segment};
pub use scan::{build_registry, scan_reader_and_write, scan_repo_and_write, write_stream};
pub use stream::{parse_revisions, RevisionStream, StreamEnd, StreamSummary};
pub use types::OutputItem;
