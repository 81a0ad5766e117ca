//! 扫描主流程：git 输出 → 提交流 → 检测器 → 流式 JSON
use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::path::Path;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::{load_config, ScanConfig};
use crate::detectors::DetectorContext;
use crate::findings::{sort_findings_stable, Finding};
use crate::launcher::GitCommand;
use crate::options::{ScanOptions, ScanStats};
use crate::prefilter::DetectorRegistry;
use crate::revision::{Revision, Segment};
use crate::stream::{RevisionStream, StreamEnd};
use crate::types::OutputItem;

/// 扫描仓库并将结果以 JSON 数组流式写入 `out`
/// 稳定性保证：
/// - 提交按 git 输出顺序；片段按文件/hunk 出现顺序
/// - 片段内命中项按 (检测器类型, raw, raw_v2) 排序
pub fn scan_repo_and_write(repo: &Path, out: &mut dyn Write, opts: &ScanOptions) -> Result<ScanStats> {
    let config = load_config(opts.config_path.as_deref())?;
    let registry = build_registry(&config)?;
    let cmd = GitCommand::new(&config.git_binary, repo, &opts.mode)?;
    let stream = RevisionStream::spawn(&cmd).context("start git")?;
    write_stream(stream, &registry, out, opts)
}

/// 扫描预先导出的 git 输出（例如 `git log -p` 的结果文件或标准输入）
pub fn scan_reader_and_write<R: Read + Send + 'static>(reader: R, out: &mut dyn Write, opts: &ScanOptions) -> Result<ScanStats> {
    let config = load_config(opts.config_path.as_deref())?;
    let registry = build_registry(&config)?;
    write_stream(RevisionStream::from_reader(reader), &registry, out, opts)
}

/// 根据配置构建检测器注册表
pub fn build_registry(config: &ScanConfig) -> Result<DetectorRegistry> {
    let ctx = DetectorContext::new(config.http_timeout(), &config.detectors.extra_false_positives)
        .context("build detector context")?;
    let enabled = config.enabled_detectors()?;
    let registry = DetectorRegistry::with_types(&ctx, enabled.as_deref()).context("build detector registry")?;
    Ok(registry)
}

/// 消费提交流并写出；写出失败时提前返回，丢弃流即取消并终止 git
pub fn write_stream(
    mut stream: RevisionStream,
    registry: &DetectorRegistry,
    out: &mut dyn Write,
    opts: &ScanOptions,
) -> Result<ScanStats> {
    let threads = opts.threads.unwrap_or_else(num_cpus::get).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("build rayon pool")?;

    let mut stats = ScanStats::default();
    write!(out, "[")?;
    let mut first = true;

    for revision in stream.by_ref() {
        stats.revisions_scanned += 1;
        // 同一提交内的片段并行扫描（验证请求可能较慢），结果按片段顺序收集
        let per_segment: Vec<Vec<Finding>> =
            pool.install(|| revision.segments.par_iter().map(|seg| scan_segment(registry, seg, opts.verify)).collect());

        for (segment, findings) in revision.segments.iter().zip(per_segment) {
            if !segment.is_binary {
                stats.segments_scanned += 1;
            }
            for f in &findings {
                stats.outputs_written += 1;
                if f.verified {
                    stats.verified += 1;
                }
                if !first {
                    write!(out, ",")?;
                } else {
                    first = false;
                }
                serde_json::to_writer(&mut *out, &output_item(&revision, segment, f))?;
            }
        }
    }

    let summary = stream.finish();
    match &summary.end {
        StreamEnd::Completed => info!(revisions = summary.revisions, exit_code = ?summary.exit_code, "revision stream completed"),
        StreamEnd::Cancelled => warn!(revisions = summary.revisions, "revision stream cancelled; output is partial"),
        StreamEnd::Aborted(err) => warn!(revisions = summary.revisions, error = %err, "revision stream aborted; output is partial"),
    }
    stats.complete = summary.end.is_completed();

    write!(out, "]")?;
    Ok(stats)
}

fn scan_segment(registry: &DetectorRegistry, segment: &Segment, verify: bool) -> Vec<Finding> {
    if segment.is_binary || segment.is_empty() {
        return Vec::new();
    }
    let mut findings = registry.scan(verify, &segment.content);
    sort_findings_stable(&mut findings);
    findings
}

fn output_item<'a>(revision: &'a Revision, segment: &'a Segment, f: &'a Finding) -> OutputItem<'a> {
    OutputItem {
        detector: f.detector_type,
        commit: &revision.hash,
        author: &revision.author,
        date: revision.date.map(|d| d.to_rfc3339()),
        path: &segment.path,
        line: segment.line_start,
        raw: String::from_utf8_lossy(&f.raw).into_owned(),
        raw_v2: f.raw_v2.as_ref().map(|v| String::from_utf8_lossy(v).into_owned()),
        redacted: &f.redacted,
        verified: f.verified,
    }
}
