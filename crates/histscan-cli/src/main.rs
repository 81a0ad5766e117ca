use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use histscan_core::{scan_reader_and_write, scan_repo_and_write, ScanMode, ScanOptions};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

/// histscan 命令行
#[derive(Parser, Debug)]
#[command(name = "histscan", version, about = "扫描 git 历史与工作区新增内容中的密钥")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 扫描仓库并输出 JSON 数组
    Scan {
        /// 仓库路径
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// 调用方式：history（全历史）或 unstaged（工作区相对 HEAD）
        #[arg(long, default_value = "history", value_parser = ["history", "unstaged"])]
        mode: String,

        /// 起始引用或范围（仅 history 模式，例如 v1.0..HEAD）；缺省扫描全部引用
        #[arg(long)]
        since: Option<String>,

        /// 路径过滤（仅 history 模式，可重复）
        #[arg(long = "path")]
        paths: Vec<String>,

        /// 读取预先导出的 git 输出而不启动 git（"-" 表示标准输入）
        #[arg(long)]
        from_log: Option<PathBuf>,

        /// 对候选密钥做在线验证
        #[arg(long)]
        verify: bool,

        /// 结果文件（JSON 数组）
        #[arg(long, default_value = "./findings.json")]
        output: PathBuf,

        /// 检测线程数（"auto"=CPU 核心数）
        #[arg(long, default_value = "auto")]
        threads: String,

        /// 配置文件路径（TOML），默认 ./histscan.toml
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // 日志写到 stderr，等级由 RUST_LOG 控制（默认 info）
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { repo, mode, since, paths, from_log, verify, output, threads, config } => {
            let mode = parse_mode(&mode, since, paths)?;
            info!(?repo, ?output, ?mode, "starting scan");

            // 结果边扫描边写出，中途失败也保留已写部分
            let mut out = BufWriter::new(File::create(&output).context("create output file")?);
            let opts = ScanOptions { mode, verify, threads: parse_threads(&threads), config_path: config };

            let stats = match from_log {
                Some(path) if path.as_os_str() == "-" => scan_reader_and_write(std::io::stdin(), &mut out, &opts),
                Some(path) => {
                    let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
                    scan_reader_and_write(file, &mut out, &opts)
                }
                None => scan_repo_and_write(&repo, &mut out, &opts),
            }
            .context("scan and write failed")?;
            out.flush().context("flush output")?;

            info!(
                revisions = stats.revisions_scanned,
                segments = stats.segments_scanned,
                outputs_written = stats.outputs_written,
                verified = stats.verified,
                complete = stats.complete,
                "scan finished"
            );
        }
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 解析调用方式；起始引用与路径过滤只对 history 有意义
fn parse_mode(mode: &str, since: Option<String>, paths: Vec<String>) -> Result<ScanMode> {
    match mode {
        "unstaged" => {
            if since.is_some() || !paths.is_empty() {
                bail!("--since/--path only apply to --mode history");
            }
            Ok(ScanMode::WorkingTree)
        }
        _ => Ok(ScanMode::History { since, paths }),
    }
}

/// "auto" 或正整数；其它值退回自动
fn parse_threads(s: &str) -> Option<usize> {
    if s.eq_ignore_ascii_case("auto") {
        return None;
    }
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Some(n),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threads_argument() {
        assert_eq!(parse_threads("auto"), None);
        assert_eq!(parse_threads("4"), Some(4));
        assert_eq!(parse_threads("0"), None);
    }

    #[test]
    fn unstaged_rejects_history_filters() {
        assert_eq!(parse_mode("unstaged", None, vec![]).expect("mode"), ScanMode::WorkingTree);
        assert!(parse_mode("unstaged", Some("HEAD~3".into()), vec![]).is_err());
        assert_eq!(
            parse_mode("history", None, vec!["src".into()]).expect("mode"),
            ScanMode::History { since: None, paths: vec!["src".into()] }
        );
    }

    #[test]
    fn cli_parses_scan_flags() {
        let cli = Cli::try_parse_from(["histscan", "scan", "--repo", "/tmp/r", "--mode", "unstaged", "--verify"]).expect("parse");
        let Commands::Scan { repo, mode, verify, .. } = cli.command;
        assert_eq!(repo, PathBuf::from("/tmp/r"));
        assert_eq!(mode, "unstaged");
        assert!(verify);
    }

    #[test]
    fn output_defaults_to_findings_file() {
        let cli = Cli::try_parse_from(["histscan", "scan"]).expect("parse");
        let Commands::Scan { output, threads, .. } = cli.command;
        assert_eq!(output, PathBuf::from("./findings.json"));
        assert_eq!(threads, "auto");
    }
}
