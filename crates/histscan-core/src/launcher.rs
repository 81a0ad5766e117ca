//! git 进程启动器：两种固定调用方式，环境变量固定，日期格式与区域设置无关
use std::ffi::OsString;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, info};

use crate::error::SetupError;

/// 传给 `--date=format:` 的格式；解析 `Date:` 行时使用同一个常量
pub const GIT_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y %z";

/// 调用方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMode {
    /// 全历史：`git log -p`，可选起始引用与路径过滤
    History { since: Option<String>, paths: Vec<String> },
    /// 工作区相对 HEAD：`git diff -p -U0`，仅新增/修改的文件
    WorkingTree,
}

impl Default for ScanMode {
    fn default() -> Self {
        ScanMode::History { since: None, paths: Vec::new() }
    }
}

/// 已构建好的 git 调用
#[derive(Debug, Clone)]
pub struct GitCommand {
    program: String,
    repo: PathBuf,
    args: Vec<OsString>,
}

impl GitCommand {
    /// 针对仓库路径构建调用；路径会先解析为绝对路径
    pub fn new(program: &str, repo: &Path, mode: &ScanMode) -> Result<Self, SetupError> {
        let repo = std::fs::canonicalize(repo)
            .map_err(|source| SetupError::ResolvePath { path: repo.to_path_buf(), source })?;
        let date = OsString::from(format!("--date=format:{GIT_DATE_FORMAT}"));

        let mut args: Vec<OsString> = vec!["-C".into(), repo.clone().into_os_string()];
        match mode {
            ScanMode::History { since, paths } => {
                args.extend(["log", "-p", "-U5", "--full-history"].map(OsString::from));
                args.push(date);
                match since {
                    Some(rev) => args.push(rev.into()),
                    None => args.push("--all".into()),
                }
                if !paths.is_empty() {
                    args.push("--".into());
                    args.extend(paths.iter().map(OsString::from));
                }
            }
            ScanMode::WorkingTree => {
                args.extend(["diff", "-p", "-U0", "--full-history", "--diff-filter=AM"].map(OsString::from));
                args.push(date);
                args.push("HEAD".into());
            }
        }

        Ok(Self { program: program.to_string(), repo, args })
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// 组装 `Command`：清空环境，仅保留 PATH，并把 GIT_DIR 固定到仓库绝对路径
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.env_clear();
        if let Some(path) = std::env::var_os("PATH") {
            cmd.env("PATH", path);
        }
        cmd.env("GIT_DIR", self.repo.join(".git"));
        cmd.env("LC_ALL", "C");
        cmd.env("GIT_PAGER", "cat");
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd
    }

    /// 启动进程；失败即为同步的 SetupError
    pub fn spawn(&self) -> Result<(Child, ChildStdout), SetupError> {
        info!(program = %self.program, repo = %self.repo.display(), "starting git");
        debug!(args = ?self.args, "git arguments");
        let mut child = self
            .command()
            .spawn()
            .map_err(|source| SetupError::Spawn { program: self.program.clone(), source })?;

        // stderr 由辅助线程读尽并以 debug 级别记录，避免管道写满阻塞子进程
        if let Some(stderr) = child.stderr.take() {
            std::thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    debug!(target: "histscan::git", "{line}");
                }
            });
        }

        match child.stdout.take() {
            Some(stdout) => Ok((child, stdout)),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(SetupError::MissingStdout)
            }
        }
    }
}
