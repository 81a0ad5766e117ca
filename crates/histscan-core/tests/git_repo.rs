//! 针对临时 git 仓库的端到端测试；环境中没有 git 时跳过
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use histscan_core::{GitCommand, Revision, RevisionStream, ScanMode, SetupError, StreamEnd};
use tempfile::TempDir;

fn git_available() -> bool {
    Command::new("git").arg("--version").output().map(|o| o.status.success()).unwrap_or(false)
}

fn git(repo: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com", "-c", "commit.gpgsign=false"])
        .args(args)
        .output()
        .expect("run git");
    assert!(status.status.success(), "git {args:?} failed: {}", String::from_utf8_lossy(&status.stderr));
}

/// 两个提交：先加文本文件，再加二进制文件
fn fixture_repo() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    git(dir.path(), &["init", "-q"]);

    fs::write(dir.path().join("config.txt"), "alpha\nbeta\n").expect("write config");
    git(dir.path(), &["add", "config.txt"]);
    git(dir.path(), &["commit", "-q", "-m", "add config"]);

    fs::write(dir.path().join("logo.bin"), [0x89u8, b'P', b'N', b'G', 0, 0, 1, 2, 0, 3]).expect("write logo");
    git(dir.path(), &["add", "logo.bin"]);
    git(dir.path(), &["commit", "-q", "-m", "add logo"]);
    dir
}

/// 足够大的历史，保证 git 在管道写满后阻塞，不会在取消前自行退出
fn busy_repo() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    git(dir.path(), &["init", "-q"]);
    for commit in 0..40 {
        let body: String = (0..3000).map(|line| format!("revision {commit} line {line}\n")).collect();
        fs::write(dir.path().join("big.txt"), body).expect("write big");
        git(dir.path(), &["add", "big.txt"]);
        git(dir.path(), &["commit", "-q", "-m", &format!("rewrite {commit}")]);
    }
    dir
}

fn collect(repo: &Path, mode: ScanMode) -> (Vec<Revision>, histscan_core::StreamSummary) {
    let cmd = GitCommand::new("git", repo, &mode).expect("command");
    let mut stream = RevisionStream::spawn(&cmd).expect("spawn");
    let revisions: Vec<_> = stream.by_ref().collect();
    (revisions, stream.finish())
}

#[test]
fn history_mode_yields_revisions_newest_first() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let repo = fixture_repo();
    let (revisions, summary) = collect(repo.path(), ScanMode::default());

    assert!(summary.end.is_completed());
    assert_eq!(summary.exit_code, Some(0));
    assert_eq!(revisions.len(), 2);

    let logo = &revisions[0];
    assert_eq!(logo.message, "add logo\n");
    assert_eq!(logo.segments.len(), 1);
    assert!(logo.segments[0].is_binary);
    assert_eq!(logo.segments[0].path, "logo.bin");

    let config = &revisions[1];
    assert_eq!(config.hash.len(), 40);
    assert!(config.hash.bytes().all(|b| b.is_ascii_hexdigit()));
    assert_eq!(config.author, "Test <test@example.com>");
    assert!(config.date.is_some());
    assert_eq!(config.segments.len(), 1);
    assert_eq!(config.segments[0].path, "config.txt");
    assert_eq!(config.segments[0].line_start, 1);
    assert_eq!(config.segments[0].content, b"alpha\nbeta\n");
}

#[test]
fn history_mode_honours_path_filter() {
    if !git_available() {
        return;
    }
    let repo = fixture_repo();
    let mode = ScanMode::History { since: None, paths: vec!["config.txt".into()] };
    let (revisions, _) = collect(repo.path(), mode);
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].segments[0].path, "config.txt");
}

#[test]
fn working_tree_mode_reports_unstaged_additions() {
    if !git_available() {
        return;
    }
    let repo = fixture_repo();
    fs::write(repo.path().join("config.txt"), "alpha\nbeta\ngamma\n").expect("modify config");

    let (revisions, summary) = collect(repo.path(), ScanMode::WorkingTree);
    assert!(summary.end.is_completed());
    assert_eq!(revisions.len(), 1);

    let revision = &revisions[0];
    assert!(revision.hash.is_empty());
    assert_eq!(revision.segments.len(), 1);
    assert_eq!(revision.segments[0].path, "config.txt");
    assert_eq!(revision.segments[0].line_start, 3);
    assert_eq!(revision.segments[0].content, b"gamma\n");
}

#[test]
fn clean_working_tree_yields_nothing() {
    if !git_available() {
        return;
    }
    let repo = fixture_repo();
    let (revisions, summary) = collect(repo.path(), ScanMode::WorkingTree);
    assert!(revisions.is_empty());
    assert!(summary.end.is_completed());
}

#[test]
fn non_repository_closes_stream_with_git_exit_status() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let (revisions, summary) = collect(dir.path(), ScanMode::default());
    assert!(revisions.is_empty());
    assert!(summary.end.is_completed());
    assert_ne!(summary.exit_code, Some(0));
}

#[test]
fn missing_git_binary_fails_synchronously() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cmd = GitCommand::new("histscan-no-such-git-binary", dir.path(), &ScanMode::default()).expect("command");
    assert!(matches!(RevisionStream::spawn(&cmd), Err(SetupError::Spawn { .. })));
}

#[test]
fn finish_kills_git_mid_stream() {
    if !git_available() {
        return;
    }
    let repo = busy_repo();
    let cmd = GitCommand::new("git", repo.path(), &ScanMode::default()).expect("command");
    let mut stream = RevisionStream::spawn(&cmd).expect("spawn");
    assert!(stream.child_id().is_some());
    assert!(stream.recv().is_some());

    let started = Instant::now();
    let summary = stream.finish();
    assert!(started.elapsed() < Duration::from_secs(5), "finish blocked for {:?}", started.elapsed());
    assert!(matches!(summary.end, StreamEnd::Cancelled));
    assert_eq!(summary.revisions, 1);
    // 被信号终止，没有退出码
    #[cfg(unix)]
    assert_eq!(summary.exit_code, None);
}

#[cfg(target_os = "linux")]
#[test]
fn dropping_stream_kills_and_reaps_git() {
    if !git_available() {
        return;
    }
    let repo = busy_repo();
    let cmd = GitCommand::new("git", repo.path(), &ScanMode::default()).expect("command");
    let mut stream = RevisionStream::spawn(&cmd).expect("spawn");
    let pid = stream.child_id().expect("git pid");
    assert!(stream.recv().is_some());
    drop(stream);

    let proc_entry = Path::new("/proc").join(pid.to_string());
    let deadline = Instant::now() + Duration::from_secs(5);
    while proc_entry.exists() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(!proc_entry.exists(), "git process {pid} still present after drop");
}
