//! 流桥接：生产者线程（读 git 输出 + 状态机）→ 同步交接通道 → 单一消费者
//!
//! - 通道容量为 0（rendezvous）：消费者取走上一个提交前，生产者不会继续推进，
//!   内存占用约为一个进行中的提交加其最大片段。
//! - 取消：丢弃取消通道的发送端即为取消信号；生产者在每次读行前、以及阻塞在发送时
//!   （select）都会观察到，同时会杀掉 git 子进程，避免生产者永远阻塞。
//! - 通道只在生产者线程结束时关闭一次（Sender 被丢弃），覆盖正常、读错误与 panic 三种路径。
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::panic::{self, AssertUnwindSafe};
use std::process::Child;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{self as channel, select, Receiver, Sender, TryRecvError};
use tracing::{debug, error, warn};

use crate::assembler::RevisionAssembler;
use crate::error::{SetupError, StreamError};
use crate::launcher::GitCommand;
use crate::revision::Revision;

/// 流结束方式
#[derive(Debug)]
pub enum StreamEnd {
    /// 读到 EOF，所有提交均已交付
    Completed,
    /// 消费者主动取消或提前丢弃接收端
    Cancelled,
    /// 读错误或生产者 panic；已交付的提交仍然有效
    Aborted(StreamError),
}

impl StreamEnd {
    pub fn is_completed(&self) -> bool {
        matches!(self, StreamEnd::Completed)
    }
}

/// `RevisionStream::finish` 的汇总
#[derive(Debug)]
pub struct StreamSummary {
    pub end: StreamEnd,
    /// 消费者实际收到的提交数
    pub revisions: usize,
    /// git 退出码（读取自进程时才有；被信号终止则为 None）
    pub exit_code: Option<i32>,
}

struct ProducerOutcome {
    end: StreamEnd,
    exit_code: Option<i32>,
}

/// 提交流（单一消费者）
pub struct RevisionStream {
    rx: Receiver<Revision>,
    cancel: Option<Sender<()>>,
    child: Option<Arc<Mutex<Child>>>,
    child_id: Option<u32>,
    producer: Option<JoinHandle<ProducerOutcome>>,
    received: usize,
    closed: bool,
}

impl RevisionStream {
    /// 启动 git 并开始解析；启动失败同步返回，不产生流
    pub fn spawn(cmd: &GitCommand) -> Result<Self, SetupError> {
        let (child, stdout) = cmd.spawn()?;
        debug!(pid = child.id(), "git started");
        Ok(Self::start(stdout, Some(Arc::new(Mutex::new(child)))))
    }

    /// 解析任意字节流（例如预先导出的 git 输出或标准输入）
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self::start(reader, None)
    }

    fn start<R: Read + Send + 'static>(reader: R, child: Option<Arc<Mutex<Child>>>) -> Self {
        let (tx, rx) = channel::bounded::<Revision>(0);
        let (cancel_tx, cancel_rx) = channel::bounded::<()>(0);
        let producer_child = child.clone();
        let child_id = child.as_ref().map(|c| c.lock().unwrap_or_else(PoisonError::into_inner).id());

        let producer = thread::spawn(move || {
            let end = match panic::catch_unwind(AssertUnwindSafe(|| produce(reader, &tx, &cancel_rx))) {
                Ok(end) => end,
                Err(payload) => {
                    let msg = panic_message(payload.as_ref());
                    error!(panic = %msg, "revision producer panicked; closing stream early");
                    StreamEnd::Aborted(StreamError::Panicked(msg))
                }
            };
            // 先关闭通道，消费者即可结束迭代；随后回收子进程
            drop(tx);
            let exit_code = producer_child.and_then(|c| reap(&c, !end.is_completed()));
            ProducerOutcome { end, exit_code }
        });

        Self {
            rx,
            cancel: Some(cancel_tx),
            child,
            child_id,
            producer: Some(producer),
            received: 0,
            closed: false,
        }
    }

    /// git 子进程的 pid；`from_reader` 构建的流没有子进程
    pub fn child_id(&self) -> Option<u32> {
        self.child_id
    }

    /// 阻塞等待下一个提交；通道关闭后返回 None
    pub fn recv(&mut self) -> Option<Revision> {
        if self.closed {
            return None;
        }
        match self.rx.recv() {
            Ok(revision) => {
                self.received += 1;
                Some(revision)
            }
            Err(_) => {
                self.closed = true;
                None
            }
        }
    }

    /// 取消：通知生产者并杀掉子进程。可重复调用
    pub fn cancel(&mut self) {
        if self.cancel.take().is_some() {
            debug!("revision stream cancelled by consumer");
        }
        if let Some(child) = &self.child {
            let mut child = child.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = child.kill();
        }
    }

    /// 结束消费并取得汇总。未读完就调用视为取消
    pub fn finish(mut self) -> StreamSummary {
        if !self.closed {
            self.cancel();
        }
        let outcome = match self.producer.take().map(JoinHandle::join) {
            Some(Ok(outcome)) => outcome,
            Some(Err(payload)) => {
                let msg = panic_message(payload.as_ref());
                let exit_code = self.child.as_ref().and_then(|c| reap(c, true));
                ProducerOutcome { end: StreamEnd::Aborted(StreamError::Panicked(msg)), exit_code }
            }
            None => ProducerOutcome { end: StreamEnd::Cancelled, exit_code: None },
        };
        StreamSummary { end: outcome.end, revisions: self.received, exit_code: outcome.exit_code }
    }
}

impl Iterator for RevisionStream {
    type Item = Revision;

    fn next(&mut self) -> Option<Revision> {
        self.recv()
    }
}

impl Drop for RevisionStream {
    fn drop(&mut self) {
        if !self.closed {
            self.cancel();
        }
    }
}

/// 生产者主循环
fn produce<R: Read>(reader: R, tx: &Sender<Revision>, cancel: &Receiver<()>) -> StreamEnd {
    let mut reader = BufReader::new(reader);
    let mut assembler = RevisionAssembler::new();
    let mut line = Vec::new();

    loop {
        if is_cancelled(cancel) {
            return StreamEnd::Cancelled;
        }
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                if let Some(revision) = assembler.push_line(&line) {
                    if !deliver(tx, cancel, revision) {
                        return StreamEnd::Cancelled;
                    }
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!(error = %err, "reading git output failed; flushing pending revision");
                if let Some(revision) = assembler.finish() {
                    if !deliver(tx, cancel, revision) {
                        return StreamEnd::Cancelled;
                    }
                }
                return StreamEnd::Aborted(StreamError::Read(err));
            }
        }
    }

    if let Some(revision) = assembler.finish() {
        if !deliver(tx, cancel, revision) {
            return StreamEnd::Cancelled;
        }
    }
    if is_cancelled(cancel) {
        return StreamEnd::Cancelled;
    }
    StreamEnd::Completed
}

/// 同步交付；消费者取消或丢弃接收端时返回 false
fn deliver(tx: &Sender<Revision>, cancel: &Receiver<()>, revision: Revision) -> bool {
    if is_cancelled(cancel) {
        return false;
    }
    select! {
        send(tx, revision) -> res => res.is_ok(),
        recv(cancel) -> _ => false,
    }
}

fn is_cancelled(cancel: &Receiver<()>) -> bool {
    matches!(cancel.try_recv(), Err(TryRecvError::Disconnected))
}

/// 回收子进程；非零退出只记录日志，不撤回已发出的提交
fn reap(child: &Mutex<Child>, kill: bool) -> Option<i32> {
    let mut child = child.lock().unwrap_or_else(PoisonError::into_inner);
    if kill {
        let _ = child.kill();
    }
    match child.wait() {
        Ok(status) => {
            if !status.success() && !kill {
                warn!(%status, "git exited with non-zero status");
            }
            status.code()
        }
        Err(err) => {
            debug!(error = %err, "error waiting for git to complete");
            None
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// 同步解析完整输入（不启动线程）；读错误直接返回
pub fn parse_revisions<R: Read>(reader: R) -> std::io::Result<Vec<Revision>> {
    let mut reader = BufReader::new(reader);
    let mut assembler = RevisionAssembler::new();
    let mut out = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        out.extend(assembler.push_line(&line));
    }
    out.extend(assembler.finish());
    Ok(out)
}
