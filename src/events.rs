//! 进度事件与取消标志。
//!
//! 分割线程通过 [`EventSink`] 把事件交给调用方；调用方通过 [`CancelToken`]
//! 请求协作式取消，分割线程每读一行检查一次。

use crate::errors::AppError;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// 运行中最多 99.9，只有完成时才是 100
    pub percent_complete: f64,
    pub total_lines: u64,
    pub current_part_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Cancelled,
    Failed,
}

/// 运行结束时的最终快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitSummary {
    pub status: RunStatus,
    pub total_lines: u64,
    /// 实际创建的分片数
    pub total_parts: u32,
    pub total_bytes_read: u64,
    pub total_bytes_written: u64,
    pub percent_complete: f64,
    /// 分片路径由 `PartNaming::paths(total_parts)` 推出，这里不逐个保存
    pub output_dir: PathBuf,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Completed(SplitSummary),
    Cancelled(SplitSummary),
    Failed {
        error: AppError,
        summary: SplitSummary,
    },
}

impl Outcome {
    pub fn summary(&self) -> &SplitSummary {
        match self {
            Outcome::Completed(summary) | Outcome::Cancelled(summary) => summary,
            Outcome::Failed { summary, .. } => summary,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.summary().status
    }

    pub fn error(&self) -> Option<&AppError> {
        match self {
            Outcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// 取消不算错误，同样返回 Ok
    pub fn into_result(self) -> Result<SplitSummary, AppError> {
        match self {
            Outcome::Completed(summary) | Outcome::Cancelled(summary) => Ok(summary),
            Outcome::Failed { error, .. } => Err(error),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    Progress(Progress),
    Status(String),
    Outcome(Outcome),
}

pub trait EventSink {
    fn emit(&mut self, event: Event);
}

/// 批处理模式：丢弃所有事件
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl EventSink for NoEvents {
    fn emit(&mut self, _event: Event) {}
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

impl EventSink for UnboundedSender<Event> {
    // 接收端已经关闭时直接丢弃
    fn emit(&mut self, event: Event) {
        let _ = self.send(event);
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn percent_complete(bytes_read: u64, input_size: u64) -> f64 {
    if input_size == 0 {
        return 0.0;
    }
    (bytes_read as f64 / input_size as f64 * 100.0).min(99.9)
}
