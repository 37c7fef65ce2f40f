use crate::errors::AppError;
use crate::events::{
    CancelToken, Event, EventSink, NoEvents, Outcome, Progress, RunStatus, SplitSummary,
    percent_complete,
};
use crate::job::SplitJob;
use crate::sink::{FilePartFactory, PartFactory, PartSink};
use crate::source::LineSource;
use log::{debug, error, info, warn};
use std::fs;
use std::io::Read;
use std::time::Instant;

/// 默认每处理这么多行发一次进度事件
pub const DEFAULT_PROGRESS_EVERY: u64 = 100_000;

/// 一次运行的可变计数器，只由分割线程修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitState {
    pub current_part_index: u32,
    pub parts_created: u32,
    pub lines_in_current_part: u64,
    pub bytes_in_current_part: u64,
    pub total_lines: u64,
    pub total_bytes_read: u64,
    pub total_bytes_written: u64,
    pub input_size: u64,
}

impl Default for SplitState {
    fn default() -> Self {
        SplitState {
            current_part_index: 1,
            parts_created: 0,
            lines_in_current_part: 0,
            bytes_in_current_part: 0,
            total_lines: 0,
            total_bytes_read: 0,
            total_bytes_written: 0,
            input_size: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobState {
    fn advance(&mut self, next: JobState) {
        debug_assert!(matches!(
            (*self, next),
            (JobState::Idle, JobState::Running)
                | (JobState::Running, JobState::Completed)
                | (JobState::Running, JobState::Cancelled)
                | (JobState::Running, JobState::Failed)
        ));
        debug!("split state {:?} -> {:?}", self, next);
        *self = next;
    }
}

enum Flow {
    Exhausted,
    Cancelled,
}

/// 分割驱动：单线程顺序读取、换片、写入，同一时刻最多只有一个分片打开
pub struct Splitter {
    job: SplitJob,
    progress_every: u64,
    cancel: CancelToken,
}

impl Splitter {
    pub fn new(job: SplitJob) -> Self {
        Splitter {
            job,
            progress_every: DEFAULT_PROGRESS_EVERY,
            cancel: CancelToken::new(),
        }
    }

    pub fn progress_every(mut self, lines: u64) -> Self {
        self.progress_every = lines.max(1);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn job(&self) -> &SplitJob {
        &self.job
    }

    /// 写入真实文件；最后一个事件总是 `Event::Outcome`
    pub fn run(&self, events: &mut dyn EventSink) -> Outcome {
        let mut parts = FilePartFactory::new(self.job.naming.clone());
        self.run_with(&mut parts, events)
    }

    pub fn run_with(&self, parts: &mut dyn PartFactory, events: &mut dyn EventSink) -> Outcome {
        self.execute(self.prepare(), parts, events)
    }

    /// 从任意已打开的行源分割；不会创建输出目录，由 `parts` 自己负责落盘位置
    pub fn run_source<R: Read>(
        &self,
        source: LineSource<R>,
        parts: &mut dyn PartFactory,
        events: &mut dyn EventSink,
    ) -> Outcome {
        self.execute(Ok(source), parts, events)
    }

    fn execute<R: Read>(
        &self,
        source: Result<LineSource<R>, AppError>,
        parts: &mut dyn PartFactory,
        events: &mut dyn EventSink,
    ) -> Outcome {
        let started = Instant::now();
        let mut phase = JobState::Idle;
        phase.advance(JobState::Running);

        let mut state = SplitState::default();
        let result = source.and_then(|source| self.pump(source, parts, &mut state, events));

        let (status, error) = match result {
            Ok(Flow::Exhausted) => (RunStatus::Completed, None),
            Ok(Flow::Cancelled) => (RunStatus::Cancelled, None),
            Err(e) => (RunStatus::Failed, Some(e)),
        };
        phase.advance(match status {
            RunStatus::Completed => JobState::Completed,
            RunStatus::Cancelled => JobState::Cancelled,
            RunStatus::Failed => JobState::Failed,
        });

        let summary = SplitSummary {
            status,
            total_lines: state.total_lines,
            total_parts: state.parts_created,
            total_bytes_read: state.total_bytes_read,
            total_bytes_written: state.total_bytes_written,
            percent_complete: match status {
                RunStatus::Completed => 100.0,
                _ => percent_complete(state.total_bytes_read, state.input_size),
            },
            output_dir: self.job.output_dir().to_path_buf(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        let outcome = match error {
            Some(error) => {
                error!("split of {} failed: {}", self.job.input_path.display(), error);
                Outcome::Failed { error, summary }
            }
            None if status == RunStatus::Cancelled => {
                warn!(
                    "split of {} cancelled after {} lines",
                    self.job.input_path.display(),
                    summary.total_lines
                );
                Outcome::Cancelled(summary)
            }
            None => {
                info!(
                    "split {} into {} parts ({} lines) in {} ms",
                    self.job.input_path.display(),
                    summary.total_parts,
                    summary.total_lines,
                    summary.elapsed_ms
                );
                Outcome::Completed(summary)
            }
        };
        events.emit(Event::Outcome(outcome.clone()));
        outcome
    }

    /// 先确认输入存在，再创建输出目录（已存在则复用）
    fn prepare(&self) -> Result<LineSource, AppError> {
        let source = LineSource::open(&self.job.input_path)?;
        fs::create_dir_all(self.job.output_dir()).map_err(|e| {
            AppError::io(format!("create directory {}", self.job.output_dir().display()), e)
        })?;
        Ok(source)
    }

    fn pump<R: Read>(
        &self,
        source: LineSource<R>,
        parts: &mut dyn PartFactory,
        state: &mut SplitState,
        events: &mut dyn EventSink,
    ) -> Result<Flow, AppError> {
        let mut current: Option<Box<dyn PartSink>> = None;
        let flow = self.drive(source, parts, &mut current, state, events);
        let closed = match current.take() {
            Some(sink) => sink.close(),
            None => Ok(()),
        };
        match (flow, closed) {
            (Err(e), Err(close_err)) => {
                warn!("closing part after failure also failed: {}", close_err);
                Err(e)
            }
            (Err(e), Ok(())) | (Ok(_), Err(e)) => Err(e),
            (Ok(flow), Ok(())) => Ok(flow),
        }
    }

    fn drive<R: Read>(
        &self,
        source: LineSource<R>,
        parts: &mut dyn PartFactory,
        current: &mut Option<Box<dyn PartSink>>,
        state: &mut SplitState,
        events: &mut dyn EventSink,
    ) -> Result<Flow, AppError> {
        state.input_size = source.size_hint();
        let mut policy = self.job.policy.rollover();

        for line in source {
            let line = line?;
            state.total_bytes_read += line.raw_len as u64;
            if self.cancel.is_cancelled() {
                return Ok(Flow::Cancelled);
            }
            // 整行都是非法字节时解码为空，不算一行，也不触发换片
            if line.text.is_empty() {
                debug!("skipped {} undecodable bytes", line.raw_len);
                continue;
            }

            let len = line.byte_len() as u64;
            if current.is_none() || policy.should_rollover(state, len) {
                // 先置空再关闭，关闭失败时 pump 不会再关一次
                if let Some(sink) = current.take() {
                    sink.close()?;
                }
                let index = state.parts_created + 1;
                events.emit(Event::Status(format!(
                    "Creating: {}",
                    self.job.naming.file_name(index)
                )));
                let sink = parts.open(index)?;
                info!("opened part {} at {}", index, sink.path().display());
                state.parts_created = index;
                state.current_part_index = index;
                policy.on_part_opened(state);
                *current = Some(sink);
            }

            let sink = current
                .as_mut()
                .ok_or_else(|| AppError::Internal("no open part to write to".to_string()))?;
            sink.write_line(&line)?;
            policy.on_line_written(state, len);
            state.total_lines += 1;
            state.total_bytes_written += len;

            if state.total_lines % self.progress_every == 0 {
                events.emit(Event::Progress(Progress {
                    percent_complete: percent_complete(state.total_bytes_read, state.input_size),
                    total_lines: state.total_lines,
                    current_part_index: state.current_part_index,
                }));
            }
        }
        Ok(Flow::Exhausted)
    }
}

/// 批处理模式：不报告进度，也不会被取消
pub fn split_file(job: SplitJob) -> Result<SplitSummary, AppError> {
    Splitter::new(job).run(&mut NoEvents).into_result()
}
