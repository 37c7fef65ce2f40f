use crate::errors::AppError;
use crate::events::{CancelToken, Event, Outcome};
use crate::job::SplitJob;
use crate::split::Splitter;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

/// 后台分割任务的句柄：事件流 + 取消 + 等待结果
pub struct JobHandle {
    events: UnboundedReceiver<Event>,
    cancel: CancelToken,
    task: JoinHandle<Outcome>,
}

/// 在阻塞线程池上启动分割任务，必须在 tokio 运行时内调用
pub fn start_job(job: SplitJob, progress_every: u64) -> JobHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancelToken::new();
    let splitter = Splitter::new(job)
        .progress_every(progress_every)
        .cancel_token(cancel.clone());
    let task = tokio::task::spawn_blocking(move || {
        let mut tx = tx;
        splitter.run(&mut tx)
    });
    JobHandle {
        events: rx,
        cancel,
        task,
    }
}

impl JobHandle {
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub async fn recv(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// 等待任务结束并返回最终结果；未读取的事件被丢弃
    pub async fn join(self) -> Result<Outcome, AppError> {
        Ok(self.task.await?)
    }
}

impl Stream for JobHandle {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        self.get_mut().events.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RunStatus;
    use crate::job::SplitPolicy;
    use futures::StreamExt;
    use std::fs;

    #[tokio::test]
    async fn stream_ends_with_outcome_and_join_agrees() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("log.txt");
        let body: String = (0..25).map(|i| format!("entry {}\n", i)).collect();
        fs::write(&input, body).unwrap();

        let job = SplitJob::new(&input, SplitPolicy::ByLineCount(10)).unwrap();
        let mut handle = start_job(job, 5);
        let mut events = Vec::new();
        while let Some(event) = handle.next().await {
            events.push(event);
        }

        let progress: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                Event::Progress(p) => Some(p.total_lines),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![5, 10, 15, 20, 25]);
        match events.last() {
            Some(Event::Outcome(outcome)) => assert_eq!(outcome.summary().total_parts, 3),
            other => panic!("unexpected last event: {:?}", other),
        }

        let outcome = handle.join().await.unwrap();
        assert_eq!(outcome.status(), RunStatus::Completed);
        assert_eq!(outcome.summary().total_lines, 25);
    }
}
